//! Core library for the `inspecta` property-audit tool.
//!
//! Data flows one direction: the static [`schema`] defines the checklist,
//! the [`store`] keys answers against it, [`scoring`] derives percentages,
//! and [`prompt`]/[`report`] serialize the results for the summarization
//! and export collaborators.

pub mod analysis;
pub mod cli;
pub mod photos;
pub mod prompt;
pub mod report;
pub mod schema;
pub mod scoring;
pub mod store;
