//! CLI argument parsing for the inspection workflow.
//!
//! The CLI is intentionally thin: every subcommand maps to one library
//! operation, so scoring and persistence policy never leak into argument
//! handling.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::store::ItemStatus;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "inspecta",
    version,
    about = "Checklist-driven property inspection auditor",
    after_help = "Examples:\n  inspecta header --property \"Mirador Tower\" --auditor \"R. Vega\"\n  inspecta answer --item seg_01 --status non-compliant\n  inspecta note --item seg_01 --text \"logbook missing two weeks\"\n  inspecta photo add --item seg_01 --file front-gate.jpg\n  inspecta score --json\n  inspecta analyze\n  inspecta export --out report.md\n  inspecta reset --force",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Data directory for the form snapshot and photo blobs
    /// (default: the platform data dir)
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show checklist progress per section
    Status(StatusArgs),
    /// Record or clear a compliance status for an item
    Answer(AnswerArgs),
    /// Attach a free-text observation to an item
    Note(NoteArgs),
    /// Set inspection header fields
    Header(HeaderArgs),
    /// Set the free-form closing comments
    Comment(CommentArgs),
    /// Manage photos attached to an item
    #[command(subcommand)]
    Photo(PhotoCommand),
    /// Compute section and overall compliance scores
    Score(ScoreArgs),
    /// Print the summarization prompt without calling the AI service
    Prompt,
    /// Request an AI-generated executive summary
    Analyze(AnalyzeArgs),
    /// Render the inspection report as Markdown
    Export(ExportArgs),
    /// Discard the current inspection and every attached photo
    Reset(ResetArgs),
}

/// Status values accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StatusArg {
    Compliant,
    NonCompliant,
    NotApplicable,
}

impl From<StatusArg> for ItemStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Compliant => ItemStatus::Compliant,
            StatusArg::NonCompliant => ItemStatus::NonCompliant,
            StatusArg::NotApplicable => ItemStatus::NotApplicable,
        }
    }
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct AnswerArgs {
    /// Checklist item id (e.g. seg_01)
    #[arg(long, value_name = "ID")]
    pub item: String,

    /// Compliance status to record
    #[arg(long, value_enum, required_unless_present = "clear", conflicts_with = "clear")]
    pub status: Option<StatusArg>,

    /// Clear the recorded status instead
    #[arg(long)]
    pub clear: bool,
}

#[derive(Parser, Debug)]
pub struct NoteArgs {
    /// Checklist item id
    #[arg(long, value_name = "ID")]
    pub item: String,

    /// Observation text (empty clears it)
    #[arg(long)]
    pub text: String,
}

#[derive(Parser, Debug)]
pub struct HeaderArgs {
    /// Inspection date, ISO YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,

    /// Auditor name
    #[arg(long)]
    pub auditor: Option<String>,

    /// Auditor email
    #[arg(long)]
    pub auditor_email: Option<String>,

    /// Property manager name
    #[arg(long)]
    pub manager: Option<String>,

    /// Property manager email
    #[arg(long)]
    pub manager_email: Option<String>,

    /// Property (target site) label
    #[arg(long)]
    pub property: Option<String>,
}

#[derive(Parser, Debug)]
pub struct CommentArgs {
    /// Closing comments (empty clears them)
    #[arg(long)]
    pub text: String,
}

#[derive(Subcommand, Debug)]
pub enum PhotoCommand {
    /// Attach an image file to an item
    Add(PhotoAddArgs),
    /// Detach (and delete) a photo by key
    Rm(PhotoRmArgs),
}

#[derive(Parser, Debug)]
pub struct PhotoAddArgs {
    /// Checklist item id
    #[arg(long, value_name = "ID")]
    pub item: String,

    /// Image file to store
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct PhotoRmArgs {
    /// Checklist item id
    #[arg(long, value_name = "ID")]
    pub item: String,

    /// Photo key as printed by `photo add`
    #[arg(long, value_name = "KEY")]
    pub key: String,
}

#[derive(Parser, Debug)]
pub struct ScoreArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Emit the parsed analysis as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Output path for the Markdown report (stdout when omitted)
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Required confirmation; reset is irreversible
    #[arg(long)]
    pub force: bool,
}
