//! Deterministic summary-prompt assembly for the AI collaborator.
//!
//! The same snapshot must always serialize to byte-identical text so the
//! downstream call is reproducible for testing and caching. Photo bytes are
//! never included; only counts and text travel.

use crate::schema::SectionDef;
use crate::scoring::{overall_score, section_scores};
use crate::store::{FormSnapshot, ItemStatus};

/// Serialize header metadata, per-section scores, the overall score, and
/// flagged items into the structured text block the summarization service
/// consumes.
pub fn build_summary_input(snapshot: &FormSnapshot, sections: &'static [SectionDef]) -> String {
    let scores = section_scores(snapshot, sections);
    let overall = overall_score(snapshot, sections);

    let mut out = String::new();
    out.push_str(
        "You are an expert property-management auditor. Analyze the following \
         inspection results and produce a professional report.\n\n",
    );

    out.push_str("INSPECTION DETAILS:\n");
    out.push_str(&format!("- Property: {}\n", snapshot.header.property));
    out.push_str(&format!("- Date: {}\n", snapshot.header.date));
    out.push_str(&format!("- Auditor: {}\n", snapshot.header.auditor));
    out.push_str(&format!("- Manager: {}\n", snapshot.header.manager));

    out.push_str("\nRATING SCALE:\n");
    out.push_str("- Compliant (C) = 100% - the item meets every verification criterion\n");
    out.push_str("- Non-compliant (NC) = 0% - the item does not meet the criteria\n");
    out.push_str("- Not applicable (NA) = excluded from the calculation\n");

    out.push_str("\nSECTION RESULTS:\n");
    for score in &scores {
        out.push_str(&format!(
            "\n{}: {}% compliance ({} compliant, {} non-compliant, {} N/A)",
            score.section_title,
            score.percent,
            score.compliant,
            score.non_compliant,
            score.not_applicable
        ));
    }

    out.push_str(&format!("\n\nOVERALL SCORE: {overall}% compliance\n"));

    out.push_str("\nFINDINGS DETAIL:");
    for section in sections {
        let flagged: Vec<_> = section
            .items
            .iter()
            .filter_map(|item| {
                let answer = snapshot.answers.get(item.id)?;
                let has_observation = !answer.observation.trim().is_empty();
                if answer.status == Some(ItemStatus::NonCompliant) || has_observation {
                    Some((item, answer))
                } else {
                    None
                }
            })
            .collect();
        if flagged.is_empty() {
            continue;
        }
        out.push_str(&format!("\n\n{}:", section.title));
        for (item, answer) in flagged {
            let status_label = match answer.status {
                Some(ItemStatus::NonCompliant) => "NON-COMPLIANT",
                Some(ItemStatus::Compliant) => "COMPLIANT",
                Some(ItemStatus::NotApplicable) => "NOT APPLICABLE",
                None => "UNANSWERED",
            };
            out.push_str(&format!("\n- {}: {status_label}", item.label));
            out.push_str(&format!("\n  Verification criterion: {}", item.criterion));
            let observation = answer.observation.trim();
            if !observation.is_empty() {
                out.push_str(&format!("\n  Observation: {observation}"));
            }
        }
    }

    let comments = snapshot.comments.trim();
    if !comments.is_empty() {
        out.push_str(&format!("\n\nGENERAL AUDITOR COMMENTS:\n{comments}"));
    }

    out.push_str(&format!(
        "\n\nRespond in JSON with exactly this structure:\n{{\n  \
         \"executive_summary\": \"3-5 sentence professional executive summary\",\n  \
         \"risk_level\": \"low|medium|high|critical\",\n  \
         \"critical_findings\": [\"finding 1\", \"finding 2\"],\n  \
         \"recommendations\": [\"prioritized recommendation 1\", \"prioritized recommendation 2\"],\n  \
         \"compliance_percent\": {overall}\n}}\n"
    ));

    out.push_str(
        "\nIMPORTANT:\n\
         - Respond with the JSON object only, no markdown fences or extra text\n\
         - Order recommendations from most to least urgent\n\
         - The risk level must reflect the severity of the findings\n\
         - Use professional, technical language\n",
    );

    out
}
