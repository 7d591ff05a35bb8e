//! Markdown report rendering.
//!
//! Thin export collaborator: consumes an already-validated snapshot, its
//! derived scores, and an optional AI summary. Formatting only; no policy.

use crate::analysis::Analysis;
use crate::schema::SectionDef;
use crate::scoring::SectionScore;
use crate::store::{FormSnapshot, ItemStatus};

pub fn render_report(
    snapshot: &FormSnapshot,
    sections: &'static [SectionDef],
    scores: &[SectionScore],
    overall: u8,
    analysis: Option<&Analysis>,
) -> String {
    let mut out = String::new();
    push_line(&mut out, "# Property Inspection Report");
    push_line(&mut out, "");
    push_line(&mut out, &format!("- Property: {}", snapshot.header.property));
    push_line(&mut out, &format!("- Date: {}", snapshot.header.date));
    push_line(
        &mut out,
        &format!(
            "- Auditor: {}{}",
            snapshot.header.auditor,
            email_suffix(&snapshot.header.auditor_email)
        ),
    );
    push_line(
        &mut out,
        &format!(
            "- Manager: {}{}",
            snapshot.header.manager,
            email_suffix(&snapshot.header.manager_email)
        ),
    );

    push_line(&mut out, "");
    push_line(&mut out, "## Compliance Scores");
    push_line(&mut out, "");
    push_line(
        &mut out,
        "| Section | Compliant | Non-compliant | N/A | Score |",
    );
    push_line(&mut out, "|---|---|---|---|---|");
    for score in scores {
        push_line(
            &mut out,
            &format!(
                "| {} | {} | {} | {} | {}% |",
                score.section_title,
                score.compliant,
                score.non_compliant,
                score.not_applicable,
                score.percent
            ),
        );
    }
    push_line(&mut out, &format!("| **Overall** | | | | **{overall}%** |"));

    push_line(&mut out, "");
    push_line(&mut out, "## Checklist Detail");
    for section in sections {
        push_line(&mut out, "");
        push_line(&mut out, &format!("### {}", section.title));
        push_line(&mut out, "");
        for item in section.items {
            let answer = snapshot.answers.get(item.id);
            let status = answer.and_then(|answer| answer.status);
            let mark = match status {
                Some(ItemStatus::Compliant) => "C",
                Some(ItemStatus::NonCompliant) => "NC",
                Some(ItemStatus::NotApplicable) => "NA",
                None => " ",
            };
            let mut line = format!("- [{mark}] {}", item.label);
            if let Some(answer) = answer {
                if !answer.photo_refs.is_empty() {
                    let noun = if answer.photo_refs.len() == 1 {
                        "photo"
                    } else {
                        "photos"
                    };
                    line.push_str(&format!(" ({} {noun})", answer.photo_refs.len()));
                }
            }
            push_line(&mut out, &line);
            if let Some(answer) = answer {
                let observation = answer.observation.trim();
                if !observation.is_empty() {
                    push_line(&mut out, &format!("  - Observation: {observation}"));
                }
            }
        }
    }

    let comments = snapshot.comments.trim();
    if !comments.is_empty() {
        push_line(&mut out, "");
        push_line(&mut out, "## Closing Comments");
        push_line(&mut out, "");
        push_line(&mut out, comments);
    }

    if let Some(analysis) = analysis {
        push_line(&mut out, "");
        push_line(&mut out, "## AI Summary");
        push_line(&mut out, "");
        push_line(
            &mut out,
            &format!("Risk level: **{}**", analysis.risk_level.label()),
        );
        push_line(&mut out, "");
        push_line(&mut out, &analysis.executive_summary);
        if !analysis.critical_findings.is_empty() {
            push_line(&mut out, "");
            push_line(&mut out, "### Critical Findings");
            push_line(&mut out, "");
            for finding in &analysis.critical_findings {
                push_line(&mut out, &format!("- {finding}"));
            }
        }
        if !analysis.recommendations.is_empty() {
            push_line(&mut out, "");
            push_line(&mut out, "### Recommendations");
            push_line(&mut out, "");
            for (idx, recommendation) in analysis.recommendations.iter().enumerate() {
                push_line(&mut out, &format!("{}. {recommendation}", idx + 1));
            }
        }
    }

    out
}

fn email_suffix(email: &str) -> String {
    if email.trim().is_empty() {
        String::new()
    } else {
        format!(" <{email}>")
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
