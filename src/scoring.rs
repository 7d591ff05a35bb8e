//! Weighted compliance scoring over a form snapshot.
//!
//! Two-tier scale: an item is either compliant or non-compliant once
//! evaluated; not-applicable and unanswered items are excluded from the
//! denominator. The overall score sums counts across sections before
//! dividing, so sections with more items weigh proportionally more than a
//! naive average of section percentages would allow.

use crate::schema::SectionDef;
use crate::store::{FormSnapshot, ItemStatus};
use serde::Serialize;

/// Per-section score derived from a snapshot. Never persisted; recomputed on
/// every request.
#[derive(Debug, Clone, Serialize)]
pub struct SectionScore {
    pub section_id: &'static str,
    pub section_title: &'static str,
    /// Number of items defined in the section.
    pub total: usize,
    pub compliant: usize,
    pub non_compliant: usize,
    pub not_applicable: usize,
    /// round-half-up(100 * compliant / evaluated); 0 when nothing was
    /// evaluated.
    pub percent: u8,
}

impl SectionScore {
    pub fn evaluated(&self) -> usize {
        self.compliant + self.non_compliant
    }
}

/// Compute scores for every section, in schema order.
pub fn section_scores(
    snapshot: &FormSnapshot,
    sections: &'static [SectionDef],
) -> Vec<SectionScore> {
    sections
        .iter()
        .map(|section| {
            let mut compliant = 0;
            let mut non_compliant = 0;
            let mut not_applicable = 0;
            for item in section.items {
                match snapshot.answers.get(item.id).and_then(|answer| answer.status) {
                    Some(ItemStatus::Compliant) => compliant += 1,
                    Some(ItemStatus::NonCompliant) => non_compliant += 1,
                    Some(ItemStatus::NotApplicable) => not_applicable += 1,
                    None => {}
                }
            }
            SectionScore {
                section_id: section.id,
                section_title: section.title,
                total: section.items.len(),
                compliant,
                non_compliant,
                not_applicable,
                percent: percent(compliant, compliant + non_compliant),
            }
        })
        .collect()
}

/// Overall percentage over the union of all sections' evaluated items.
///
/// Counts are summed first and divided once; averaging section percentages
/// would bias the result toward sections with fewer items.
pub fn overall_score(snapshot: &FormSnapshot, sections: &'static [SectionDef]) -> u8 {
    let scores = section_scores(snapshot, sections);
    let compliant: usize = scores.iter().map(|score| score.compliant).sum();
    let evaluated: usize = scores.iter().map(SectionScore::evaluated).sum();
    percent(compliant, evaluated)
}

/// Integer percentage with round-half-up, 0 for an empty denominator.
fn percent(compliant: usize, evaluated: usize) -> u8 {
    if evaluated == 0 {
        return 0;
    }
    // floor((100c + e/2) / e) expressed without intermediate truncation
    ((200 * compliant + evaluated) / (2 * evaluated)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::sections;
    use crate::store::ItemAnswer;

    fn answered(snapshot: &mut FormSnapshot, item_id: &str, status: ItemStatus) {
        snapshot.answers.insert(
            item_id.to_string(),
            ItemAnswer {
                status: Some(status),
                ..ItemAnswer::default()
            },
        );
    }

    fn score_for<'a>(scores: &'a [SectionScore], section_id: &str) -> &'a SectionScore {
        scores
            .iter()
            .find(|score| score.section_id == section_id)
            .expect("section present")
    }

    #[test]
    fn empty_snapshot_scores_zero_everywhere() {
        let snapshot = FormSnapshot::default();
        let scores = section_scores(&snapshot, sections());
        assert_eq!(scores.len(), sections().len());
        for score in &scores {
            assert_eq!(score.percent, 0);
            assert_eq!(score.evaluated(), 0);
        }
        assert_eq!(overall_score(&snapshot, sections()), 0);
    }

    #[test]
    fn one_compliant_one_non_compliant_is_fifty_percent() {
        let mut snapshot = FormSnapshot::default();
        answered(&mut snapshot, "com_01", ItemStatus::Compliant);
        answered(&mut snapshot, "com_02", ItemStatus::NonCompliant);

        let scores = section_scores(&snapshot, sections());
        let communication = score_for(&scores, "communication");
        assert_eq!(communication.total, 2);
        assert_eq!(communication.compliant, 1);
        assert_eq!(communication.non_compliant, 1);
        assert_eq!(communication.percent, 50);
        assert_eq!(overall_score(&snapshot, sections()), 50);
    }

    #[test]
    fn all_not_applicable_section_reports_zero_not_nan() {
        let mut snapshot = FormSnapshot::default();
        answered(&mut snapshot, "inf_01", ItemStatus::NotApplicable);
        answered(&mut snapshot, "inf_02", ItemStatus::NotApplicable);
        answered(&mut snapshot, "inf_04", ItemStatus::NotApplicable);

        let scores = section_scores(&snapshot, sections());
        let infrastructure = score_for(&scores, "infrastructure");
        assert_eq!(infrastructure.not_applicable, 3);
        assert_eq!(infrastructure.evaluated(), 0);
        assert_eq!(infrastructure.percent, 0);
    }

    #[test]
    fn not_applicable_is_excluded_from_the_denominator() {
        let mut snapshot = FormSnapshot::default();
        answered(&mut snapshot, "ase_01", ItemStatus::Compliant);
        answered(&mut snapshot, "ase_02", ItemStatus::Compliant);
        answered(&mut snapshot, "ase_03", ItemStatus::NotApplicable);

        let scores = section_scores(&snapshot, sections());
        let cleaning = score_for(&scores, "cleaning");
        assert_eq!(cleaning.percent, 100);
        assert_eq!(overall_score(&snapshot, sections()), 100);
    }

    #[test]
    fn rounding_is_half_up_on_the_integer_percentage() {
        // 1 of 3 evaluated: 33.33 rounds down; 2 of 3: 66.67 rounds up.
        let mut snapshot = FormSnapshot::default();
        answered(&mut snapshot, "seg_01", ItemStatus::Compliant);
        answered(&mut snapshot, "seg_02", ItemStatus::NonCompliant);
        answered(&mut snapshot, "seg_03", ItemStatus::NonCompliant);
        let scores = section_scores(&snapshot, sections());
        assert_eq!(score_for(&scores, "security").percent, 33);

        answered(&mut snapshot, "seg_02", ItemStatus::Compliant);
        let scores = section_scores(&snapshot, sections());
        assert_eq!(score_for(&scores, "security").percent, 67);

        // Exact half: 1 of 8 evaluated is 12.5 and must round to 13.
        assert_eq!(percent(1, 8), 13);
    }

    #[test]
    fn overall_sums_counts_instead_of_averaging_section_percentages() {
        // One small fully-compliant section against nine non-compliant items
        // spread elsewhere: summed counts give 1/10, a naive average of
        // per-section percentages would not.
        let mut snapshot = FormSnapshot::default();
        answered(&mut snapshot, "pry_01", ItemStatus::Compliant);
        for item_id in [
            "seg_01", "seg_02", "seg_03", "ase_01", "ase_02", "ase_03", "inf_03", "com_01",
            "com_02",
        ] {
            answered(&mut snapshot, item_id, ItemStatus::NonCompliant);
        }

        let overall = overall_score(&snapshot, sections());
        assert_eq!(overall, 10);

        let scores = section_scores(&snapshot, sections());
        let with_items: Vec<&SectionScore> = scores
            .iter()
            .filter(|score| score.evaluated() > 0)
            .collect();
        let naive_average = with_items
            .iter()
            .map(|score| u32::from(score.percent))
            .sum::<u32>()
            / with_items.len() as u32;
        assert_ne!(u32::from(overall), naive_average);
    }

    #[test]
    fn lopsided_sections_expose_the_averaging_bug_class() {
        use crate::schema::{ItemDef, SectionDef};

        const fn bare_item(id: &'static str) -> ItemDef {
            ItemDef {
                id,
                label: id,
                criterion: "",
                frequency: "",
                allow_na: false,
            }
        }
        const SMALL: &[ItemDef] = &[bare_item("one_01")];
        const LARGE: &[ItemDef] = &[
            bare_item("many_01"),
            bare_item("many_02"),
            bare_item("many_03"),
            bare_item("many_04"),
            bare_item("many_05"),
            bare_item("many_06"),
            bare_item("many_07"),
            bare_item("many_08"),
            bare_item("many_09"),
        ];
        const LOPSIDED: &[SectionDef] = &[
            SectionDef {
                id: "small",
                title: "Small",
                description: "",
                items: SMALL,
            },
            SectionDef {
                id: "large",
                title: "Large",
                description: "",
                items: LARGE,
            },
        ];

        let mut snapshot = FormSnapshot::default();
        answered(&mut snapshot, "one_01", ItemStatus::Compliant);
        for item in LARGE {
            answered(&mut snapshot, item.id, ItemStatus::NonCompliant);
        }

        let scores = section_scores(&snapshot, LOPSIDED);
        assert_eq!(score_for(&scores, "small").percent, 100);
        assert_eq!(score_for(&scores, "large").percent, 0);

        // Summed counts: 1 of 10. A naive average of section percentages
        // would report (100 + 0) / 2 = 50.
        assert_eq!(overall_score(&snapshot, LOPSIDED), 10);
    }

    #[test]
    fn overall_stays_within_percentage_bounds() {
        let mut snapshot = FormSnapshot::default();
        for section in sections() {
            for item in section.items {
                answered(&mut snapshot, item.id, ItemStatus::Compliant);
            }
        }
        assert_eq!(overall_score(&snapshot, sections()), 100);

        for section in sections() {
            for item in section.items {
                answered(&mut snapshot, item.id, ItemStatus::NonCompliant);
            }
        }
        assert_eq!(overall_score(&snapshot, sections()), 0);
    }
}
