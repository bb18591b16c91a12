//! Label merging — the only path by which labels enter or move through
//! the canonical table.
//!
//! Corrections join onto the table by text alone: identical wording gets
//! an identical verdict, even across distinct permalinks. The merge never
//! regresses a known label to unknown; among known labels the last
//! correction applied wins, and disagreements are logged rather than
//! silently absorbed.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use dugout_common::{CanonicalRecord, Label, LabelCorrection};

/// Counters from one merge pass.
#[derive(Debug, Default)]
pub struct LabelMergeStats {
    /// Corrections seen before any filtering.
    pub corrections_seen: u64,
    /// Corrections left after dropping placeholders and exact duplicates.
    pub corrections_usable: u64,
    /// Texts for which two corrections disagreed (last one won).
    pub conflicts: u64,
    /// Rows moved from unknown to a known label.
    pub rows_labeled: u64,
    /// Rows whose known label was overwritten with a different one.
    pub rows_relabeled: u64,
}

/// Collapse a correction stream into a text → label map. Placeholder and
/// unlabeled entries are dropped, exact duplicate pairs collapse silently,
/// and a later correction that disagrees with an earlier one overwrites it
/// (counted and logged).
fn correction_map(
    corrections: impl IntoIterator<Item = LabelCorrection>,
    stats: &mut LabelMergeStats,
) -> HashMap<String, Label> {
    let mut map: HashMap<String, Label> = HashMap::new();
    let mut seen_pairs: HashSet<(String, Label)> = HashSet::new();

    for correction in corrections {
        stats.corrections_seen += 1;
        if !correction.label.is_known() || correction.text.trim().is_empty() {
            continue;
        }
        if !seen_pairs.insert((correction.text.clone(), correction.label)) {
            continue;
        }
        if let Some(previous) = map.insert(correction.text.clone(), correction.label) {
            if previous != correction.label {
                stats.conflicts += 1;
                warn!(
                    text = correction.text.as_str(),
                    previous = %previous,
                    current = %correction.label,
                    "conflicting corrections for the same text; keeping the later one"
                );
            }
        }
    }

    stats.corrections_usable = map.len() as u64;
    map
}

/// Apply a correction stream to the table in place. Per row: the
/// correction's label when the text has one, otherwise the label the row
/// already carries. A known label is never overwritten by an absence of
/// one.
pub fn apply_corrections(
    table: &mut [CanonicalRecord],
    corrections: impl IntoIterator<Item = LabelCorrection>,
) -> LabelMergeStats {
    let mut stats = LabelMergeStats::default();
    let map = correction_map(corrections, &mut stats);
    if map.is_empty() {
        return stats;
    }

    for row in table.iter_mut() {
        if let Some(&label) = map.get(&row.text) {
            if row.label == Label::Unknown {
                stats.rows_labeled += 1;
            } else if row.label != label {
                stats.rows_relabeled += 1;
                warn!(
                    permalink = row.permalink.as_str(),
                    previous = %row.label,
                    current = %label,
                    "correction overwrote an established label"
                );
            }
            row.label = label;
        }
    }

    stats
}

/// Every labeled (text, label) pair in the table, deduplicated, in table
/// order.
pub fn labeled_pairs(table: &[CanonicalRecord]) -> Vec<LabelCorrection> {
    let mut seen: HashSet<(String, Label)> = HashSet::new();
    let mut pairs = Vec::new();
    for row in table {
        if row.label.is_known() && seen.insert((row.text.clone(), row.label)) {
            pairs.push(LabelCorrection {
                label: row.label,
                text: row.text.clone(),
            });
        }
    }
    pairs
}

/// Fill in rows whose text matches an already-labeled row. The table's
/// own labeled pairs are extracted, stable-sorted by text (table order
/// breaks ties, making the pass deterministic), and fed back through the
/// merge.
pub fn propagate_duplicate_labels(table: &mut [CanonicalRecord]) -> LabelMergeStats {
    let mut pairs = labeled_pairs(table);
    pairs.sort_by(|a, b| a.text.cmp(&b.text));
    apply_corrections(table, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::canonical;

    fn correction(label: Label, text: &str) -> LabelCorrection {
        LabelCorrection {
            label,
            text: text.to_string(),
        }
    }

    #[test]
    fn correction_fills_unknown_row() {
        let mut table = vec![canonical("p1", "wrist soreness", Label::Unknown)];
        let stats = apply_corrections(&mut table, vec![correction(Label::Injury, "wrist soreness")]);
        assert_eq!(table[0].label, Label::Injury);
        assert_eq!(stats.rows_labeled, 1);
        assert_eq!(stats.rows_relabeled, 0);
    }

    #[test]
    fn placeholder_corrections_are_filtered() {
        let mut table = vec![canonical("p1", "foo", Label::Injury)];
        let stats = apply_corrections(&mut table, vec![correction(Label::Unknown, "foo")]);
        assert_eq!(table[0].label, Label::Injury, "placeholder must not regress a label");
        assert_eq!(stats.corrections_usable, 0);
    }

    #[test]
    fn rows_without_corrections_keep_their_label() {
        let mut table = vec![
            canonical("p1", "labeled already", Label::NotInjury),
            canonical("p2", "never labeled", Label::Unknown),
        ];
        apply_corrections(&mut table, vec![correction(Label::Injury, "something else")]);
        assert_eq!(table[0].label, Label::NotInjury);
        assert_eq!(table[1].label, Label::Unknown);
    }

    #[test]
    fn exact_duplicate_pairs_collapse_without_conflict() {
        let mut table = vec![canonical("p1", "dup", Label::Unknown)];
        let stats = apply_corrections(
            &mut table,
            vec![correction(Label::Injury, "dup"), correction(Label::Injury, "dup")],
        );
        assert_eq!(stats.conflicts, 0);
        assert_eq!(stats.corrections_usable, 1);
        assert_eq!(table[0].label, Label::Injury);
    }

    #[test]
    fn conflicting_corrections_last_write_wins_and_counted() {
        let mut table = vec![canonical("p1", "ambiguous", Label::Unknown)];
        let stats = apply_corrections(
            &mut table,
            vec![
                correction(Label::Injury, "ambiguous"),
                correction(Label::NotInjury, "ambiguous"),
            ],
        );
        assert_eq!(stats.conflicts, 1);
        assert_eq!(table[0].label, Label::NotInjury);
    }

    #[test]
    fn known_correction_overwrites_known_label() {
        let mut table = vec![canonical("p1", "reversed on review", Label::NotInjury)];
        let stats =
            apply_corrections(&mut table, vec![correction(Label::Injury, "reversed on review")]);
        assert_eq!(table[0].label, Label::Injury);
        assert_eq!(stats.rows_relabeled, 1);
    }

    #[test]
    fn propagate_fills_duplicate_text() {
        let mut table = vec![
            canonical("p1", "dup", Label::Injury),
            canonical("p2", "dup", Label::Unknown),
            canonical("p3", "other", Label::Unknown),
        ];
        let stats = propagate_duplicate_labels(&mut table);
        assert_eq!(table[0].label, Label::Injury);
        assert_eq!(table[1].label, Label::Injury);
        assert_eq!(table[2].label, Label::Unknown);
        assert_eq!(stats.rows_labeled, 1);
    }

    #[test]
    fn propagate_is_idempotent() {
        let mut table = vec![
            canonical("p1", "dup", Label::Injury),
            canonical("p2", "dup", Label::Unknown),
        ];
        propagate_duplicate_labels(&mut table);
        let snapshot = table.clone();
        let stats = propagate_duplicate_labels(&mut table);
        assert_eq!(table, snapshot);
        assert_eq!(stats.rows_labeled, 0);
    }

    #[test]
    fn propagate_conflicting_duplicates_is_deterministic() {
        // Two permalinks, same text, disagreeing labels: the extracted
        // pairs sort by text with table order breaking ties, so the later
        // table row's label wins — every run.
        let mut table = vec![
            canonical("p1", "dup", Label::Injury),
            canonical("p2", "dup", Label::NotInjury),
        ];
        let stats = propagate_duplicate_labels(&mut table);
        assert_eq!(stats.conflicts, 1);
        assert_eq!(table[0].label, Label::NotInjury);
        assert_eq!(table[1].label, Label::NotInjury);
    }

    #[test]
    fn no_sequence_of_passes_regresses_a_label() {
        let mut table = vec![
            canonical("p1", "set once", Label::Injury),
            canonical("p2", "unrelated", Label::Unknown),
        ];
        apply_corrections(&mut table, vec![correction(Label::Unknown, "set once")]);
        propagate_duplicate_labels(&mut table);
        apply_corrections(&mut table, Vec::new());
        assert_eq!(table[0].label, Label::Injury);
    }
}
