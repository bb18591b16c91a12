//! Annotation sampling — drawing unlabeled rows for human labelers.
//!
//! The draw is over distinct texts (duplicate wording would waste
//! annotator time — duplicate propagation fills those in for free) and
//! comes back in correction-sheet format with the `x` placeholder, ready
//! to be filled in and fed to the label merge.

use rand::seq::IndexedRandom;
use rand::Rng;

use dugout_common::{CanonicalRecord, Label, LabelCorrection};

/// Draw up to `n` distinct unknown-labeled texts uniformly at random.
pub fn sample_unlabeled<R: Rng + ?Sized>(
    table: &[CanonicalRecord],
    n: usize,
    rng: &mut R,
) -> Vec<LabelCorrection> {
    let mut seen = std::collections::HashSet::new();
    let texts: Vec<&str> = table
        .iter()
        .filter(|row| row.label == Label::Unknown && !row.text.trim().is_empty())
        .map(|row| row.text.as_str())
        .filter(|text| seen.insert(*text))
        .collect();

    texts
        .choose_multiple(rng, n.min(texts.len()))
        .map(|text| LabelCorrection {
            label: Label::Unknown,
            text: (*text).to_string(),
        })
        .collect()
}
