//! Reconciliation — many overlapping snapshots in, one canonical table out.
//!
//! Every merged chunk on record is folded into a map keyed by
//! (permalink, text): engagement counters take the maximum ever observed,
//! presence flags the OR. Counters never decrease, even when the platform
//! corrected one downward — the table is a last-known-maximum, not a live
//! mirror. Labels are carried over from the previous table by text, via
//! the same merge used for corrections, so a rebuild never loses them.
//!
//! The rebuild is total and idempotent: the output depends only on the
//! chunk set and the previous table's labels, so rerunning after a crash
//! is always safe.

use std::collections::HashMap;

use anyhow::Result;
use tracing::info;

use dugout_common::{list_present, CanonicalRecord, Label, SnapshotRow};

use crate::labels::{apply_corrections, labeled_pairs};
use crate::traits::TableStore;

/// Counters from one reconciliation.
#[derive(Debug, Default)]
pub struct ReconcileStats {
    pub chunk_files: u64,
    pub rows_scanned: u64,
    pub canonical_rows: u64,
    /// Rows that inherited a label from the previous table.
    pub labels_carried: u64,
    /// Texts whose carried labels disagreed across permalinks.
    pub label_conflicts: u64,
}

/// Fold one snapshot into the aggregation map.
fn fold_snapshot(map: &mut HashMap<(String, String), CanonicalRecord>, row: SnapshotRow) {
    let link_present = list_present(&row.url_list);
    let photo_present = list_present(&row.photo_list);
    let key = (row.permalink.clone(), row.text.clone());

    match map.entry(key) {
        std::collections::hash_map::Entry::Occupied(entry) => {
            let record = entry.into_mut();
            record.reply_count = record.reply_count.max(row.reply_count);
            record.repost_count = record.repost_count.max(row.repost_count);
            record.like_count = record.like_count.max(row.like_count);
            record.link_present |= link_present;
            record.photo_present |= photo_present;
            record.is_repost |= row.is_repost;
        }
        std::collections::hash_map::Entry::Vacant(entry) => {
            entry.insert(CanonicalRecord {
                permalink: row.permalink,
                text: row.text,
                reply_count: row.reply_count,
                repost_count: row.repost_count,
                like_count: row.like_count,
                link_present,
                photo_present,
                is_repost: row.is_repost,
                label: Label::Unknown,
            });
        }
    }
}

/// Aggregate a snapshot collection into canonical records, sorted by
/// (permalink, text) so repeated runs produce identical output.
pub fn aggregate_rows(rows: impl IntoIterator<Item = SnapshotRow>) -> Vec<CanonicalRecord> {
    let mut map: HashMap<(String, String), CanonicalRecord> = HashMap::new();
    for row in rows {
        fold_snapshot(&mut map, row);
    }
    let mut table: Vec<CanonicalRecord> = map.into_values().collect();
    table.sort_by(|a, b| (&a.permalink, &a.text).cmp(&(&b.permalink, &b.text)));
    table
}

/// Rebuild the canonical table from every chunk in the store, carrying
/// labels over from the existing table. With no chunks on record the
/// existing table is returned unchanged.
pub fn reconcile<S: TableStore>(store: &S) -> Result<(Vec<CanonicalRecord>, ReconcileStats)> {
    let mut stats = ReconcileStats::default();
    let existing = store.load_canonical()?;

    let names = store.chunk_names()?;
    if names.is_empty() {
        info!(rows = existing.len(), "no chunks on record; canonical table unchanged");
        stats.canonical_rows = existing.len() as u64;
        return Ok((existing, stats));
    }

    let mut map: HashMap<(String, String), CanonicalRecord> = HashMap::new();
    for name in &names {
        let rows = store.read_chunk(name)?;
        stats.chunk_files += 1;
        stats.rows_scanned += rows.len() as u64;
        for row in rows {
            fold_snapshot(&mut map, row);
        }
    }
    let mut table: Vec<CanonicalRecord> = map.into_values().collect();
    table.sort_by(|a, b| (&a.permalink, &a.text).cmp(&(&b.permalink, &b.text)));

    let carried = labeled_pairs(&existing);
    let merge = apply_corrections(&mut table, carried);
    stats.labels_carried = merge.rows_labeled;
    stats.label_conflicts = merge.conflicts;
    stats.canonical_rows = table.len() as u64;

    info!(
        chunks = stats.chunk_files,
        rows_scanned = stats.rows_scanned,
        canonical_rows = stats.canonical_rows,
        labels_carried = stats.labels_carried,
        "reconciled canonical table"
    );
    Ok((table, stats))
}
