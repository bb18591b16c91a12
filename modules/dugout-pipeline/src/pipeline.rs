//! Stage orchestration for a full pipeline run.
//!
//! Stages run to completion in order — ingest, reconcile, apply
//! corrections, propagate duplicate labels — with the canonical table
//! rewritten after each mutating stage. Every artifact is an idempotent
//! full rebuild, so the recovery story for a failed run is "fix the input
//! and rerun", not partial patching.

use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

use crate::chunker::SnapshotChunker;
use crate::labels::{apply_corrections, propagate_duplicate_labels};
use crate::reconciler::reconcile;
use crate::run_log::{EventKind, RunLog};
use crate::stats::PipelineStats;
use crate::traits::{CorrectionSource, SnapshotSource, TableStore};

pub fn run_pipeline<Src, St, C>(
    source: &mut Src,
    store: &St,
    correction_sheets: &[C],
    chunk_row_limit: usize,
    run_date: NaiveDate,
) -> Result<(PipelineStats, RunLog)>
where
    Src: SnapshotSource,
    St: TableStore,
    C: CorrectionSource,
{
    let mut stats = PipelineStats::default();
    let mut log = RunLog::new();

    // --- Ingest raw snapshots into merged chunks ---
    info!("chunking raw snapshot files");
    let chunker = SnapshotChunker::new(store, chunk_row_limit, run_date);
    let chunk_stats = chunker.ingest(source.rows()?)?;
    stats.snapshots_read = chunk_stats.rows_read;
    stats.snapshots_malformed = source.malformed();
    stats.duplicates_dropped = chunk_stats.duplicates_dropped;
    stats.chunks_written = chunk_stats.chunks.len() as u64;
    stats.chunk_rows_written = chunk_stats.rows_written;
    log.log(EventKind::SnapshotsIngested {
        rows: stats.snapshots_read,
        malformed: stats.snapshots_malformed,
    });
    for chunk in &chunk_stats.chunks {
        log.log(EventKind::ChunkFlushed {
            name: chunk.name.clone(),
            rows: chunk.rows,
        });
    }
    info!(
        rows = stats.snapshots_read,
        malformed = stats.snapshots_malformed,
        chunks = stats.chunks_written,
        "snapshot ingest complete"
    );

    // --- Rebuild the canonical table ---
    info!("reconciling merged chunks into the canonical table");
    let (mut table, rec) = reconcile(store)?;
    store.save_canonical(&table)?;
    stats.chunk_files_reconciled = rec.chunk_files;
    stats.rows_scanned = rec.rows_scanned;
    stats.canonical_rows = rec.canonical_rows;
    stats.labels_carried = rec.labels_carried;
    stats.label_conflicts += rec.label_conflicts;
    log.log(EventKind::TableReconciled {
        chunk_files: rec.chunk_files,
        rows_scanned: rec.rows_scanned,
        canonical_rows: rec.canonical_rows,
        labels_carried: rec.labels_carried,
    });

    // --- Apply every correction sheet on hand ---
    if !correction_sheets.is_empty() {
        info!(sheets = correction_sheets.len(), "applying label corrections");
        for sheet in correction_sheets {
            let corrections = sheet.corrections()?;
            let merge = apply_corrections(&mut table, corrections);
            stats.correction_sheets += 1;
            stats.corrections_applied += merge.corrections_usable;
            stats.label_conflicts += merge.conflicts;
            stats.rows_labeled += merge.rows_labeled;
            stats.rows_relabeled += merge.rows_relabeled;
            info!(
                sheet = sheet.name().as_str(),
                corrections = merge.corrections_usable,
                rows_labeled = merge.rows_labeled,
                "correction sheet applied"
            );
            log.log(EventKind::CorrectionsApplied {
                sheet: sheet.name(),
                corrections: merge.corrections_usable,
                conflicts: merge.conflicts,
                rows_labeled: merge.rows_labeled,
                rows_relabeled: merge.rows_relabeled,
            });
        }
        store.save_canonical(&table)?;
    }

    // --- Propagate labels across duplicate text ---
    info!("propagating labels across duplicate text");
    let merge = propagate_duplicate_labels(&mut table);
    stats.duplicate_rows_filled = merge.rows_labeled;
    stats.label_conflicts += merge.conflicts;
    store.save_canonical(&table)?;
    log.log(EventKind::DuplicateLabelsPropagated {
        pairs: merge.corrections_seen,
        rows_filled: merge.rows_labeled,
    });
    info!(rows_filled = merge.rows_labeled, "duplicate label propagation complete");

    Ok((stats, log))
}
