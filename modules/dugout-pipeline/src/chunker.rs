//! Snapshot chunking — the pipeline's admission control.
//!
//! Raw scrape output is unbounded; the working set is not. Rows stream in
//! one at a time, and once the set crosses the configured limit it is
//! deduplicated and flushed as a merged chunk file. Chunk boundaries carry
//! no meaning — they exist so a full scrape never has to fit in memory.

use std::collections::HashSet;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

use dugout_common::SnapshotRow;

use crate::traits::TableStore;

/// Counters produced by an ingest run.
#[derive(Debug, Default)]
pub struct ChunkStats {
    pub rows_read: u64,
    pub duplicates_dropped: u64,
    pub rows_written: u64,
    /// Chunks flushed, in flush order.
    pub chunks: Vec<FlushedChunk>,
}

/// One flushed chunk, for stage reporting.
#[derive(Debug)]
pub struct FlushedChunk {
    pub name: String,
    pub rows: u64,
}

impl ChunkStats {
    pub fn chunk_names(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.name.as_str()).collect()
    }
}

pub struct SnapshotChunker<'a, S: TableStore> {
    store: &'a S,
    row_limit: usize,
    run_date: NaiveDate,
}

impl<'a, S: TableStore> SnapshotChunker<'a, S> {
    pub fn new(store: &'a S, row_limit: usize, run_date: NaiveDate) -> Self {
        Self {
            store,
            row_limit,
            run_date,
        }
    }

    /// Consume a stream of snapshot rows, flushing a deduplicated chunk
    /// whenever the working set exceeds the row limit and once more for
    /// any remainder at end of stream. Chunk numbering starts at 1 each
    /// run. I/O failures propagate — this is a batch job, not a service.
    pub fn ingest(&self, rows: impl Iterator<Item = Result<SnapshotRow>>) -> Result<ChunkStats> {
        let mut stats = ChunkStats::default();
        let mut working: Vec<SnapshotRow> = Vec::new();
        let mut seq = 0u32;

        for row in rows {
            working.push(row?);
            stats.rows_read += 1;
            if working.len() > self.row_limit {
                self.flush(&mut working, &mut seq, &mut stats)?;
            }
        }
        if !working.is_empty() {
            self.flush(&mut working, &mut seq, &mut stats)?;
        }

        Ok(stats)
    }

    /// Dedup the working set by exact row equality (first occurrence wins,
    /// order preserved), persist it, and reset.
    fn flush(&self, working: &mut Vec<SnapshotRow>, seq: &mut u32, stats: &mut ChunkStats) -> Result<()> {
        *seq += 1;
        let name = chunk_name(*seq, self.run_date);

        let rows = std::mem::take(working);
        let before = rows.len();
        let mut seen = HashSet::with_capacity(before);
        let mut unique = Vec::with_capacity(before);
        for row in rows {
            if seen.insert(row.clone()) {
                unique.push(row);
            }
        }
        stats.duplicates_dropped += (before - unique.len()) as u64;
        stats.rows_written += unique.len() as u64;

        self.store.write_chunk(&name, &unique)?;
        info!(chunk = name.as_str(), rows = unique.len(), dropped = before - unique.len(), "flushed chunk");
        stats.chunks.push(FlushedChunk {
            name,
            rows: unique.len() as u64,
        });
        Ok(())
    }
}

pub fn chunk_name(seq: u32, date: NaiveDate) -> String {
    format!("merged-{seq}-{date}.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{snapshot, MemoryStore};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 4, 1).unwrap()
    }

    fn ok_rows(rows: Vec<SnapshotRow>) -> impl Iterator<Item = Result<SnapshotRow>> {
        rows.into_iter().map(Ok)
    }

    #[test]
    fn remainder_below_threshold_flushes_once() {
        let store = MemoryStore::new();
        let chunker = SnapshotChunker::new(&store, 10, date());
        let rows: Vec<_> = (0..3).map(|i| snapshot(&format!("p{i}"), "text")).collect();

        let stats = chunker.ingest(ok_rows(rows)).unwrap();
        assert_eq!(stats.chunk_names(), vec!["merged-1-2021-04-01.csv"]);
        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.rows_written, 3);
        assert_eq!(store.chunk("merged-1-2021-04-01.csv").len(), 3);
    }

    #[test]
    fn working_set_never_exceeds_limit_plus_one() {
        let store = MemoryStore::new();
        let chunker = SnapshotChunker::new(&store, 4, date());
        let rows: Vec<_> = (0..11).map(|i| snapshot(&format!("p{i}"), "text")).collect();

        let stats = chunker.ingest(ok_rows(rows)).unwrap();
        // 11 rows with a limit of 4: flush at 5, flush at 5, remainder 1
        assert_eq!(
            stats.chunk_names(),
            vec![
                "merged-1-2021-04-01.csv",
                "merged-2-2021-04-01.csv",
                "merged-3-2021-04-01.csv"
            ]
        );
        assert_eq!(store.chunk("merged-1-2021-04-01.csv").len(), 5);
        assert_eq!(store.chunk("merged-2-2021-04-01.csv").len(), 5);
        assert_eq!(store.chunk("merged-3-2021-04-01.csv").len(), 1);
    }

    #[test]
    fn exact_duplicates_dropped_within_chunk() {
        let store = MemoryStore::new();
        let chunker = SnapshotChunker::new(&store, 10, date());
        let row = snapshot("p1", "same row");
        let mut near = snapshot("p1", "same row");
        near.like_count += 1; // differs in one field, so it survives

        let stats = chunker
            .ingest(ok_rows(vec![row.clone(), row.clone(), near.clone(), row]))
            .unwrap();
        assert_eq!(stats.duplicates_dropped, 2);
        let flushed = store.chunk("merged-1-2021-04-01.csv");
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[1], near);
    }

    #[test]
    fn empty_stream_writes_no_chunk() {
        let store = MemoryStore::new();
        let chunker = SnapshotChunker::new(&store, 10, date());
        let stats = chunker.ingest(ok_rows(vec![])).unwrap();
        assert!(stats.chunks.is_empty());
        assert!(store.chunk_names().unwrap().is_empty());
    }

    #[test]
    fn numbering_restarts_each_run() {
        let store = MemoryStore::new();
        let chunker = SnapshotChunker::new(&store, 10, date());
        chunker.ingest(ok_rows(vec![snapshot("p1", "a")])).unwrap();
        let stats = chunker.ingest(ok_rows(vec![snapshot("p2", "b")])).unwrap();
        // Same date, same sequence number: the rerun overwrites its own name
        assert_eq!(stats.chunk_names(), vec!["merged-1-2021-04-01.csv"]);
    }

    #[test]
    fn upstream_error_aborts() {
        let store = MemoryStore::new();
        let chunker = SnapshotChunker::new(&store, 10, date());
        let rows = vec![Ok(snapshot("p1", "a")), Err(anyhow::anyhow!("disk gone"))];
        assert!(chunker.ingest(rows.into_iter()).is_err());
    }
}
