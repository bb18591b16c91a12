// Test mocks for the pipeline.
//
// In-memory implementations of the three trait seams, plus row builders.
// No data directory, no fixture files — `cargo test` in seconds.

use std::cell::RefCell;
use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;

use dugout_common::{CanonicalRecord, Label, LabelCorrection, SnapshotRow};

use crate::traits::{CorrectionSource, SnapshotSource, TableStore};

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

/// A snapshot row with quiet defaults: zero counters, empty lists, not a
/// repost, scraped 2021-04-01.
pub fn snapshot(permalink: &str, text: &str) -> SnapshotRow {
    SnapshotRow {
        permalink: permalink.to_string(),
        text: text.to_string(),
        reply_count: 0,
        repost_count: 0,
        like_count: 0,
        url_list: "[]".to_string(),
        photo_list: "[]".to_string(),
        is_repost: false,
        scrape_date: NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
    }
}

/// A canonical record with zero counters and no presence flags.
pub fn canonical(permalink: &str, text: &str, label: Label) -> CanonicalRecord {
    CanonicalRecord {
        permalink: permalink.to_string(),
        text: text.to_string(),
        reply_count: 0,
        repost_count: 0,
        like_count: 0,
        link_present: false,
        photo_present: false,
        is_repost: false,
        label,
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Stateful in-memory table store. BTreeMap keeps chunk names sorted, like
/// the directory listing the CSV store produces.
#[derive(Default)]
pub struct MemoryStore {
    chunks: RefCell<BTreeMap<String, Vec<SnapshotRow>>>,
    canonical: RefCell<Option<Vec<CanonicalRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flushed chunk's rows. Panics when the chunk was never written —
    /// a test that asks for a missing chunk is already broken.
    pub fn chunk(&self, name: &str) -> Vec<SnapshotRow> {
        self.chunks
            .borrow()
            .get(name)
            .unwrap_or_else(|| panic!("no chunk named {name}"))
            .clone()
    }
}

impl TableStore for MemoryStore {
    fn load_canonical(&self) -> Result<Vec<CanonicalRecord>> {
        Ok(self.canonical.borrow().clone().unwrap_or_default())
    }

    fn save_canonical(&self, table: &[CanonicalRecord]) -> Result<()> {
        *self.canonical.borrow_mut() = Some(table.to_vec());
        Ok(())
    }

    fn write_chunk(&self, name: &str, rows: &[SnapshotRow]) -> Result<()> {
        self.chunks.borrow_mut().insert(name.to_string(), rows.to_vec());
        Ok(())
    }

    fn chunk_names(&self) -> Result<Vec<String>> {
        Ok(self.chunks.borrow().keys().cloned().collect())
    }

    fn read_chunk(&self, name: &str) -> Result<Vec<SnapshotRow>> {
        Ok(self.chunk(name))
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// Snapshot source over a fixed row list.
pub struct MemorySource {
    rows: Vec<SnapshotRow>,
}

impl MemorySource {
    pub fn new(rows: Vec<SnapshotRow>) -> Self {
        Self { rows }
    }
}

impl SnapshotSource for MemorySource {
    fn rows(&mut self) -> Result<Box<dyn Iterator<Item = Result<SnapshotRow>> + '_>> {
        Ok(Box::new(self.rows.clone().into_iter().map(Ok)))
    }

    fn malformed(&self) -> u64 {
        0
    }
}

// ---------------------------------------------------------------------------
// MemoryCorrections
// ---------------------------------------------------------------------------

/// Correction source over a fixed sheet.
pub struct MemoryCorrections {
    name: String,
    corrections: Vec<LabelCorrection>,
}

impl MemoryCorrections {
    pub fn new(name: &str, corrections: Vec<LabelCorrection>) -> Self {
        Self {
            name: name.to_string(),
            corrections,
        }
    }
}

impl CorrectionSource for MemoryCorrections {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn corrections(&self) -> Result<Vec<LabelCorrection>> {
        Ok(self.corrections.clone())
    }
}
