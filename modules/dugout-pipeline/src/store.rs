//! CSV-backed implementations of the collaborator seams.
//!
//! All pipeline artifacts are delimited text with fixed column sets:
//! chunk files and the canonical table under a data directory, correction
//! sheets wherever annotators left them. Rows that fail to parse are
//! filtered with a warning and never fail the run; I/O errors are fatal.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use dugout_common::{CanonicalRecord, LabelCorrection, SnapshotRow};

use crate::traits::{CorrectionSource, SnapshotSource, TableStore};

/// A parse failure scoped to one record, as opposed to an I/O failure that
/// should abort the run.
fn is_row_error(err: &csv::Error) -> bool {
    !matches!(err.kind(), csv::ErrorKind::Io(_))
}

// ---------------------------------------------------------------------------
// CsvStore
// ---------------------------------------------------------------------------

/// Chunk and canonical persistence over a data directory.
pub struct CsvStore {
    chunk_dir: PathBuf,
    canonical_path: PathBuf,
}

impl CsvStore {
    pub fn new(chunk_dir: impl Into<PathBuf>, canonical_path: impl Into<PathBuf>) -> Self {
        Self {
            chunk_dir: chunk_dir.into(),
            canonical_path: canonical_path.into(),
        }
    }

    fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        let mut skipped = 0u64;
        let rdr = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        for record in rdr.into_deserialize() {
            match record {
                Ok(row) => rows.push(row),
                Err(e) if is_row_error(&e) => {
                    skipped += 1;
                    warn!(file = %path.display(), error = %e, "skipping malformed row");
                }
                Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
            }
        }
        if skipped > 0 {
            debug!(file = %path.display(), skipped, "malformed rows filtered");
        }
        Ok(rows)
    }

    fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl TableStore for CsvStore {
    fn load_canonical(&self) -> Result<Vec<CanonicalRecord>> {
        if !self.canonical_path.exists() {
            return Ok(Vec::new());
        }
        Self::read_rows(&self.canonical_path)
    }

    fn save_canonical(&self, table: &[CanonicalRecord]) -> Result<()> {
        Self::write_rows(&self.canonical_path, table)
    }

    fn write_chunk(&self, name: &str, rows: &[SnapshotRow]) -> Result<()> {
        Self::write_rows(&self.chunk_dir.join(name), rows)
    }

    fn chunk_names(&self) -> Result<Vec<String>> {
        if !self.chunk_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.chunk_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_file() && name.starts_with("merged") && name.ends_with(".csv")
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_chunk(&self, name: &str) -> Result<Vec<SnapshotRow>> {
        Self::read_rows(&self.chunk_dir.join(name))
    }
}

// ---------------------------------------------------------------------------
// CsvSnapshotSource
// ---------------------------------------------------------------------------

/// Raw snapshot rows from every CSV file in a directory. Files are visited
/// in name order; one file is open at a time, so memory stays bounded by
/// the chunker's working set, not by the size of the scrape.
pub struct CsvSnapshotSource {
    dir: PathBuf,
    malformed: Cell<u64>,
}

impl CsvSnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            malformed: Cell::new(0),
        }
    }
}

impl SnapshotSource for CsvSnapshotSource {
    fn rows(&mut self) -> Result<Box<dyn Iterator<Item = Result<SnapshotRow>> + '_>> {
        let mut files = Vec::new();
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)
                .with_context(|| format!("listing {}", self.dir.display()))?
            {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    files.push(entry.path());
                }
            }
        }
        files.sort();
        Ok(Box::new(SnapshotIter {
            files: files.into_iter(),
            current: None,
            malformed: &self.malformed,
        }))
    }

    fn malformed(&self) -> u64 {
        self.malformed.get()
    }
}

struct SnapshotIter<'a> {
    files: std::vec::IntoIter<PathBuf>,
    current: Option<(PathBuf, csv::DeserializeRecordsIntoIter<fs::File, SnapshotRow>)>,
    malformed: &'a Cell<u64>,
}

impl Iterator for SnapshotIter<'_> {
    type Item = Result<SnapshotRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((path, records)) = &mut self.current {
                match records.next() {
                    Some(Ok(row)) => return Some(Ok(row)),
                    Some(Err(e)) if is_row_error(&e) => {
                        self.malformed.set(self.malformed.get() + 1);
                        warn!(file = %path.display(), error = %e, "skipping malformed row");
                        continue;
                    }
                    Some(Err(e)) => return Some(Err(e.into())),
                    None => self.current = None,
                }
                continue;
            }
            let path = self.files.next()?;
            match csv::Reader::from_path(&path) {
                Ok(rdr) => {
                    debug!(file = %path.display(), "reading snapshot file");
                    self.current = Some((path, rdr.into_deserialize()));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Write an annotation sheet in correction-file format (`label,text`,
/// unknown spelled `x`).
pub fn write_correction_sheet(path: &Path, rows: &[LabelCorrection]) -> Result<()> {
    CsvStore::write_rows(path, rows)
}

// ---------------------------------------------------------------------------
// CsvCorrectionSource
// ---------------------------------------------------------------------------

/// Label corrections from a single annotation sheet.
pub struct CsvCorrectionSource {
    path: PathBuf,
}

impl CsvCorrectionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// One source per CSV file in a directory, in name order. Missing
    /// directory means no corrections — a normal state between labeling
    /// rounds.
    pub fn from_dir(dir: &Path) -> Result<Vec<Self>> {
        let mut paths = Vec::new();
        if dir.exists() {
            for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?
            {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type()?.is_file() && name.ends_with(".csv") {
                    paths.push(entry.path());
                }
            }
        }
        paths.sort();
        Ok(paths.into_iter().map(Self::new).collect())
    }
}

impl CorrectionSource for CsvCorrectionSource {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn corrections(&self) -> Result<Vec<LabelCorrection>> {
        CsvStore::read_rows(&self.path)
    }
}
