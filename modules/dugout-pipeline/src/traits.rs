// Trait abstractions for the pipeline's external collaborators.
//
// SnapshotSource — raw scrape output, whatever produced it.
// CorrectionSource — label sheets coming back from annotators.
// TableStore — durable home of chunk and canonical artifacts.
//
// These enable deterministic testing with the in-memory mocks in
// `testing`: no data directory, no fixture files. `cargo test` in seconds.

use anyhow::Result;

use dugout_common::{CanonicalRecord, LabelCorrection, SnapshotRow};

/// A finite stream of raw snapshot rows from arbitrary-named files in a
/// designated location. Order is not guaranteed. Implementations filter
/// malformed rows (with a count) rather than failing the stream; I/O
/// errors surface through the iterator and abort the run.
pub trait SnapshotSource {
    fn rows(&mut self) -> Result<Box<dyn Iterator<Item = Result<SnapshotRow>> + '_>>;

    /// Rows dropped as malformed so far, for stage reporting.
    fn malformed(&self) -> u64;
}

/// Label corrections from one or more annotation sheets — human-labeled
/// samples or reviewer-corrected misclassifications.
pub trait CorrectionSource {
    /// A short name for logging (typically the file name).
    fn name(&self) -> String;

    fn corrections(&self) -> Result<Vec<LabelCorrection>>;
}

/// Durable store for chunk and canonical artifacts, keyed by file name.
pub trait TableStore {
    /// Read the existing canonical table, or empty if none has been
    /// written yet.
    fn load_canonical(&self) -> Result<Vec<CanonicalRecord>>;

    /// Write the canonical table in full, replacing any previous version.
    fn save_canonical(&self, table: &[CanonicalRecord]) -> Result<()>;

    /// Persist a merged chunk under the given name.
    fn write_chunk(&self, name: &str, rows: &[SnapshotRow]) -> Result<()>;

    /// Names of all persisted chunks, sorted.
    fn chunk_names(&self) -> Result<Vec<String>>;

    /// Read one chunk back.
    fn read_chunk(&self, name: &str) -> Result<Vec<SnapshotRow>>;
}
