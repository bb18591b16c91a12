//! Pipeline run log — persisted timeline of every action taken during a
//! run.
//!
//! Each run produces a single JSON artifact, named by run id, holding the
//! run's stats and its sequenced events.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::stats::PipelineStats;

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

pub struct RunLog {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    events: Vec<RunEvent>,
    seq: u32,
}

#[derive(Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u32,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    SnapshotsIngested {
        rows: u64,
        malformed: u64,
    },
    ChunkFlushed {
        name: String,
        rows: u64,
    },
    TableReconciled {
        chunk_files: u64,
        rows_scanned: u64,
        canonical_rows: u64,
        labels_carried: u64,
    },
    CorrectionsApplied {
        sheet: String,
        corrections: u64,
        conflicts: u64,
        rows_labeled: u64,
        rows_relabeled: u64,
    },
    DuplicateLabelsPropagated {
        pairs: u64,
        rows_filled: u64,
    },
    SampleDrawn {
        rows: u64,
        sheet: String,
    },
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            events: Vec::new(),
            seq: 0,
        }
    }

    pub fn log(&mut self, kind: EventKind) {
        self.events.push(RunEvent {
            seq: self.seq,
            ts: Utc::now(),
            kind,
        });
        self.seq += 1;
    }

    /// Serialize the run log and write it under the given directory.
    /// Returns the artifact path.
    pub fn save(&self, dir: &Path, stats: &PipelineStats) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("run-{}.json", self.run_id));
        let artifact = serde_json::json!({
            "run_id": self.run_id,
            "started_at": self.started_at,
            "finished_at": Utc::now(),
            "stats": stats,
            "events": self.events,
        });
        fs::write(&path, serde_json::to_vec_pretty(&artifact)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(run_id = self.run_id.as_str(), events = self.events.len(), "run log saved");
        Ok(path)
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}
