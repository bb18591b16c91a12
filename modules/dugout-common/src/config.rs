use std::env;
use std::path::PathBuf;

/// Working set bound for the chunker. Snapshots past this count trigger a
/// dedup-and-flush, which keeps peak memory bounded on small hardware.
pub const DEFAULT_CHUNK_ROW_LIMIT: usize = 2_000_000;

/// How many unlabeled rows an annotation sample draws by default.
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;

/// Pipeline configuration loaded from environment variables.
///
/// Constructed once in `main` and passed explicitly into every stage —
/// nothing in the pipeline reads the environment after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of raw per-account/per-hashtag scrape files.
    pub snapshot_dir: PathBuf,
    /// Directory merged chunk files are written to and reconciled from.
    pub chunk_dir: PathBuf,
    /// The canonical table file.
    pub canonical_path: PathBuf,
    /// Directory of label correction sheets.
    pub corrections_dir: PathBuf,
    /// Directory run-log artifacts are written to.
    pub run_log_dir: PathBuf,
    /// Row-count threshold that triggers a chunk flush.
    pub chunk_row_limit: usize,
    /// Rows per annotation sample.
    pub sample_size: usize,
}

impl Config {
    /// Load configuration from environment variables. Every variable has a
    /// default; numeric variables panic with a clear message when set to
    /// something unparseable.
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(env::var("DUGOUT_DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        Self {
            snapshot_dir: path_env("DUGOUT_SNAPSHOT_DIR", data_dir.join("snapshots")),
            chunk_dir: path_env("DUGOUT_CHUNK_DIR", data_dir.join("merged")),
            canonical_path: path_env("DUGOUT_CANONICAL_PATH", data_dir.join("filtered.csv")),
            corrections_dir: path_env("DUGOUT_LABELS_DIR", data_dir.join("labels")),
            run_log_dir: path_env("DUGOUT_RUN_LOG_DIR", data_dir.join("runs")),
            chunk_row_limit: env::var("DUGOUT_CHUNK_ROW_LIMIT")
                .map(|v| v.parse().expect("DUGOUT_CHUNK_ROW_LIMIT must be a number"))
                .unwrap_or(DEFAULT_CHUNK_ROW_LIMIT),
            sample_size: env::var("DUGOUT_SAMPLE_SIZE")
                .map(|v| v.parse().expect("DUGOUT_SAMPLE_SIZE must be a number"))
                .unwrap_or(DEFAULT_SAMPLE_SIZE),
        }
    }

    /// All paths rooted under one directory, defaults elsewhere. Used by
    /// tests and by tools that operate on a self-contained data directory.
    pub fn rooted_at(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            snapshot_dir: data_dir.join("snapshots"),
            chunk_dir: data_dir.join("merged"),
            canonical_path: data_dir.join("filtered.csv"),
            corrections_dir: data_dir.join("labels"),
            run_log_dir: data_dir.join("runs"),
            chunk_row_limit: DEFAULT_CHUNK_ROW_LIMIT,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

fn path_env(key: &str, default: PathBuf) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or(default)
}
