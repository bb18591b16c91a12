use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dugout_common::{Config, DugoutError};
use dugout_pipeline::chunker::SnapshotChunker;
use dugout_pipeline::labels::{apply_corrections, propagate_duplicate_labels};
use dugout_pipeline::pipeline::run_pipeline;
use dugout_pipeline::reconciler::reconcile;
use dugout_pipeline::sampler::sample_unlabeled;
use dugout_pipeline::store::{
    write_correction_sheet, CsvCorrectionSource, CsvSnapshotSource, CsvStore,
};
use dugout_pipeline::traits::{CorrectionSource, SnapshotSource, TableStore};

#[derive(Parser)]
#[command(name = "dugout", about = "Batch pipeline for the injury-report tweet dataset")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: chunk, reconcile, label, propagate.
    Run,
    /// Chunk raw snapshot files into merged chunk files.
    Ingest,
    /// Rebuild the canonical table from every merged chunk on record.
    Reconcile,
    /// Apply a correction sheet (default: every sheet in the labels
    /// directory) to the canonical table.
    Label {
        /// A single sheet to apply instead of the labels directory.
        sheet: Option<PathBuf>,
    },
    /// Fill unknown labels on rows whose text matches a labeled row.
    Propagate,
    /// Draw unlabeled rows into an annotation sheet.
    Sample {
        /// Rows to draw (default from config).
        #[arg(long)]
        count: Option<usize>,
        /// Where to write the sheet (default: labels dir, `sampled.csv`).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dugout=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = CsvStore::new(&config.chunk_dir, &config.canonical_path);

    match cli.command {
        Command::Run => {
            let mut source = CsvSnapshotSource::new(&config.snapshot_dir);
            let sheets = CsvCorrectionSource::from_dir(&config.corrections_dir)?;
            let (stats, log) = run_pipeline(
                &mut source,
                &store,
                &sheets,
                config.chunk_row_limit,
                Utc::now().date_naive(),
            )?;
            log.save(&config.run_log_dir, &stats)?;
            info!("Pipeline run complete. {stats}");
        }
        Command::Ingest => {
            let mut source = CsvSnapshotSource::new(&config.snapshot_dir);
            let chunker = SnapshotChunker::new(&store, config.chunk_row_limit, Utc::now().date_naive());
            let stats = chunker.ingest(source.rows()?)?;
            info!(
                rows = stats.rows_read,
                malformed = source.malformed(),
                chunks = stats.chunks.len(),
                "snapshot ingest complete"
            );
        }
        Command::Reconcile => {
            let (table, stats) = reconcile(&store)?;
            store.save_canonical(&table)?;
            info!(canonical_rows = stats.canonical_rows, "canonical table written");
        }
        Command::Label { sheet } => {
            let sheets = match sheet {
                Some(path) => {
                    if !path.exists() {
                        return Err(DugoutError::Validation(format!(
                            "no such correction sheet: {}",
                            path.display()
                        ))
                        .into());
                    }
                    vec![CsvCorrectionSource::new(path)]
                }
                None => CsvCorrectionSource::from_dir(&config.corrections_dir)?,
            };
            let mut table = store.load_canonical()?;
            for sheet in &sheets {
                let merge = apply_corrections(&mut table, sheet.corrections()?);
                info!(
                    sheet = sheet.name().as_str(),
                    corrections = merge.corrections_usable,
                    rows_labeled = merge.rows_labeled,
                    conflicts = merge.conflicts,
                    "correction sheet applied"
                );
            }
            store.save_canonical(&table)?;
        }
        Command::Propagate => {
            let mut table = store.load_canonical()?;
            let merge = propagate_duplicate_labels(&mut table);
            store.save_canonical(&table)?;
            info!(rows_filled = merge.rows_labeled, "duplicate label propagation complete");
        }
        Command::Sample { count, out } => {
            let table = store.load_canonical()?;
            let mut rng = rand::rng();
            let sample = sample_unlabeled(&table, count.unwrap_or(config.sample_size), &mut rng);
            let path = out.unwrap_or_else(|| config.corrections_dir.join("sampled.csv"));
            write_correction_sheet(&path, &sample)?;
            info!(rows = sample.len(), sheet = %path.display(), "annotation sample written");
        }
    }

    Ok(())
}
