//! End-to-end pipeline runs over a real data directory.
//!
//! These exercise the CSV artifacts themselves: raw snapshot files in,
//! merged chunks and a canonical table out, correction sheets folded in,
//! reruns stable byte for byte.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use dugout_common::{Config, Label};
use dugout_pipeline::pipeline::run_pipeline;
use dugout_pipeline::reconciler::reconcile;
use dugout_pipeline::store::{CsvCorrectionSource, CsvSnapshotSource, CsvStore};
use dugout_pipeline::traits::TableStore;

const SNAPSHOT_HEADER: &str =
    "permalink,text,reply_count,repost_count,like_count,url_list,photo_list,is_repost,scrape_date\n";

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 4, 1).unwrap()
}

fn write_snapshots(dir: &Path, name: &str, rows: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), format!("{SNAPSHOT_HEADER}{rows}")).unwrap();
}

fn run(config: &Config) -> dugout_pipeline::stats::PipelineStats {
    let store = CsvStore::new(&config.chunk_dir, &config.canonical_path);
    let mut source = CsvSnapshotSource::new(&config.snapshot_dir);
    let sheets = CsvCorrectionSource::from_dir(&config.corrections_dir).unwrap();
    let (stats, _log) = run_pipeline(
        &mut source,
        &store,
        &sheets,
        config.chunk_row_limit,
        run_date(),
    )
    .unwrap();
    stats
}

#[test]
fn overlapping_snapshots_reconcile_to_max_and_or() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    write_snapshots(
        &config.snapshot_dir,
        "team_a.csv",
        "https://x.com/a/1,hello,0,0,5,[],[],False,2021-04-01\n\
         https://x.com/a/1,hello,0,0,3,['http://x'],[],False,2021-04-01\n",
    );

    let stats = run(&config);
    assert_eq!(stats.snapshots_read, 2);
    assert_eq!(stats.canonical_rows, 1);

    let store = CsvStore::new(&config.chunk_dir, &config.canonical_path);
    let table = store.load_canonical().unwrap();
    assert_eq!(table[0].like_count, 5);
    assert!(table[0].link_present);
    assert!(!table[0].photo_present);
    assert_eq!(table[0].label, Label::Unknown);
}

#[test]
fn correction_sheets_label_the_table_and_placeholders_are_inert() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    write_snapshots(
        &config.snapshot_dir,
        "scrape.csv",
        "https://x.com/a/1,left the game with a limp,1,0,9,[],[],False,2021-04-01\n\
         https://x.com/a/2,starting lineup announced,0,0,2,[],[],False,2021-04-01\n",
    );
    fs::create_dir_all(&config.corrections_dir).unwrap();
    fs::write(
        config.corrections_dir.join("sampled.csv"),
        "label,text\n1,left the game with a limp\nx,starting lineup announced\n",
    )
    .unwrap();

    run(&config);

    let store = CsvStore::new(&config.chunk_dir, &config.canonical_path);
    let table = store.load_canonical().unwrap();
    let by_text = |t: &str| table.iter().find(|r| r.text == t).unwrap();
    assert_eq!(by_text("left the game with a limp").label, Label::Injury);
    // The `x` placeholder is filtered before the merge
    assert_eq!(by_text("starting lineup announced").label, Label::Unknown);
}

#[test]
fn placeholder_never_regresses_an_established_label() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    write_snapshots(
        &config.snapshot_dir,
        "scrape.csv",
        "https://x.com/a/1,foo,0,0,0,[],[],False,2021-04-01\n",
    );
    fs::create_dir_all(&config.corrections_dir).unwrap();
    fs::write(config.corrections_dir.join("round1.csv"), "label,text\n1,foo\n").unwrap();
    run(&config);

    // Second run: the sheet now says "unresolved"
    fs::write(config.corrections_dir.join("round1.csv"), "label,text\nx,foo\n").unwrap();
    run(&config);

    let store = CsvStore::new(&config.chunk_dir, &config.canonical_path);
    assert_eq!(store.load_canonical().unwrap()[0].label, Label::Injury);
}

#[test]
fn duplicate_text_inherits_the_known_label() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    write_snapshots(
        &config.snapshot_dir,
        "scrape.csv",
        "https://x.com/a/1,dup,0,0,0,[],[],False,2021-04-01\n\
         https://x.com/b/2,dup,0,0,0,[],[],False,2021-04-01\n",
    );
    fs::create_dir_all(&config.corrections_dir).unwrap();
    fs::write(config.corrections_dir.join("sheet.csv"), "label,text\n1,dup\n").unwrap();

    run(&config);

    let store = CsvStore::new(&config.chunk_dir, &config.canonical_path);
    let table = store.load_canonical().unwrap();
    assert_eq!(table.len(), 2);
    assert!(table.iter().all(|r| r.label == Label::Injury));
}

#[test]
fn reconcile_is_byte_identical_across_reruns() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    write_snapshots(
        &config.snapshot_dir,
        "scrape.csv",
        "https://x.com/a/1,first,2,1,7,['u'],[],True,2021-04-01\n\
         https://x.com/b/2,second,0,0,1,[],['p'],False,2021-04-02\n",
    );
    run(&config);
    let first = fs::read(&config.canonical_path).unwrap();

    let store = CsvStore::new(&config.chunk_dir, &config.canonical_path);
    let (table, _) = reconcile(&store).unwrap();
    store.save_canonical(&table).unwrap();
    let second = fs::read(&config.canonical_path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_snapshot_run_leaves_the_canonical_table_alone() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    write_snapshots(
        &config.snapshot_dir,
        "scrape.csv",
        "https://x.com/a/1,kept,0,0,0,[],[],False,2021-04-01\n",
    );
    run(&config);
    let before = fs::read(&config.canonical_path).unwrap();

    // Raw files and chunks gone, canonical table still on disk
    fs::remove_dir_all(&config.snapshot_dir).unwrap();
    fs::remove_dir_all(&config.chunk_dir).unwrap();
    run(&config);
    let after = fs::read(&config.canonical_path).unwrap();
    assert_eq!(before, after);
}

#[test]
fn chunk_limit_splits_the_scrape_into_multiple_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::rooted_at(dir.path());
    config.chunk_row_limit = 2;
    let rows: String = (0..7)
        .map(|i| format!("https://x.com/a/{i},text {i},0,0,0,[],[],False,2021-04-01\n"))
        .collect();
    write_snapshots(&config.snapshot_dir, "scrape.csv", &rows);

    let stats = run(&config);
    assert_eq!(stats.chunks_written, 3);
    assert_eq!(stats.canonical_rows, 7);

    let store = CsvStore::new(&config.chunk_dir, &config.canonical_path);
    assert_eq!(
        store.chunk_names().unwrap(),
        vec![
            "merged-1-2021-04-01.csv",
            "merged-2-2021-04-01.csv",
            "merged-3-2021-04-01.csv"
        ]
    );
}

#[test]
fn malformed_snapshot_rows_never_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::rooted_at(dir.path());
    write_snapshots(
        &config.snapshot_dir,
        "scrape.csv",
        "https://x.com/a/1,good,0,0,0,[],[],False,2021-04-01\n\
         https://x.com/a/2,bad,zero,0,0,[],[],False,2021-04-01\n",
    );

    let stats = run(&config);
    assert_eq!(stats.snapshots_read, 1);
    assert_eq!(stats.snapshots_malformed, 1);
    assert_eq!(stats.canonical_rows, 1);
}
