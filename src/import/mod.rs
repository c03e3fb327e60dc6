pub mod batch;

use crate::archive::{ArchiveClient, DEFAULT_BASE_URL, HourSpec, window_name};
use crate::error::{ImportError, Result as ImportResult};
use crate::events::store::{EventStore, UpsertPolicy};
use crate::events::{classify, project};
use crate::logging::ndjson;
use anyhow::Result;
use batch::{Batch, BatchAccumulator};
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::path::PathBuf;

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ImportCommand {
    pub day: Option<NaiveDate>,
    pub hour: HourSpec,
    pub batch_size: Option<usize>,
    pub db: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub base_url: Option<String>,
    pub skip_failed_hours: bool,
}

pub fn default_db_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("gharvest").join("events.db");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("gharvest")
            .join("events.db");
    }
    PathBuf::from("gharvest-events.db")
}

/// Progress counters, reported to the observer and printed on exit
/// whether the run succeeded or not.
#[derive(Debug, Default)]
struct Progress {
    hours_fetched: usize,
    hours_skipped: usize,
    lines_seen: usize,
    recognized: usize,
    malformed_skipped: usize,
    flushes: usize,
    events_flushed: usize,
}

impl Progress {
    fn summary_json(&self) -> Value {
        json!({
            "hours_fetched": self.hours_fetched,
            "hours_skipped": self.hours_skipped,
            "lines_seen": self.lines_seen,
            "recognized": self.recognized,
            "malformed_skipped": self.malformed_skipped,
            "flushes": self.flushes,
            "events_flushed": self.events_flushed,
        })
    }
}

/// Advisory observer: warnings go to stderr, and every event is mirrored
/// to the NDJSON log when one is configured. No behavioral feedback into
/// the pipeline.
struct Reporter {
    log: Option<PathBuf>,
}

impl Reporter {
    fn emit(&self, event: &str, fields: Value) -> ImportResult<()> {
        if let Some(path) = &self.log {
            ndjson::mirror_event(path, event, &fields)?;
        }
        Ok(())
    }

    fn warn(&self, event: &str, message: &str, fields: Value) -> ImportResult<()> {
        eprintln!("warning: {message}");
        self.emit(event, fields)
    }
}

pub fn execute_import(cmd: ImportCommand) -> Result<()> {
    let cfg = crate::config::load_user_config()?.unwrap_or_default();

    let day = cmd.day.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let batch_size = cmd
        .batch_size
        .or(cfg.import_batch_size)
        .unwrap_or(DEFAULT_BATCH_SIZE);
    if batch_size == 0 {
        return Err(
            ImportError::Config("batch size must be a positive integer".to_string()).into(),
        );
    }
    let base_url = cmd
        .base_url
        .or(cfg.archive_base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let db_path = cmd.db.or(cfg.database_path).unwrap_or_else(default_db_path);

    let store = EventStore::open(&db_path)?;
    let client = ArchiveClient::new(&base_url)?;
    let reporter = Reporter {
        log: cmd.log.clone(),
    };
    let mut progress = Progress::default();

    let outcome = run_pipeline(
        &client,
        &store,
        &reporter,
        &mut progress,
        PipelineInput {
            day,
            hour: cmd.hour,
            batch_size,
            skip_failed_hours: cmd.skip_failed_hours,
        },
    );

    print_summary(&progress);
    match outcome {
        Ok(()) => {
            reporter.emit("import_completed", progress.summary_json())?;
            println!("import of {day} complete");
            Ok(())
        }
        Err(err) => {
            let mut fields = progress.summary_json();
            if let Some(obj) = fields.as_object_mut() {
                obj.insert("error".to_string(), json!(err.to_string()));
            }
            reporter.emit("import_failed", fields)?;
            Err(err.into())
        }
    }
}

struct PipelineInput {
    day: NaiveDate,
    hour: HourSpec,
    batch_size: usize,
    skip_failed_hours: bool,
}

fn run_pipeline(
    client: &ArchiveClient,
    store: &EventStore,
    reporter: &Reporter,
    progress: &mut Progress,
    input: PipelineInput,
) -> ImportResult<()> {
    let PipelineInput {
        day,
        hour,
        batch_size,
        skip_failed_hours,
    } = input;
    let mut buffers = BatchAccumulator::default();

    for hour in hour.hours() {
        let window = window_name(day, hour);
        let lines = match client.fetch_hour(day, hour) {
            Ok(lines) => lines,
            Err(err) if skip_failed_hours => {
                progress.hours_skipped += 1;
                reporter.warn(
                    "hour_skipped",
                    &format!("skipping {window}: {err}"),
                    json!({"window": window, "error": err.to_string()}),
                )?;
                continue;
            }
            Err(err) => return Err(err),
        };
        progress.hours_fetched += 1;
        println!("fetched {window}: {} lines", lines.len());
        reporter.emit("hour_fetched", json!({"window": window, "lines": lines.len()}))?;

        for line in &lines {
            progress.lines_seen += 1;

            let record: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(err) => {
                    progress.malformed_skipped += 1;
                    reporter.warn(
                        "record_skipped",
                        &format!("skipping undecodable record in {window}: {err}"),
                        json!({"window": window, "error": err.to_string()}),
                    )?;
                    continue;
                }
            };

            let Some(kind) = classify::classify(&record) else {
                continue;
            };

            let triple = match project::project(&record, kind) {
                Ok(t) => t,
                Err(err) => {
                    progress.malformed_skipped += 1;
                    reporter.warn(
                        "record_skipped",
                        &format!("skipping record in {window}: {err}"),
                        json!({"window": window, "error": err.to_string()}),
                    )?;
                    continue;
                }
            };

            progress.recognized += 1;
            buffers.append(triple);
            if buffers.should_flush(batch_size) {
                flush(store, reporter, progress, buffers.drain())?;
            }
        }
    }

    // Final partial flush; an empty tail is suppressed, not written.
    let tail = buffers.drain();
    if !tail.is_empty() {
        flush(store, reporter, progress, tail)?;
    }
    Ok(())
}

fn flush(
    store: &EventStore,
    reporter: &Reporter,
    progress: &mut Progress,
    batch: Batch,
) -> ImportResult<()> {
    let policy = UpsertPolicy::IgnoreConflict;
    // Events reference actor/repo ids; writing them last keeps references
    // from dangling even though integrity is not enforced.
    let actors_inserted = store.upsert_actors(&batch.actors, policy)?;
    let repos_inserted = store.upsert_repos(&batch.repos, policy)?;
    let events_inserted = store.upsert_events(&batch.events, policy)?;

    progress.flushes += 1;
    progress.events_flushed += batch.events.len();
    println!(
        "flush #{}: {} events ({} new), {} new actors, {} new repos; {} events flushed in total",
        progress.flushes,
        batch.events.len(),
        events_inserted,
        actors_inserted,
        repos_inserted,
        progress.events_flushed
    );
    reporter.emit(
        "batch_flushed",
        json!({
            "flush": progress.flushes,
            "events": batch.events.len(),
            "events_inserted": events_inserted,
            "actors_inserted": actors_inserted,
            "repos_inserted": repos_inserted,
            "events_flushed_total": progress.events_flushed,
        }),
    )?;
    Ok(())
}

fn print_summary(progress: &Progress) {
    println!(
        "processed {} lines ({} recognized, {} malformed skipped); {} flushes, {} events flushed",
        progress.lines_seen,
        progress.recognized,
        progress.malformed_skipped,
        progress.flushes,
        progress.events_flushed
    );
    if progress.hours_skipped > 0 {
        println!("skipped {} unreachable hour(s)", progress.hours_skipped);
    }
}

pub fn show_stats(db: Option<PathBuf>) -> Result<()> {
    let cfg = crate::config::load_user_config()?.unwrap_or_default();
    let db_path = db.or(cfg.database_path).unwrap_or_else(default_db_path);
    let store = EventStore::open(&db_path)?;

    let counts = store.table_counts()?;
    println!("database: {}", db_path.display());
    println!("actors: {}", counts.actors);
    println!("repos: {}", counts.repos);
    println!("events: {}", counts.events);
    for (kind, n) in store.event_kind_counts()? {
        println!("  {kind}: {n}");
    }
    println!("count_sum: {}", store.event_count_total()?);
    if let Some((min, max)) = store.created_at_range()? {
        println!("created_at: {min} .. {max}");
    }
    Ok(())
}
