use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use gharvest::archive::HourSpec;
use gharvest::events::store::EventStore;
use gharvest::import::{ImportCommand, execute_import};
use serde_json::{Value, json};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
}

fn gzip_lines(lines: &[String]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        writeln!(enc, "{line}").unwrap();
    }
    enc.finish().unwrap()
}

fn record(id: i64, tag: &str, payload: Value) -> String {
    json!({
        "id": id,
        "type": tag,
        "actor": {
            "id": 100 + id % 7,
            "login": format!("user{}", id % 7),
            "url": format!("https://api.github.test/users/user{}", id % 7),
            "avatar_url": ""
        },
        "repo": {
            "id": 200 + id % 5,
            "name": format!("org/repo{}", id % 5),
            "url": format!("https://api.github.test/repos/org/repo{}", id % 5)
        },
        "payload": payload,
        "created_at": "2015-01-01T15:00:00Z",
        "public": true
    })
    .to_string()
}

fn push(id: i64, size: i64) -> String {
    record(
        id,
        "PushEvent",
        json!({"push_id": 9000 + id, "size": size, "distinct_size": size}),
    )
}

fn command(
    db: &Path,
    hour: HourSpec,
    batch_size: usize,
    base_url: &str,
    log: Option<PathBuf>,
) -> ImportCommand {
    ImportCommand {
        day: Some(day()),
        hour,
        batch_size: Some(batch_size),
        db: Some(db.to_path_buf()),
        log,
        base_url: Some(base_url.to_string()),
        skip_failed_hours: false,
    }
}

fn log_events(log: &Path, name: &str) -> usize {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .filter(|line| {
            serde_json::from_str::<Value>(line)
                .ok()
                .and_then(|v| v.get("event").and_then(Value::as_str).map(ToString::to_string))
                .as_deref()
                == Some(name)
        })
        .count()
}

#[test]
fn synthetic_hour_imports_with_exact_batch_boundaries() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("events.db");
    let log = tmp.path().join("import.ndjson");

    // 250 lines: 120 pushes with sizes cycling 1-5, 40 pull requests,
    // 20 issue comments, 70 unrecognized.
    let mut lines = Vec::new();
    let mut id = 0i64;
    for i in 0..120i64 {
        id += 1;
        lines.push(push(id, (i % 5) + 1));
    }
    for _ in 0..40 {
        id += 1;
        lines.push(record(id, "PullRequestEvent", json!({"action": "opened"})));
    }
    for _ in 0..20 {
        id += 1;
        lines.push(record(id, "IssueCommentEvent", json!({"action": "created"})));
    }
    for _ in 0..70 {
        id += 1;
        lines.push(record(id, "WatchEvent", json!({"action": "started"})));
    }
    assert_eq!(lines.len(), 250);

    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/2015-01-01-15.json.gz")
        .with_body(gzip_lines(&lines))
        .create();

    execute_import(command(
        &db,
        HourSpec::Single(15),
        100,
        &server.url(),
        Some(log.clone()),
    ))
    .unwrap();

    let store = EventStore::open(&db).unwrap();
    let counts = store.table_counts().unwrap();
    assert_eq!(counts.events, 180);
    assert_eq!(counts.actors, 7);
    assert_eq!(counts.repos, 5);

    // 24 full cycles of sizes 1..=5 sum to 360, plus one per non-push.
    assert_eq!(store.event_count_total().unwrap(), 360 + 40 + 20);

    let kinds: std::collections::HashMap<String, i64> =
        store.event_kind_counts().unwrap().into_iter().collect();
    assert_eq!(kinds["commit"], 120);
    assert_eq!(kinds["pull_request"], 40);
    assert_eq!(kinds["comment"], 20);

    // 180 events at batch size 100: one full flush, one partial, and no
    // trailing empty flush.
    assert_eq!(log_events(&log, "batch_flushed"), 2);
    assert_eq!(log_events(&log, "record_skipped"), 0);
    assert_eq!(log_events(&log, "import_completed"), 1);
}

#[test]
fn reimporting_the_same_window_is_idempotent() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("events.db");

    let lines: Vec<String> = (1..=10).map(|id| push(id, 2)).collect();
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/2015-01-01-3.json.gz")
        .with_body(gzip_lines(&lines))
        .create();

    let cmd = command(&db, HourSpec::Single(3), 5, &server.url(), None);
    execute_import(cmd.clone()).unwrap();
    let store = EventStore::open(&db).unwrap();
    let first = store.table_counts().unwrap();
    drop(store);

    execute_import(cmd).unwrap();
    let store = EventStore::open(&db).unwrap();
    let second = store.table_counts().unwrap();
    assert_eq!(first, second);
    assert_eq!(second.events, 10);
    assert_eq!(store.event_count_total().unwrap(), 20);
}

#[test]
fn malformed_record_is_skipped_and_run_completes() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("events.db");
    let log = tmp.path().join("import.ndjson");

    let mut lines: Vec<String> = (1..=5).map(|id| push(id, 1)).collect();
    // Valid type tag, but actor.id is missing.
    lines.insert(
        2,
        json!({
            "id": 999,
            "type": "PushEvent",
            "actor": {"login": "ghost"},
            "repo": {"id": 201, "name": "org/repo1", "url": ""},
            "payload": {"size": 1},
            "created_at": "2015-01-01T15:00:00Z"
        })
        .to_string(),
    );

    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/2015-01-01-15.json.gz")
        .with_body(gzip_lines(&lines))
        .create();

    execute_import(command(
        &db,
        HourSpec::Single(15),
        100,
        &server.url(),
        Some(log.clone()),
    ))
    .unwrap();

    let store = EventStore::open(&db).unwrap();
    assert_eq!(store.table_counts().unwrap().events, 5);
    assert!(store.get_event(999).unwrap().is_none());
    assert_eq!(log_events(&log, "record_skipped"), 1);
}

#[test]
fn unreachable_archive_fails_with_zero_rows_persisted() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("events.db");

    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/2015-01-01-15.json.gz")
        .with_status(503)
        .create();

    let err = execute_import(command(&db, HourSpec::Single(15), 100, &server.url(), None))
        .unwrap_err();
    assert!(err.to_string().contains("2015-01-01-15"), "{err}");

    let store = EventStore::open(&db).unwrap();
    assert_eq!(store.table_counts().unwrap().events, 0);
}

#[test]
fn all_hours_abort_keeps_earlier_committed_batches() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("events.db");

    // Hour 0 delivers 4 events at batch size 2, so both batches commit
    // before hour 1 fails the run.
    let lines: Vec<String> = (1..=4).map(|id| push(id, 1)).collect();
    let mut server = mockito::Server::new();
    let _hour0 = server
        .mock("GET", "/2015-01-01-0.json.gz")
        .with_body(gzip_lines(&lines))
        .create();
    let _hour1 = server
        .mock("GET", "/2015-01-01-1.json.gz")
        .with_status(500)
        .create();

    let err = execute_import(command(&db, HourSpec::All, 2, &server.url(), None)).unwrap_err();
    assert!(err.to_string().contains("2015-01-01-1"), "{err}");

    let store = EventStore::open(&db).unwrap();
    assert_eq!(store.table_counts().unwrap().events, 4);
}

#[test]
fn skip_failed_hours_imports_the_reachable_ones() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("events.db");
    let log = tmp.path().join("import.ndjson");

    let lines: Vec<String> = (1..=2).map(|id| push(id, 1)).collect();
    let mut server = mockito::Server::new();
    // Only hour 0 exists; the other 23 hours answer with an error status.
    let _hour0 = server
        .mock("GET", "/2015-01-01-0.json.gz")
        .with_body(gzip_lines(&lines))
        .create();

    let mut cmd = command(&db, HourSpec::All, 100, &server.url(), Some(log.clone()));
    cmd.skip_failed_hours = true;
    execute_import(cmd).unwrap();

    let store = EventStore::open(&db).unwrap();
    assert_eq!(store.table_counts().unwrap().events, 2);
    assert_eq!(log_events(&log, "hour_skipped"), 23);
    assert_eq!(log_events(&log, "import_completed"), 1);
}

#[test]
fn zero_batch_size_is_rejected_before_any_fetch() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("events.db");

    // No server: a zero batch size must fail before any I/O happens.
    let err = execute_import(ImportCommand {
        day: Some(day()),
        hour: HourSpec::Single(15),
        batch_size: Some(0),
        db: Some(db.clone()),
        log: None,
        base_url: Some("http://127.0.0.1:1".to_string()),
        skip_failed_hours: false,
    })
    .unwrap_err();
    assert!(err.to_string().contains("batch size"), "{err}");
    assert!(!db.exists());
}
