use crate::error::{ImportError, Result};
use crate::events::{ActorRow, EventKind, EventRow, ProjectedTriple, RepoRow};
use serde_json::Value;

/// Project a classified raw record into its (actor, repo, event) triple.
///
/// Extraction is field-path based: the `actor` sub-object becomes the
/// actor row, `repo` becomes the repo row, and the remaining fields the
/// event row. The payload is re-serialized verbatim as an opaque blob;
/// the only field ever read from it is `size` for push records, which
/// becomes the event's `count` (all other kinds count as 1).
///
/// A missing required field is a malformed-record error naming the field
/// path; the caller skips the record and continues.
pub fn project(record: &Value, kind: EventKind) -> Result<ProjectedTriple> {
    let id = require_i64(record, "id")?;

    let actor_obj = require_object(record, "actor")?;
    let actor = ActorRow {
        id: require_i64(actor_obj, "actor.id")?,
        login: require_str(actor_obj, "actor.login")?,
        url: optional_str(actor_obj, "url"),
        avatar_url: optional_str(actor_obj, "avatar_url"),
    };

    let repo_obj = require_object(record, "repo")?;
    let repo = RepoRow {
        id: require_i64(repo_obj, "repo.id")?,
        name: require_str(repo_obj, "repo.name")?,
        url: optional_str(repo_obj, "url"),
    };

    let payload = record
        .get("payload")
        .ok_or_else(|| missing("payload"))?;
    let count = match kind {
        EventKind::Commit => require_i64(payload, "payload.size")?,
        EventKind::PullRequest | EventKind::Comment => 1,
    };

    let created_at = record
        .get("created_at")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("created_at"))?
        .to_string();

    let event = EventRow {
        id,
        kind,
        actor_id: actor.id,
        repo_id: repo.id,
        payload: payload.to_string(),
        created_at,
        comment: String::new(),
        count,
    };

    Ok(ProjectedTriple { actor, repo, event })
}

fn missing(path: &str) -> ImportError {
    ImportError::Malformed(format!("missing required field `{path}`"))
}

fn not_an_integer(path: &str) -> ImportError {
    ImportError::Malformed(format!("field `{path}` is not an integer"))
}

fn leaf_key(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn require_object<'a>(parent: &'a Value, path: &str) -> Result<&'a Value> {
    parent
        .get(leaf_key(path))
        .filter(|v| v.is_object())
        .ok_or_else(|| missing(path))
}

// The archive has served ids as JSON numbers and as numeric strings
// across eras; accept both.
fn require_i64(parent: &Value, path: &str) -> Result<i64> {
    match parent.get(leaf_key(path)) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| not_an_integer(path)),
        Some(Value::String(s)) => s.parse().map_err(|_| not_an_integer(path)),
        Some(_) | None => Err(missing(path)),
    }
}

fn require_str(parent: &Value, path: &str) -> Result<String> {
    parent
        .get(leaf_key(path))
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| missing(path))
}

fn optional_str(parent: &Value, key: &str) -> String {
    parent
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
