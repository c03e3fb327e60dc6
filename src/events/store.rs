use crate::error::Result;
use crate::events::{ActorRow, EventKind, EventRow, RepoRow, schema};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;

/// Conflict handling contract for bulk writes.
///
/// The importer silently drops rows whose identity already exists.
/// Making the policy an explicit argument keeps that decision visible at
/// every call site and leaves room for an update-on-conflict variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertPolicy {
    IgnoreConflict,
}

impl UpsertPolicy {
    fn conflict_clause(self) -> &'static str {
        match self {
            UpsertPolicy::IgnoreConflict => "ON CONFLICT(id) DO NOTHING",
        }
    }
}

// Rows per multi-row VALUES statement; keeps bind counts well under
// SQLite's host parameter limit for the widest row.
const INSERT_CHUNK: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub actors: i64,
    pub repos: i64,
    pub events: i64,
}

pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Bulk-insert one batch of actors under the given conflict policy.
    /// One transaction; empty input is a no-op. Returns rows actually
    /// inserted (conflicting ids are not counted).
    pub fn upsert_actors(&self, rows: &[ActorRow], policy: UpsertPolicy) -> Result<usize> {
        self.bulk_insert(
            "actor",
            &["id", "login", "url", "avatar_url"],
            policy,
            rows.iter()
                .map(|r| {
                    vec![
                        r.id.into(),
                        r.login.clone().into(),
                        r.url.clone().into(),
                        r.avatar_url.clone().into(),
                    ]
                })
                .collect(),
        )
    }

    pub fn upsert_repos(&self, rows: &[RepoRow], policy: UpsertPolicy) -> Result<usize> {
        self.bulk_insert(
            "repo",
            &["id", "name", "url"],
            policy,
            rows.iter()
                .map(|r| vec![r.id.into(), r.name.clone().into(), r.url.clone().into()])
                .collect(),
        )
    }

    pub fn upsert_events(&self, rows: &[EventRow], policy: UpsertPolicy) -> Result<usize> {
        self.bulk_insert(
            "event",
            &[
                "id",
                "type",
                "actor_id",
                "repo_id",
                "payload",
                "created_at",
                "comment",
                "count",
            ],
            policy,
            rows.iter()
                .map(|r| {
                    vec![
                        r.id.into(),
                        r.kind.as_str().to_string().into(),
                        r.actor_id.into(),
                        r.repo_id.into(),
                        r.payload.clone().into(),
                        r.created_at.clone().into(),
                        r.comment.clone().into(),
                        r.count.into(),
                    ]
                })
                .collect(),
        )
    }

    fn bulk_insert(
        &self,
        table: &str,
        columns: &[&str],
        policy: UpsertPolicy,
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let row_placeholder = format!("({})", vec!["?"; columns.len()].join(", "));
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_CHUNK) {
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {} {}",
                table,
                columns.join(", "),
                vec![row_placeholder.as_str(); chunk.len()].join(", "),
                policy.conflict_clause()
            );
            inserted += tx.execute(&sql, params_from_iter(chunk.iter().flatten().cloned()))?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn table_counts(&self) -> Result<StoreCounts> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?)
        };
        Ok(StoreCounts {
            actors: count("actor")?,
            repos: count("repo")?,
            events: count("event")?,
        })
    }

    pub fn event_kind_counts(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT type, COUNT(*) FROM event GROUP BY type ORDER BY type")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Sum of the `count` column: push sizes plus one per non-push event.
    pub fn event_count_total(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COALESCE(SUM(count), 0) FROM event", [], |row| {
                row.get(0)
            })?)
    }

    pub fn created_at_range(&self) -> Result<Option<(String, String)>> {
        let (min, max): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM event",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(min.zip(max))
    }

    pub fn get_actor(&self, id: i64) -> Result<Option<ActorRow>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, login, url, avatar_url FROM actor WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ActorRow {
                        id: row.get(0)?,
                        login: row.get(1)?,
                        url: row.get(2)?,
                        avatar_url: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn get_event(&self, id: i64) -> Result<Option<EventRow>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, type, actor_id, repo_id, payload, created_at, comment, count
                 FROM event WHERE id = ?1",
                params![id],
                |row| {
                    let kind_str: String = row.get(1)?;
                    let kind = EventKind::from_db(&kind_str).ok_or_else(|| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            format!("unknown event type `{kind_str}`").into(),
                        )
                    })?;
                    Ok(EventRow {
                        id: row.get(0)?,
                        kind,
                        actor_id: row.get(2)?,
                        repo_id: row.get(3)?,
                        payload: row.get(4)?,
                        created_at: row.get(5)?,
                        comment: row.get(6)?,
                        count: row.get(7)?,
                    })
                },
            )
            .optional()?)
    }
}
