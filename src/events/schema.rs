use rusqlite::{Connection, Result};

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    // No declared foreign keys: events reference actor/repo ids, but
    // referential integrity is not enforced. Flush order (actors, repos,
    // then events) keeps references from dangling in practice.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS actor (
            id INTEGER PRIMARY KEY,
            login TEXT NOT NULL,
            url TEXT NOT NULL DEFAULT '',
            avatar_url TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS repo (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            url TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS event (
            id INTEGER PRIMARY KEY,
            type TEXT NOT NULL CHECK(type IN ('pull_request','comment','commit')),
            actor_id INTEGER NOT NULL,
            repo_id INTEGER NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL,
            comment TEXT NOT NULL DEFAULT '',
            count INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_event_created_at ON event(created_at);
        CREATE INDEX IF NOT EXISTS idx_event_actor ON event(actor_id);
        ",
    )?;

    Ok(())
}
