//! Schema definition and migration runner for the Persistent Store (§4.2).

use rusqlite::Connection;

use crate::cache_dir::CURRENT_SCHEMA_VERSION;
use crate::error::{EngineError, Result};

/// One migration step, applied atomically.
struct Migration {
    version: i64,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/0001_initial.sql"),
}];

/// Bring `conn`'s schema up to `CURRENT_SCHEMA_VERSION`, applying any
/// pending migrations in order. Fails with `SchemaTooNew` if the on-disk
/// version is newer than this binary understands.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_meta (
            version INTEGER NOT NULL,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let stored: Option<i64> = conn
        .query_row(
            "SELECT MAX(version) FROM schema_meta",
            [],
            |row| row.get(0),
        )
        .unwrap_or(None);
    let stored = stored.unwrap_or(0);

    if stored > CURRENT_SCHEMA_VERSION {
        return Err(EngineError::SchemaTooNew {
            found: stored,
            current: CURRENT_SCHEMA_VERSION,
        });
    }

    for migration in MIGRATIONS {
        if migration.version <= stored {
            continue;
        }
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_meta (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.version, now()],
        )?;
        tx.commit()?;
    }

    Ok(())
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_migrates_to_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_meta", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrating_twice_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_meta", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn newer_stored_version_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_meta (version INTEGER NOT NULL, applied_at INTEGER NOT NULL);
             INSERT INTO schema_meta (version, applied_at) VALUES (999, 0);",
        )
        .unwrap();
        let err = migrate(&conn).unwrap_err();
        assert_eq!(err.kind(), "SchemaTooNew");
    }
}
