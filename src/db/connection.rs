use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::contract::TABLE_NAME;

/// Schema version written to `PRAGMA user_version`. Bump it whenever the
/// table definition changes; existing rows are dropped on the next open.
pub const DATABASE_VERSION: i32 = 1;
/// SQLite file name stored inside the application data directory.
pub const DATABASE_NAME: &str = "bookshop.db";

/// Open (or create) the database file at `path` and bring its schema to
/// `version`.
pub fn open_database(path: &Path, version: i32) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    prepare_schema(&conn, version)?;
    Ok(conn)
}

/// Open a private in-memory database with the schema applied.
pub fn open_in_memory(version: i32) -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare_schema(&conn, version)?;
    Ok(conn)
}

/// Compare the stored schema version with `version` and create or upgrade the
/// table as needed. Safe to call on every start.
pub fn prepare_schema(conn: &Connection, version: i32) -> Result<()> {
    let current: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read schema version")?;

    if current == version {
        // Guards against a file whose version was set by hand without a table.
        create_table(conn)?;
        return Ok(());
    }

    if current == 0 {
        on_create(conn)?;
    } else if current < version {
        on_upgrade(conn, current, version)?;
    } else {
        bail!("cannot downgrade database from version {current} to {version}");
    }

    conn.pragma_update(None, "user_version", version)
        .context("failed to record schema version")?;
    Ok(())
}

/// First-run hook: build the table from scratch.
fn on_create(conn: &Connection) -> Result<()> {
    info!("creating {TABLE_NAME} table");
    create_table(conn)
}

/// Version-change hook. The table is dropped and rebuilt, so every stored
/// book is lost.
fn on_upgrade(conn: &Connection, old_version: i32, new_version: i32) -> Result<()> {
    warn!(
        old_version,
        new_version, "upgrading schema by dropping the {TABLE_NAME} table; existing rows are discarded"
    );
    conn.execute(&format!("DROP TABLE IF EXISTS {TABLE_NAME}"), [])
        .context("failed to drop books table")?;
    create_table(conn)
}

fn create_table(conn: &Connection) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                authors TEXT,
                pages INTEGER NOT NULL DEFAULT 0,
                price INTEGER NOT NULL,
                quantity INTEGER NOT NULL DEFAULT 0,
                supplier_name TEXT NOT NULL,
                supplier_phone TEXT NOT NULL
            )"
        ),
        [],
    )
    .context("failed to create books table")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_sample(conn: &Connection) {
        conn.execute(
            "INSERT INTO books (name, price, quantity, supplier_name, supplier_phone)
             VALUES ('Dune', 999, 5, 'Acme', '0123456789')",
            [],
        )
        .unwrap();
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DATABASE_NAME);

        let conn = open_database(&path, DATABASE_VERSION).unwrap();
        insert_sample(&conn);
        drop(conn);

        let conn = open_database(&path, DATABASE_VERSION).unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn upgrade_drops_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DATABASE_NAME);

        let conn = open_database(&path, 1).unwrap();
        insert_sample(&conn);
        drop(conn);

        let conn = open_database(&path, 2).unwrap();
        assert_eq!(count(&conn), 0);
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn refuses_to_downgrade() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DATABASE_NAME);

        drop(open_database(&path, 3).unwrap());
        let err = open_database(&path, 2).unwrap_err();
        assert!(err.to_string().contains("cannot downgrade"));
    }

    #[test]
    fn default_columns_are_filled() {
        let conn = open_in_memory(DATABASE_VERSION).unwrap();
        insert_sample(&conn);
        let (pages, authors): (i64, Option<String>) = conn
            .query_row("SELECT pages, authors FROM books", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(pages, 0);
        assert_eq!(authors, None);
    }
}
