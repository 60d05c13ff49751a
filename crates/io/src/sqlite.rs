// Contact storage on the bot's SQLite database

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, warn};

use lidsweep_identity::{ContactRecord, ContactStore, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS Users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name VARCHAR(255) NOT NULL,
    number VARCHAR(255) NOT NULL,       -- phone number, or a JID before cleanup
    createdAt DATETIME NOT NULL,
    updatedAt DATETIME NOT NULL
);
"#;

// Same layout the bot's ORM writes, so string order == time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f +00:00";

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the ORM layout, RFC 3339, and naive UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f %:z") {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// `ContactStore` backed by the `Users` table.
pub struct SqliteContactStore {
    conn: Connection,
}

impl SqliteContactStore {
    /// Open an existing contact database. Never creates files or tables:
    /// a missing file, a non-SQLite file, or a database without a `Users`
    /// table is `StoreError::Unavailable`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let unavailable = |e: &dyn std::fmt::Display| {
            StoreError::Unavailable(format!("{}: {e}", path.display()))
        };
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(&e))?;

        let has_users: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'Users')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| unavailable(&e))?;
        if !has_users {
            return Err(unavailable(&"no Users table"));
        }
        Ok(Self { conn })
    }

    /// Open or create a database file, creating the `Users` table if needed.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::with_schema(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::with_schema(conn)
    }

    fn with_schema(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self { conn })
    }

    /// Seed a contact created now. Returns the new id.
    pub fn insert(&self, name: &str, number: &str) -> Result<i64, StoreError> {
        self.insert_at(name, number, Utc::now())
    }

    pub fn insert_at(
        &self,
        name: &str,
        number: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let ts = format_timestamp(&created_at);
        self.conn
            .execute(
                "INSERT INTO Users (name, number, createdAt, updatedAt) VALUES (?1, ?2, ?3, ?3)",
                params![name, number, ts],
            )
            .map_err(backend)?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<ContactRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, number, createdAt, updatedAt FROM Users WHERE id = ?1",
                params![id],
                raw_row,
            )
            .optional()
            .map_err(backend)?;
        row.map(into_record).transpose()
    }

    /// First `limit` readable contacts by id, for post-run display.
    pub fn sample(&self, limit: usize) -> Result<Vec<ContactRecord>, StoreError> {
        self.query(
            "SELECT id, name, number, createdAt, updatedAt FROM Users ORDER BY id ASC LIMIT ?1",
            params![limit as i64],
        )
    }

    /// Rows whose timestamps cannot be parsed are skipped with a warning;
    /// the sweep never sees (and so never touches) them.
    fn query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<ContactRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql).map_err(backend)?;
        let rows = stmt
            .query_map(params, raw_row)
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        let records = rows
            .into_iter()
            .filter_map(|row| match into_record(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable contact row");
                    None
                }
            })
            .collect();
        Ok(records)
    }
}

type RawRow = (i64, String, String, String, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_record((id, name, number, created, updated): RawRow) -> Result<ContactRecord, StoreError> {
    let parse = |column: &str, value: &str| {
        parse_timestamp(value).ok_or_else(|| {
            StoreError::Backend(format!("record {id}: cannot parse {column} '{value}'"))
        })
    };
    Ok(ContactRecord {
        id,
        display_name: name,
        identity_value: number,
        created_at: parse("createdAt", &created)?,
        updated_at: parse("updatedAt", &updated)?,
    })
}

impl ContactStore for SqliteContactStore {
    fn list_all(&self) -> Result<Vec<ContactRecord>, StoreError> {
        let records = self.query(
            "SELECT id, name, number, createdAt, updatedAt FROM Users ORDER BY createdAt ASC, id ASC",
            [],
        )?;
        debug!(count = records.len(), "loaded contacts");
        Ok(records)
    }

    fn update(&mut self, record: &ContactRecord) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE Users SET number = ?1, updatedAt = ?2 WHERE id = ?3",
                params![record.identity_value, format_timestamp(&Utc::now()), record.id],
            )
            .map_err(backend)?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: record.id });
        }
        Ok(())
    }

    fn delete(&mut self, record: &ContactRecord) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM Users WHERE id = ?1", params![record.id])
            .map_err(backend)?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: record.id });
        }
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Users", [], |row| row.get(0))
            .map_err(backend)?;
        Ok(n as u64)
    }
}
