//! Database connection and draft persistence

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::draft::{DraftRecord, DraftStorage};
use crate::migrations::run_migrations;
use crate::Result;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Remove every draft. Explicit caller-driven cleanup only; nothing in
    /// the draft layer invokes this implicitly.
    pub fn clear_all(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM drafts", [])?;
            Ok(())
        })
    }
}

impl DraftStorage for Database {
    fn get(&self, key: &str) -> Result<Option<DraftRecord>> {
        self.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT data, updated_at FROM drafts WHERE key = ?1",
                    [key],
                    |row| {
                        let data: String = row.get(0)?;
                        let updated_at: String = row.get(1)?;
                        Ok((data, updated_at))
                    },
                )
                .optional()?;

            let Some((data_json, updated_str)) = row else {
                return Ok(None);
            };

            // A row with unparseable JSON is a corrupted record, not an
            // empty result; the caller decides how to degrade.
            let data: serde_json::Value = serde_json::from_str(&data_json)?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());

            Ok(Some(DraftRecord {
                key: key.to_string(),
                data,
                updated_at,
            }))
        })
    }

    fn put(&self, record: &DraftRecord) -> Result<()> {
        let data_json = serde_json::to_string(&record.data)?;

        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO drafts (key, data, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![record.key, data_json, record.updated_at.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM drafts WHERE key = ?1", [key])?;
            Ok(())
        })
    }

    fn list(&self) -> Result<Vec<DraftRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT key, data, updated_at FROM drafts ORDER BY updated_at DESC")?;

            let records: Vec<DraftRecord> = stmt
                .query_map([], |row| {
                    let key: String = row.get(0)?;
                    let data_json: String = row.get(1)?;
                    let updated_str: String = row.get(2)?;
                    Ok((key, data_json, updated_str))
                })?
                .filter_map(|r| r.ok())
                .filter_map(|(key, data_json, updated_str)| {
                    let data = serde_json::from_str(&data_json).ok()?;
                    let updated_at = DateTime::parse_from_rfc3339(&updated_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now());
                    Some(DraftRecord {
                        key,
                        data,
                        updated_at,
                    })
                })
                .collect();

            Ok(records)
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}
