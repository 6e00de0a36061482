//! SQLite-based history and preset storage.
//!
//! Provides persistent storage for:
//! - Recorded practice sessions
//! - Saved custom presets
//! - Key-value store for application state

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backup::Backup;
use super::data_dir;
use crate::error::{DatabaseError, PresetError, Result};
use crate::pattern::{PatternDurations, Preset};
use crate::session::{SessionLog, SessionRecord};

const THEME_KEY: &str = "theme";

/// Aggregate figures over the whole history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HistoryTotals {
    pub sessions: u64,
    pub total_secs: u64,
    pub total_cycles: u64,
}

/// SQLite database for session history and presets.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/pranayama/pranayama.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("pranayama.db"))
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at   TEXT NOT NULL,
                cycles        INTEGER NOT NULL,
                duration_secs INTEGER NOT NULL,
                pattern_label TEXT NOT NULL DEFAULT '',
                is_custom     INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS presets (
                name   TEXT PRIMARY KEY,
                inhale INTEGER NOT NULL,
                hold   INTEGER NOT NULL,
                exhale INTEGER NOT NULL,
                relax  INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_recorded_at ON sessions(recorded_at);",
        )?;
        Ok(())
    }

    // ── History ──────────────────────────────────────────────────────

    /// Append a session record. Returns the row id.
    pub fn append_session(&self, record: &SessionRecord) -> Result<i64> {
        insert_session(&self.conn, record)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All records, newest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT recorded_at, cycles, duration_secs, pattern_label, is_custom
             FROM sessions
             ORDER BY recorded_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], session_from_row)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Delete all history. Returns the number of removed records.
    pub fn clear_sessions(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM sessions", [])?;
        Ok(removed)
    }

    pub fn history_totals(&self) -> Result<HistoryTotals> {
        let totals = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_secs), 0), COALESCE(SUM(cycles), 0)
             FROM sessions",
            [],
            |row| {
                Ok(HistoryTotals {
                    sessions: row.get(0)?,
                    total_secs: row.get(1)?,
                    total_cycles: row.get(2)?,
                })
            },
        )?;
        Ok(totals)
    }

    // ── Presets ──────────────────────────────────────────────────────

    /// Store a preset. An existing preset with the same name is only
    /// replaced when `overwrite` is set.
    ///
    /// # Errors
    /// [`PresetError::EmptyName`] for a blank name,
    /// [`PresetError::AlreadyExists`] on a name clash without `overwrite`,
    /// and a validation error for an all-zero pattern.
    pub fn save_preset(&self, preset: &Preset, overwrite: bool) -> Result<Preset> {
        let name = preset.name.trim();
        if name.is_empty() {
            return Err(PresetError::EmptyName.into());
        }
        preset.durations.validate()?;

        if !overwrite && self.get_preset(name)?.is_some() {
            return Err(PresetError::AlreadyExists(name.to_string()).into());
        }

        let stored = Preset {
            name: name.to_string(),
            durations: preset.durations,
        };
        insert_preset(&self.conn, &stored)?;
        debug!(name = %stored.name, overwrite, "preset saved");
        Ok(stored)
    }

    /// All presets, in name order.
    pub fn list_presets(&self) -> Result<Vec<Preset>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, inhale, hold, exhale, relax FROM presets ORDER BY name")?;
        let rows = stmt.query_map([], preset_from_row)?;
        let presets = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(presets)
    }

    pub fn get_preset(&self, name: &str) -> Result<Option<Preset>> {
        let preset = self
            .conn
            .query_row(
                "SELECT name, inhale, hold, exhale, relax FROM presets WHERE name = ?1",
                params![name.trim()],
                preset_from_row,
            )
            .optional()?;
        Ok(preset)
    }

    pub fn delete_preset(&self, name: &str) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM presets WHERE name = ?1", params![name.trim()])?;
        if removed == 0 {
            return Err(PresetError::NotFound(name.trim().to_string()).into());
        }
        Ok(())
    }

    // ── Backup ───────────────────────────────────────────────────────

    pub fn export_backup(&self) -> Result<Backup> {
        Ok(Backup {
            history: self.list_sessions()?,
            presets: self.list_presets()?,
            theme: self.kv_get(THEME_KEY)?,
        })
    }

    /// Replace history and presets with the backup's contents.
    ///
    /// Runs in a single transaction; on error nothing changes. Presets with
    /// an all-zero pattern are rejected.
    pub fn import_backup(&mut self, backup: &Backup) -> Result<()> {
        for preset in &backup.presets {
            if preset.name.trim().is_empty() {
                return Err(PresetError::EmptyName.into());
            }
            preset.durations.validate()?;
        }

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM sessions", [])?;
        tx.execute("DELETE FROM presets", [])?;
        // Oldest first so row ids follow recording order.
        for record in backup.history.iter().rev() {
            insert_session(&tx, record)?;
        }
        for preset in &backup.presets {
            insert_preset(
                &tx,
                &Preset {
                    name: preset.name.trim().to_string(),
                    durations: preset.durations,
                },
            )?;
        }
        if let Some(theme) = &backup.theme {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![THEME_KEY, theme],
            )?;
        }
        tx.commit()?;
        debug!(
            sessions = backup.history.len(),
            presets = backup.presets.len(),
            "backup imported"
        );
        Ok(())
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionLog for Database {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        self.append_session(record).map(|_| ())
    }
}

fn insert_session(conn: &Connection, record: &SessionRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO sessions (recorded_at, cycles, duration_secs, pattern_label, is_custom)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.recorded_at.to_rfc3339(),
            record.cycles,
            record.duration_secs,
            record.pattern_label,
            record.is_custom_or_preset,
        ],
    )?;
    Ok(())
}

fn insert_preset(conn: &Connection, preset: &Preset) -> Result<(), rusqlite::Error> {
    let d = &preset.durations;
    conn.execute(
        "INSERT OR REPLACE INTO presets (name, inhale, hold, exhale, relax)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![preset.name, d.inhale, d.hold, d.exhale, d.relax],
    )?;
    Ok(())
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let raw: String = row.get(0)?;
    let recorded_at = DateTime::parse_from_rfc3339(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);
    Ok(SessionRecord {
        recorded_at,
        cycles: row.get(1)?,
        duration_secs: row.get(2)?,
        pattern_label: row.get(3)?,
        is_custom_or_preset: row.get(4)?,
    })
}

fn preset_from_row(row: &Row<'_>) -> rusqlite::Result<Preset> {
    Ok(Preset {
        name: row.get(0)?,
        durations: PatternDurations {
            inhale: row.get(1)?,
            hold: row.get(2)?,
            exhale: row.get(3)?,
            relax: row.get(4)?,
        },
    })
}
