//! SQLite-based preset storage and study history.
//!
//! Provides persistent storage for:
//! - Saved timer presets
//! - Completed phases and sessions (append-only)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::presets::{Preset, PresetId, PresetStore};
use crate::error::StorageError;
use crate::timer::{PhaseKind, SessionConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: i64,
    pub phase_name: String,
    pub kind: PhaseKind,
    pub duration_secs: u64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HistoryStats {
    pub completed_phases: u64,
    pub study_secs: u64,
    pub break_secs: u64,
    pub completed_sessions: u64,
    pub today_study_secs: u64,
}

/// SQLite database for presets and history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/studyclock.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()?.join("studyclock.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS presets (
                id          TEXT PRIMARY KEY,
                config      TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS phase_history (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                phase_name    TEXT NOT NULL DEFAULT '',
                kind          TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                completed_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS session_history (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                plan_name     TEXT NOT NULL DEFAULT '',
                phase_count   INTEGER NOT NULL,
                total_secs    INTEGER NOT NULL,
                completed_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_phase_history_completed_at ON phase_history(completed_at);
            CREATE INDEX IF NOT EXISTS idx_presets_created_at ON presets(created_at);",
        )?;
        Ok(())
    }

    // ── History ──────────────────────────────────────────────────────

    /// Append a completed phase.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_phase(
        &self,
        phase_name: &str,
        kind: PhaseKind,
        duration_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO phase_history (phase_name, kind, duration_secs, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                phase_name,
                kind.as_str(),
                duration_secs,
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Append a completed session.
    pub fn record_session(
        &self,
        plan_name: &str,
        phase_count: usize,
        total_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO session_history (plan_name, phase_count, total_secs, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![plan_name, phase_count, total_secs, completed_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent phases first.
    pub fn recent_phases(&self, limit: usize) -> Result<Vec<PhaseRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase_name, kind, duration_secs, completed_at
             FROM phase_history
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, phase_name, kind, duration_secs, completed_at) = row?;
            let corrupt = |message: String| StorageError::Corrupt {
                id: format!("phase_history/{id}"),
                message,
            };
            let kind: PhaseKind = kind.parse().map_err(corrupt)?;
            let completed_at = parse_timestamp(&completed_at).map_err(corrupt)?;
            records.push(PhaseRecord {
                id,
                phase_name,
                kind,
                duration_secs,
                completed_at,
            });
        }
        Ok(records)
    }

    pub fn history_stats(&self) -> Result<HistoryStats, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, COUNT(*), COALESCE(SUM(duration_secs), 0)
             FROM phase_history
             GROUP BY kind",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        let mut stats = HistoryStats::default();
        for row in rows {
            let (kind, count, secs) = row?;
            stats.completed_phases += count;
            match kind.as_str() {
                "study" => stats.study_secs += secs,
                "break" => stats.break_secs += secs,
                _ => {}
            }
        }

        stats.completed_sessions =
            self.conn
                .query_row("SELECT COUNT(*) FROM session_history", [], |row| {
                    row.get::<_, u64>(0)
                })?;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        stats.today_study_secs = self.conn.query_row(
            "SELECT COALESCE(SUM(duration_secs), 0)
             FROM phase_history
             WHERE kind = 'study' AND completed_at >= ?1",
            params![format!("{today}T00:00:00+00:00")],
            |row| row.get::<_, u64>(0),
        )?;

        Ok(stats)
    }

    // ── Presets ──────────────────────────────────────────────────────

    fn decode_preset(
        id: String,
        config: &str,
        created_at: &str,
        updated_at: &str,
    ) -> Result<Preset, StorageError> {
        let corrupt = |message: String| StorageError::Corrupt {
            id: id.clone(),
            message,
        };
        let config: SessionConfig =
            serde_json::from_str(config).map_err(|e| corrupt(e.to_string()))?;
        let created_at = parse_timestamp(created_at).map_err(corrupt)?;
        let updated_at = parse_timestamp(updated_at).map_err(corrupt)?;
        Ok(Preset {
            id: PresetId::from(id),
            config,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp '{s}': {e}"))
}

impl PresetStore for Database {
    fn list_presets(&self) -> Result<Vec<Preset>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, config, created_at, updated_at
             FROM presets
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut presets = Vec::new();
        for row in rows {
            let (id, config, created_at, updated_at) = row?;
            presets.push(Self::decode_preset(id, &config, &created_at, &updated_at)?);
        }
        Ok(presets)
    }

    fn save_preset(&mut self, config: &SessionConfig) -> Result<PresetId, StorageError> {
        let id = PresetId::generate();
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO presets (id, config, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![id.as_str(), serde_json::to_string(config)?, now],
        )?;
        Ok(id)
    }

    fn update_preset(&mut self, id: &PresetId, config: &SessionConfig) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "UPDATE presets SET config = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.as_str(), serde_json::to_string(config)?, Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_preset(&mut self, id: &PresetId) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute("DELETE FROM presets WHERE id = ?1", params![id.as_str()])?;
        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get_preset(&self, id: &PresetId) -> Result<Option<Preset>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, config, created_at, updated_at FROM presets WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        match row {
            Some((id, config, created_at, updated_at)) => {
                Self::decode_preset(id, &config, &created_at, &updated_at).map(Some)
            }
            None => Ok(None),
        }
    }
}
