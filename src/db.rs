// SQLite persistence for decisions and the reasoning feed.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::model::{
    Confidence, DecisionRecord, EventCategory, Recommendation, ReasoningEvent,
};
use crate::store::{DecisionStore, ReasoningStore};

/// SQLite-backed store for decision records and reasoning-log events.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS decisions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                gameweek      INTEGER NOT NULL,
                transfers     TEXT NOT NULL,
                captain       INTEGER,
                vice_captain  INTEGER,
                reasoning     TEXT NOT NULL,
                confidence    TEXT NOT NULL,
                executed      INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS reasoning_log (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                gameweek   INTEGER,
                message    TEXT NOT NULL,
                category   TEXT NOT NULL DEFAULT 'info',
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_decisions_gameweek ON decisions(gameweek);
            CREATE INDEX IF NOT EXISTS idx_reasoning_log_gameweek ON reasoning_log(gameweek);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

/// Parse the ISO-8601 timestamps SQLite's strftime default produces.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp in database: {raw}"))
}

fn row_to_decision(row: &rusqlite::Row<'_>) -> rusqlite::Result<(DecisionRecord, String)> {
    let confidence_raw: String = row.get(6)?;
    let created_raw: String = row.get(8)?;
    let record = DecisionRecord {
        id: row.get(0)?,
        gameweek: row.get::<_, i64>(1)? as u32,
        transfers: row.get(2)?,
        captain: row.get::<_, Option<i64>>(3)?.map(|v| v as u32),
        vice_captain: row.get::<_, Option<i64>>(4)?.map(|v| v as u32),
        reasoning: row.get(5)?,
        confidence: Confidence::from_str(&confidence_raw).unwrap_or(Confidence::Low),
        executed: row.get::<_, i64>(7)? != 0,
        created_at: Utc::now(), // overwritten by the caller after parsing
    };
    Ok((record, created_raw))
}

const DECISION_COLUMNS: &str =
    "id, gameweek, transfers, captain, vice_captain, reasoning, confidence, executed, created_at";

impl ReasoningStore for Database {
    fn append(
        &self,
        gameweek: Option<u32>,
        message: &str,
        category: EventCategory,
    ) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO reasoning_log (gameweek, message, category) VALUES (?1, ?2, ?3)",
            params![gameweek.map(|g| g as i64), message, category.as_str()],
        )
        .context("failed to append reasoning event")?;
        Ok(())
    }

    fn clear_for(&self, gameweek: u32) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM reasoning_log WHERE gameweek = ?1",
            params![gameweek as i64],
        )
        .context("failed to clear reasoning log")?;
        Ok(())
    }

    fn query(&self, gameweek: u32, limit: usize) -> Result<Vec<ReasoningEvent>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, gameweek, message, category, created_at
                 FROM reasoning_log
                 WHERE gameweek = ?1 OR gameweek IS NULL
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .context("failed to prepare reasoning query")?;

        let rows = stmt
            .query_map(params![gameweek as i64, limit as i64], |row| {
                let category_raw: String = row.get(3)?;
                let created_raw: String = row.get(4)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, String>(2)?,
                    category_raw,
                    created_raw,
                ))
            })
            .context("failed to query reasoning log")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map reasoning rows")?;

        let mut events = Vec::with_capacity(rows.len());
        for (id, gw, message, category_raw, created_raw) in rows {
            events.push(ReasoningEvent {
                id,
                gameweek: gw.map(|g| g as u32),
                message,
                category: EventCategory::from_str(&category_raw)
                    .unwrap_or(EventCategory::Info),
                created_at: parse_timestamp(&created_raw)?,
            });
        }
        Ok(events)
    }
}

impl DecisionStore for Database {
    fn insert_decision(&self, gameweek: u32, recommendation: &Recommendation) -> Result<i64> {
        let transfers = serde_json::to_string(&recommendation.transfers)
            .context("failed to serialize transfer proposals")?;
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO decisions (gameweek, transfers, captain, vice_captain, reasoning, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id",
                params![
                    gameweek as i64,
                    transfers,
                    recommendation.captain.as_ref().map(|c| c.id as i64),
                    recommendation.vice_captain.as_ref().map(|c| c.id as i64),
                    recommendation.summary,
                    recommendation.confidence.as_str(),
                ],
                |row| row.get(0),
            )
            .context("failed to insert decision")?;
        Ok(id)
    }

    fn latest_decision(&self, gameweek: u32) -> Result<Option<DecisionRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DECISION_COLUMNS} FROM decisions
                 WHERE gameweek = ?1 ORDER BY id DESC LIMIT 1"
            ))
            .context("failed to prepare latest_decision query")?;

        let mut rows = stmt
            .query_map(params![gameweek as i64], row_to_decision)
            .context("failed to query latest decision")?;

        match rows.next() {
            Some(row) => {
                let (mut record, created_raw) = row.context("failed to read decision row")?;
                record.created_at = parse_timestamp(&created_raw)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DECISION_COLUMNS} FROM decisions ORDER BY id DESC LIMIT ?1"
            ))
            .context("failed to prepare recent_decisions query")?;

        let rows = stmt
            .query_map(params![limit as i64], row_to_decision)
            .context("failed to query recent decisions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map decision rows")?;

        let mut decisions = Vec::with_capacity(rows.len());
        for (mut record, created_raw) in rows {
            record.created_at = parse_timestamp(&created_raw)?;
            decisions.push(record);
        }
        Ok(decisions)
    }

    fn mark_executed(&self, decision_id: i64) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE decisions SET executed = 1 WHERE id = ?1",
            params![decision_id],
        )
        .context("failed to mark decision executed")?;
        Ok(())
    }
}
