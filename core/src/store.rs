//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine calls store methods and never executes SQL directly.

use crate::{error::RewardResult, event::EventLogEntry};
use rusqlite::{params, Connection, OptionalExtension};

pub struct RewardStore {
    conn: Connection,
}

impl RewardStore {
    /// Open (or create) the reward database at `path`.
    pub fn open(path: &str) -> RewardResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RewardResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RewardResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Session ────────────────────────────────────────────────

    pub fn insert_session(
        &self,
        session_id: &str,
        seed: u64,
        version: &str,
        started_at: &str,
    ) -> RewardResult<()> {
        self.conn.execute(
            "INSERT INTO session (session_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, seed as i64, version, started_at],
        )?;
        Ok(())
    }

    pub fn session_seed(&self, session_id: &str) -> RewardResult<Option<u64>> {
        let seed = self
            .conn
            .query_row(
                "SELECT seed FROM session WHERE session_id = ?1",
                params![session_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(seed.map(|s| s as u64))
    }

    // ── Event log ──────────────────────────────────────────────

    /// Append a batch in one transaction: either every entry lands or none do.
    pub fn append_events(&self, entries: &[EventLogEntry]) -> RewardResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO reward_event_log (session_id, seq, user_id, event_type, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.session_id,
                    entry.seq as i64,
                    entry.user_id,
                    entry.event_type,
                    entry.payload,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn events_for_user(&self, session_id: &str, user_id: &str) -> RewardResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, seq, user_id, event_type, payload
             FROM reward_event_log WHERE session_id = ?1 AND user_id = ?2
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![session_id, user_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    session_id: row.get(1)?,
                    seq:        row.get::<_, i64>(2)? as u64,
                    user_id:    row.get(3)?,
                    event_type: row.get(4)?,
                    payload:    row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, session_id: &str, event_type: &str) -> RewardResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM reward_event_log WHERE session_id = ?1 AND event_type = ?2",
            params![session_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(
        &self,
        session_id: &str,
        user_id: &str,
        saved_at: &str,
        state_json: &str,
    ) -> RewardResult<()> {
        self.conn.execute(
            "INSERT INTO account_snapshot (session_id, user_id, saved_at, state_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, user_id, saved_at, state_json],
        )?;
        Ok(())
    }

    /// Most recent snapshot for `user_id` from any session.
    pub fn latest_snapshot(&self, user_id: &str) -> RewardResult<Option<String>> {
        let json = self
            .conn
            .query_row(
                "SELECT state_json FROM account_snapshot
                 WHERE user_id = ?1
                 ORDER BY id DESC LIMIT 1",
                params![user_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(json)
    }
}
