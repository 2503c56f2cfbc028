//! SQLite persistence for the donation ledger.
//!
//! RULE: Only the store talks to the database.
//! Analyzers read through the DonationSource trait and never execute SQL.

use crate::error::AnalyticsResult;
use rusqlite::{Connection, OpenFlags};

mod donation;

pub struct LedgerStore {
    conn: Connection,
}

impl LedgerStore {
    /// Open (or create) the ledger at `path`. URI paths are accepted.
    pub fn open(path: &str) -> AnalyticsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        // :memory: answers "memory" instead of failing, so the result is ignored.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        log::debug!("store: opened ledger {path}");
        Ok(Self { conn })
    }

    /// Open an in-memory ledger (used in tests).
    pub fn in_memory() -> AnalyticsResult<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalyticsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_donations.sql"))?;
        Ok(())
    }
}
