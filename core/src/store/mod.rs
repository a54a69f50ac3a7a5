//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine and the wrapper rules call store methods; they never execute SQL directly.
//!
//! Every store method runs on the store's single connection. While a
//! transaction from `begin()` is live, every read sees its uncommitted writes.

use crate::{error::AllocResult, models::TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use rusqlite::{types::Type, Connection, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use std::str::FromStr;

mod account;
mod client;
mod deposit;
mod ledger;

pub struct AllocStore {
    conn: Connection,
}

impl AllocStore {
    pub fn open(path: &str) -> AllocResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AllocResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AllocResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_deposits.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_gia_per_pot.sql"))?;
        Ok(())
    }

    /// Start an IMMEDIATE transaction on this store's connection.
    ///
    /// SQLite takes the write lock up front, so two allocations never
    /// interleave their ledger reads and writes. Dropping the returned
    /// transaction without `commit()` rolls it back.
    pub fn begin(&self) -> AllocResult<Transaction<'_>> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        Ok(tx)
    }

    /// Whether a transaction is currently open on this connection.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

// ── Row helpers ────────────────────────────────────────────────────

pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
