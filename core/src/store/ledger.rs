use super::{format_timestamp, timestamp_at, AllocStore};
use crate::{
    error::AllocResult,
    models::{self, Allocation, WrapperKind},
    types::{AccountId, AllocationId, ClientId, DepositId, MinorUnits, ReceiptId},
};
use chrono::NaiveDateTime;
use rusqlite::params;

impl AllocStore {
    // ── Receipt ───────────────────────────────────────────────────

    pub fn insert_receipt(&self, deposit_id: DepositId, amount: MinorUnits) -> AllocResult<ReceiptId> {
        self.conn.execute(
            "INSERT INTO receipt (deposit_id, amount, created_at) VALUES (?1, ?2, ?3)",
            params![deposit_id, amount, format_timestamp(&models::now())],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// (receipt_id, amount, created_at) for every live receipt on a deposit.
    pub fn receipts_for_deposit(
        &self,
        deposit_id: DepositId,
    ) -> AllocResult<Vec<(ReceiptId, MinorUnits, NaiveDateTime)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, amount, created_at FROM receipt
             WHERE deposit_id = ?1 AND deleted_at IS NULL
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![deposit_id], |row| {
            Ok((row.get(0)?, row.get(1)?, timestamp_at(row, 2)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn receipt_count(&self) -> AllocResult<i64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM receipt", [], |row| row.get(0))?;
        Ok(n)
    }

    // ── Allocation ────────────────────────────────────────────────

    pub fn insert_allocation(
        &self,
        receipt_id: ReceiptId,
        account_id: AccountId,
        amount: MinorUnits,
    ) -> AllocResult<AllocationId> {
        self.conn.execute(
            "INSERT INTO allocation (receipt_id, account_id, amount, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![receipt_id, account_id, amount, format_timestamp(&models::now())],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn allocations_for_receipt(&self, receipt_id: ReceiptId) -> AllocResult<Vec<Allocation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, receipt_id, account_id, amount, created_at FROM allocation
             WHERE receipt_id = ?1 AND deleted_at IS NULL
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![receipt_id], |row| {
            Ok(Allocation {
                id: row.get(0)?,
                receipt_id: row.get(1)?,
                account_id: row.get(2)?,
                amount: row.get(3)?,
                created_at: timestamp_at(row, 4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn allocation_count(&self) -> AllocResult<i64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM allocation", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn soft_delete_allocation(&self, allocation_id: AllocationId) -> AllocResult<()> {
        self.conn.execute(
            "UPDATE allocation SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![format_timestamp(&models::now()), allocation_id],
        )?;
        Ok(())
    }

    /// Sum of live allocations into `wrapper` accounts owned by a client,
    /// following client → pot → account → allocation. 0 when nothing matches.
    pub fn sum_allocated(&self, wrapper: WrapperKind, client_id: ClientId) -> AllocResult<MinorUnits> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(al.amount), 0)
             FROM client c
             JOIN pot p         ON p.client_id = c.id   AND p.deleted_at IS NULL
             JOIN account a     ON a.pot_id = p.id      AND a.deleted_at IS NULL
             JOIN allocation al ON al.account_id = a.id AND al.deleted_at IS NULL
             WHERE c.id = ?1 AND a.wrapper = ?2",
            params![client_id, wrapper.as_str()],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}
