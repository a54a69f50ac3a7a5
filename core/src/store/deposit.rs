use super::{decimal_at, format_timestamp, timestamp_at, AllocStore};
use crate::{
    error::AllocResult,
    models::{self, Deposit, DepositStatement, NewDeposit, ProposedAllocation, ReceiptStatement},
    types::DepositId,
};
use rusqlite::{params, OptionalExtension};

impl AllocStore {
    // ── Deposit ───────────────────────────────────────────────────

    /// Validate and persist a deposit with its proposed splits, atomically.
    pub fn create_deposit(&self, new: &NewDeposit) -> AllocResult<Deposit> {
        new.validate()?;

        let created_at = models::now();
        let ts = format_timestamp(&created_at);
        let tx = self.begin()?;

        self.conn.execute(
            "INSERT INTO deposit (client_id, amount, created_at) VALUES (?1, ?2, ?3)",
            params![new.client_id, new.amount, ts],
        )?;
        let deposit_id = self.conn.last_insert_rowid();

        let mut proposed = Vec::with_capacity(new.proposed_allocation.len());
        for p in &new.proposed_allocation {
            self.conn.execute(
                "INSERT INTO proposed_allocation (deposit_id, account_id, split, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![deposit_id, p.account_id, p.split.to_string(), ts],
            )?;
            proposed.push(ProposedAllocation {
                id: self.conn.last_insert_rowid(),
                deposit_id,
                account_id: p.account_id,
                split: p.split,
            });
        }

        tx.commit()?;
        log::debug!(
            "Deposit {deposit_id} created for client {} ({} splits)",
            new.client_id,
            proposed.len()
        );

        Ok(Deposit {
            id: deposit_id,
            client_id: new.client_id,
            amount: new.amount,
            proposed_allocation: proposed,
            created_at,
        })
    }

    /// A deposit with its proposed splits in insertion order.
    pub fn load_deposit(&self, deposit_id: DepositId) -> AllocResult<Option<Deposit>> {
        let head = self
            .conn
            .query_row(
                "SELECT id, client_id, amount, created_at FROM deposit
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![deposit_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        timestamp_at(row, 3)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, client_id, amount, created_at)) = head else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, deposit_id, account_id, split FROM proposed_allocation
             WHERE deposit_id = ?1 AND deleted_at IS NULL
             ORDER BY id ASC",
        )?;
        let proposed = stmt
            .query_map(params![id], |row| {
                Ok(ProposedAllocation {
                    id: row.get(0)?,
                    deposit_id: row.get(1)?,
                    account_id: row.get(2)?,
                    split: decimal_at(row, 3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Deposit {
            id,
            client_id,
            amount,
            proposed_allocation: proposed,
            created_at,
        }))
    }

    /// A deposit with every receipt and each receipt's allocations.
    pub fn deposit_statement(&self, deposit_id: DepositId) -> AllocResult<Option<DepositStatement>> {
        let Some(deposit) = self.load_deposit(deposit_id)? else {
            return Ok(None);
        };

        let receipts = self
            .receipts_for_deposit(deposit_id)?
            .into_iter()
            .map(|(id, amount, created_at)| {
                Ok(ReceiptStatement {
                    id,
                    amount,
                    allocations: self.allocations_for_receipt(id)?,
                    created_at,
                })
            })
            .collect::<AllocResult<Vec<_>>>()?;

        Ok(Some(DepositStatement {
            id: deposit.id,
            client_id: deposit.client_id,
            amount: deposit.amount,
            receipts,
        }))
    }
}
