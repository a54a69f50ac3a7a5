use super::{format_timestamp, timestamp_at, AllocStore};
use crate::{
    error::AllocResult,
    models::{self, Account, WrapperKind},
    types::{AccountId, PotId},
};
use rusqlite::{params, OptionalExtension, Row};

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        pot_id: row.get(1)?,
        wrapper: WrapperKind::from_db(&row.get::<_, String>(2)?),
        created_at: timestamp_at(row, 3)?,
    })
}

impl AllocStore {
    // ── Account ───────────────────────────────────────────────────

    pub fn insert_account(&self, pot_id: PotId, wrapper: WrapperKind) -> AllocResult<Account> {
        let created_at = models::now();
        self.conn.execute(
            "INSERT INTO account (pot_id, wrapper, created_at) VALUES (?1, ?2, ?3)",
            params![pot_id, wrapper.as_str(), format_timestamp(&created_at)],
        )?;
        Ok(Account {
            id: self.conn.last_insert_rowid(),
            pot_id,
            wrapper,
            created_at,
        })
    }

    pub fn find_account(&self, account_id: AccountId) -> AllocResult<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT id, pot_id, wrapper, created_at FROM account
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![account_id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    /// First live account of `wrapper` kind inside a pot.
    pub fn find_account_by_kind(
        &self,
        pot_id: PotId,
        wrapper: WrapperKind,
    ) -> AllocResult<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT id, pot_id, wrapper, created_at FROM account
                 WHERE pot_id = ?1 AND wrapper = ?2 AND deleted_at IS NULL
                 ORDER BY id ASC LIMIT 1",
                params![pot_id, wrapper.as_str()],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    /// The pot's GIA account, created on first use.
    /// Returns the account and whether it was created by this call.
    pub fn resolve_or_create_gia(&self, pot_id: PotId) -> AllocResult<(Account, bool)> {
        if let Some(gia) = self.find_account_by_kind(pot_id, WrapperKind::Gia)? {
            return Ok((gia, false));
        }
        let gia = self.insert_account(pot_id, WrapperKind::Gia)?;
        log::debug!("Created GIA account {} for pot {pot_id}", gia.id);
        Ok((gia, true))
    }

    pub fn accounts_for_pot(&self, pot_id: PotId) -> AllocResult<Vec<Account>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pot_id, wrapper, created_at FROM account
             WHERE pot_id = ?1 AND deleted_at IS NULL
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![pot_id], account_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn soft_delete_account(&self, account_id: AccountId) -> AllocResult<()> {
        self.conn.execute(
            "UPDATE account SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![format_timestamp(&models::now()), account_id],
        )?;
        Ok(())
    }
}
