use super::{format_timestamp, timestamp_at, AllocStore};
use crate::{
    error::AllocResult,
    models::{self, Client, Pot},
    types::{ClientId, PotId},
};
use rusqlite::{params, OptionalExtension};

impl AllocStore {
    // ── Client ────────────────────────────────────────────────────

    pub fn insert_client(&self, name: &str) -> AllocResult<Client> {
        let created_at = models::now();
        self.conn.execute(
            "INSERT INTO client (name, created_at) VALUES (?1, ?2)",
            params![name, format_timestamp(&created_at)],
        )?;
        Ok(Client {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    pub fn find_client(&self, client_id: ClientId) -> AllocResult<Option<Client>> {
        let client = self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM client
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![client_id],
                |row| {
                    Ok(Client {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: timestamp_at(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(client)
    }

    // ── Pot ───────────────────────────────────────────────────────

    pub fn insert_pot(&self, client_id: ClientId, name: &str) -> AllocResult<Pot> {
        let created_at = models::now();
        self.conn.execute(
            "INSERT INTO pot (client_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![client_id, name, format_timestamp(&created_at)],
        )?;
        Ok(Pot {
            id: self.conn.last_insert_rowid(),
            client_id,
            name: name.to_string(),
            created_at,
        })
    }

    pub fn pots_for_client(&self, client_id: ClientId) -> AllocResult<Vec<Pot>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, client_id, name, created_at FROM pot
             WHERE client_id = ?1 AND deleted_at IS NULL
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![client_id], |row| {
            Ok(Pot {
                id: row.get(0)?,
                client_id: row.get(1)?,
                name: row.get(2)?,
                created_at: timestamp_at(row, 3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Soft delete. The pot's accounts stop counting towards contribution totals.
    pub fn soft_delete_pot(&self, pot_id: PotId) -> AllocResult<()> {
        self.conn.execute(
            "UPDATE pot SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![format_timestamp(&models::now()), pot_id],
        )?;
        Ok(())
    }
}
