//! Bed status catalogue queries.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::Storage;
use crate::error::{Error, Result};
use crate::model::{BedStatus, NewStatus, StatusKind};

const STATUS_COLUMNS: &str = "id, name, kind, color, description, sort_order, active";

pub(super) fn row_to_status(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<BedStatus> {
    Ok(BedStatus {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        kind: row.get(offset + 2)?,
        color: row.get(offset + 3)?,
        description: row.get(offset + 4)?,
        sort_order: row.get(offset + 5)?,
        active: row.get(offset + 6)?,
    })
}

/// Look up an active status by id.
pub(crate) fn fetch_status(conn: &Connection, id: i64) -> Result<Option<BedStatus>> {
    let status = conn
        .query_row(
            &format!("SELECT {STATUS_COLUMNS} FROM bed_statuses WHERE id = ?1 AND active = 1"),
            [id],
            |row| row_to_status(row, 0),
        )
        .optional()?;
    Ok(status)
}

/// The first active status of the given kind, by `sort_order`.
pub(crate) fn find_status_by_kind(
    conn: &Connection,
    kind: StatusKind,
) -> Result<Option<BedStatus>> {
    let status = conn
        .query_row(
            &format!(
                "SELECT {STATUS_COLUMNS} FROM bed_statuses
                 WHERE kind = ?1 AND active = 1
                 ORDER BY sort_order, id LIMIT 1"
            ),
            [kind],
            |row| row_to_status(row, 0),
        )
        .optional()?;
    Ok(status)
}

impl Storage {
    /// Add a status to the catalogue.
    ///
    /// # Errors
    ///
    /// Returns a client error for missing fields, a malformed color or a
    /// duplicate name.
    pub fn create_status(&self, new: &NewStatus) -> Result<BedStatus> {
        new.validate()?;
        let name = new.name.trim();
        if self.status_by_name(name)?.is_some() {
            return Err(Error::validation(format!("status '{name}' already exists")));
        }

        self.conn().execute(
            "INSERT INTO bed_statuses (name, kind, color, description, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                name,
                new.kind.unwrap_or(StatusKind::Other),
                new.color,
                new.description,
                new.sort_order.unwrap_or(0),
            ],
        )?;

        let id = self.conn().last_insert_rowid();
        debug!("Inserted status '{}' with id {}", name, id);
        self.status(id)
    }

    /// Get an active status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the status is unknown or inactive.
    pub fn status(&self, id: i64) -> Result<BedStatus> {
        fetch_status(self.conn(), id)?.ok_or(Error::not_found("status", id))
    }

    /// All active statuses ordered for display.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn statuses(&self) -> Result<Vec<BedStatus>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {STATUS_COLUMNS} FROM bed_statuses WHERE active = 1 ORDER BY sort_order, id"
        ))?;
        let statuses = stmt
            .query_map([], |row| row_to_status(row, 0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(statuses)
    }

    /// The first active status of the given kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn status_by_kind(&self, kind: StatusKind) -> Result<Option<BedStatus>> {
        find_status_by_kind(self.conn(), kind)
    }

    /// Find a status by exact name, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn status_by_name(&self, name: &str) -> Result<Option<BedStatus>> {
        let status = self
            .conn()
            .query_row(
                &format!("SELECT {STATUS_COLUMNS} FROM bed_statuses WHERE name = ?1"),
                [name],
                |row| row_to_status(row, 0),
            )
            .optional()?;
        Ok(status)
    }
}
