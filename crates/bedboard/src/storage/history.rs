//! Append-only status change log.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp, sql_limit, Storage};
use crate::error::Result;
use crate::model::StatusChange;

/// An audit record about to be written.
#[derive(Debug, Clone)]
pub(crate) struct NewStatusChange<'a> {
    pub bed_id: i64,
    pub previous_status_id: Option<i64>,
    pub new_status_id: i64,
    pub actor: &'a str,
    pub patient_id: Option<i64>,
    pub comment: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Append an audit record, returning its id.
pub(crate) fn insert_status_change(conn: &Connection, change: &NewStatusChange<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO status_changes
             (bed_id, previous_status_id, new_status_id, actor, patient_id, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            change.bed_id,
            change.previous_status_id,
            change.new_status_id,
            change.actor,
            change.patient_id,
            change.comment,
            format_timestamp(change.created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_change(row: &rusqlite::Row) -> rusqlite::Result<StatusChange> {
    let created_at: String = row.get(7)?;
    Ok(StatusChange {
        id: row.get(0)?,
        bed_id: row.get(1)?,
        previous_status_id: row.get(2)?,
        new_status_id: row.get(3)?,
        actor: row.get(4)?,
        patient_id: row.get(5)?,
        comment: row.get(6)?,
        created_at: parse_timestamp(&created_at),
    })
}

impl Storage {
    /// Status changes of a bed, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the bed is unknown or inactive.
    pub fn bed_history(&self, bed_id: i64, limit: usize) -> Result<Vec<StatusChange>> {
        self.bed(bed_id)?;

        let mut stmt = self.conn().prepare(
            r"
            SELECT id, bed_id, previous_status_id, new_status_id, actor, patient_id, comment,
                   created_at
            FROM status_changes WHERE bed_id = ?1
            ORDER BY id DESC LIMIT ?2
            ",
        )?;
        let changes = stmt
            .query_map(params![bed_id, sql_limit(limit)], row_to_change)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(changes)
    }

    /// Total number of audit records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn status_change_count(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM status_changes", [], |row| row.get(0))?;
        Ok(count)
    }
}
