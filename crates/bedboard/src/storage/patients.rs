//! Patient registry queries.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{fetch_bed_by_patient, format_timestamp, parse_timestamp, sql_limit, Storage};
use crate::error::{Error, Result};
use crate::model::{Bed, NewPatient, Patient, PatientUpdate};

const PATIENT_COLUMNS: &str = "id, name, national_id, active, created_at";

pub(super) fn row_to_patient(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Patient> {
    let created_at: String = row.get(offset + 4)?;
    Ok(Patient {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        national_id: row.get(offset + 2)?,
        active: row.get(offset + 3)?,
        created_at: parse_timestamp(&created_at),
    })
}

/// Escape `LIKE` wildcards so `query` matches as a literal substring.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Look up an active patient by id.
pub(crate) fn fetch_patient(conn: &Connection, id: i64) -> Result<Option<Patient>> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1 AND active = 1"),
            [id],
            |row| row_to_patient(row, 0),
        )
        .optional()?;
    Ok(patient)
}

/// Look up a patient by national id, active or not.
pub(crate) fn fetch_patient_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> Result<Option<Patient>> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE national_id = ?1"),
            [national_id.trim()],
            |row| row_to_patient(row, 0),
        )
        .optional()?;
    Ok(patient)
}

/// Register a patient.
///
/// # Errors
///
/// Returns a client error for missing fields or a national id that is
/// already registered.
pub(crate) fn insert_patient(conn: &Connection, new: &NewPatient) -> Result<Patient> {
    new.validate()?;
    let national_id = new.national_id.trim();
    if fetch_patient_by_national_id(conn, national_id)?.is_some() {
        return Err(Error::validation(format!(
            "a patient with national id {national_id} is already registered"
        )));
    }

    conn.execute(
        "INSERT INTO patients (name, national_id, created_at) VALUES (?1, ?2, ?3)",
        params![new.name.trim(), national_id, format_timestamp(Utc::now())],
    )?;

    let id = conn.last_insert_rowid();
    debug!("Registered patient with id {}", id);
    fetch_patient(conn, id)?.ok_or_else(|| Error::internal("inserted patient vanished"))
}

impl Storage {
    /// Register a patient.
    ///
    /// # Errors
    ///
    /// Returns a client error for missing fields or a duplicate national id.
    pub fn create_patient(&self, new: &NewPatient) -> Result<Patient> {
        insert_patient(self.conn(), new)
    }

    /// Get an active patient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the patient is unknown or inactive.
    pub fn patient(&self, id: i64) -> Result<Patient> {
        fetch_patient(self.conn(), id)?.ok_or(Error::not_found("patient", id))
    }

    /// Find a patient by national id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn patient_by_national_id(&self, national_id: &str) -> Result<Option<Patient>> {
        fetch_patient_by_national_id(self.conn(), national_id)
    }

    /// Search active patients by name or national id substring.
    ///
    /// An empty query lists every active patient.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_patients(&self, query: &str, limit: usize) -> Result<Vec<Patient>> {
        let pattern = like_pattern(query.trim());
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients
             WHERE active = 1 AND (name LIKE ?1 ESCAPE '\\' OR national_id LIKE ?1 ESCAPE '\\')
             ORDER BY name, id LIMIT ?2"
        ))?;

        let patients = stmt
            .query_map(params![pattern, sql_limit(limit)], |row| {
                row_to_patient(row, 0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(patients)
    }

    /// Apply a partial update to a patient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown patient and a client error
    /// for blank fields or a national id owned by someone else.
    pub fn update_patient(&self, id: i64, update: &PatientUpdate) -> Result<Patient> {
        let current = self.patient(id)?;

        let name = match &update.name {
            Some(name) if name.trim().is_empty() => return Err(Error::MissingField("name")),
            Some(name) => name.trim().to_string(),
            None => current.name,
        };
        let national_id = match &update.national_id {
            Some(nid) if nid.trim().is_empty() => {
                return Err(Error::MissingField("national_id"));
            }
            Some(nid) => nid.trim().to_string(),
            None => current.national_id,
        };

        if let Some(other) = self.patient_by_national_id(&national_id)? {
            if other.id != id {
                return Err(Error::validation(format!(
                    "national id {national_id} belongs to another patient"
                )));
            }
        }

        self.conn().execute(
            "UPDATE patients SET name = ?1, national_id = ?2 WHERE id = ?3",
            params![name, national_id, id],
        )?;
        self.patient(id)
    }

    /// Deactivate a patient who is not in a bed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown patient and a client error
    /// while the patient still occupies a bed.
    pub fn deactivate_patient(&self, id: i64) -> Result<()> {
        let patient = self.patient(id)?;
        if let Some(bed) = fetch_bed_by_patient(self.conn(), id)? {
            return Err(Error::validation(format!(
                "patient {} still occupies bed {}",
                patient.national_id, bed.code
            )));
        }

        self.conn()
            .execute("UPDATE patients SET active = 0 WHERE id = ?1", [id])?;
        info!("Deactivated patient {}", id);
        Ok(())
    }

    /// The active bed a patient currently occupies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown patient.
    pub fn patient_bed(&self, id: i64) -> Result<Option<Bed>> {
        self.patient(id)?;
        fetch_bed_by_patient(self.conn(), id)
    }
}
