//! Bed queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::locations::fetch_location;
use super::patients::row_to_patient;
use super::statuses::row_to_status;
use super::{fetch_status, find_status_by_kind, format_timestamp, parse_timestamp, Storage};
use crate::error::{Error, Result};
use crate::model::{Bed, BedUpdate, NewBed, StatusKind};

/// Bed columns followed by its status and (optional) patient.
const BED_SELECT: &str = r"
SELECT b.id, b.code, b.name, b.location_id, b.sort_order, b.active, b.status_since, b.updated_at,
       s.id, s.name, s.kind, s.color, s.description, s.sort_order, s.active,
       p.id, p.name, p.national_id, p.active, p.created_at
FROM beds b
JOIN bed_statuses s ON s.id = b.status_id
LEFT JOIN patients p ON p.id = b.patient_id
";

fn row_to_bed(row: &rusqlite::Row) -> rusqlite::Result<Bed> {
    let status_since: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    let patient_id: Option<i64> = row.get(15)?;
    let patient = match patient_id {
        Some(_) => Some(row_to_patient(row, 15)?),
        None => None,
    };

    Ok(Bed {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        location_id: row.get(3)?,
        sort_order: row.get(4)?,
        active: row.get(5)?,
        status_since: parse_timestamp(&status_since),
        updated_at: parse_timestamp(&updated_at),
        status: row_to_status(row, 8)?,
        patient,
    })
}

/// Look up an active bed by id.
pub(crate) fn fetch_bed(conn: &Connection, id: i64) -> Result<Option<Bed>> {
    let bed = conn
        .query_row(
            &format!("{BED_SELECT} WHERE b.id = ?1 AND b.active = 1"),
            [id],
            row_to_bed,
        )
        .optional()?;
    Ok(bed)
}

/// The active bed a patient occupies, if any.
pub(crate) fn fetch_bed_by_patient(conn: &Connection, patient_id: i64) -> Result<Option<Bed>> {
    let bed = conn
        .query_row(
            &format!("{BED_SELECT} WHERE b.patient_id = ?1 AND b.active = 1"),
            [patient_id],
            row_to_bed,
        )
        .optional()?;
    Ok(bed)
}

/// Overwrite a bed's status, occupant and timestamps.
pub(crate) fn set_bed_state(
    conn: &Connection,
    bed_id: i64,
    status_id: i64,
    patient_id: Option<i64>,
    status_since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE beds SET status_id = ?1, patient_id = ?2, status_since = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            status_id,
            patient_id,
            format_timestamp(status_since),
            format_timestamp(now),
            bed_id,
        ],
    )?;
    Ok(())
}

impl Storage {
    /// Create a bed in a sector.
    ///
    /// The initial status defaults to the first `available` status.
    ///
    /// # Errors
    ///
    /// Returns a client error for missing fields, a non-sector location or a
    /// duplicate code, and [`Error::NotFound`] for unknown references.
    pub fn create_bed(&self, new: &NewBed) -> Result<Bed> {
        let location_id = new.validate()?;
        let code = new.code.trim();

        let location = fetch_location(self.conn(), location_id)?
            .ok_or(Error::not_found("location", location_id))?;
        if !location.kind.holds_beds() {
            return Err(Error::validation(format!(
                "beds can only be placed in a sector, '{}' is a {}",
                location.name, location.kind
            )));
        }
        self.ensure_unique_code(location_id, code, None)?;

        let status = match new.status_id {
            Some(id) => fetch_status(self.conn(), id)?.ok_or(Error::not_found("status", id))?,
            None => find_status_by_kind(self.conn(), StatusKind::Available)?.ok_or_else(|| {
                Error::validation("no available status is configured; pass status_id")
            })?,
        };

        let now = format_timestamp(Utc::now());
        self.conn().execute(
            "INSERT INTO beds
                 (code, name, location_id, status_id, sort_order, status_since, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                code,
                new.name,
                location_id,
                status.id,
                new.sort_order.unwrap_or(0),
                now,
            ],
        )?;

        let id = self.conn().last_insert_rowid();
        debug!("Inserted bed {} with id {} in location {}", code, id, location_id);
        self.bed(id)
    }

    /// Get an active bed with its status and occupant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the bed is unknown or inactive.
    pub fn bed(&self, id: i64) -> Result<Bed> {
        fetch_bed(self.conn(), id)?.ok_or(Error::not_found("bed", id))
    }

    /// Active beds of a location in grid order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the location is unknown or inactive.
    pub fn beds_in_location(&self, location_id: i64) -> Result<Vec<Bed>> {
        self.location(location_id)?;

        let mut stmt = self.conn().prepare(&format!(
            "{BED_SELECT} WHERE b.location_id = ?1 AND b.active = 1 ORDER BY b.sort_order, b.id"
        ))?;
        let beds = stmt
            .query_map([location_id], row_to_bed)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(beds)
    }

    /// Apply a partial update to a bed's descriptive fields.
    ///
    /// Status and occupant only change through
    /// [`Storage::change_bed_status`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown bed and a client error for a
    /// blank or duplicate code.
    pub fn update_bed(&self, id: i64, update: &BedUpdate) -> Result<Bed> {
        let current = self.bed(id)?;

        let code = match &update.code {
            Some(code) if code.trim().is_empty() => return Err(Error::MissingField("code")),
            Some(code) => code.trim().to_string(),
            None => current.code,
        };
        self.ensure_unique_code(current.location_id, &code, Some(id))?;
        let name = update.name.clone().or(current.name);
        let sort_order = update.sort_order.unwrap_or(current.sort_order);

        self.conn().execute(
            "UPDATE beds SET code = ?1, name = ?2, sort_order = ?3, updated_at = ?4 WHERE id = ?5",
            params![code, name, sort_order, format_timestamp(Utc::now()), id],
        )?;
        self.bed(id)
    }

    /// Deactivate an empty bed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown bed and a client error while
    /// a patient occupies it.
    pub fn deactivate_bed(&self, id: i64) -> Result<()> {
        let bed = self.bed(id)?;
        if let Some(patient) = &bed.patient {
            return Err(Error::validation(format!(
                "bed {} is occupied by patient {}; release it first",
                bed.code, patient.national_id
            )));
        }

        self.conn().execute(
            "UPDATE beds SET active = 0, updated_at = ?1 WHERE id = ?2",
            params![format_timestamp(Utc::now()), id],
        )?;
        info!("Deactivated bed {} ({})", bed.code, id);
        Ok(())
    }

    fn ensure_unique_code(&self, location_id: i64, code: &str, except: Option<i64>) -> Result<()> {
        let clash: Option<i64> = self
            .conn()
            .query_row(
                "SELECT id FROM beds
                 WHERE location_id = ?1 AND code = ?2 AND active = 1 AND (?3 IS NULL OR id != ?3)
                 LIMIT 1",
                params![location_id, code, except],
                |row| row.get(0),
            )
            .optional()?;

        match clash {
            Some(_) => Err(Error::validation(format!(
                "bed code {code} is already used in this location"
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{BedUpdate, LocationKind, NewBed, StatusChangeRequest, StatusKind};
    use crate::storage::test_support;

    #[test]
    fn test_create_bed_defaults_to_available() {
        let storage = test_support::storage();
        let sector = test_support::sector(&storage);
        let bed = test_support::bed(&storage, sector.id, "ICU-01");

        assert_eq!(bed.status.kind, StatusKind::Available);
        assert!(!bed.is_occupied());
        assert_eq!(bed.location_id, sector.id);
        assert_eq!(bed.status_since, bed.updated_at);
    }

    #[test]
    fn test_create_bed_with_status() {
        let storage = test_support::storage();
        let sector = test_support::sector(&storage);
        let blocked = test_support::status(&storage, StatusKind::Blocked);

        let bed = storage
            .create_bed(&NewBed {
                code: "ICU-02".to_string(),
                name: Some("Bed 2".to_string()),
                location_id: Some(sector.id),
                status_id: Some(blocked.id),
                sort_order: Some(2),
            })
            .unwrap();
        assert_eq!(bed.status, blocked);
        assert_eq!(bed.name.as_deref(), Some("Bed 2"));
    }

    #[test]
    fn test_create_bed_requires_sector() {
        let storage = test_support::storage();
        let tower = test_support::location(&storage, "Tower A", LocationKind::Tower, None);

        let err = storage
            .create_bed(&NewBed {
                code: "X-01".to_string(),
                location_id: Some(tower.id),
                ..NewBed::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("sector"));
    }

    #[test]
    fn test_create_bed_unknown_references() {
        let storage = test_support::storage();
        let sector = test_support::sector(&storage);

        let err = storage
            .create_bed(&NewBed {
                code: "X-01".to_string(),
                location_id: Some(777),
                ..NewBed::default()
            })
            .unwrap_err();
        assert!(err.is_not_found());

        let err = storage
            .create_bed(&NewBed {
                code: "X-01".to_string(),
                location_id: Some(sector.id),
                status_id: Some(777),
                ..NewBed::default()
            })
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_duplicate_code_in_location() {
        let storage = test_support::storage();
        let sector = test_support::sector(&storage);
        test_support::bed(&storage, sector.id, "ICU-01");

        let err = storage
            .create_bed(&NewBed {
                code: "ICU-01".to_string(),
                location_id: Some(sector.id),
                ..NewBed::default()
            })
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_beds_in_location_ordered() {
        let storage = test_support::storage();
        let sector = test_support::sector(&storage);
        for (code, order) in [("ICU-03", 3), ("ICU-01", 1), ("ICU-02", 2)] {
            storage
                .create_bed(&NewBed {
                    code: code.to_string(),
                    location_id: Some(sector.id),
                    sort_order: Some(order),
                    ..NewBed::default()
                })
                .unwrap();
        }

        let codes: Vec<String> = storage
            .beds_in_location(sector.id)
            .unwrap()
            .into_iter()
            .map(|b| b.code)
            .collect();
        assert_eq!(codes, ["ICU-01", "ICU-02", "ICU-03"]);
        assert!(storage.beds_in_location(404).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_bed() {
        let storage = test_support::storage();
        let sector = test_support::sector(&storage);
        let bed = test_support::bed(&storage, sector.id, "ICU-01");
        test_support::bed(&storage, sector.id, "ICU-02");

        let updated = storage
            .update_bed(
                bed.id,
                &BedUpdate {
                    code: Some("ICU-10".to_string()),
                    name: Some("Window bed".to_string()),
                    sort_order: Some(10),
                },
            )
            .unwrap();
        assert_eq!(updated.code, "ICU-10");
        assert_eq!(updated.sort_order, 10);
        assert_eq!(updated.status_since, bed.status_since);

        let err = storage
            .update_bed(
                bed.id,
                &BedUpdate {
                    code: Some("ICU-02".to_string()),
                    ..BedUpdate::default()
                },
            )
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_deactivate_bed() {
        let storage = test_support::storage();
        let sector = test_support::sector(&storage);
        let bed = test_support::bed(&storage, sector.id, "ICU-01");

        storage.deactivate_bed(bed.id).unwrap();
        assert!(storage.bed(bed.id).unwrap_err().is_not_found());
        assert!(storage.beds_in_location(sector.id).unwrap().is_empty());

        // The code is free again once the old bed is gone.
        test_support::bed(&storage, sector.id, "ICU-01");
    }

    #[test]
    fn test_deactivate_occupied_bed() {
        let mut storage = test_support::storage();
        let sector = test_support::sector(&storage);
        let bed = test_support::bed(&storage, sector.id, "ICU-01");
        let patient = test_support::patient(&storage, "Ana Rojas", "111");
        let occupied = test_support::status(&storage, StatusKind::Occupied);
        storage
            .change_bed_status(
                bed.id,
                &StatusChangeRequest {
                    status_id: Some(occupied.id),
                    patient_id: Some(patient.id),
                    ..StatusChangeRequest::default()
                },
                "test",
            )
            .unwrap();

        let err = storage.deactivate_bed(bed.id).unwrap_err();
        assert!(err.is_client_error());
        let bed = storage.bed(bed.id).unwrap();
        assert!(bed.active);
        assert_eq!(bed.patient.unwrap().id, patient.id);
    }
}
