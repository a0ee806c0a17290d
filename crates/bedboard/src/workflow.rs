//! Bed status transitions.
//!
//! A transition moves one bed to a new status and, optionally, places a
//! patient in it. Everything happens inside a single transaction: the bed
//! update and its audit record are written together or not at all.
//!
//! Rules:
//! - entering an `available` status releases the occupant;
//! - a patient who already occupies another bed is only moved when the
//!   caller confirms the transfer. The vacated bed goes to the
//!   `pending_cleaning` status with its own audit record;
//! - a bed occupied by someone else must be released before a new patient
//!   is assigned.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Bed, BedStatus, Patient, StatusChangeRequest, StatusKind};
use crate::storage::{
    fetch_bed, fetch_bed_by_patient, fetch_patient, fetch_patient_by_national_id, fetch_status,
    find_status_by_kind, insert_patient, insert_status_change, set_bed_state, NewStatusChange,
    Storage,
};

/// Result of a status change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The change was written.
    Applied {
        /// The bed after the change.
        bed: Bed,
        /// The bed the patient was transferred out of, if any.
        released_bed: Option<Bed>,
    },
    /// Nothing was written: the patient occupies another bed and the request
    /// did not confirm the transfer.
    ConfirmationRequired {
        /// The patient being assigned.
        patient: Patient,
        /// The bed the patient currently occupies.
        current_bed: Bed,
    },
}

impl TransitionOutcome {
    /// Whether the change was written.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Human-readable warning for an unconfirmed transfer.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Applied { .. } => None,
            Self::ConfirmationRequired {
                patient,
                current_bed,
            } => Some(format!(
                "patient {} ({}) already occupies bed {}; confirm the transfer to proceed",
                patient.name, patient.national_id, current_bed.code
            )),
        }
    }
}

impl Storage {
    /// Move a bed to a new status, assigning or transferring a patient.
    ///
    /// `default_actor` is recorded when the request does not name one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] without a `status_id`,
    /// [`Error::NotFound`] for unknown beds, statuses or patients, a client
    /// error when the rules above are violated, and an internal error if no
    /// `pending_cleaning` status exists when one is needed.
    pub fn change_bed_status(
        &mut self,
        bed_id: i64,
        request: &StatusChangeRequest,
        default_actor: &str,
    ) -> Result<TransitionOutcome> {
        let status_id = request.status_id.ok_or(Error::MissingField("status_id"))?;
        if request.patient_id.is_some() && request.patient.is_some() {
            return Err(Error::validation(
                "pass either patient_id or patient, not both",
            ));
        }
        let actor = request
            .actor
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(default_actor);
        let comment = request.comment.as_deref().unwrap_or_default().trim();

        let tx = self.conn_mut().transaction()?;
        let transition = Transition {
            conn: &tx,
            actor,
            comment,
            now: Utc::now(),
        };
        let outcome = transition.run(bed_id, status_id, request)?;

        if outcome.is_applied() {
            tx.commit()?;
        } else {
            debug!("Transfer to bed {} needs confirmation; rolling back", bed_id);
            tx.rollback()?;
        }
        Ok(outcome)
    }
}

struct Transition<'a> {
    conn: &'a Connection,
    actor: &'a str,
    comment: &'a str,
    now: DateTime<Utc>,
}

impl Transition<'_> {
    fn run(
        &self,
        bed_id: i64,
        status_id: i64,
        request: &StatusChangeRequest,
    ) -> Result<TransitionOutcome> {
        let bed = fetch_bed(self.conn, bed_id)?.ok_or(Error::not_found("bed", bed_id))?;
        let status = fetch_status(self.conn, status_id)?
            .ok_or(Error::not_found("status", status_id))?;
        let incoming = self.resolve_patient(request)?;

        if status.kind == StatusKind::Available && incoming.is_some() {
            return Err(Error::validation(format!(
                "cannot assign a patient while marking bed {} as {}",
                bed.code, status.name
            )));
        }

        let mut released_bed = None;
        if let Some(patient) = &incoming {
            if let Some(occupant) = bed.patient.as_ref().filter(|p| p.id != patient.id) {
                return Err(Error::validation(format!(
                    "bed {} is occupied by patient {}; release it first",
                    bed.code, occupant.national_id
                )));
            }

            if let Some(current) = fetch_bed_by_patient(self.conn, patient.id)? {
                if current.id != bed.id {
                    if !request.confirm_transfer {
                        return Ok(TransitionOutcome::ConfirmationRequired {
                            patient: patient.clone(),
                            current_bed: current,
                        });
                    }
                    released_bed = Some(self.release_for_transfer(&current, patient, &bed)?);
                }
            }
        }

        let patient_id = if status.kind == StatusKind::Available {
            None
        } else {
            incoming.as_ref().map(|p| p.id).or(bed.patient_id())
        };

        self.record(&bed, &status, patient_id.or(bed.patient_id()), self.comment)?;
        let status_since = if status.id == bed.status.id {
            bed.status_since
        } else {
            self.now
        };
        set_bed_state(self.conn, bed.id, status.id, patient_id, status_since, self.now)?;

        let updated = fetch_bed(self.conn, bed.id)?
            .ok_or_else(|| Error::internal(format!("bed {} vanished during update", bed.id)))?;
        info!(
            "Bed {} moved from '{}' to '{}' by {}",
            updated.code, bed.status.name, updated.status.name, self.actor
        );

        Ok(TransitionOutcome::Applied {
            bed: updated,
            released_bed,
        })
    }

    fn resolve_patient(&self, request: &StatusChangeRequest) -> Result<Option<Patient>> {
        if let Some(id) = request.patient_id {
            let patient = fetch_patient(self.conn, id)?.ok_or(Error::not_found("patient", id))?;
            return Ok(Some(patient));
        }

        let Some(identity) = &request.patient else {
            return Ok(None);
        };
        identity.validate()?;

        match fetch_patient_by_national_id(self.conn, &identity.national_id)? {
            Some(patient) if patient.active => Ok(Some(patient)),
            Some(patient) => Err(Error::validation(format!(
                "patient {} is inactive",
                patient.national_id
            ))),
            None => insert_patient(self.conn, identity).map(Some),
        }
    }

    /// Vacate the patient's previous bed ahead of a confirmed transfer.
    fn release_for_transfer(&self, from: &Bed, patient: &Patient, to: &Bed) -> Result<Bed> {
        let pending = find_status_by_kind(self.conn, StatusKind::PendingCleaning)?
            .ok_or_else(|| Error::internal("no pending_cleaning status is configured"))?;

        let comment = format!("patient {} transferred to bed {}", patient.national_id, to.code);
        self.record(from, &pending, Some(patient.id), &comment)?;

        let status_since = if pending.id == from.status.id {
            from.status_since
        } else {
            self.now
        };
        set_bed_state(self.conn, from.id, pending.id, None, status_since, self.now)?;
        info!(
            "Patient {} transferred from bed {} to bed {}",
            patient.national_id, from.code, to.code
        );

        fetch_bed(self.conn, from.id)?
            .ok_or_else(|| Error::internal(format!("bed {} vanished during transfer", from.id)))
    }

    fn record(
        &self,
        bed: &Bed,
        next: &BedStatus,
        patient_id: Option<i64>,
        comment: &str,
    ) -> Result<i64> {
        insert_status_change(
            self.conn,
            &NewStatusChange {
                bed_id: bed.id,
                previous_status_id: Some(bed.status.id),
                new_status_id: next.id,
                actor: self.actor,
                patient_id,
                comment,
                created_at: self.now,
            },
        )
    }
}
