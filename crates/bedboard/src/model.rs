//! Core domain types for bedboard.
//!
//! This module defines the records tracked by the service (locations, bed
//! statuses, beds, patients and the status-change audit trail) together with
//! the request payloads used to create and modify them.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern is valid"));

/// The level a location occupies in the hospital hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// A building.
    Tower,
    /// A floor inside a tower.
    Floor,
    /// A ward or unit on a floor; the only level that holds beds.
    Sector,
}

impl LocationKind {
    /// The kind a parent location must have, or `None` for a root.
    #[must_use]
    pub fn parent_kind(self) -> Option<Self> {
        match self {
            Self::Tower => None,
            Self::Floor => Some(Self::Tower),
            Self::Sector => Some(Self::Floor),
        }
    }

    /// Whether beds may be placed directly in a location of this kind.
    #[must_use]
    pub fn holds_beds(self) -> bool {
        matches!(self, Self::Sector)
    }
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tower => write!(f, "tower"),
            Self::Floor => write!(f, "floor"),
            Self::Sector => write!(f, "sector"),
        }
    }
}

impl std::str::FromStr for LocationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tower" => Ok(Self::Tower),
            "floor" => Ok(Self::Floor),
            "sector" => Ok(Self::Sector),
            other => Err(Error::validation(format!("unknown location kind: {other}"))),
        }
    }
}

/// A node of the location hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Unique identifier (assigned by storage).
    pub id: i64,
    /// Display name, e.g. "Tower A" or "ICU".
    pub name: String,
    /// Hierarchy level.
    pub kind: LocationKind,
    /// Enclosing location; `None` for towers.
    pub parent_id: Option<i64>,
    /// Layout hint for the bed grid.
    pub beds_per_row: u32,
    /// Position among siblings.
    pub sort_order: i64,
    /// Inactive locations are hidden and cannot receive beds.
    pub active: bool,
    /// When the location was created.
    pub created_at: DateTime<Utc>,
}

/// A location with its active descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationNode {
    /// The location itself.
    #[serde(flatten)]
    pub location: Location,
    /// Active child locations, ordered by `sort_order`.
    pub children: Vec<LocationNode>,
}

/// What a status means to the transition workflow.
///
/// Status names and colors are display data and may be edited freely; the
/// kind is what the workflow keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Ready to receive a patient. Entering it releases the occupant.
    Available,
    /// A patient is in the bed.
    Occupied,
    /// Vacated and waiting for housekeeping.
    PendingCleaning,
    /// Being cleaned.
    Cleaning,
    /// Occupant is waiting to be moved.
    AwaitingTransport,
    /// Out of service for repairs.
    Maintenance,
    /// Not available for any other reason.
    Blocked,
    /// Custom status with no workflow meaning.
    Other,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::PendingCleaning => "pending_cleaning",
            Self::Cleaning => "cleaning",
            Self::AwaitingTransport => "awaiting_transport",
            Self::Maintenance => "maintenance",
            Self::Blocked => "blocked",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for StatusKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "available" => Ok(Self::Available),
            "occupied" => Ok(Self::Occupied),
            "pending_cleaning" => Ok(Self::PendingCleaning),
            "cleaning" => Ok(Self::Cleaning),
            "awaiting_transport" => Ok(Self::AwaitingTransport),
            "maintenance" => Ok(Self::Maintenance),
            "blocked" => Ok(Self::Blocked),
            "other" => Ok(Self::Other),
            other => Err(Error::validation(format!("unknown status kind: {other}"))),
        }
    }
}

/// A bed condition from the status catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedStatus {
    /// Unique identifier (assigned by storage).
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Workflow meaning.
    pub kind: StatusKind,
    /// Hex color, `#RRGGBB`.
    pub color: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Position in legends and statistics.
    pub sort_order: i64,
    /// Inactive statuses cannot be assigned and are left out of statistics.
    pub active: bool,
}

/// A person who may occupy a bed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Unique identifier (assigned by storage).
    pub id: i64,
    /// Full name.
    pub name: String,
    /// National identity number; unique across patients.
    pub national_id: String,
    /// Inactive patients cannot be assigned.
    pub active: bool,
    /// When the patient was registered.
    pub created_at: DateTime<Utc>,
}

/// A trackable bed with its current status and occupant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    /// Unique identifier (assigned by storage).
    pub id: i64,
    /// Short code, e.g. "ICU-03".
    pub code: String,
    /// Optional display name.
    pub name: Option<String>,
    /// The sector the bed belongs to.
    pub location_id: i64,
    /// Current status.
    pub status: BedStatus,
    /// Current occupant, if any.
    pub patient: Option<Patient>,
    /// Position in the sector grid.
    pub sort_order: i64,
    /// Inactive beds are hidden and excluded from statistics.
    pub active: bool,
    /// When the current status was entered.
    pub status_since: DateTime<Utc>,
    /// Last modification of any field.
    pub updated_at: DateTime<Utc>,
}

impl Bed {
    /// Whether a patient is assigned to this bed.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.patient.is_some()
    }

    /// Identifier of the current occupant.
    #[must_use]
    pub fn patient_id(&self) -> Option<i64> {
        self.patient.as_ref().map(|p| p.id)
    }
}

/// An immutable audit entry describing one status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Unique identifier (assigned by storage).
    pub id: i64,
    /// The bed that changed.
    pub bed_id: i64,
    /// Status before the transition.
    pub previous_status_id: Option<i64>,
    /// Status after the transition.
    pub new_status_id: i64,
    /// Role or name of whoever made the change.
    pub actor: String,
    /// Patient involved in the transition, if any.
    pub patient_id: Option<i64>,
    /// Free-text note.
    pub comment: String,
    /// When the transition was recorded.
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewLocation {
    /// Display name (required).
    pub name: String,
    /// Hierarchy level (required).
    pub kind: Option<LocationKind>,
    /// Enclosing location; required for floors and sectors.
    pub parent_id: Option<i64>,
    /// Defaults to 3.
    pub beds_per_row: Option<u32>,
    /// Defaults to 0.
    pub sort_order: Option<i64>,
}

impl NewLocation {
    /// Check that required fields are present and the kind is known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for absent fields.
    pub fn validate(&self) -> Result<LocationKind> {
        require("name", &self.name)?;
        let kind = self.kind.ok_or(Error::MissingField("kind"))?;
        if self.beds_per_row == Some(0) {
            return Err(Error::validation("beds_per_row must be greater than 0"));
        }
        Ok(kind)
    }
}

/// Partial update of a location. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New layout hint.
    pub beds_per_row: Option<u32>,
    /// New sibling position.
    pub sort_order: Option<i64>,
}

/// Payload for adding a status to the catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewStatus {
    /// Display name (required, unique).
    pub name: String,
    /// Workflow meaning; defaults to [`StatusKind::Other`].
    pub kind: Option<StatusKind>,
    /// Hex color `#RRGGBB` (required).
    pub color: String,
    /// Optional description.
    pub description: Option<String>,
    /// Defaults to 0.
    pub sort_order: Option<i64>,
}

impl NewStatus {
    /// Check required fields and the color format.
    ///
    /// # Errors
    ///
    /// Returns a client error when a field is absent or malformed.
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("color", &self.color)?;
        if !HEX_COLOR.is_match(&self.color) {
            return Err(Error::validation(format!(
                "color must be a #RRGGBB hex value, got {}",
                self.color
            )));
        }
        Ok(())
    }
}

/// Payload for creating a bed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewBed {
    /// Short code (required).
    pub code: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Sector to place the bed in (required).
    pub location_id: Option<i64>,
    /// Initial status; defaults to the first `available` status.
    pub status_id: Option<i64>,
    /// Defaults to 0.
    pub sort_order: Option<i64>,
}

impl NewBed {
    /// Check that required fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for absent fields.
    pub fn validate(&self) -> Result<i64> {
        require("code", &self.code)?;
        self.location_id.ok_or(Error::MissingField("location_id"))
    }
}

/// Partial update of a bed. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BedUpdate {
    /// New code.
    pub code: Option<String>,
    /// New display name.
    pub name: Option<String>,
    /// New grid position.
    pub sort_order: Option<i64>,
}

/// Payload for registering a patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPatient {
    /// Full name (required).
    pub name: String,
    /// National identity number (required).
    pub national_id: String,
}

impl NewPatient {
    /// Check that both identity fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for absent fields.
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("national_id", &self.national_id)
    }
}

/// Partial update of a patient. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientUpdate {
    /// New full name.
    pub name: Option<String>,
    /// New national identity number.
    pub national_id: Option<String>,
}

/// A request to move a bed to another status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusChangeRequest {
    /// Target status (required).
    pub status_id: Option<i64>,
    /// Existing patient to place in the bed.
    pub patient_id: Option<i64>,
    /// Patient identified by name and national id; registered on first use.
    pub patient: Option<NewPatient>,
    /// Free-text note stored with the audit record.
    pub comment: Option<String>,
    /// Who is making the change; falls back to the configured default.
    pub actor: Option<String>,
    /// Accept moving a patient out of the bed they currently occupy.
    pub confirm_transfer: bool,
}

/// Reject blank required string fields.
pub(crate) fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::MissingField(field))
    } else {
        Ok(())
    }
}
