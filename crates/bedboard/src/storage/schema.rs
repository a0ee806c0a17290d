//! `SQLite` schema definitions for bedboard.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the locations table.
pub const CREATE_LOCATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('tower', 'floor', 'sector')),
    parent_id INTEGER REFERENCES locations(id),
    beds_per_row INTEGER NOT NULL DEFAULT 3,
    sort_order INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `parent_id` for hierarchy walks.
pub const CREATE_LOCATION_PARENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_locations_parent ON locations(parent_id)
";

/// SQL statement to create the bed status catalogue.
pub const CREATE_STATUSES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS bed_statuses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    color TEXT NOT NULL,
    description TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1
)
";

/// SQL statement to create the patients table.
pub const CREATE_PATIENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    national_id TEXT NOT NULL UNIQUE,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the beds table.
pub const CREATE_BEDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS beds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    name TEXT,
    location_id INTEGER NOT NULL REFERENCES locations(id),
    status_id INTEGER NOT NULL REFERENCES bed_statuses(id),
    patient_id INTEGER REFERENCES patients(id),
    sort_order INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    status_since TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `location_id` for per-sector listings.
pub const CREATE_BED_LOCATION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_beds_location ON beds(location_id)
";

/// A patient occupies at most one active bed.
pub const CREATE_BED_PATIENT_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_beds_patient
ON beds(patient_id) WHERE patient_id IS NOT NULL AND active = 1
";

/// SQL statement to create the append-only status change log.
pub const CREATE_STATUS_CHANGES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS status_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bed_id INTEGER NOT NULL REFERENCES beds(id),
    previous_status_id INTEGER REFERENCES bed_statuses(id),
    new_status_id INTEGER NOT NULL REFERENCES bed_statuses(id),
    actor TEXT NOT NULL,
    patient_id INTEGER REFERENCES patients(id),
    comment TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `bed_id` for history lookups.
pub const CREATE_STATUS_CHANGE_BED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_status_changes_bed ON status_changes(bed_id, id DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_LOCATIONS_TABLE,
    CREATE_LOCATION_PARENT_INDEX,
    CREATE_STATUSES_TABLE,
    CREATE_PATIENTS_TABLE,
    CREATE_BEDS_TABLE,
    CREATE_BED_LOCATION_INDEX,
    CREATE_BED_PATIENT_INDEX,
    CREATE_STATUS_CHANGES_TABLE,
    CREATE_STATUS_CHANGE_BED_INDEX,
    CREATE_METADATA_TABLE,
];
