//! Initial data: the default status catalogue and a demo hospital.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    LocationKind, NewBed, NewLocation, NewPatient, NewStatus, StatusChangeRequest, StatusKind,
};
use crate::storage::Storage;

/// Actor recorded on transitions made while seeding.
const SEED_ACTOR: &str = "seed";

/// The statuses every installation starts with: name, kind, color, description.
const DEFAULT_STATUSES: &[(&str, StatusKind, &str, &str)] = &[
    ("Available", StatusKind::Available, "#4CAF50", "Ready for a patient"),
    ("Occupied", StatusKind::Occupied, "#F44336", "A patient is in the bed"),
    (
        "Pending Cleaning",
        StatusKind::PendingCleaning,
        "#FF5722",
        "Vacated, waiting for housekeeping",
    ),
    ("Cleaning", StatusKind::Cleaning, "#FF9800", "Being cleaned"),
    (
        "Awaiting Transport",
        StatusKind::AwaitingTransport,
        "#FFC107",
        "Patient waiting to be moved",
    ),
    ("Maintenance", StatusKind::Maintenance, "#9E9E9E", "Under repair"),
    ("Blocked", StatusKind::Blocked, "#607D8B", "Out of service"),
];

/// Towers, their floors and the sectors on each floor.
const DEMO_LAYOUT: &[(&str, &[(&str, &[&str])])] = &[
    (
        "Tower A",
        &[
            ("Floor 1", &["ICU", "Emergency"]),
            ("Floor 2", &["General Medicine", "Cardiology"]),
            ("Floor 3", &["Surgery", "Traumatology"]),
        ],
    ),
    (
        "Tower B",
        &[
            ("Floor 1", &["Pediatrics", "Neonatology"]),
            ("Floor 2", &["Maternity", "Gynecology"]),
        ],
    ),
];

/// Status mix the demo beds cycle through.
const DEMO_ROTATION: &[StatusKind] = &[
    StatusKind::Available,
    StatusKind::Occupied,
    StatusKind::Available,
    StatusKind::Cleaning,
    StatusKind::Occupied,
    StatusKind::PendingCleaning,
    StatusKind::Available,
    StatusKind::Maintenance,
    StatusKind::Occupied,
    StatusKind::AwaitingTransport,
    StatusKind::Blocked,
];

const DEMO_FIRST_NAMES: &[&str] = &["Ana", "Bruno", "Carla", "Diego", "Elena", "Felipe", "Gloria"];
const DEMO_LAST_NAMES: &[&str] = &["Rojas", "Diaz", "Soto", "Munoz", "Silva", "Torres"];

/// What a demo seed created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Locations inserted.
    pub locations: usize,
    /// Beds inserted.
    pub beds: usize,
    /// Patients registered.
    pub patients: usize,
}

/// Insert the default statuses that are not present yet, matched by name.
///
/// Returns how many were inserted.
///
/// # Errors
///
/// Returns an error if a database operation fails.
pub fn seed_statuses(storage: &Storage) -> Result<usize> {
    let mut inserted = 0;
    for (order, (name, kind, color, description)) in (0_i64..).zip(DEFAULT_STATUSES) {
        if storage.status_by_name(name)?.is_some() {
            continue;
        }
        storage.create_status(&NewStatus {
            name: (*name).to_string(),
            kind: Some(*kind),
            color: (*color).to_string(),
            description: Some((*description).to_string()),
            sort_order: Some(order),
        })?;
        inserted += 1;
    }

    if inserted > 0 {
        info!("Seeded {} bed statuses", inserted);
    }
    Ok(inserted)
}

/// Build the demo hospital.
///
/// Towers that already exist (by name) are skipped, so running this twice
/// adds nothing. Occupied demo beds get generated patients through the
/// regular transition workflow.
///
/// # Errors
///
/// Returns an error if a database operation fails.
pub fn seed_demo(storage: &mut Storage) -> Result<SeedSummary> {
    seed_statuses(storage)?;

    let existing: Vec<String> = storage
        .locations(Some(LocationKind::Tower), None)?
        .into_iter()
        .map(|l| l.name)
        .collect();

    let mut summary = SeedSummary::default();
    let mut bed_counter = 0_usize;
    let mut sector_counter = 0_usize;

    for (tower_order, (tower_name, floors)) in (0_i64..).zip(DEMO_LAYOUT) {
        if existing.iter().any(|name| name == tower_name) {
            debug!("Demo tower '{}' already exists, skipping", tower_name);
            continue;
        }

        let tower = storage.create_location(&NewLocation {
            name: (*tower_name).to_string(),
            kind: Some(LocationKind::Tower),
            beds_per_row: Some(4),
            sort_order: Some(tower_order),
            ..NewLocation::default()
        })?;
        summary.locations += 1;

        for (floor_order, (floor_name, sectors)) in (0_i64..).zip(*floors) {
            let floor = storage.create_location(&NewLocation {
                name: (*floor_name).to_string(),
                kind: Some(LocationKind::Floor),
                parent_id: Some(tower.id),
                sort_order: Some(floor_order),
                ..NewLocation::default()
            })?;
            summary.locations += 1;

            for (sector_order, sector_name) in (0_i64..).zip(*sectors) {
                let sector = storage.create_location(&NewLocation {
                    name: (*sector_name).to_string(),
                    kind: Some(LocationKind::Sector),
                    parent_id: Some(floor.id),
                    sort_order: Some(sector_order),
                    ..NewLocation::default()
                })?;
                summary.locations += 1;

                let prefix = bed_prefix(sector_name);
                let bed_count = 4 + sector_counter % 6;
                sector_counter += 1;

                for (number, order) in (1..=bed_count).zip(0_i64..) {
                    let kind = DEMO_ROTATION[bed_counter % DEMO_ROTATION.len()];
                    bed_counter += 1;
                    let code = format!("{prefix}-{number:02}");
                    summary.patients += demo_bed(storage, sector.id, &code, order, kind)?;
                    summary.beds += 1;
                }
            }
        }
    }

    info!(
        "Demo seed created {} locations, {} beds and {} patients",
        summary.locations, summary.beds, summary.patients
    );
    Ok(summary)
}

/// Create one demo bed in the given status, returning the number of
/// patients registered for it.
fn demo_bed(
    storage: &mut Storage,
    location_id: i64,
    code: &str,
    sort_order: i64,
    kind: StatusKind,
) -> Result<usize> {
    let status = storage
        .status_by_kind(kind)?
        .ok_or_else(|| Error::internal(format!("no {kind} status to seed with")))?;
    let needs_patient = matches!(kind, StatusKind::Occupied | StatusKind::AwaitingTransport);

    let bed = storage.create_bed(&NewBed {
        code: code.to_string(),
        location_id: Some(location_id),
        status_id: (!needs_patient).then_some(status.id),
        sort_order: Some(sort_order),
        ..NewBed::default()
    })?;
    if !needs_patient {
        return Ok(0);
    }

    storage.change_bed_status(
        bed.id,
        &StatusChangeRequest {
            status_id: Some(status.id),
            patient: Some(demo_patient(bed.id)),
            comment: Some("demo admission".to_string()),
            ..StatusChangeRequest::default()
        },
        SEED_ACTOR,
    )?;
    Ok(1)
}

/// Deterministic patient identity derived from a bed id.
fn demo_patient(bed_id: i64) -> NewPatient {
    let n = usize::try_from(bed_id).unwrap_or_default();
    NewPatient {
        name: format!(
            "{} {}",
            DEMO_FIRST_NAMES[n % DEMO_FIRST_NAMES.len()],
            DEMO_LAST_NAMES[n % DEMO_LAST_NAMES.len()]
        ),
        national_id: format!("DEMO-{bed_id:05}"),
    }
}

/// Uppercased first three letters of a sector name, e.g. "CAR".
fn bed_prefix(sector_name: &str) -> String {
    sector_name
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase()
}
