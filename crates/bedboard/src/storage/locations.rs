//! Location hierarchy queries.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{format_timestamp, parse_timestamp, Storage};
use crate::error::{Error, Result};
use crate::model::{Location, LocationKind, LocationNode, LocationUpdate, NewLocation};

const LOCATION_COLUMNS: &str =
    "id, name, kind, parent_id, beds_per_row, sort_order, active, created_at";

fn row_to_location(row: &rusqlite::Row) -> rusqlite::Result<Location> {
    let created_at: String = row.get(7)?;
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        parent_id: row.get(3)?,
        beds_per_row: row.get(4)?,
        sort_order: row.get(5)?,
        active: row.get(6)?,
        created_at: parse_timestamp(&created_at),
    })
}

/// Look up an active location by id.
pub(crate) fn fetch_location(conn: &Connection, id: i64) -> Result<Option<Location>> {
    let location = conn
        .query_row(
            &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?1 AND active = 1"),
            [id],
            row_to_location,
        )
        .optional()?;
    Ok(location)
}

impl Storage {
    /// Create a location.
    ///
    /// Towers are roots; floors must sit in an active tower and sectors in an
    /// active floor.
    ///
    /// # Errors
    ///
    /// Returns a client error for missing fields or an invalid parent, and
    /// [`Error::NotFound`] if the parent does not exist.
    pub fn create_location(&self, new: &NewLocation) -> Result<Location> {
        let kind = new.validate()?;

        match (kind.parent_kind(), new.parent_id) {
            (None, Some(_)) => {
                return Err(Error::validation(format!("a {kind} cannot have a parent")));
            }
            (Some(expected), None) => {
                return Err(Error::validation(format!(
                    "a {kind} must be placed in a {expected}"
                )));
            }
            (Some(expected), Some(parent_id)) => {
                let parent = self.location(parent_id)?;
                if parent.kind != expected {
                    return Err(Error::validation(format!(
                        "a {kind} must be placed in a {expected}, not a {}",
                        parent.kind
                    )));
                }
            }
            (None, None) => {}
        }

        self.conn().execute(
            "INSERT INTO locations (name, kind, parent_id, beds_per_row, sort_order, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.name.trim(),
                kind,
                new.parent_id,
                new.beds_per_row.unwrap_or(3),
                new.sort_order.unwrap_or(0),
                format_timestamp(Utc::now()),
            ],
        )?;

        let id = self.conn().last_insert_rowid();
        debug!("Inserted {} '{}' with id {}", kind, new.name.trim(), id);
        self.location(id)
    }

    /// Get an active location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the location is unknown or inactive.
    pub fn location(&self, id: i64) -> Result<Location> {
        fetch_location(self.conn(), id)?.ok_or(Error::not_found("location", id))
    }

    /// List active locations, optionally filtered by kind and parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn locations(
        &self,
        kind: Option<LocationKind>,
        parent_id: Option<i64>,
    ) -> Result<Vec<Location>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations
             WHERE active = 1
               AND (?1 IS NULL OR kind = ?1)
               AND (?2 IS NULL OR parent_id = ?2)
             ORDER BY sort_order, id"
        ))?;

        let locations = stmt
            .query_map(params![kind, parent_id], row_to_location)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(locations)
    }

    /// The active hierarchy as a forest rooted at the towers.
    ///
    /// Children of inactive locations are not reachable and are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn location_tree(&self) -> Result<Vec<LocationNode>> {
        fn build(
            parent: Option<i64>,
            by_parent: &mut HashMap<Option<i64>, Vec<Location>>,
        ) -> Vec<LocationNode> {
            by_parent
                .remove(&parent)
                .unwrap_or_default()
                .into_iter()
                .map(|location| {
                    let children = build(Some(location.id), by_parent);
                    LocationNode { location, children }
                })
                .collect()
        }

        let all = self.locations(None, None)?;

        let mut by_parent: HashMap<Option<i64>, Vec<Location>> = HashMap::new();
        for location in all {
            by_parent.entry(location.parent_id).or_default().push(location);
        }

        Ok(build(None, &mut by_parent))
    }

    /// Apply a partial update to a location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown location and a client error
    /// for blank names or a zero row width.
    pub fn update_location(&self, id: i64, update: &LocationUpdate) -> Result<Location> {
        let current = self.location(id)?;

        let name = match &update.name {
            Some(name) if name.trim().is_empty() => return Err(Error::MissingField("name")),
            Some(name) => name.trim().to_string(),
            None => current.name,
        };
        let beds_per_row = match update.beds_per_row {
            Some(0) => return Err(Error::validation("beds_per_row must be greater than 0")),
            Some(n) => n,
            None => current.beds_per_row,
        };
        let sort_order = update.sort_order.unwrap_or(current.sort_order);

        self.conn().execute(
            "UPDATE locations SET name = ?1, beds_per_row = ?2, sort_order = ?3 WHERE id = ?4",
            params![name, beds_per_row, sort_order, id],
        )?;
        self.location(id)
    }

    /// Deactivate a location.
    ///
    /// A location still holding active children or beds cannot be removed;
    /// every active bed must keep an active location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown location and a client error
    /// if it is not empty.
    pub fn deactivate_location(&self, id: i64) -> Result<()> {
        let location = self.location(id)?;

        let children: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM locations WHERE parent_id = ?1 AND active = 1",
            [id],
            |row| row.get(0),
        )?;
        let beds: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM beds WHERE location_id = ?1 AND active = 1",
            [id],
            |row| row.get(0),
        )?;

        if children > 0 || beds > 0 {
            return Err(Error::validation(format!(
                "{} '{}' still has {children} active locations and {beds} active beds",
                location.kind, location.name
            )));
        }

        self.conn()
            .execute("UPDATE locations SET active = 0 WHERE id = ?1", [id])?;
        info!("Deactivated {} '{}' ({})", location.kind, location.name, id);
        Ok(())
    }
}
