//! Occupancy statistics and dashboard aggregates.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;
use crate::model::{Location, LocationKind, StatusKind};
use crate::storage::Storage;

/// Bed counts per active status over the active beds of `root` and all of
/// its active descendants, or over every active bed when `root` is `None`.
const STATUS_COUNTS: &str = r"
WITH RECURSIVE subtree(id) AS (
    SELECT ?1
    UNION ALL
    SELECT l.id FROM locations l JOIN subtree t ON l.parent_id = t.id WHERE l.active = 1
)
SELECT s.id, s.name, s.kind, s.color, COUNT(b.id)
FROM bed_statuses s
LEFT JOIN beds b
       ON b.status_id = s.id
      AND b.active = 1
      AND (?1 IS NULL OR b.location_id IN (SELECT id FROM subtree))
WHERE s.active = 1
GROUP BY s.id
ORDER BY s.sort_order, s.id
";

/// Number of beds in one status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    /// The status.
    pub status_id: i64,
    /// Status display name.
    pub name: String,
    /// Status workflow meaning.
    pub kind: StatusKind,
    /// Status color.
    pub color: String,
    /// Beds currently in this status.
    pub count: i64,
    /// Share of `total`, in percent with one decimal.
    pub percentage: f64,
}

/// Bed counts broken down by status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    /// Active beds counted.
    pub total: i64,
    /// One entry per active status, in display order.
    pub by_status: Vec<StatusCount>,
}

impl Statistics {
    /// Beds whose status is of the given kind.
    #[must_use]
    pub fn count_of(&self, kind: StatusKind) -> i64 {
        self.by_status
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.count)
            .sum()
    }
}

/// Occupancy of one tower.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerSummary {
    /// The tower.
    pub tower: Location,
    /// Active beds anywhere in the tower.
    pub total: i64,
    /// Beds in an `occupied` status.
    pub occupied: i64,
    /// `occupied / total` in percent with one decimal.
    pub occupancy_rate: f64,
    /// Per-status breakdown.
    pub by_status: Vec<StatusCount>,
}

/// Aggregates for the dashboard view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// One summary per active tower.
    pub towers: Vec<TowerSummary>,
    /// Hospital-wide statistics.
    pub overall: Statistics,
}

/// Percentage of `part` in `total`, rounded to one decimal.
#[allow(clippy::cast_precision_loss)]
fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}

fn status_counts(conn: &Connection, root: Option<i64>) -> Result<Statistics> {
    let mut stmt = conn.prepare(STATUS_COUNTS)?;
    let rows = stmt
        .query_map(params![root], |row| {
            Ok(StatusCount {
                status_id: row.get(0)?,
                name: row.get(1)?,
                kind: row.get(2)?,
                color: row.get(3)?,
                count: row.get(4)?,
                percentage: 0.0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total = rows.iter().map(|s| s.count).sum();
    let by_status = rows
        .into_iter()
        .map(|s| StatusCount {
            percentage: percentage(s.count, total),
            ..s
        })
        .collect();
    Ok(Statistics { total, by_status })
}

impl Storage {
    /// Hospital-wide bed counts per status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn statistics(&self) -> Result<Statistics> {
        status_counts(self.conn(), None)
    }

    /// Per-tower occupancy plus the hospital-wide statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn dashboard(&self) -> Result<Dashboard> {
        let towers = self
            .locations(Some(LocationKind::Tower), None)?
            .into_iter()
            .map(|tower| {
                let stats = status_counts(self.conn(), Some(tower.id))?;
                let occupied = stats.count_of(StatusKind::Occupied);
                Ok(TowerSummary {
                    tower,
                    total: stats.total,
                    occupied,
                    occupancy_rate: percentage(occupied, stats.total),
                    by_status: stats.by_status,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Dashboard {
            towers,
            overall: self.statistics()?,
        })
    }
}
