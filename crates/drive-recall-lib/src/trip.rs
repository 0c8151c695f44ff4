//! Trip entities and their recorded driving-safety events
//!
//! A [`Trip`] owns its projected path, its buffered corridor, and its events, all
//! derived together from one ingestion record. Nothing here is mutated after
//! construction, so trips can be shared freely across concurrent queries.

use crate::ingest::{DriveEventRecord, TripRecord};
use crate::{
    ALERT_DISTANCE_M, BufferedCorridor, GeoPoint, ProjectedLine, ProjectedPoint, Result, UserId,
    projection,
};
use std::fmt;

pub type TripId = u64;

/// Per-trip metrics carried through from the data source
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct TripMetrics {
    #[serde(default)]
    pub average_mpg: Option<f64>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub duration_over_70_s: Option<i64>,
    #[serde(default)]
    pub duration_over_75_s: Option<i64>,
    #[serde(default)]
    pub duration_over_80_s: Option<i64>,
    #[serde(default)]
    pub fuel_cost_usd: Option<f64>,
    #[serde(default)]
    pub fuel_volume_gal: Option<f64>,
    #[serde(default)]
    pub hard_accels: Option<i64>,
    #[serde(default)]
    pub hard_brakes: Option<i64>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub start_time_zone: Option<String>,
    #[serde(default)]
    pub end_time_zone: Option<String>,
}

/// A recorded driving-safety event with its resolved projected location
#[derive(Clone, Debug)]
pub struct DriveEvent {
    pub(crate) location: ProjectedPoint,
    pub(crate) kind: EventKind,
}

/// Variant-specific event payloads
#[derive(Clone, Debug)]
pub enum EventKind {
    /// Sustained speeding over a stretch of the trip path
    Speeding {
        start_distance_m: f64,
        end_distance_m: f64,
        start_time: i64,
        end_time: i64,
        velocity_mph: f64,
        /// The stretch of the trip path between the two recorded distances
        segment: ProjectedLine,
    },
    /// Instantaneous hard braking
    HardBrake { ts: i64, g_force: f64 },
    /// Instantaneous hard acceleration
    HardAcceleration { ts: i64, g_force: f64 },
}

impl DriveEvent {
    /// Resolve a raw event record against its trip path.
    ///
    /// Speeding events re-derive their geometry from the recorded distances along
    /// the path; brake/acceleration events project their recorded coordinate.
    pub(crate) fn from_record(record: &DriveEventRecord, path: &ProjectedLine) -> Result<Self> {
        match *record {
            DriveEventRecord::Speeding {
                start_distance_m,
                end_distance_m,
                start_time,
                end_time,
                velocity_mph,
            } => {
                let segment = path.substring(start_distance_m, end_distance_m);
                Ok(Self {
                    location: segment.start_point(),
                    kind: EventKind::Speeding {
                        start_distance_m,
                        end_distance_m,
                        start_time,
                        end_time,
                        velocity_mph,
                        segment,
                    },
                })
            }
            DriveEventRecord::HardBrake { lat, lon, ts, g } => Ok(Self {
                location: projection::to_projected(GeoPoint::new(lat, lon))?,
                kind: EventKind::HardBrake { ts, g_force: g },
            }),
            DriveEventRecord::HardAccel { lat, lon, ts, g } => Ok(Self {
                location: projection::to_projected(GeoPoint::new(lat, lon))?,
                kind: EventKind::HardAcceleration { ts, g_force: g },
            }),
        }
    }

    /// The event's projected location, used for proximity testing
    #[inline]
    pub fn location(&self) -> &ProjectedPoint {
        &self.location
    }

    #[inline]
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }
}

impl fmt::Display for DriveEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let behavior = match self.kind {
            EventKind::Speeding { .. } => "speed",
            EventKind::HardBrake { .. } => "brake hard",
            EventKind::HardAcceleration { .. } => "accelerate hard",
        };
        write!(
            f,
            "Warning! Based on your driving patterns, you are likely to {} within {} meters.",
            behavior, ALERT_DISTANCE_M
        )
    }
}

/// An immutable trip: projected path, buffered corridor, and recorded events
#[derive(Clone, Debug)]
pub struct Trip {
    id: TripId,
    source_id: String,
    user_id: UserId,
    path: ProjectedLine,
    corridor: BufferedCorridor,
    /// Kept in deterministic scan order: speeding, hard accelerations, hard brakes
    events: Vec<DriveEvent>,
    metrics: TripMetrics,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Trip {
    /// Build a trip and all of its events atomically from one ingestion record.
    ///
    /// Fails for paths with fewer than 2 points, out-of-zone coordinates, or
    /// undecodable path data; a partially built trip is never observable.
    pub(crate) fn from_record(
        id: TripId,
        user_id: UserId,
        record: &TripRecord,
        corridor_radius_m: f64,
    ) -> Result<Self> {
        let geo_path = record.decode_path()?;
        let path = ProjectedLine::from_geo_path(&geo_path)?;
        let corridor = BufferedCorridor::from_line(&path, corridor_radius_m);

        let mut events = Vec::with_capacity(record.drive_events.len());
        for event in record
            .drive_events
            .iter()
            .filter(|e| matches!(e, DriveEventRecord::Speeding { .. }))
        {
            events.push(DriveEvent::from_record(event, &path)?);
        }
        for event in record
            .drive_events
            .iter()
            .filter(|e| matches!(e, DriveEventRecord::HardAccel { .. }))
        {
            events.push(DriveEvent::from_record(event, &path)?);
        }
        for event in record
            .drive_events
            .iter()
            .filter(|e| matches!(e, DriveEventRecord::HardBrake { .. }))
        {
            events.push(DriveEvent::from_record(event, &path)?);
        }

        Ok(Self {
            id,
            source_id: record.id.clone(),
            user_id,
            path,
            corridor,
            events,
            metrics: record.metrics.clone(),
        })
    }

    #[inline]
    pub fn id(&self) -> TripId {
        self.id
    }

    /// Identifier of the trip in the source data
    #[inline]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    #[inline]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[inline]
    pub fn path(&self) -> &ProjectedLine {
        &self.path
    }

    #[inline]
    pub fn corridor(&self) -> &BufferedCorridor {
        &self.corridor
    }

    /// All recorded events in deterministic scan order
    /// (speeding, then hard accelerations, then hard brakes)
    #[inline]
    pub fn events(&self) -> &[DriveEvent] {
        &self.events
    }

    #[inline]
    pub fn metrics(&self) -> &TripMetrics {
        &self.metrics
    }
}
