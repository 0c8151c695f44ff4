//! JSON ingestion records for trips and their typed drive events
//!
//! The data source delivers trips as JSON arrays whose `path` field is a
//! Google-encoded polyline; drive events are tagged by a `type` discriminator.
//! Records are plain data — turning them into [`crate::Trip`] entities happens in
//! the store.

use crate::trip::TripMetrics;
use crate::{EngineError, GeoPoint, Result};
use rayon::prelude::*;
use serde::Deserialize;
use std::path::Path;

/// Precision of encoded polyline paths (1e-5 degrees per unit)
const POLYLINE_PRECISION: u32 = 5;

/// One trip as delivered by the data source
#[derive(Clone, Debug, Deserialize)]
pub struct TripRecord {
    /// Source identifier of the trip
    pub id: String,
    /// Google-encoded polyline of the driven path
    pub path: String,
    /// Owning username as supplied by the source; ownership is decided by the
    /// caller at ingestion time, so this is informational only
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub drive_events: Vec<DriveEventRecord>,
    #[serde(flatten)]
    pub metrics: TripMetrics,
}

impl TripRecord {
    /// Decode the encoded path into geographic points
    pub fn decode_path(&self) -> Result<Vec<GeoPoint>> {
        let line = polyline::decode_polyline(&self.path, POLYLINE_PRECISION)
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        Ok(line.points().map(|p| GeoPoint::new(p.y(), p.x())).collect())
    }
}

/// A raw drive event, tagged the way the data source tags them
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum DriveEventRecord {
    #[serde(rename = "speeding")]
    Speeding {
        start_distance_m: f64,
        end_distance_m: f64,
        #[serde(default)]
        start_time: i64,
        #[serde(default)]
        end_time: i64,
        velocity_mph: f64,
    },
    #[serde(rename = "hard_brake")]
    HardBrake {
        lat: f64,
        lon: f64,
        #[serde(default)]
        ts: i64,
        g: f64,
    },
    #[serde(rename = "hard_accel")]
    HardAccel {
        lat: f64,
        lon: f64,
        #[serde(default)]
        ts: i64,
        g: f64,
    },
}

/// Encode a geographic path the way the data source encodes trip paths
pub fn encode_path(points: &[GeoPoint]) -> Result<String> {
    polyline::encode_coordinates(
        points.iter().map(|p| geo::Coord {
            x: p.lon(),
            y: p.lat(),
        }),
        POLYLINE_PRECISION,
    )
    .map_err(|e| EngineError::Decode(e.to_string()))
}

/// Parse trip records from a JSON array
pub fn records_from_str(json: &str) -> Result<Vec<TripRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Load and parse trip-record files in parallel
pub fn records_from_files<P: AsRef<Path> + Send + Sync>(paths: &[P]) -> Result<Vec<TripRecord>> {
    let nested = paths
        .par_iter()
        .map(|path| {
            let data = std::fs::read_to_string(path.as_ref())?;
            records_from_str(&data)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(nested.into_iter().flatten().collect())
}
