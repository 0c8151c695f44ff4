//! Drive Recall Library - Spatial Proximity & Path-Matching Engine
//!
//! This library matches a driver's recent location history against the corridors of
//! their historical trips and reports which recorded driving-safety events (speeding,
//! hard braking, hard acceleration) lie within an alert radius of the current position.
//!
//! # Architecture
//!
//! - **[`projection`]**: Fixed planar projection (UTM zone 10 north, GRS80) between
//!   geographic and projected coordinates
//! - **[`ProjectedLine`] / [`BufferedCorridor`]**: Arc-length-parameterized polylines
//!   and GPS-tolerant buffered trip corridors
//! - **[`Trip`] / [`DriveEvent`]**: Immutable trip entities built atomically from
//!   ingestion records
//! - **[`CorridorStore`] / [`MemoryStore`]**: The containment query contract and a
//!   concurrent in-memory implementation
//! - **[`AlertEngine`]**: Corridor containment matching plus proximity filtering of
//!   recorded events
//! - **[`probe`]**: Synthetic probe points at controlled distances along a line,
//!   used to validate proximity correctness

mod engine;
mod geometry;
mod ingest;
pub mod probe;
mod projection;
mod store;
mod trip;

// Public API exports
pub use engine::{AlertEngine, Config};
pub use geometry::{BufferedCorridor, ProjectedLine};
pub use ingest::{DriveEventRecord, TripRecord, encode_path, records_from_files, records_from_str};
pub use projection::{GeoPoint, ProjectedPoint, to_geographic, to_projected};
pub use store::{CorridorStore, MemoryStore, UserId};
pub use trip::{DriveEvent, EventKind, Trip, TripId, TripMetrics};

/// Buffer radius applied to trip paths, absorbing GPS inaccuracy (meters).
pub const MAX_GPS_ERROR_M: f64 = 20.0;

/// Radius within which a past safety event is considered relevant to the
/// current position (meters).
pub const ALERT_DISTANCE_M: f64 = 200.0;

/// Error types for the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("coordinate ({lat}, {lon}) is outside the projection zone")]
    Projection { lat: f64, lon: f64 },

    #[error("path needs at least 2 points, got {points}")]
    DegeneratePath { points: usize },

    #[error("zero-length line has no arc-length parameterization")]
    DegenerateGeometry,

    #[error("unknown user id {user_id}")]
    InvalidUser { user_id: u64 },

    #[error("path decoding error: {0}")]
    Decode(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
