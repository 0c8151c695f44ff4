//! Containment matching and proximity alerting over a corridor store
//!
//! The end-to-end operation: project the caller's recent path fragment, find the
//! user's trips whose corridor fully contains it, and report which of those trips'
//! recorded events lie within the alert distance of the most recent position.

use crate::{
    ALERT_DISTANCE_M, CorridorStore, DriveEvent, GeoPoint, MAX_GPS_ERROR_M, ProjectedLine,
    ProjectedPoint, Result, Trip, UserId, projection,
};
use std::sync::Arc;

/// Tunable engine distances
#[derive(Clone, Debug)]
pub struct Config {
    /// Buffer radius applied to trip paths at ingestion (meters)
    pub corridor_radius_m: f64,
    /// Radius within which a recorded event is alert-relevant (meters)
    pub alert_distance_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corridor_radius_m: MAX_GPS_ERROR_M,
            alert_distance_m: ALERT_DISTANCE_M,
        }
    }
}

/// Read-only alerting engine over a corridor store handle.
///
/// Every operation is a pure, finite computation over its inputs; instances can be
/// shared and queried concurrently because trips are immutable once stored.
pub struct AlertEngine<S: CorridorStore> {
    store: Arc<S>,
    config: Config,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<S: CorridorStore> AlertEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: Arc<S>, config: Config) -> Self {
        Self { store, config }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The user's trips whose corridor fully contains the candidate path.
    ///
    /// A candidate with fewer than 2 points carries no directional information and
    /// matches nothing. Containment does not verify direction of travel; a reverse
    /// traversal of the same route matches too.
    pub fn matching_trips(
        &self,
        candidate: &[GeoPoint],
        user_id: UserId,
    ) -> Result<Vec<Arc<Trip>>> {
        if candidate.len() < 2 {
            return Ok(Vec::new());
        }
        let line = ProjectedLine::from_geo_path(candidate)?;
        self.store.trips_matching(user_id, &line)
    }

    /// The subset of `events` whose location is within `radius_m` of `query`.
    ///
    /// Planar Euclidean distance, inclusive boundary: an event exactly at the
    /// radius counts.
    pub fn events_within(
        query: &ProjectedPoint,
        events: &[DriveEvent],
        radius_m: f64,
    ) -> Vec<DriveEvent> {
        events
            .iter()
            .filter(|event| event.location().distance_to(query) <= radius_m)
            .cloned()
            .collect()
    }

    /// All recorded events near the most recent candidate position.
    ///
    /// Only the last point of the candidate path is alert-relevant; earlier points
    /// exist to establish which corridors the driver is retracing.
    pub fn find_alerts(&self, candidate: &[GeoPoint], user_id: UserId) -> Result<Vec<DriveEvent>> {
        #[cfg(feature = "profiling")]
        profiling::scope!("engine::find_alerts");

        let Some(last) = candidate.last() else {
            return Ok(Vec::new());
        };
        if candidate.len() < 2 {
            return Ok(Vec::new());
        }

        let trips = self.matching_trips(candidate, user_id)?;
        let query = projection::to_projected(*last)?;

        let mut alerts = Vec::new();
        for trip in &trips {
            alerts.extend(Self::events_within(
                &query,
                trip.events(),
                self.config.alert_distance_m,
            ));
        }
        tracing::debug!(
            matched_trips = trips.len(),
            alerts = alerts.len(),
            "alert query complete"
        );
        Ok(alerts)
    }
}
