//! The corridor store contract and a concurrent in-memory implementation
//!
//! The engine depends on exactly one query: all trips of a user whose corridor
//! fully contains a candidate line. How trips are held (in memory, behind a
//! spatial index, in an external database) is the store's business.

use crate::ingest::TripRecord;
use crate::{EngineError, ProjectedLine, Result, Trip};
use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub type UserId = u64;

/// The one query the matching engine needs from trip storage
pub trait CorridorStore: Send + Sync {
    /// All trips belonging to `user_id` whose corridor fully contains `line`.
    ///
    /// Result ordering carries no meaning. Fails if `user_id` is unknown.
    fn trips_matching(&self, user_id: UserId, line: &ProjectedLine) -> Result<Vec<Arc<Trip>>>;
}

/// Concurrent in-memory trip storage keyed by user
pub struct MemoryStore {
    usernames: DashMap<String, UserId>,
    trips: DashMap<UserId, Vec<Arc<Trip>>>,
    next_user_id: AtomicU64,
    next_trip_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            usernames: DashMap::new(),
            trips: DashMap::new(),
            next_user_id: AtomicU64::new(1),
            next_trip_id: AtomicU64::new(1),
        }
    }

    /// Create a user, or return the existing id for an already-known username
    pub fn create_user(&self, username: &str) -> UserId {
        let id = *self
            .usernames
            .entry(username.to_string())
            .or_insert_with(|| self.next_user_id.fetch_add(1, Ordering::Relaxed));
        self.trips.entry(id).or_default();
        id
    }

    /// Look up the id of a known username
    pub fn resolve_username(&self, username: &str) -> Option<UserId> {
        self.usernames.get(username).map(|id| *id)
    }

    #[inline]
    pub fn user_exists(&self, user_id: UserId) -> bool {
        self.trips.contains_key(&user_id)
    }

    /// Build one trip from a record and publish it.
    ///
    /// The trip enters the store only after its geometry and events are fully
    /// constructed, so concurrent readers never observe a partial trip.
    pub fn add_trip(
        &self,
        user_id: UserId,
        record: &TripRecord,
        corridor_radius_m: f64,
    ) -> Result<Arc<Trip>> {
        if !self.user_exists(user_id) {
            return Err(EngineError::InvalidUser { user_id });
        }
        let trip_id = self.next_trip_id.fetch_add(1, Ordering::Relaxed);
        let trip = Arc::new(Trip::from_record(
            trip_id,
            user_id,
            record,
            corridor_radius_m,
        )?);
        self.trips.entry(user_id).or_default().push(trip.clone());
        Ok(trip)
    }

    /// Build trips from records in parallel and publish the successful ones.
    ///
    /// Records that cannot become a valid trip (degenerate path, out-of-zone
    /// coordinates, undecodable path) are skipped with a warning rather than
    /// aborting the batch. Returns the number of trips published.
    pub fn ingest_records(
        &self,
        user_id: UserId,
        records: &[TripRecord],
        corridor_radius_m: f64,
    ) -> Result<usize> {
        #[cfg(feature = "profiling")]
        profiling::scope!("store::ingest_records");

        if !self.user_exists(user_id) {
            return Err(EngineError::InvalidUser { user_id });
        }

        let base_id = self
            .next_trip_id
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        let built: Vec<Option<Arc<Trip>>> = records
            .par_iter()
            .enumerate()
            .map(|(i, record)| {
                match Trip::from_record(base_id + i as u64, user_id, record, corridor_radius_m) {
                    Ok(trip) => Some(Arc::new(trip)),
                    Err(err) => {
                        tracing::warn!("skipping trip record {}: {}", record.id, err);
                        None
                    }
                }
            })
            .collect();

        let mut published = 0;
        let mut list = self.trips.entry(user_id).or_default();
        for trip in built.into_iter().flatten() {
            list.push(trip);
            published += 1;
        }
        Ok(published)
    }

    /// Number of trips stored for a user
    pub fn trip_count(&self, user_id: UserId) -> usize {
        self.trips.get(&user_id).map_or(0, |list| list.len())
    }

    pub fn user_count(&self) -> usize {
        self.usernames.len()
    }
}

impl CorridorStore for MemoryStore {
    fn trips_matching(&self, user_id: UserId, line: &ProjectedLine) -> Result<Vec<Arc<Trip>>> {
        #[cfg(feature = "profiling")]
        profiling::scope!("store::trips_matching");

        let trips = self
            .trips
            .get(&user_id)
            .ok_or(EngineError::InvalidUser { user_id })?;
        Ok(trips
            .iter()
            .filter(|trip| trip.corridor().contains_line(line))
            .cloned()
            .collect())
    }
}
