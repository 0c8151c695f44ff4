//! Command-line front end for the alert engine: ingest trip-record JSON files for
//! a user, then answer one alert query for a candidate path.

use anyhow::{Context, Result};
use clap::Parser;
use drive_recall_lib::{
    ALERT_DISTANCE_M, AlertEngine, Config, GeoPoint, MAX_GPS_ERROR_M, MemoryStore,
    records_from_files,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "drive-recall",
    about = "Alerts on past driving-safety events near the current position"
)]
struct Args {
    /// Username owning the ingested trips
    #[arg(long)]
    user: String,

    /// Trip-record JSON files to load
    #[arg(long, required = true, num_args = 1..)]
    data: Vec<PathBuf>,

    /// Candidate path as "lat,lon" pairs, most recent position last
    #[arg(long = "point", required = true, num_args = 2.., value_parser = parse_geo_point)]
    points: Vec<GeoPoint>,

    /// Corridor buffer radius in meters
    #[arg(long, default_value_t = MAX_GPS_ERROR_M)]
    corridor_radius: f64,

    /// Alert distance in meters
    #[arg(long, default_value_t = ALERT_DISTANCE_M)]
    alert_distance: f64,
}

fn parse_geo_point(value: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lon but got {value:?}"))?;
    let lat = lat
        .trim()
        .parse()
        .map_err(|e| format!("bad latitude in {value:?}: {e}"))?;
    let lon = lon
        .trim()
        .parse()
        .map_err(|e| format!("bad longitude in {value:?}: {e}"))?;
    Ok(GeoPoint::new(lat, lon))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let store = Arc::new(MemoryStore::new());
    let user_id = store.create_user(&args.user);

    let records = records_from_files(&args.data).context("loading trip records")?;
    let published = store.ingest_records(user_id, &records, args.corridor_radius)?;
    tracing::info!(
        records = records.len(),
        published,
        user = %args.user,
        "trips ingested"
    );

    let engine = AlertEngine::with_config(
        store,
        Config {
            corridor_radius_m: args.corridor_radius,
            alert_distance_m: args.alert_distance,
        },
    );
    let alerts = engine
        .find_alerts(&args.points, user_id)
        .context("alert query failed")?;

    if alerts.is_empty() {
        println!("No warnings for this position.");
    } else {
        for alert in &alerts {
            println!("{alert}");
        }
    }
    Ok(())
}
