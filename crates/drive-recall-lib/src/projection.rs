//! Fixed planar projection between geographic and projected coordinates
//!
//! All distance math in this crate happens in one projection: UTM zone 10 north on
//! the GRS80 ellipsoid (the western-California zone the trip data lives in). The
//! forward/inverse transverse-Mercator series below is exact to well under a
//! millimeter inside the zone, so round trips are lossless for GPS purposes.

use crate::{EngineError, Result};
use geo::Point;

/// Central meridian of UTM zone 10 (degrees)
const CENTRAL_MERIDIAN_DEG: f64 = -123.0;

/// UTM scale factor at the central meridian
const SCALE_FACTOR: f64 = 0.9996;

/// UTM false easting (meters); no false northing in the northern hemisphere
const FALSE_EASTING_M: f64 = 500_000.0;

/// Longitude span of the zone (degrees)
const MIN_LON_DEG: f64 = -126.0;
const MAX_LON_DEG: f64 = -120.0;

/// Latitude span covered by the northern-hemisphere zone (degrees)
const MIN_LAT_DEG: f64 = 0.0;
const MAX_LAT_DEG: f64 = 84.0;

// Series constants for the GRS80 ellipsoid (a = 6378137 m, 1/f = 298.257222101),
// precomputed from the third flattening n = f / (2 - f).

/// Rectifying radius a/(1+n)·(1 + n²/4 + n⁴/64), meters
const RECTIFYING_RADIUS_M: f64 = 6_367_449.145771047;

/// 2·√n/(1+n), used in the conformal latitude conversion
const CONFORMAL_FACTOR: f64 = 0.08181919104281579;

/// Forward series coefficients α₁..α₃
const ALPHA: [f64; 3] = [
    8.377318229233356e-4,
    7.608497033275728e-7,
    1.2034878053241857e-9,
];

/// Inverse series coefficients β₁..β₃
const BETA: [f64; 3] = [
    8.377321681862305e-4,
    5.906110921873399e-8,
    1.6769912041402588e-10,
];

/// Latitude recovery coefficients δ₁..δ₃
const DELTA: [f64; 3] = [
    3.356551465100355e-3,
    6.571913257672216e-6,
    1.7677460222466728e-8,
];

/// A geographic coordinate in degrees (geodetic datum of the fixed projection)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Create a geographic point from latitude and longitude in degrees
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[inline]
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Whether this coordinate lies inside the configured projection zone
    #[inline]
    pub fn in_projection_zone(&self) -> bool {
        self.lon >= MIN_LON_DEG
            && self.lon <= MAX_LON_DEG
            && self.lat >= MIN_LAT_DEG
            && self.lat <= MAX_LAT_DEG
    }
}

/// A planar coordinate in meters under the fixed projection.
///
/// Instances only come out of [`to_projected`] or out of arc-length operations on
/// an already-projected line, which keeps every distance computation in the crate
/// in consistent units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedPoint(Point<f64>);

impl ProjectedPoint {
    #[inline]
    pub(crate) fn new(x: f64, y: f64) -> Self {
        Self(Point::new(x, y))
    }

    #[inline]
    pub(crate) fn from_geo_point(point: Point<f64>) -> Self {
        Self(point)
    }

    /// Easting in meters
    #[inline]
    pub fn x(&self) -> f64 {
        self.0.x()
    }

    /// Northing in meters
    #[inline]
    pub fn y(&self) -> f64 {
        self.0.y()
    }

    #[inline]
    pub(crate) fn as_geo_point(&self) -> Point<f64> {
        self.0
    }

    /// Planar Euclidean distance to another projected point, meters
    #[inline]
    pub fn distance_to(&self, other: &ProjectedPoint) -> f64 {
        use geo::{Distance, Euclidean};
        Euclidean.distance(self.0, other.0)
    }
}

/// Project a geographic coordinate into the fixed planar projection.
///
/// Fails if the coordinate is outside the configured zone; callers decide whether
/// that is fatal or filtered.
pub fn to_projected(point: GeoPoint) -> Result<ProjectedPoint> {
    if !point.in_projection_zone() {
        return Err(EngineError::Projection {
            lat: point.lat,
            lon: point.lon,
        });
    }

    let phi = point.lat.to_radians();
    let lambda = (point.lon - CENTRAL_MERIDIAN_DEG).to_radians();

    // Conformal latitude, then the Gauss-Krueger series
    let t = (phi.sin().atanh() - CONFORMAL_FACTOR * (CONFORMAL_FACTOR * phi.sin()).atanh()).sinh();
    let xi = t.atan2(lambda.cos());
    let eta = (lambda.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut easting = eta;
    let mut northing = xi;
    for (j, alpha_j) in ALPHA.iter().enumerate() {
        let k = 2.0 * (j + 1) as f64;
        easting += alpha_j * (k * xi).cos() * (k * eta).sinh();
        northing += alpha_j * (k * xi).sin() * (k * eta).cosh();
    }

    Ok(ProjectedPoint::new(
        FALSE_EASTING_M + SCALE_FACTOR * RECTIFYING_RADIUS_M * easting,
        SCALE_FACTOR * RECTIFYING_RADIUS_M * northing,
    ))
}

/// Invert the fixed projection back to a geographic coordinate.
///
/// Fails if the input does not correspond to a coordinate inside the zone.
pub fn to_geographic(point: &ProjectedPoint) -> Result<GeoPoint> {
    let xi = point.y() / (SCALE_FACTOR * RECTIFYING_RADIUS_M);
    let eta = (point.x() - FALSE_EASTING_M) / (SCALE_FACTOR * RECTIFYING_RADIUS_M);

    let mut xi_prime = xi;
    let mut eta_prime = eta;
    for (j, beta_j) in BETA.iter().enumerate() {
        let k = 2.0 * (j + 1) as f64;
        xi_prime -= beta_j * (k * xi).sin() * (k * eta).cosh();
        eta_prime -= beta_j * (k * xi).cos() * (k * eta).sinh();
    }

    let chi = (xi_prime.sin() / eta_prime.cosh()).asin();
    let mut phi = chi;
    for (j, delta_j) in DELTA.iter().enumerate() {
        let k = 2.0 * (j + 1) as f64;
        phi += delta_j * (k * chi).sin();
    }
    let lambda = eta_prime.sinh().atan2(xi_prime.cos());

    let geographic = GeoPoint::new(phi.to_degrees(), CENTRAL_MERIDIAN_DEG + lambda.to_degrees());
    if !geographic.in_projection_zone() {
        return Err(EngineError::Projection {
            lat: geographic.lat,
            lon: geographic.lon,
        });
    }
    Ok(geographic)
}
