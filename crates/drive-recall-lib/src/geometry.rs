//! Projected polylines, arc-length parameterization, and buffered trip corridors
//!
//! A [`ProjectedLine`] is a polyline in the fixed planar projection with cumulative
//! segment lengths cached at construction, which makes arc-length queries (total
//! length, substrings, locate/interpolate) cheap. A [`BufferedCorridor`] is the
//! polygon of all points within a tolerance radius of a line, used to absorb GPS
//! jitter during containment matching.

use crate::{EngineError, GeoPoint, ProjectedPoint, Result, projection};
use geo::{
    BooleanOps, BoundingRect, Contains, Coord, Distance, Euclidean, LineString, MultiPolygon,
    Point, Polygon, Rect,
};
use std::f64::consts::{FRAC_PI_2, PI};

/// Arc segments per semicircle when polygonizing buffer caps and joins
/// (matches the 8-per-quarter-circle default of common spatial engines).
const ARC_SEGMENTS_PER_SEMICIRCLE: usize = 16;

/// Consecutive vertices closer than this are collapsed (meters)
const VERTEX_EPSILON_M: f64 = 1e-9;

/// An ordered sequence of projected points (>= 2) with cached arc-length data
#[derive(Clone, Debug)]
pub struct ProjectedLine {
    line: LineString<f64>,
    /// Cumulative arc length at each vertex; first entry 0, last entry == total length
    cumulative_m: Vec<f64>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ProjectedLine {
    /// Project a geographic path into a line.
    ///
    /// Fails with a degenerate-path error for fewer than 2 points and propagates
    /// projection failures for out-of-zone coordinates.
    pub fn from_geo_path(path: &[GeoPoint]) -> Result<Self> {
        if path.len() < 2 {
            return Err(EngineError::DegeneratePath { points: path.len() });
        }
        let points = path
            .iter()
            .map(|p| projection::to_projected(*p))
            .collect::<Result<Vec<_>>>()?;
        Self::from_projected_points(points)
    }

    /// Build a line from already-projected points (>= 2 required)
    pub(crate) fn from_projected_points(points: Vec<ProjectedPoint>) -> Result<Self> {
        if points.len() < 2 {
            return Err(EngineError::DegeneratePath {
                points: points.len(),
            });
        }
        let coords: Vec<Coord<f64>> = points.iter().map(|p| p.as_geo_point().into()).collect();
        Ok(Self::from_coords(coords))
    }

    fn from_coords(coords: Vec<Coord<f64>>) -> Self {
        debug_assert!(coords.len() >= 2);
        let mut cumulative_m = Vec::with_capacity(coords.len());
        cumulative_m.push(0.0);
        let mut total = 0.0;
        for pair in coords.windows(2) {
            total += Euclidean.distance(Point::from(pair[0]), Point::from(pair[1]));
            cumulative_m.push(total);
        }
        Self {
            line: LineString::new(coords),
            cumulative_m,
        }
    }

    /// Total polyline length in meters
    #[inline]
    pub fn length(&self) -> f64 {
        match self.cumulative_m.last() {
            Some(&len) => len,
            None => 0.0,
        }
    }

    /// First vertex
    #[inline]
    pub fn start_point(&self) -> ProjectedPoint {
        ProjectedPoint::from_geo_point(Point::from(self.line.0[0]))
    }

    /// Last vertex
    #[inline]
    pub fn end_point(&self) -> ProjectedPoint {
        ProjectedPoint::from_geo_point(Point::from(self.line.0[self.line.0.len() - 1]))
    }

    /// Number of vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.line.0.len()
    }

    #[inline]
    pub(crate) fn line_string(&self) -> &LineString<f64> {
        &self.line
    }

    /// The point at an absolute arc-length offset, clamped to `[0, length]`
    pub fn point_at(&self, distance_m: f64) -> ProjectedPoint {
        let mut target = distance_m.clamp(0.0, self.length());
        if target.is_nan() {
            target = 0.0;
        }
        let idx = match self
            .cumulative_m
            .binary_search_by(|c| c.partial_cmp(&target).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => return ProjectedPoint::from_geo_point(Point::from(self.line.0[i])),
            Err(i) => i,
        };
        // target falls strictly inside segment [idx - 1, idx]
        let seg_start = self.cumulative_m[idx - 1];
        let seg_len = self.cumulative_m[idx] - seg_start;
        let frac = (target - seg_start) / seg_len;
        let a = self.line.0[idx - 1];
        let b = self.line.0[idx];
        ProjectedPoint::new(a.x + frac * (b.x - a.x), a.y + frac * (b.y - a.y))
    }

    /// The point at a fractional arc-length position, clamped to `[0, 1]`
    #[inline]
    pub fn interpolate(&self, ratio: f64) -> ProjectedPoint {
        self.point_at(ratio.clamp(0.0, 1.0) * self.length())
    }

    /// Fractional arc-length position of the closest point on the line to `point`.
    ///
    /// Projects onto segment interiors, not just vertices. Fails on a zero-length
    /// line, where arc length is undefined.
    pub fn locate(&self, point: &ProjectedPoint) -> Result<f64> {
        let total = self.length();
        if total <= 0.0 {
            return Err(EngineError::DegenerateGeometry);
        }

        let p = point.as_geo_point();
        let mut best_dist_sq = f64::INFINITY;
        let mut best_arc = 0.0;
        for (i, pair) in self.line.0.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            let seg_len_sq = dx * dx + dy * dy;
            let t = if seg_len_sq > 0.0 {
                (((p.x() - a.x) * dx + (p.y() - a.y) * dy) / seg_len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (cx, cy) = (a.x + t * dx, a.y + t * dy);
            let dist_sq = (p.x() - cx).powi(2) + (p.y() - cy).powi(2);
            if dist_sq < best_dist_sq {
                best_dist_sq = dist_sq;
                best_arc = self.cumulative_m[i] + t * seg_len_sq.sqrt();
            }
        }
        Ok(best_arc / total)
    }

    /// The portion of the line between two arc-length offsets.
    ///
    /// Offsets outside `[0, length]` are clamped rather than rejected, tolerating
    /// minor floating-point drift in upstream distance measurements. Equal clamped
    /// offsets yield a zero-length line at that position.
    pub fn substring(&self, start_m: f64, end_m: f64) -> ProjectedLine {
        let total = self.length();
        let mut start = start_m.clamp(0.0, total);
        let mut end = end_m.clamp(0.0, total);
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }

        let start_point = self.point_at(start);
        let end_point = self.point_at(end);
        let mut coords: Vec<Coord<f64>> = vec![start_point.as_geo_point().into()];
        for (i, &cum) in self.cumulative_m.iter().enumerate() {
            if cum > start && cum < end {
                coords.push(self.line.0[i]);
            }
        }
        coords.push(end_point.as_geo_point().into());
        coords.dedup_by(|a, b| {
            (a.x - b.x).abs() < VERTEX_EPSILON_M && (a.y - b.y).abs() < VERTEX_EPSILON_M
        });
        if coords.len() < 2 {
            // collapsed to a single position; keep the two-vertex invariant
            coords.push(end_point.as_geo_point().into());
        }
        Self::from_coords(coords)
    }

    /// Points spaced `step_m` apart along the line (plus the final endpoint)
    pub fn points_every(&self, step_m: f64) -> Vec<ProjectedPoint> {
        let total = self.length();
        if step_m <= 0.0 {
            return vec![self.start_point(), self.end_point()];
        }
        let mut points = Vec::new();
        let mut offset = 0.0;
        while offset < total {
            points.push(self.point_at(offset));
            offset += step_m;
        }
        points.push(self.end_point());
        points
    }

    /// Geographic coordinates spaced `step_m` apart along the line.
    ///
    /// Mainly intended for verification code that needs known-on-route probe paths.
    pub fn geographic_points_every(&self, step_m: f64) -> Result<Vec<GeoPoint>> {
        self.points_every(step_m)
            .iter()
            .map(projection::to_geographic)
            .collect()
    }
}

/// The polygon of all points within `radius_m` of a line, with a cached bounding box
#[derive(Clone, Debug)]
pub struct BufferedCorridor {
    polygon: MultiPolygon<f64>,
    bounding_box: Rect<f64>,
    radius_m: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl BufferedCorridor {
    /// Buffer a line by `radius_m`, producing a proper line buffer (round caps and
    /// joins, polygonized), not a bounding box.
    pub fn from_line(line: &ProjectedLine, radius_m: f64) -> Self {
        #[cfg(feature = "profiling")]
        profiling::scope!("corridor::from_line");

        let coords = &line.line_string().0;
        let capsules: Vec<MultiPolygon<f64>> = coords
            .windows(2)
            .filter(|pair| Euclidean.distance(Point::from(pair[0]), Point::from(pair[1])) > 0.0)
            .map(|pair| MultiPolygon::new(vec![capsule_polygon(pair[0], pair[1], radius_m)]))
            .collect();
        let polygon = if capsules.is_empty() {
            // every segment was zero-length; buffer the single position instead
            MultiPolygon::new(vec![circle_polygon(coords[0], radius_m)])
        } else {
            union_all(capsules)
        };

        let fallback = Rect::new(coords[0], coords[0]);
        let bounding_box = polygon.bounding_rect().unwrap_or(fallback);
        Self {
            polygon,
            bounding_box,
            radius_m,
        }
    }

    /// Buffer radius in meters
    #[inline]
    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Bounding box of the corridor polygon
    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.bounding_box
    }

    /// The corridor polygon itself
    #[inline]
    pub fn polygon(&self) -> &MultiPolygon<f64> {
        &self.polygon
    }

    /// Whether the candidate line lies entirely within the corridor polygon.
    ///
    /// Full containment of the whole line, not just its vertices; a cheap
    /// bounding-box rejection runs first.
    pub fn contains_line(&self, line: &ProjectedLine) -> bool {
        #[cfg(feature = "profiling")]
        profiling::scope!("corridor::contains_line");

        if let Some(bbox) = line.line_string().bounding_rect() {
            let outer = self.bounding_box;
            if bbox.min().x < outer.min().x
                || bbox.min().y < outer.min().y
                || bbox.max().x > outer.max().x
                || bbox.max().y > outer.max().y
            {
                return false;
            }
        }
        self.polygon.contains(line.line_string())
    }
}

/// Union a set of polygons pairwise in a balanced tree
fn union_all(mut polygons: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while polygons.len() > 1 {
        polygons = polygons
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => unreachable!("chunks(2) yields 1 or 2 elements"),
            })
            .collect();
    }
    polygons
        .pop()
        .unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

/// A segment dilated by `radius`: two semicircular caps joined by straight flanks
fn capsule_polygon(a: Coord<f64>, b: Coord<f64>, radius: f64) -> Polygon<f64> {
    let theta = (b.y - a.y).atan2(b.x - a.x);
    let mut ring = Vec::with_capacity(2 * (ARC_SEGMENTS_PER_SEMICIRCLE + 1));
    for i in 0..=ARC_SEGMENTS_PER_SEMICIRCLE {
        let angle = theta + FRAC_PI_2 + PI * (i as f64) / (ARC_SEGMENTS_PER_SEMICIRCLE as f64);
        ring.push(Coord {
            x: a.x + radius * angle.cos(),
            y: a.y + radius * angle.sin(),
        });
    }
    for i in 0..=ARC_SEGMENTS_PER_SEMICIRCLE {
        let angle = theta - FRAC_PI_2 + PI * (i as f64) / (ARC_SEGMENTS_PER_SEMICIRCLE as f64);
        ring.push(Coord {
            x: b.x + radius * angle.cos(),
            y: b.y + radius * angle.sin(),
        });
    }
    Polygon::new(LineString::new(ring), vec![])
}

/// A polygonized circle around a single position
fn circle_polygon(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    let steps = 2 * ARC_SEGMENTS_PER_SEMICIRCLE;
    let ring = (0..steps)
        .map(|i| {
            let angle = 2.0 * PI * (i as f64) / (steps as f64);
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::new(ring), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_from(points: &[(f64, f64)]) -> ProjectedLine {
        let projected = points
            .iter()
            .map(|&(x, y)| ProjectedPoint::new(x, y))
            .collect();
        ProjectedLine::from_projected_points(projected).unwrap()
    }

    #[test]
    fn test_degenerate_paths_rejected() {
        assert!(ProjectedLine::from_geo_path(&[]).is_err());
        assert!(ProjectedLine::from_geo_path(&[GeoPoint::new(37.0, -122.0)]).is_err());
    }

    #[test]
    fn test_length_and_endpoints() {
        let line = line_from(&[(0.0, 0.0), (300.0, 0.0), (300.0, 400.0)]);
        assert!((line.length() - 700.0).abs() < 1e-9);
        assert!((line.start_point().x() - 0.0).abs() < 1e-9);
        assert!((line.end_point().y() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_at_walks_segments() {
        let line = line_from(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]);
        let p = line.point_at(150.0);
        assert!((p.x() - 100.0).abs() < 1e-9);
        assert!((p.y() - 50.0).abs() < 1e-9);

        // clamped on both sides
        assert_eq!(line.point_at(-5.0).x(), 0.0);
        assert!((line.point_at(1e9).y() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_locate_interpolate_roundtrip() {
        let line = line_from(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (250.0, 100.0)]);
        for ratio in [0.0, 0.1, 0.33, 0.5, 0.77, 1.0] {
            let p = line.interpolate(ratio);
            let located = line.locate(&p).unwrap();
            assert!(
                (located - ratio).abs() < 1e-9,
                "ratio {ratio} came back as {located}"
            );
        }
    }

    #[test]
    fn test_locate_projects_onto_segment_interior() {
        let line = line_from(&[(0.0, 0.0), (100.0, 0.0)]);
        // nearest point on the line is (60, 0), not a vertex
        let ratio = line.locate(&ProjectedPoint::new(60.0, 35.0)).unwrap();
        assert!((ratio - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_locate_zero_length_line_fails() {
        let line = line_from(&[(5.0, 5.0), (5.0, 5.0)]);
        assert!(matches!(
            line.locate(&ProjectedPoint::new(0.0, 0.0)),
            Err(EngineError::DegenerateGeometry)
        ));
    }

    #[test]
    fn test_substring_extracts_interior() {
        let line = line_from(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]);
        let sub = line.substring(50.0, 150.0);
        assert!((sub.length() - 100.0).abs() < 1e-9);
        assert!((sub.start_point().x() - 50.0).abs() < 1e-9);
        assert!((sub.end_point().y() - 50.0).abs() < 1e-9);
        // the corner vertex survives
        assert_eq!(sub.vertex_count(), 3);
    }

    #[test]
    fn test_substring_clamps_out_of_range_offsets() {
        let line = line_from(&[(0.0, 0.0), (100.0, 0.0)]);
        let sub = line.substring(-20.0, 1e6);
        assert!((sub.length() - line.length()).abs() < 1e-9);
    }

    #[test]
    fn test_substring_equal_offsets_degenerates() {
        let line = line_from(&[(0.0, 0.0), (100.0, 0.0)]);
        let sub = line.substring(40.0, 40.0);
        assert_eq!(sub.vertex_count(), 2);
        assert!(sub.length() < 1e-9);
        assert!((sub.start_point().x() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_points_every_spacing() {
        let line = line_from(&[(0.0, 0.0), (120.0, 0.0)]);
        let points = line.points_every(50.0);
        assert_eq!(points.len(), 4);
        assert!((points[1].x() - 50.0).abs() < 1e-9);
        assert!((points[3].x() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_geographic_resampling_stays_on_route() {
        let path = [
            GeoPoint::new(37.0, -122.0),
            GeoPoint::new(37.01, -122.0),
            GeoPoint::new(37.02, -122.0),
        ];
        let line = ProjectedLine::from_geo_path(&path).unwrap();
        let corridor = BufferedCorridor::from_line(&line, 20.0);

        let samples = line.geographic_points_every(50.0).unwrap();
        // roughly one sample per 50 m over ~2.2 km
        assert!(samples.len() > 40);
        // consecutive samples re-projected form fragments of the same route
        for pair in samples.windows(2) {
            let fragment = ProjectedLine::from_geo_path(pair).unwrap();
            assert!(corridor.contains_line(&fragment));
        }
    }

    #[test]
    fn test_corridor_contains_own_centerline() {
        let line = line_from(&[(0.0, 0.0), (500.0, 0.0), (500.0, 500.0)]);
        let corridor = BufferedCorridor::from_line(&line, 20.0);
        assert!(corridor.contains_line(&line));
    }

    #[test]
    fn test_corridor_contains_subpath() {
        // buffering a superset line covers any of its own subsegments
        let line = line_from(&[(0.0, 0.0), (500.0, 0.0), (500.0, 500.0)]);
        let corridor = BufferedCorridor::from_line(&line, 20.0);
        let sub = line.substring(100.0, 700.0);
        assert!(corridor.contains_line(&sub));
    }

    #[test]
    fn test_corridor_tolerates_jitter_within_radius() {
        let line = line_from(&[(0.0, 0.0), (500.0, 0.0)]);
        let corridor = BufferedCorridor::from_line(&line, 20.0);
        let jittered = line_from(&[(10.0, 12.0), (250.0, -15.0), (490.0, 8.0)]);
        assert!(corridor.contains_line(&jittered));
    }

    #[test]
    fn test_corridor_rejects_escaping_line() {
        let line = line_from(&[(0.0, 0.0), (500.0, 0.0)]);
        let corridor = BufferedCorridor::from_line(&line, 20.0);
        // endpoints are inside but the middle bulges out of the buffer
        let bulge = line_from(&[(100.0, 0.0), (250.0, 80.0), (400.0, 0.0)]);
        assert!(!corridor.contains_line(&bulge));
        // and a line far away fails the bbox prefilter
        let far = line_from(&[(0.0, 5000.0), (500.0, 5000.0)]);
        assert!(!corridor.contains_line(&far));
    }

    #[test]
    fn test_corridor_of_zero_length_line_is_a_disc() {
        let line = line_from(&[(10.0, 10.0), (10.0, 10.0)]);
        let corridor = BufferedCorridor::from_line(&line, 20.0);
        let bbox = corridor.bounding_box();
        assert!((bbox.width() - 40.0).abs() < 1.0);
        assert!((bbox.height() - 40.0).abs() < 1.0);
    }

    #[test]
    fn test_corner_join_is_covered() {
        // a point near the outside of a 90-degree corner is still within radius
        let line = line_from(&[(0.0, 0.0), (200.0, 0.0), (200.0, 200.0)]);
        let corridor = BufferedCorridor::from_line(&line, 20.0);
        let diagonal = 19.0 / std::f64::consts::SQRT_2;
        let near_corner = line_from(&[
            (200.0 + diagonal, diagonal),
            (200.0, 50.0),
        ]);
        assert!(corridor.contains_line(&near_corner));
    }
}
