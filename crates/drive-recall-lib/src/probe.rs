//! Synthetic probe points at controlled distances along a line
//!
//! Verification helpers: given a reference point on (or near) a line, produce a
//! probe point on the line that is guaranteed inside or outside a radius of the
//! reference, measured along the line. Probes only ever look backward along the
//! line from the reference position, never forward or off-line.

use crate::{ProjectedLine, ProjectedPoint, Result};
use rand::Rng;

/// A point on `line` strictly behind `reference`'s position, within `radius_m` of
/// it along the line.
///
/// The probe distance is drawn uniformly from the last `radius_m` meters before
/// the reference position (capped at the line start), so the result is within the
/// radius by construction.
pub fn probe_within<R: Rng>(
    line: &ProjectedLine,
    reference: &ProjectedPoint,
    radius_m: f64,
    rng: &mut R,
) -> Result<ProjectedPoint> {
    let ratio = line.locate(reference)?;
    let distance_on_line = ratio * line.length();
    // can move back as far as the line start or the radius, whichever is nearer
    let allowable = distance_on_line.min(radius_m);
    let probe_distance = distance_on_line - rng.r#gen::<f64>() * allowable;
    Ok(line.point_at(probe_distance))
}

/// A point on `line` farther than `radius_m` behind `reference`'s position,
/// measured along the line.
///
/// Returns `None` when the reference sits within `radius_m` of the line start:
/// no point behind it can be outside the radius, and the probe never looks
/// forward along the line.
pub fn probe_beyond<R: Rng>(
    line: &ProjectedLine,
    reference: &ProjectedPoint,
    radius_m: f64,
    rng: &mut R,
) -> Result<Option<ProjectedPoint>> {
    let ratio = line.locate(reference)?;
    let distance_on_line = ratio * line.length();
    if distance_on_line <= radius_m {
        return Ok(None);
    }
    // anywhere from the line start up to the radius threshold
    let threshold = distance_on_line - radius_m;
    let probe_distance = rng.r#gen::<f64>() * threshold;
    Ok(Some(line.point_at(probe_distance)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// A straight 2 km east-west line, so along-line and Euclidean distances agree
    fn straight_line() -> ProjectedLine {
        ProjectedLine::from_projected_points(vec![
            ProjectedPoint::new(0.0, 0.0),
            ProjectedPoint::new(2_000.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_probe_within_stays_inside_radius() {
        let line = straight_line();
        let reference = line.point_at(1_500.0);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let probe = probe_within(&line, &reference, 200.0, &mut rng).unwrap();
            let along = line.locate(&probe).unwrap() * line.length();
            assert!(along <= 1_500.0 + 1e-9);
            assert!(1_500.0 - along <= 200.0 + 1e-9);
            assert!(probe.distance_to(&reference) <= 200.0 + 1e-9);
        }
    }

    #[test]
    fn test_probe_within_near_line_start_caps_at_zero() {
        let line = straight_line();
        let reference = line.point_at(80.0);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            let probe = probe_within(&line, &reference, 200.0, &mut rng).unwrap();
            let along = line.locate(&probe).unwrap() * line.length();
            assert!((0.0..=80.0 + 1e-9).contains(&along));
        }
    }

    #[test]
    fn test_probe_beyond_stays_outside_radius() {
        let line = straight_line();
        let reference = line.point_at(1_500.0);
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..100 {
            let probe = probe_beyond(&line, &reference, 200.0, &mut rng)
                .unwrap()
                .expect("reference is far enough from the start");
            let along = line.locate(&probe).unwrap() * line.length();
            assert!(1_500.0 - along > 200.0);
            assert!(probe.distance_to(&reference) > 200.0);
        }
    }

    #[test]
    fn test_probe_beyond_impossible_near_line_start() {
        let line = straight_line();
        let reference = line.point_at(150.0);
        let mut rng = StdRng::seed_from_u64(17);

        let probe = probe_beyond(&line, &reference, 200.0, &mut rng).unwrap();
        assert!(probe.is_none());
    }

    #[test]
    fn test_probes_fail_on_zero_length_line() {
        let line = ProjectedLine::from_projected_points(vec![
            ProjectedPoint::new(5.0, 5.0),
            ProjectedPoint::new(5.0, 5.0),
        ])
        .unwrap();
        let reference = ProjectedPoint::new(5.0, 5.0);
        let mut rng = StdRng::seed_from_u64(19);

        assert!(probe_within(&line, &reference, 200.0, &mut rng).is_err());
        assert!(probe_beyond(&line, &reference, 200.0, &mut rng).is_err());
    }

    #[test]
    fn test_probes_validate_proximity_filtering() {
        // the synthesizer's intended use: generate known-distance probes and
        // check the proximity predicate against them
        use crate::{AlertEngine, DriveEvent, EventKind, MemoryStore};

        let line = straight_line();
        let reference = line.point_at(1_000.0);
        let event = DriveEvent {
            location: reference,
            kind: EventKind::HardBrake {
                ts: 0,
                g_force: 0.5,
            },
        };
        let events = vec![event];
        let mut rng = StdRng::seed_from_u64(23);

        for _ in 0..20 {
            let near = probe_within(&line, &reference, 200.0, &mut rng).unwrap();
            assert_eq!(
                AlertEngine::<MemoryStore>::events_within(&near, &events, 200.0).len(),
                1
            );
            let far = probe_beyond(&line, &reference, 200.0, &mut rng)
                .unwrap()
                .expect("reference is far enough from the start");
            assert!(AlertEngine::<MemoryStore>::events_within(&far, &events, 200.0).is_empty());
        }
    }
}
