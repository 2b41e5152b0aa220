//! Unit tests for waitline geometry.

use bx_core::GeoPoint;

use crate::{PathError, Waitline};

fn l_shape() -> Waitline {
    // ~1113 m north, then ~1056 m east (at lat 31.766).
    Waitline::from_points(vec![
        GeoPoint::new(31.766, -106.451),
        GeoPoint::new(31.776, -106.451),
        GeoPoint::new(31.776, -106.440),
    ])
    .unwrap()
}

#[test]
fn rejects_degenerate_input() {
    assert!(matches!(
        Waitline::from_points(vec![GeoPoint::new(0.0, 0.0)]),
        Err(PathError::TooFewPoints(1))
    ));
    // Two identical points collapse to one.
    assert!(matches!(
        Waitline::from_points(vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(1.0, 1.0)]),
        Err(PathError::TooFewPoints(1))
    ));
}

#[test]
fn total_length_sums_segments() {
    let line = l_shape();
    // 0.01° lat ≈ 1112 m; 0.011° lon at 31.776° ≈ 1040 m.
    assert!((line.total_length() - 2150.0).abs() < 30.0, "{}", line.total_length());
}

#[test]
fn point_at_endpoints_and_clamping() {
    let line = l_shape();
    let start = line.point_at(0.0);
    assert!((start.lat - 31.766).abs() < 1e-9);

    let end = line.point_at(line.total_length());
    assert!((end.lon - -106.440).abs() < 1e-6);

    // Out-of-range lookups clamp instead of panicking.
    let before = line.point_at(-50.0);
    assert_eq!(before.lat, start.lat);
    let after = line.point_at(line.total_length() + 50.0);
    assert!((after.lon - end.lon).abs() < 1e-9);
}

#[test]
fn point_at_interpolates_within_segment() {
    let line =
        Waitline::straight(GeoPoint::new(31.766, -106.451), 0.0, 1000.0).unwrap();
    let mid = line.point_at(500.0);
    let expected_lat = 31.766 + 500.0 / bx_core::geo::METERS_PER_DEGREE;
    assert!((mid.lat - expected_lat).abs() < 1e-7);
    assert!((mid.lon - -106.451).abs() < 1e-9);
}

#[test]
fn heading_follows_segments() {
    let line = l_shape();
    assert!(line.heading_at(100.0).abs() < 1.0, "first leg runs north");
    let h2 = line.heading_at(line.total_length() - 100.0);
    assert!((h2 - 90.0).abs() < 1.0, "second leg runs east, got {h2}");
}

#[test]
fn straight_line_has_zero_curvature() {
    let line =
        Waitline::straight(GeoPoint::new(31.766, -106.451), 45.0, 500.0).unwrap();
    assert_eq!(line.curvature_at(250.0), 0.0);
}

#[test]
fn right_turn_has_positive_curvature() {
    let line = l_shape();
    // The north→east corner is a +90° heading change.
    let kappa = line.curvature_at(100.0);
    assert!(kappa > 0.0, "clockwise turn should be positive, got {kappa}");
    // Δψ = π/2 over roughly half of each leg ≈ 1076 m.
    assert!((kappa - std::f64::consts::FRAC_PI_2 / 1076.0).abs() < kappa * 0.1);
}

#[test]
fn straight_constructor_length_and_bearing() {
    let origin = GeoPoint::new(31.766, -106.451);
    let line = Waitline::straight(origin, 90.0, 800.0).unwrap();
    assert!((line.total_length() - 800.0).abs() < 2.0);
    assert!((line.heading_at(0.0) - 90.0).abs() < 0.5);
}
