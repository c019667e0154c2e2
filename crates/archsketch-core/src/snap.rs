//! Snap functionality for aligning points to grids and angles.

use kurbo::{Point, Vec2};

/// Default angle snap increment in degrees.
pub const ANGLE_SNAP_INCREMENT: f64 = 15.0;

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the point moved onto a snap target.
    pub snapped: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self { point, snapped: false }
    }
}

/// Result of an angle snap operation.
#[derive(Debug, Clone, Copy)]
pub struct AngleSnapResult {
    /// The snapped endpoint.
    pub point: Point,
    /// The snapped angle in degrees (0-360).
    pub angle_degrees: f64,
    /// The original (unsnapped) angle in degrees.
    pub original_angle_degrees: f64,
    /// Whether angle snapping occurred.
    pub snapped: bool,
    /// Distance from start point (preserved from original).
    pub distance: f64,
}

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle % 360.0;
    if a < 0.0 { a + 360.0 } else { a }
}

/// Snap an angle to the nearest increment.
/// Returns the snapped angle in degrees (0-360).
pub fn snap_angle(angle_degrees: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return normalize_degrees(angle_degrees);
    }
    let snapped = (angle_degrees / increment).round() * increment;
    normalize_degrees(snapped)
}

/// Snap a line endpoint to angle increments from a start point.
/// This snaps the angle while preserving the distance from start.
pub fn snap_line_endpoint(start: Point, end: Point, increment: f64) -> AngleSnapResult {
    let delta = end - start;
    let distance = delta.hypot();

    if distance < 0.001 {
        return AngleSnapResult {
            point: end,
            angle_degrees: 0.0,
            original_angle_degrees: 0.0,
            snapped: false,
            distance: 0.0,
        };
    }

    let original = normalize_degrees(delta.y.atan2(delta.x).to_degrees());
    let snapped_angle = snap_angle(original, increment);
    let radians = snapped_angle.to_radians();
    let point = Point::new(
        start.x + distance * radians.cos(),
        start.y + distance * radians.sin(),
    );

    AngleSnapResult {
        point,
        angle_degrees: snapped_angle,
        original_angle_degrees: original,
        snapped: true,
        distance,
    }
}

/// Snap a point to the nearest cartesian grid intersection.
pub fn snap_to_grid(point: Point, spacing: f64) -> SnapResult {
    if spacing <= 0.0 {
        return SnapResult::none(point);
    }
    let snapped = Point::new(
        (point.x / spacing).round() * spacing,
        (point.y / spacing).round() * spacing,
    );
    SnapResult { point: snapped, snapped: true }
}

/// Basis vectors of an isometric grid: two axes rotated `±iso_angle` degrees
/// from vertical, each scaled to `spacing`.
pub fn isometric_basis(spacing: f64, iso_angle_degrees: f64) -> (Vec2, Vec2) {
    let a = iso_angle_degrees.to_radians();
    let (sin, cos) = a.sin_cos();
    // Vertical is (0, 1); rotate by +a and -a.
    let u = Vec2::new(-sin, cos) * spacing;
    let v = Vec2::new(sin, cos) * spacing;
    (u, v)
}

/// Snap a point to the nearest isometric lattice node.
///
/// The point is expressed in the (u, v) basis, each coordinate is rounded to
/// the nearest integer, and the node is mapped back. A degenerate basis
/// (iso angle of 0 or 180 degrees) leaves the point untouched.
pub fn snap_to_isometric_grid(point: Point, spacing: f64, iso_angle_degrees: f64) -> SnapResult {
    if spacing <= 0.0 {
        return SnapResult::none(point);
    }
    let (u, v) = isometric_basis(spacing, iso_angle_degrees);
    let det = u.cross(v);
    if det.abs() < 1e-9 {
        return SnapResult::none(point);
    }
    let p = point.to_vec2();
    // Solve p = s*u + t*v.
    let s = p.cross(v) / det;
    let t = u.cross(p) / det;
    let node = u * s.round() + v * t.round();
    SnapResult { point: node.to_point(), snapped: true }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_to_grid() {
        let result = snap_to_grid(Point::new(23.0, 47.0), 20.0);
        assert_eq!(result.point, Point::new(20.0, 40.0));
        assert!(result.snapped);
    }

    #[test]
    fn test_snap_to_grid_round_up() {
        let result = snap_to_grid(Point::new(31.0, 51.0), 20.0);
        assert_eq!(result.point, Point::new(40.0, 60.0));
    }

    #[test]
    fn test_snap_to_grid_is_idempotent() {
        for &(x, y) in &[(23.0, 47.0), (-13.7, 88.1), (1234.5, -0.4), (7.5, 7.5)] {
            let once = snap_to_grid(Point::new(x, y), 16.0).point;
            let twice = snap_to_grid(once, 16.0).point;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_zero_spacing_does_not_snap() {
        let p = Point::new(3.3, 4.4);
        assert_eq!(snap_to_grid(p, 0.0).point, p);
    }

    #[test]
    fn test_snap_angle() {
        assert!((snap_angle(7.0, 15.0) - 0.0).abs() < 0.01);
        assert!((snap_angle(8.0, 15.0) - 15.0).abs() < 0.01);
        assert!((snap_angle(23.0, 15.0) - 30.0).abs() < 0.01);
        assert!((snap_angle(359.0, 15.0) - 0.0).abs() < 0.01);
        assert!((snap_angle(-50.0, 15.0) - 315.0).abs() < 0.01);
    }

    #[test]
    fn test_snap_line_endpoint_horizontal() {
        let result = snap_line_endpoint(Point::ZERO, Point::new(100.0, 5.0), 15.0);
        assert!(result.snapped);
        assert!(result.angle_degrees.abs() < 0.01);
        assert!(result.point.y.abs() < 0.01);
    }

    #[test]
    fn test_snap_line_preserves_distance() {
        let result = snap_line_endpoint(Point::ZERO, Point::new(100.0, 10.0), 15.0);
        let original = (100.0_f64.powi(2) + 10.0_f64.powi(2)).sqrt();
        assert!((result.distance - original).abs() < 0.01);
    }

    #[test]
    fn test_isometric_snap_is_idempotent() {
        for &(x, y) in &[(13.0, 27.0), (-40.0, 3.0), (250.5, 99.9)] {
            let once = snap_to_isometric_grid(Point::new(x, y), 20.0, 60.0).point;
            let twice = snap_to_isometric_grid(once, 20.0, 60.0).point;
            assert!((once - twice).hypot() < 1e-9);
        }
    }

    #[test]
    fn test_isometric_snap_lands_on_lattice() {
        let (u, v) = isometric_basis(20.0, 60.0);
        let node = (u * 3.0 + v * -2.0).to_point();
        let nudged = Point::new(node.x + 1.5, node.y - 1.0);
        let snapped = snap_to_isometric_grid(nudged, 20.0, 60.0).point;
        assert!((snapped - node).hypot() < 1e-9);
    }

    #[test]
    fn test_degenerate_isometric_basis_is_identity() {
        let p = Point::new(5.0, 6.0);
        let r = snap_to_isometric_grid(p, 20.0, 0.0);
        assert!(!r.snapped);
        assert_eq!(r.point, p);
    }
}
