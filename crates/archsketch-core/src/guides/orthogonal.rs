//! Orthogonal guide: locks strokes to a rotated horizontal/vertical frame.

use crate::geometry::rotate_about;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Rotation offset (degrees) of the "horizontal" direction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrthogonalGuide {
    pub angle: f64,
}

impl OrthogonalGuide {
    pub fn new(angle: f64) -> Self {
        Self { angle }
    }

    /// Constrain the segment `anchor -> point` to 0/90/180/270 degrees in the
    /// frame rotated by `angle`.
    pub fn project(&self, anchor: Point, point: Point) -> Point {
        let theta = self.angle.to_radians();
        let local = rotate_about(point, anchor, -theta);
        let d = local - anchor;
        let locked = if d.x.abs() >= d.y.abs() {
            Point::new(local.x, anchor.y)
        } else {
            Point::new(anchor.x, local.y)
        };
        rotate_about(locked, anchor, theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrotated_frame_locks_horizontal() {
        let guide = OrthogonalGuide::new(0.0);
        let p = guide.project(Point::new(10.0, 10.0), Point::new(60.0, 18.0));
        assert!((p.x - 60.0).abs() < 1e-9);
        assert!((p.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrotated_frame_locks_vertical() {
        let guide = OrthogonalGuide::new(0.0);
        let p = guide.project(Point::ZERO, Point::new(3.0, -40.0));
        assert!(p.x.abs() < 1e-9);
        assert!((p.y + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_frame() {
        let guide = OrthogonalGuide::new(45.0);
        let p = guide.project(Point::ZERO, Point::new(10.0, 9.0));
        // Result lies on the 45 degree diagonal.
        assert!((p.x - p.y).abs() < 1e-9);
    }
}
