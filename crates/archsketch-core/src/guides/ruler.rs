//! Ruler guide: a single reference line.

use super::GuideId;
use crate::geometry::GuideLine;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A straight reference line. Decorative unless a tool requests ruler-lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulerGuide {
    pub id: GuideId,
    pub start: Point,
    pub end: Point,
}

impl RulerGuide {
    pub fn new(start: Point, end: Point) -> Self {
        Self { id: Uuid::new_v4(), start, end }
    }

    /// Horizontal ruler across the middle 60% of the canvas.
    pub fn default_for(canvas: Size) -> Self {
        let y = canvas.height * 0.5;
        Self::new(
            Point::new(canvas.width * 0.2, y),
            Point::new(canvas.width * 0.8, y),
        )
    }

    pub fn line(&self) -> GuideLine {
        GuideLine::new(self.start, self.end)
    }

    /// Orthogonal foot of `point` on the ruler; identity for a zero-length ruler.
    pub fn project(&self, point: Point) -> Point {
        self.line().project(point).unwrap_or(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_onto_horizontal_ruler() {
        let ruler = RulerGuide::new(Point::new(0.0, 100.0), Point::new(200.0, 100.0));
        let p = ruler.project(Point::new(50.0, 140.0));
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_ruler_is_identity() {
        let ruler = RulerGuide::new(Point::new(10.0, 10.0), Point::new(10.0, 10.0));
        let p = Point::new(3.0, 4.0);
        assert_eq!(ruler.project(p), p);
    }
}
