//! Mirror guide: symmetry axis for strokes.

use super::GuideId;
use crate::geometry::GuideLine;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Symmetry axis. While active, every stroke gets a reflected twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorGuide {
    pub id: GuideId,
    pub start: Point,
    pub end: Point,
}

impl MirrorGuide {
    pub fn new(start: Point, end: Point) -> Self {
        Self { id: Uuid::new_v4(), start, end }
    }

    /// Vertical axis through the canvas centre.
    pub fn default_for(canvas: Size) -> Self {
        let x = canvas.width * 0.5;
        Self::new(Point::new(x, 0.0), Point::new(x, canvas.height))
    }

    pub fn line(&self) -> GuideLine {
        GuideLine::new(self.start, self.end)
    }

    /// Reflected point, or `None` when the axis has zero length.
    pub fn reflect_point(&self, point: Point) -> Option<Point> {
        self.line().reflect(point)
    }

    /// Reflect every vertex of a path: `p' = 2 * proj(p) - p`.
    pub fn reflect_path(&self, path: &[Point]) -> Option<Vec<Point>> {
        let line = self.line();
        if line.is_degenerate() {
            return None;
        }
        path.iter().map(|&p| line.reflect(p)).collect()
    }
}
