//! Perspective guide: three vanishing-point axes and stroke-lock projection.

use crate::geometry::{
    GEOMETRY_EPSILON, GuideLine, line_intersection, project_onto_ray_line, undirected_angle_between,
};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// One of the three colour-coded perspective axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerspectiveAxis {
    Green,
    Red,
    Blue,
}

impl PerspectiveAxis {
    /// Declaration order. Axis selection ties resolve to the earlier entry.
    pub const ALL: [PerspectiveAxis; 3] = [Self::Green, Self::Red, Self::Blue];

    /// Display colour for overlays (RGBA).
    pub fn color(self) -> [u8; 4] {
        match self {
            Self::Green => [40, 170, 80, 255],
            Self::Red => [220, 50, 50, 255],
            Self::Blue => [50, 110, 230, 255],
        }
    }
}

/// Vanishing point of an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VanishingPoint {
    /// The two defining lines meet here.
    Finite(Point),
    /// The lines are parallel; the axis is a plain direction (unit vector).
    AtInfinity(Vec2),
}

/// The two defining lines of each axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisLines {
    pub green: [GuideLine; 2],
    pub red: [GuideLine; 2],
    pub blue: [GuideLine; 2],
}

/// Extra rendering-only lines per axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraLines {
    pub green: Vec<GuideLine>,
    pub red: Vec<GuideLine>,
    pub blue: Vec<GuideLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveGuide {
    pub lines: AxisLines,
    pub guide_point: Point,
    #[serde(default)]
    pub extra_guide_lines: ExtraLines,
}

/// Two lines through `a` and `b` that meet exactly at `vp`.
fn converging_pair(vp: Point, a: Point, b: Point) -> [GuideLine; 2] {
    [
        GuideLine::new(a, a.lerp(vp, 0.5)),
        GuideLine::new(b, b.lerp(vp, 0.5)),
    ]
}

impl PerspectiveGuide {
    /// Two-point perspective with a vertical third axis.
    ///
    /// Green converges left of the canvas and red right of it, both on a
    /// horizon at 40% height. Blue is a pair of parallel verticals.
    pub fn default_for(canvas: Size) -> Self {
        let (w, h) = (canvas.width, canvas.height);
        let horizon = h * 0.4;
        let green_vp = Point::new(-0.25 * w, horizon);
        let red_vp = Point::new(1.25 * w, horizon);
        let green = converging_pair(
            green_vp,
            Point::new(0.7 * w, 0.15 * h),
            Point::new(0.7 * w, 0.85 * h),
        );
        let red = converging_pair(
            red_vp,
            Point::new(0.3 * w, 0.15 * h),
            Point::new(0.3 * w, 0.85 * h),
        );
        let blue = [
            GuideLine::new(Point::new(0.4 * w, 0.2 * h), Point::new(0.4 * w, 0.8 * h)),
            GuideLine::new(Point::new(0.6 * w, 0.2 * h), Point::new(0.6 * w, 0.8 * h)),
        ];
        Self {
            lines: AxisLines { green, red, blue },
            guide_point: Point::new(w * 0.5, h * 0.5),
            extra_guide_lines: ExtraLines::default(),
        }
    }

    pub fn axis_lines(&self, axis: PerspectiveAxis) -> &[GuideLine; 2] {
        match axis {
            PerspectiveAxis::Green => &self.lines.green,
            PerspectiveAxis::Red => &self.lines.red,
            PerspectiveAxis::Blue => &self.lines.blue,
        }
    }

    pub fn axis_lines_mut(&mut self, axis: PerspectiveAxis) -> &mut [GuideLine; 2] {
        match axis {
            PerspectiveAxis::Green => &mut self.lines.green,
            PerspectiveAxis::Red => &mut self.lines.red,
            PerspectiveAxis::Blue => &mut self.lines.blue,
        }
    }

    pub fn extra_lines(&self, axis: PerspectiveAxis) -> &[GuideLine] {
        match axis {
            PerspectiveAxis::Green => &self.extra_guide_lines.green,
            PerspectiveAxis::Red => &self.extra_guide_lines.red,
            PerspectiveAxis::Blue => &self.extra_guide_lines.blue,
        }
    }

    fn extra_lines_mut(&mut self, axis: PerspectiveAxis) -> &mut Vec<GuideLine> {
        match axis {
            PerspectiveAxis::Green => &mut self.extra_guide_lines.green,
            PerspectiveAxis::Red => &mut self.extra_guide_lines.red,
            PerspectiveAxis::Blue => &mut self.extra_guide_lines.blue,
        }
    }

    /// Intersection of the axis' two lines, or a direction when they are
    /// parallel. Returns `None` only if both lines are degenerate.
    pub fn vanishing_point(&self, axis: PerspectiveAxis) -> Option<VanishingPoint> {
        let [l1, l2] = self.axis_lines(axis);
        if let Some(p) = line_intersection(l1.start, l1.end, l2.start, l2.end) {
            return Some(VanishingPoint::Finite(p));
        }
        let dir = if !l1.is_degenerate() {
            l1.direction()
        } else if !l2.is_degenerate() {
            l2.direction()
        } else {
            return None;
        };
        Some(VanishingPoint::AtInfinity(dir / dir.hypot()))
    }

    /// Direction of `axis` as seen from `anchor`.
    pub fn axis_direction(&self, axis: PerspectiveAxis, anchor: Point) -> Option<Vec2> {
        match self.vanishing_point(axis)? {
            VanishingPoint::Finite(vp) => {
                let d = vp - anchor;
                if d.hypot() > GEOMETRY_EPSILON {
                    Some(d)
                } else {
                    // Anchor sits on the vanishing point; fall back to the line itself.
                    let [l1, _] = self.axis_lines(axis);
                    (!l1.is_degenerate()).then(|| l1.direction())
                }
            }
            VanishingPoint::AtInfinity(dir) => Some(dir),
        }
    }

    /// Axis whose direction from `anchor` deviates least from `anchor -> raw`.
    pub fn nearest_axis(&self, anchor: Point, raw: Point) -> Option<PerspectiveAxis> {
        let raw_dir = raw - anchor;
        let mut best: Option<(PerspectiveAxis, f64)> = None;
        for axis in PerspectiveAxis::ALL {
            let Some(dir) = self.axis_direction(axis, anchor) else {
                continue;
            };
            let deviation = undirected_angle_between(dir, raw_dir);
            // Strict comparison keeps the earlier axis on ties.
            if best.is_none_or(|(_, d)| deviation < d) {
                best = Some((axis, deviation));
            }
        }
        best.map(|(axis, _)| axis)
    }

    /// Stroke-lock: snap `raw` onto the line from the anchor through the
    /// nearest axis' vanishing point. Without an anchor the guide point is used.
    pub fn lock(&self, anchor: Option<Point>, raw: Point) -> Option<(PerspectiveAxis, Point)> {
        let anchor = anchor.unwrap_or(self.guide_point);
        let axis = self.nearest_axis(anchor, raw)?;
        let dir = self.axis_direction(axis, anchor)?;
        let point = project_onto_ray_line(raw, anchor, dir)?;
        Some((axis, point))
    }

    /// Add a helper line for `axis` passing through `through`.
    pub fn add_extra_line(&mut self, axis: PerspectiveAxis, through: Point) -> bool {
        let line = match self.vanishing_point(axis) {
            Some(VanishingPoint::Finite(vp)) if (vp - through).hypot() > GEOMETRY_EPSILON => {
                GuideLine::new(through, vp)
            }
            Some(VanishingPoint::AtInfinity(dir)) => {
                let reach = self.axis_lines(axis)[0].length().max(1.0);
                GuideLine::new(through - dir * reach, through + dir * reach)
            }
            _ => return false,
        };
        self.extra_lines_mut(axis).push(line);
        true
    }

    pub fn clear_extra_lines(&mut self) {
        self.extra_guide_lines = ExtraLines::default();
    }
}
