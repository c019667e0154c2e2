//! Grid guide: cartesian or isometric snapping lattice.

use crate::geometry::GuideLine;
use crate::snap::{isometric_basis, snap_to_grid, snap_to_isometric_grid};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest grid spacing accepted from UI controls.
pub const MIN_GRID_SPACING: f64 = 2.0;

/// Default grid spacing in canvas pixels.
pub const DEFAULT_GRID_SPACING: f64 = 20.0;

/// Default isometric angle from vertical, in degrees.
pub const DEFAULT_ISO_ANGLE: f64 = 60.0;

/// Above this many lines per family only major lines are produced.
const MAX_LINES_PER_FAMILY: i64 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    #[default]
    None,
    Cartesian,
    Isometric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridGuide {
    pub kind: GridKind,
    spacing: f64,
    major_line_frequency: u32,
    iso_angle: f64,
}

impl Default for GridGuide {
    fn default() -> Self {
        Self {
            kind: GridKind::None,
            spacing: DEFAULT_GRID_SPACING,
            major_line_frequency: 5,
            iso_angle: DEFAULT_ISO_ANGLE,
        }
    }
}

/// A grid line ready for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub line: GuideLine,
    pub major: bool,
}

impl GridGuide {
    pub fn new(kind: GridKind, spacing: f64, major_line_frequency: u32, iso_angle: f64) -> Self {
        let mut grid = Self { kind, ..Default::default() };
        grid.set_spacing(spacing);
        grid.set_major_line_frequency(major_line_frequency);
        grid.set_iso_angle(iso_angle);
        grid
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn major_line_frequency(&self) -> u32 {
        self.major_line_frequency
    }

    pub fn iso_angle(&self) -> f64 {
        self.iso_angle
    }

    pub fn set_spacing(&mut self, spacing: f64) {
        self.spacing = if spacing.is_finite() {
            spacing.max(MIN_GRID_SPACING)
        } else {
            DEFAULT_GRID_SPACING
        };
    }

    pub fn set_major_line_frequency(&mut self, frequency: u32) {
        self.major_line_frequency = frequency.max(1);
    }

    /// Clamped to (0, 90] degrees; outside that the lattice collapses.
    pub fn set_iso_angle(&mut self, angle: f64) {
        self.iso_angle = if angle.is_finite() {
            angle.clamp(1.0, 89.0)
        } else {
            DEFAULT_ISO_ANGLE
        };
    }

    /// Re-apply setter clamps after deserializing untrusted data.
    pub fn sanitized(mut self) -> Self {
        let (s, f, a) = (self.spacing, self.major_line_frequency, self.iso_angle);
        self.set_spacing(s);
        self.set_major_line_frequency(f);
        self.set_iso_angle(a);
        self
    }

    /// Nearest lattice node, or the point itself when the grid is off.
    pub fn snap(&self, point: Point) -> Point {
        match self.kind {
            GridKind::None => point,
            GridKind::Cartesian => snap_to_grid(point, self.spacing).point,
            GridKind::Isometric => snap_to_isometric_grid(point, self.spacing, self.iso_angle).point,
        }
    }

    fn is_major(&self, index: i64) -> bool {
        index.rem_euclid(i64::from(self.major_line_frequency)) == 0
    }

    /// Lines covering `bounds` for rendering.
    pub fn lines(&self, bounds: Rect) -> Vec<GridLine> {
        match self.kind {
            GridKind::None => Vec::new(),
            GridKind::Cartesian => {
                let mut out = Vec::new();
                let s = self.spacing;
                let (x0, x1) = ((bounds.x0 / s).ceil() as i64, (bounds.x1 / s).floor() as i64);
                let (y0, y1) = ((bounds.y0 / s).ceil() as i64, (bounds.y1 / s).floor() as i64);
                let majors_only = x1 - x0 > MAX_LINES_PER_FAMILY || y1 - y0 > MAX_LINES_PER_FAMILY;
                for i in x0..=x1 {
                    let major = self.is_major(i);
                    if majors_only && !major {
                        continue;
                    }
                    let x = i as f64 * s;
                    out.push(GridLine {
                        line: GuideLine::new(Point::new(x, bounds.y0), Point::new(x, bounds.y1)),
                        major,
                    });
                }
                for j in y0..=y1 {
                    let major = self.is_major(j);
                    if majors_only && !major {
                        continue;
                    }
                    let y = j as f64 * s;
                    out.push(GridLine {
                        line: GuideLine::new(Point::new(bounds.x0, y), Point::new(bounds.x1, y)),
                        major,
                    });
                }
                out
            }
            GridKind::Isometric => {
                let (u, v) = isometric_basis(self.spacing, self.iso_angle);
                let mut out = self.lattice_family(bounds, u, v);
                out.extend(self.lattice_family(bounds, v, u));
                out
            }
        }
    }

    /// Lines running along `along`, one per integer step of `across`.
    fn lattice_family(&self, bounds: Rect, along: Vec2, across: Vec2) -> Vec<GridLine> {
        let det = along.cross(across);
        if det.abs() < 1e-9 {
            return Vec::new();
        }
        let corners = [
            Point::new(bounds.x0, bounds.y0),
            Point::new(bounds.x1, bounds.y0),
            Point::new(bounds.x1, bounds.y1),
            Point::new(bounds.x0, bounds.y1),
        ];
        // p = s * along + t * across
        let coords = corners.map(|c| {
            let p = c.to_vec2();
            (p.cross(across) / det, along.cross(p) / det)
        });
        let s_min = coords.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let s_max = coords.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let t_min = coords.iter().map(|c| c.1).fold(f64::INFINITY, f64::min).floor() as i64;
        let t_max = coords.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max).ceil() as i64;
        let majors_only = t_max - t_min > MAX_LINES_PER_FAMILY;

        let mut out = Vec::new();
        for t in t_min..=t_max {
            let major = self.is_major(t);
            if majors_only && !major {
                continue;
            }
            let base = across * t as f64;
            out.push(GridLine {
                line: GuideLine::new(
                    (base + along * s_min).to_point(),
                    (base + along * s_max).to_point(),
                ),
                major,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_clamp() {
        let mut grid = GridGuide::default();
        grid.set_spacing(0.0);
        assert_eq!(grid.spacing(), MIN_GRID_SPACING);
        grid.set_major_line_frequency(0);
        assert_eq!(grid.major_line_frequency(), 1);
        grid.set_spacing(f64::NAN);
        assert_eq!(grid.spacing(), DEFAULT_GRID_SPACING);
    }

    #[test]
    fn test_none_grid_does_not_snap() {
        let grid = GridGuide::default();
        let p = Point::new(13.0, 17.0);
        assert_eq!(grid.snap(p), p);
    }

    #[test]
    fn test_cartesian_snap_idempotent() {
        let grid = GridGuide::new(GridKind::Cartesian, 25.0, 4, DEFAULT_ISO_ANGLE);
        let once = grid.snap(Point::new(61.0, -12.6));
        assert_eq!(once, Point::new(50.0, -25.0));
        assert_eq!(grid.snap(once), once);
    }

    #[test]
    fn test_cartesian_lines_mark_majors() {
        let grid = GridGuide::new(GridKind::Cartesian, 10.0, 5, DEFAULT_ISO_ANGLE);
        let lines = grid.lines(Rect::new(0.0, 0.0, 100.0, 50.0));
        // 11 vertical + 6 horizontal
        assert_eq!(lines.len(), 17);
        let majors = lines.iter().filter(|l| l.major).count();
        // x = 0, 50, 100 and y = 0, 50
        assert_eq!(majors, 5);
    }

    #[test]
    fn test_isometric_lines_cover_bounds() {
        let grid = GridGuide::new(GridKind::Isometric, 20.0, 5, 60.0);
        let lines = grid.lines(Rect::new(0.0, 0.0, 200.0, 200.0));
        assert!(!lines.is_empty());
        assert!(lines.iter().any(|l| l.major));
    }
}
