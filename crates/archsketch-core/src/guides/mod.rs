//! Guide system: geometric aids that constrain stroke input.
//!
//! Guides are created lazily with canvas-relative defaults the first time they
//! are activated and are persisted verbatim with the project. Locking freezes
//! their geometry without disabling projection or snapping.

mod grid;
mod mirror;
mod orthogonal;
mod perspective;
mod ruler;

pub use grid::{DEFAULT_GRID_SPACING, DEFAULT_ISO_ANGLE, GridGuide, GridKind, GridLine, MIN_GRID_SPACING};
pub use mirror::MirrorGuide;
pub use orthogonal::OrthogonalGuide;
pub use perspective::{AxisLines, ExtraLines, PerspectiveAxis, PerspectiveGuide, VanishingPoint};
pub use ruler::RulerGuide;

use crate::snap::normalize_degrees;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier for line guides.
pub type GuideId = uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GuideKind {
    Ruler,
    Mirror,
    Perspective,
    Orthogonal,
    Grid,
}

/// Which end of a line a handle controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnd {
    Start,
    End,
}

/// A draggable guide control point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuideHandle {
    Ruler(LineEnd),
    Mirror(LineEnd),
    PerspectiveLine {
        axis: PerspectiveAxis,
        index: usize,
        end: LineEnd,
    },
    GuidePoint,
}

/// Per-gesture constraint requests made by the drawing tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstrainOptions {
    /// Project onto the ruler line.
    pub ruler_lock: bool,
    /// Perspective stroke-lock.
    pub stroke_lock: bool,
}

/// Which constraint produced a constrained point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    None,
    Perspective(PerspectiveAxis),
    Orthogonal,
    Ruler,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constrained {
    pub point: Point,
    pub constraint: Constraint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideSystem {
    pub ruler: Option<RulerGuide>,
    pub mirror: Option<MirrorGuide>,
    pub perspective: Option<PerspectiveGuide>,
    pub orthogonal: Option<OrthogonalGuide>,
    pub grid: GridGuide,
    active: BTreeSet<GuideKind>,
    /// Snap to the grid while drawing (requires the grid to be active).
    pub snap_to_grid: bool,
    /// Freeze guide geometry.
    pub locked: bool,
}

impl GuideSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, kind: GuideKind) -> bool {
        self.active.contains(&kind)
    }

    pub fn active_kinds(&self) -> impl Iterator<Item = GuideKind> + '_ {
        self.active.iter().copied()
    }

    /// Activate a guide, creating it with canvas-relative defaults if needed.
    pub fn activate(&mut self, kind: GuideKind, canvas: Size) {
        match kind {
            GuideKind::Ruler => {
                self.ruler.get_or_insert_with(|| RulerGuide::default_for(canvas));
            }
            GuideKind::Mirror => {
                self.mirror.get_or_insert_with(|| MirrorGuide::default_for(canvas));
            }
            GuideKind::Perspective => {
                self.perspective.get_or_insert_with(|| PerspectiveGuide::default_for(canvas));
            }
            GuideKind::Orthogonal => {
                self.orthogonal.get_or_insert_with(OrthogonalGuide::default);
            }
            GuideKind::Grid => {
                if self.grid.kind == GridKind::None {
                    self.grid.kind = GridKind::Cartesian;
                }
            }
        }
        if self.active.insert(kind) {
            log::debug!("Guide {:?} activated", kind);
        }
    }

    /// Deactivate a guide. Its geometry is kept for the next activation.
    pub fn deactivate(&mut self, kind: GuideKind) {
        if self.active.remove(&kind) {
            log::debug!("Guide {:?} deactivated", kind);
        }
    }

    pub fn toggle(&mut self, kind: GuideKind, canvas: Size) {
        if self.is_active(kind) {
            self.deactivate(kind);
        } else {
            self.activate(kind, canvas);
        }
    }

    pub fn active_ruler(&self) -> Option<&RulerGuide> {
        self.ruler.as_ref().filter(|_| self.is_active(GuideKind::Ruler))
    }

    pub fn active_mirror(&self) -> Option<&MirrorGuide> {
        self.mirror.as_ref().filter(|_| self.is_active(GuideKind::Mirror))
    }

    pub fn active_perspective(&self) -> Option<&PerspectiveGuide> {
        self.perspective.as_ref().filter(|_| self.is_active(GuideKind::Perspective))
    }

    pub fn active_orthogonal(&self) -> Option<&OrthogonalGuide> {
        self.orthogonal.as_ref().filter(|_| self.is_active(GuideKind::Orthogonal))
    }

    /// Grid is drawn when active and of a real kind.
    pub fn active_grid(&self) -> Option<&GridGuide> {
        (self.is_active(GuideKind::Grid) && self.grid.kind != GridKind::None).then_some(&self.grid)
    }

    /// Project a free-drawn point through the active guides.
    ///
    /// Order: perspective stroke-lock, orthogonal lock, ruler lock, then grid
    /// snap. Line locks need an `anchor` (the stroke start) except the ruler.
    /// Grid snapping only applies when no line lock did, so locked strokes stay
    /// on their line.
    pub fn constrain(&self, anchor: Option<Point>, point: Point, options: ConstrainOptions) -> Constrained {
        if let (Some(anchor), true) = (anchor, options.stroke_lock) {
            if let Some((axis, locked)) = self.active_perspective().and_then(|g| g.lock(Some(anchor), point)) {
                return Constrained { point: locked, constraint: Constraint::Perspective(axis) };
            }
        }
        if let (Some(anchor), Some(ortho)) = (anchor, self.active_orthogonal()) {
            return Constrained {
                point: ortho.project(anchor, point),
                constraint: Constraint::Orthogonal,
            };
        }
        if options.ruler_lock {
            if let Some(ruler) = self.active_ruler().filter(|r| !r.line().is_degenerate()) {
                return Constrained { point: ruler.project(point), constraint: Constraint::Ruler };
            }
        }
        self.snap(point)
    }

    /// Grid snap only.
    pub fn snap(&self, point: Point) -> Constrained {
        match self.active_grid().filter(|_| self.snap_to_grid) {
            Some(grid) => Constrained { point: grid.snap(point), constraint: Constraint::Grid },
            None => Constrained { point, constraint: Constraint::None },
        }
    }

    /// Reflected twin of a stroke path, when the mirror guide is active.
    pub fn mirror_path(&self, path: &[Point]) -> Option<Vec<Point>> {
        self.active_mirror()?.reflect_path(path)
    }

    /// Mirrored twin of a single point.
    pub fn mirror_point(&self, point: Point) -> Option<Point> {
        self.active_mirror()?.reflect_point(point)
    }

    /// All handles of active guides with their canvas positions.
    pub fn handles(&self) -> Vec<(GuideHandle, Point)> {
        let mut out = Vec::new();
        if let Some(r) = self.active_ruler() {
            out.push((GuideHandle::Ruler(LineEnd::Start), r.start));
            out.push((GuideHandle::Ruler(LineEnd::End), r.end));
        }
        if let Some(m) = self.active_mirror() {
            out.push((GuideHandle::Mirror(LineEnd::Start), m.start));
            out.push((GuideHandle::Mirror(LineEnd::End), m.end));
        }
        if let Some(p) = self.active_perspective() {
            for axis in PerspectiveAxis::ALL {
                for (index, line) in p.axis_lines(axis).iter().enumerate() {
                    out.push((GuideHandle::PerspectiveLine { axis, index, end: LineEnd::Start }, line.start));
                    out.push((GuideHandle::PerspectiveLine { axis, index, end: LineEnd::End }, line.end));
                }
            }
            out.push((GuideHandle::GuidePoint, p.guide_point));
        }
        out
    }

    /// Nearest handle within `tolerance` (canvas units). Locked guides have none.
    pub fn hit_test_handle(&self, point: Point, tolerance: f64) -> Option<GuideHandle> {
        if self.locked {
            return None;
        }
        self.handles()
            .into_iter()
            .map(|(h, p)| (h, p.distance(point)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(h, _)| h)
    }

    /// Move a handle to `to`. Returns false while locked.
    pub fn drag_handle(&mut self, handle: GuideHandle, to: Point) -> bool {
        if self.locked {
            log::debug!("Guide drag ignored: guides are locked");
            return false;
        }
        fn set(end: LineEnd, start: &mut Point, finish: &mut Point, to: Point) {
            match end {
                LineEnd::Start => *start = to,
                LineEnd::End => *finish = to,
            }
        }
        match handle {
            GuideHandle::Ruler(end) => match self.ruler.as_mut() {
                Some(r) => set(end, &mut r.start, &mut r.end, to),
                None => return false,
            },
            GuideHandle::Mirror(end) => match self.mirror.as_mut() {
                Some(m) => set(end, &mut m.start, &mut m.end, to),
                None => return false,
            },
            GuideHandle::PerspectiveLine { axis, index, end } => {
                let Some(line) = self.perspective.as_mut().and_then(|p| p.axis_lines_mut(axis).get_mut(index)) else {
                    return false;
                };
                set(end, &mut line.start, &mut line.end, to);
            }
            GuideHandle::GuidePoint => match self.perspective.as_mut() {
                Some(p) => p.guide_point = to,
                None => return false,
            },
        }
        true
    }

    /// Rotate the orthogonal frame. Returns false while locked or inactive.
    pub fn set_orthogonal_angle(&mut self, degrees: f64) -> bool {
        if self.locked || !degrees.is_finite() {
            return false;
        }
        match self.orthogonal.as_mut() {
            Some(o) => {
                o.angle = normalize_degrees(degrees);
                true
            }
            None => false,
        }
    }

    pub fn add_perspective_line(&mut self, axis: PerspectiveAxis, through: Point) -> bool {
        if self.locked {
            return false;
        }
        self.perspective.as_mut().is_some_and(|p| p.add_extra_line(axis, through))
    }

    pub fn clear_perspective_lines(&mut self) -> bool {
        if self.locked {
            return false;
        }
        match self.perspective.as_mut() {
            Some(p) => {
                p.clear_extra_lines();
                true
            }
            None => false,
        }
    }

    /// Re-clamp values that may come from a persisted project.
    pub fn sanitized(mut self) -> Self {
        self.grid = self.grid.sanitized();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: Size = Size::new(800.0, 600.0);

    #[test]
    fn test_lazy_activation_with_defaults() {
        let mut guides = GuideSystem::new();
        assert!(guides.ruler.is_none());
        guides.activate(GuideKind::Ruler, CANVAS);
        let ruler = guides.active_ruler().unwrap();
        assert!((ruler.start.y - 300.0).abs() < 1e-9);

        // Geometry survives deactivation.
        guides.drag_handle(GuideHandle::Ruler(LineEnd::End), Point::new(700.0, 400.0));
        guides.deactivate(GuideKind::Ruler);
        assert!(guides.active_ruler().is_none());
        guides.activate(GuideKind::Ruler, CANVAS);
        assert_eq!(guides.active_ruler().unwrap().end, Point::new(700.0, 400.0));
    }

    #[test]
    fn test_locked_guides_reject_edits_but_still_project() {
        let mut guides = GuideSystem::new();
        guides.activate(GuideKind::Ruler, CANVAS);
        guides.locked = true;
        let before = guides.ruler.clone();
        assert!(!guides.drag_handle(GuideHandle::Ruler(LineEnd::Start), Point::ZERO));
        assert_eq!(guides.ruler, before);
        assert!(guides.hit_test_handle(Point::new(160.0, 300.0), 10.0).is_none());

        let c = guides.constrain(None, Point::new(400.0, 350.0), ConstrainOptions { ruler_lock: true, ..Default::default() });
        assert_eq!(c.constraint, Constraint::Ruler);
        assert!((c.point.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_ruler_is_decorative_without_lock() {
        let mut guides = GuideSystem::new();
        guides.activate(GuideKind::Ruler, CANVAS);
        let p = Point::new(400.0, 350.0);
        let c = guides.constrain(None, p, ConstrainOptions::default());
        assert_eq!(c.point, p);
        assert_eq!(c.constraint, Constraint::None);
    }

    #[test]
    fn test_hit_test_picks_nearest_handle() {
        let mut guides = GuideSystem::new();
        guides.activate(GuideKind::Mirror, CANVAS);
        let hit = guides.hit_test_handle(Point::new(402.0, 3.0), 8.0);
        assert_eq!(hit, Some(GuideHandle::Mirror(LineEnd::Start)));
        assert!(guides.hit_test_handle(Point::new(200.0, 200.0), 8.0).is_none());
    }

    #[test]
    fn test_grid_snap_requires_flag_and_activation() {
        let mut guides = GuideSystem::new();
        let p = Point::new(23.0, 47.0);
        assert_eq!(guides.snap(p).point, p);
        guides.activate(GuideKind::Grid, CANVAS);
        assert_eq!(guides.snap(p).point, p);
        guides.snap_to_grid = true;
        assert_eq!(guides.snap(p).point, Point::new(20.0, 40.0));
    }

    #[test]
    fn test_orthogonal_before_grid() {
        let mut guides = GuideSystem::new();
        guides.activate(GuideKind::Orthogonal, CANVAS);
        guides.activate(GuideKind::Grid, CANVAS);
        guides.snap_to_grid = true;
        let anchor = Point::new(10.0, 10.0);
        let c = guides.constrain(Some(anchor), Point::new(57.0, 13.0), ConstrainOptions::default());
        assert_eq!(c.constraint, Constraint::Orthogonal);
        assert!((c.point.y - 10.0).abs() < 1e-9);
        // Without an anchor the grid wins.
        let c = guides.constrain(None, Point::new(57.0, 13.0), ConstrainOptions::default());
        assert_eq!(c.constraint, Constraint::Grid);
    }

    #[test]
    fn test_mirror_path_only_when_active() {
        let mut guides = GuideSystem::new();
        let path = [Point::new(100.0, 100.0)];
        assert!(guides.mirror_path(&path).is_none());
        guides.activate(GuideKind::Mirror, CANVAS);
        let twin = guides.mirror_path(&path).unwrap();
        assert!((twin[0].x - 700.0).abs() < 1e-9);
    }

    #[test]
    fn test_serde_roundtrip_is_verbatim() {
        let mut guides = GuideSystem::new();
        guides.activate(GuideKind::Perspective, CANVAS);
        guides.activate(GuideKind::Ruler, CANVAS);
        guides.add_perspective_line(PerspectiveAxis::Green, Point::new(10.0, 20.0));
        let json = serde_json::to_string(&guides).unwrap();
        let back: GuideSystem = serde_json::from_str(&json).unwrap();
        assert!(back.is_active(GuideKind::Perspective));
        assert!(back.is_active(GuideKind::Ruler));
        assert!(!back.is_active(GuideKind::Mirror));
        let ruler = back.ruler.as_ref().unwrap();
        assert_eq!(ruler.id, guides.ruler.as_ref().unwrap().id);
        assert!((ruler.start - guides.ruler.as_ref().unwrap().start).hypot() < 1e-9);
        let extra = back.perspective.as_ref().unwrap().extra_lines(PerspectiveAxis::Green);
        assert_eq!(extra.len(), 1);
    }
}
