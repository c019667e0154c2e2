//! Manipulation handles for the crop and transform tools.

use crate::geometry::{rotate_about, Quad};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 12.0;
/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 16.0;
/// Distance from the box edge to the rotation handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;
/// Smallest box a resize may produce, in canvas pixels.
pub const MIN_BOX_SIZE: f64 = 1.0;

/// Type of manipulation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner(Corner),
    Edge(Edge),
    /// Rotation handle (positioned outside the box).
    Rotate,
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::TopLeft, Corner::TopRight, Corner::BottomRight, Corner::BottomLeft];

    pub fn of_quad(self, quad: &Quad) -> Point {
        match self {
            Corner::TopLeft => quad.tl,
            Corner::TopRight => quad.tr,
            Corner::BottomRight => quad.br,
            Corner::BottomLeft => quad.bl,
        }
    }

    pub fn of_quad_mut(self, quad: &mut Quad) -> &mut Point {
        match self {
            Corner::TopLeft => &mut quad.tl,
            Corner::TopRight => &mut quad.tr,
            Corner::BottomRight => &mut quad.br,
            Corner::BottomLeft => &mut quad.bl,
        }
    }

    /// Unit offset from the box centre (-1 or 1 on each axis).
    fn sign(self) -> Vec2 {
        match self {
            Corner::TopLeft => Vec2::new(-1.0, -1.0),
            Corner::TopRight => Vec2::new(1.0, -1.0),
            Corner::BottomRight => Vec2::new(1.0, 1.0),
            Corner::BottomLeft => Vec2::new(-1.0, 1.0),
        }
    }
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];

    fn sign(self) -> Vec2 {
        match self {
            Edge::Top => Vec2::new(0.0, -1.0),
            Edge::Right => Vec2::new(1.0, 0.0),
            Edge::Bottom => Vec2::new(0.0, 1.0),
            Edge::Left => Vec2::new(-1.0, 0.0),
        }
    }
}

/// A handle with its position and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in canvas coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a point (in canvas coordinates) hits this handle.
    /// `tolerance` should be adjusted for zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// Corner and edge handles of an axis-aligned rectangle.
pub fn rect_handles(bounds: Rect) -> Vec<Handle> {
    rotated_box_handles(bounds.center(), bounds.size(), 0.0, None)
}

/// Corner, edge and optionally rotation handles for a box of `size` centred
/// on `center` and rotated by `rotation` radians. `rotate_offset` is in
/// canvas units.
pub fn rotated_box_handles(center: Point, size: Size, rotation: f64, rotate_offset: Option<f64>) -> Vec<Handle> {
    let half = Vec2::new(size.width / 2.0, size.height / 2.0);
    let place = |sign: Vec2| -> Point {
        let local = center + Vec2::new(sign.x * half.x, sign.y * half.y);
        rotate_about(local, center, rotation)
    };
    let mut handles: Vec<Handle> = Corner::ALL
        .iter()
        .map(|c| Handle::new(place(c.sign()), HandleKind::Corner(*c)))
        .chain(Edge::ALL.iter().map(|e| Handle::new(place(e.sign()), HandleKind::Edge(*e))))
        .collect();
    if let Some(offset) = rotate_offset {
        let top = center + Vec2::new(0.0, -half.y - offset);
        handles.push(Handle::new(rotate_about(top, center, rotation), HandleKind::Rotate));
    }
    handles
}

/// Corner handles of a free quad.
pub fn quad_handles(quad: &Quad) -> Vec<Handle> {
    Corner::ALL
        .iter()
        .map(|c| Handle::new(c.of_quad(quad), HandleKind::Corner(*c)))
        .collect()
}

/// Find which handle (if any) is hit at the given point.
pub fn hit_test_handles(handles: &[Handle], point: Point, tolerance: f64) -> Option<HandleKind> {
    handles
        .iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.kind)
}

/// Resize `bounds` by dragging one of its handles by `delta`.
///
/// The opposite side stays fixed. Rectangles never flip or shrink below
/// [`MIN_BOX_SIZE`]. With `keep_aspect_ratio` a corner drag keeps the
/// original width/height ratio.
pub fn resize_rect(bounds: Rect, handle: HandleKind, delta: Vec2, keep_aspect_ratio: bool) -> Rect {
    let Rect { mut x0, mut y0, mut x1, mut y1 } = bounds;
    match handle {
        HandleKind::Rotate => return bounds,
        HandleKind::Edge(Edge::Top) => y0 = (y0 + delta.y).min(y1 - MIN_BOX_SIZE),
        HandleKind::Edge(Edge::Bottom) => y1 = (y1 + delta.y).max(y0 + MIN_BOX_SIZE),
        HandleKind::Edge(Edge::Left) => x0 = (x0 + delta.x).min(x1 - MIN_BOX_SIZE),
        HandleKind::Edge(Edge::Right) => x1 = (x1 + delta.x).max(x0 + MIN_BOX_SIZE),
        HandleKind::Corner(corner) => {
            let sign = corner.sign();
            let mut width = (bounds.width() + sign.x * delta.x).max(MIN_BOX_SIZE);
            let mut height = (bounds.height() + sign.y * delta.y).max(MIN_BOX_SIZE);
            if keep_aspect_ratio && bounds.height() > 0.0 {
                let aspect = bounds.width() / bounds.height();
                if width / aspect > height {
                    height = width / aspect;
                } else {
                    width = height * aspect;
                }
            }
            if sign.x < 0.0 {
                x0 = x1 - width;
            } else {
                x1 = x0 + width;
            }
            if sign.y < 0.0 {
                y0 = y1 - height;
            } else {
                y1 = y0 + height;
            }
        }
    }
    Rect::new(x0, y0, x1, y1)
}

/// Rotation (radians, 0 = handle straight up) for a cursor dragged around
/// `center`. `snap_degrees` rounds to the given increment.
pub fn rotation_from_cursor(center: Point, cursor: Point, snap_degrees: Option<f64>) -> f64 {
    let d = cursor - center;
    let mut angle = d.y.atan2(d.x) + std::f64::consts::FRAC_PI_2;
    if let Some(step) = snap_degrees.filter(|s| *s > 0.0) {
        let step = step.to_radians();
        angle = (angle / step).round() * step;
    }
    angle
}
