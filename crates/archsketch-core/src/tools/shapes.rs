//! Multi-click shape tools: line, polyline, arc, bezier, rectangle, circle
//! and 3D box.
//!
//! Shapes are previewed in the overlay and rasterized once on commit.

use super::{OverlayPrimitive, Tool, ToolAction, ToolContext, CLICK_DRAG_THRESHOLD};
use crate::geometry::{bounding_box, convex_hull, point_in_polygon, polyline_length, GEOMETRY_EPSILON};
use crate::input::{Key, Modifiers, MouseButton, PointerEvent};
use crate::snap::snap_line_endpoint;
use kurbo::{BezPath, PathEl, Point, Rect, Shape as _, Vec2};
use serde::{Deserialize, Serialize};

/// Flattening tolerance for curves, in canvas pixels.
const FLATTEN_TOLERANCE: f64 = 0.25;
/// Consecutive vertices closer than this are merged on finish.
const DUPLICATE_VERTEX_DISTANCE: f64 = 0.5;
/// Shapes smaller than this (canvas pixels) are discarded.
pub const MIN_SHAPE_EXTENT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    Line,
    Polyline,
    Arc,
    Bezier,
    Rectangle,
    Circle,
    Box3D,
}

impl ShapeKind {
    /// Vertex count that commits the shape, `None` for open-ended shapes.
    pub fn required_vertices(self) -> Option<usize> {
        match self {
            ShapeKind::Line | ShapeKind::Rectangle | ShapeKind::Circle => Some(2),
            ShapeKind::Arc => Some(3),
            ShapeKind::Box3D => Some(4),
            ShapeKind::Polyline | ShapeKind::Bezier => None,
        }
    }

    /// Finished by double-click, Enter or closing the loop.
    pub fn is_open_ended(self) -> bool {
        self.required_vertices().is_none()
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Line => "Line",
            ShapeKind::Polyline => "Polyline",
            ShapeKind::Arc => "Arc",
            ShapeKind::Bezier => "Bezier",
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Circle => "Circle",
            ShapeKind::Box3D => "3D box",
        }
    }
}

/// Finished shape geometry in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeometry {
    Line { start: Point, end: Point },
    Polyline { points: Vec<Point>, closed: bool },
    /// Circular arc from `start` to `end` passing through `through`.
    Arc { start: Point, end: Point, through: Point },
    /// Smooth curve through `points` (Catmull-Rom).
    Bezier { points: Vec<Point>, closed: bool },
    Rectangle(Rect),
    Circle { center: Point, radius: f64 },
    /// Parallelepiped: bottom face 0..4, top face 4..8.
    Box3D { vertices: [Point; 8], hidden_vertex: Option<usize> },
}

/// Box edges as vertex index pairs.
const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1), (1, 2), (2, 3), (3, 0),
    (4, 5), (5, 6), (6, 7), (7, 4),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

impl ShapeGeometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeGeometry::Line { .. } => ShapeKind::Line,
            ShapeGeometry::Polyline { .. } => ShapeKind::Polyline,
            ShapeGeometry::Arc { .. } => ShapeKind::Arc,
            ShapeGeometry::Bezier { .. } => ShapeKind::Bezier,
            ShapeGeometry::Rectangle(_) => ShapeKind::Rectangle,
            ShapeGeometry::Circle { .. } => ShapeKind::Circle,
            ShapeGeometry::Box3D { .. } => ShapeKind::Box3D,
        }
    }

    /// Circle inscribed in the box spanned by two corners.
    pub fn circle_in(a: Point, b: Point) -> Self {
        let rect = Rect::from_points(a, b);
        ShapeGeometry::Circle {
            center: rect.center(),
            radius: rect.width().min(rect.height()) / 2.0,
        }
    }

    /// Box from four clicks: front edge `a-b`, depth to `c`, height to `d`.
    /// With `solid`, the three edges meeting at the hidden back vertex are
    /// left out.
    pub fn box_from_clicks(a: Point, b: Point, c: Point, d: Point, solid: bool) -> Self {
        let width = b - a;
        let depth = c - b;
        let height = d - c;
        let bottom = [a, a + width, a + width + depth, a + depth];
        let mut vertices = [Point::ZERO; 8];
        for (i, v) in bottom.iter().enumerate() {
            vertices[i] = *v;
            vertices[i + 4] = *v + height;
        }
        let hidden_vertex = if solid { hidden_box_vertex(&vertices) } else { None };
        ShapeGeometry::Box3D { vertices, hidden_vertex }
    }

    /// Flattened polylines with their closed flag.
    pub fn paths(&self) -> Vec<(Vec<Point>, bool)> {
        match self {
            ShapeGeometry::Line { start, end } => vec![(vec![*start, *end], false)],
            ShapeGeometry::Polyline { points, closed } => vec![(points.clone(), *closed && points.len() > 2)],
            ShapeGeometry::Arc { start, end, through } => match arc_through(*start, *end, *through) {
                Some(arc) => flatten(&arc.to_path(FLATTEN_TOLERANCE)),
                None => vec![(vec![*start, *end], false)],
            },
            ShapeGeometry::Bezier { points, closed } => flatten(&catmull_rom(points, *closed)),
            ShapeGeometry::Rectangle(rect) => {
                let q = [
                    Point::new(rect.x0, rect.y0),
                    Point::new(rect.x1, rect.y0),
                    Point::new(rect.x1, rect.y1),
                    Point::new(rect.x0, rect.y1),
                ];
                vec![(q.to_vec(), true)]
            }
            ShapeGeometry::Circle { center, radius } => {
                flatten(&kurbo::Circle::new(*center, *radius).to_path(FLATTEN_TOLERANCE))
            }
            ShapeGeometry::Box3D { vertices, hidden_vertex } => BOX_EDGES
                .iter()
                .filter(|(i, j)| Some(*i) != *hidden_vertex && Some(*j) != *hidden_vertex)
                .map(|(i, j)| (vec![vertices[*i], vertices[*j]], false))
                .collect(),
        }
    }

    pub fn bounds(&self) -> Rect {
        let points: Vec<Point> = self.paths().into_iter().flat_map(|(p, _)| p).collect();
        bounding_box(&points).unwrap_or(Rect::ZERO)
    }

    /// Too small to draw: rectangles and circles need both extents, other
    /// shapes need at least one.
    pub fn is_degenerate(&self) -> bool {
        match self {
            ShapeGeometry::Rectangle(rect) => rect.width() < MIN_SHAPE_EXTENT || rect.height() < MIN_SHAPE_EXTENT,
            ShapeGeometry::Circle { radius, .. } => *radius * 2.0 < MIN_SHAPE_EXTENT,
            ShapeGeometry::Polyline { points, .. } | ShapeGeometry::Bezier { points, .. } => {
                points.len() < 2 || polyline_length(points) < MIN_SHAPE_EXTENT
            }
            _ => {
                let b = self.bounds();
                b.width().max(b.height()) < MIN_SHAPE_EXTENT
            }
        }
    }
}

/// The back vertex that falls inside the box silhouette.
fn hidden_box_vertex(vertices: &[Point; 8]) -> Option<usize> {
    let hull = convex_hull(vertices);
    if hull.len() < 3 {
        return None;
    }
    let on_hull = |p: Point| hull.iter().any(|h| h.distance(p) < GEOMETRY_EPSILON);
    // Vertices reached through the depth edge form the back face.
    [3, 2, 7, 6]
        .into_iter()
        .find(|&i| !on_hull(vertices[i]) && point_in_polygon(vertices[i], &hull))
}

/// Circumcircle arc through three points; `None` when they are collinear.
fn arc_through(start: Point, end: Point, through: Point) -> Option<kurbo::Arc> {
    let (ax, ay) = (start.x, start.y);
    let (bx, by) = (through.x, through.y);
    let (cx, cy) = (end.x, end.y);
    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < GEOMETRY_EPSILON {
        return None;
    }
    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let center = Point::new(
        (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d,
        (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d,
    );
    let radius = center.distance(start);
    let angle = |p: Point| (p.y - center.y).atan2(p.x - center.x);
    let tau = std::f64::consts::TAU;
    let a0 = angle(start);
    let sweep = (angle(end) - a0).rem_euclid(tau);
    let mid = (angle(through) - a0).rem_euclid(tau);
    // Go the way that passes through the middle point.
    let sweep = if mid <= sweep { sweep } else { sweep - tau };
    Some(kurbo::Arc {
        center,
        radii: Vec2::new(radius, radius),
        start_angle: a0,
        sweep_angle: sweep,
        x_rotation: 0.0,
    })
}

/// Catmull-Rom spline through `points` as cubic Beziers.
fn catmull_rom(points: &[Point], closed: bool) -> BezPath {
    let mut path = BezPath::new();
    let n = points.len();
    let Some(&first) = points.first() else {
        return path;
    };
    path.move_to(first);
    if n < 2 {
        return path;
    }
    let closed = closed && n > 2;
    let at = |i: isize| -> Point {
        if closed {
            points[i.rem_euclid(n as isize) as usize]
        } else {
            points[i.clamp(0, n as isize - 1) as usize]
        }
    };
    let segments = if closed { n } else { n - 1 };
    for i in 0..segments as isize {
        let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
        let c1 = p1 + (p2 - p0) / 6.0;
        let c2 = p2 - (p3 - p1) / 6.0;
        path.curve_to(c1, c2, p2);
    }
    if closed {
        path.close_path();
    }
    path
}

fn flatten(path: &BezPath) -> Vec<(Vec<Point>, bool)> {
    let mut out = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    kurbo::flatten(path.elements().iter().copied(), FLATTEN_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            if current.len() > 1 {
                out.push((std::mem::take(&mut current), false));
            }
            current.clear();
            current.push(p);
        }
        PathEl::LineTo(p) => current.push(p),
        PathEl::ClosePath => {
            if current.len() > 1 {
                out.push((std::mem::take(&mut current), true));
            }
            current.clear();
        }
        _ => {}
    });
    if current.len() > 1 {
        out.push((current, false));
    }
    out
}

/// Shape capture state machine.
///
/// Fixed-count shapes commit when the last vertex lands, either by clicking
/// each vertex or by press-drag-release. Open-ended shapes commit on
/// double-click, Enter, or a click near the first vertex (closing the loop).
#[derive(Debug, Clone, Default)]
pub struct ShapeTool {
    kind: ShapeKind,
    vertices: Vec<Point>,
    cursor: Option<Point>,
    /// Screen position of the press that placed the last vertex.
    press: Option<Point>,
}

impl ShapeTool {
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: ShapeKind) {
        self.reset();
        self.kind = kind;
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    fn reset(&mut self) {
        self.vertices.clear();
        self.cursor = None;
        self.press = None;
    }

    /// Screen position to constrained canvas position for the next vertex.
    fn acquire(&self, ctx: &ToolContext, screen: Point, modifiers: Modifiers) -> Point {
        let last = self.vertices.last().copied();
        match (self.kind, last) {
            // Box corners only snap; a line lock would flatten the box.
            (ShapeKind::Rectangle | ShapeKind::Circle, Some(_)) => ctx.snapped(screen),
            (ShapeKind::Line, Some(start)) if modifiers.shift => {
                let raw = ctx.canvas_point(screen);
                snap_line_endpoint(start, raw, ctx.options.angle_snap_increment).point
            }
            _ => ctx.constrain(last, screen).point,
        }
    }

    fn build(&self, vertices: &[Point], closed: bool, solid: bool) -> Option<ShapeGeometry> {
        let v = vertices;
        let geometry = match self.kind {
            ShapeKind::Line => ShapeGeometry::Line { start: *v.first()?, end: *v.get(1)? },
            ShapeKind::Rectangle => ShapeGeometry::Rectangle(Rect::from_points(*v.first()?, *v.get(1)?)),
            ShapeKind::Circle => ShapeGeometry::circle_in(*v.first()?, *v.get(1)?),
            ShapeKind::Arc => ShapeGeometry::Arc { start: *v.first()?, end: *v.get(1)?, through: *v.get(2)? },
            ShapeKind::Polyline => ShapeGeometry::Polyline { points: v.to_vec(), closed },
            ShapeKind::Bezier => ShapeGeometry::Bezier { points: v.to_vec(), closed },
            ShapeKind::Box3D => ShapeGeometry::box_from_clicks(*v.first()?, *v.get(1)?, *v.get(2)?, *v.get(3)?, solid),
        };
        Some(geometry)
    }

    /// Geometry including the floating cursor vertex.
    pub fn preview(&self, solid: bool) -> Option<ShapeGeometry> {
        let mut points = self.vertices.clone();
        points.extend(self.cursor);
        let last = *points.last()?;
        if let Some(required) = self.kind.required_vertices() {
            // Missing vertices collapse onto the last one.
            while points.len() < required {
                points.push(last);
            }
            points.truncate(required);
        }
        if points.len() == 2 && self.kind == ShapeKind::Arc {
            points.push(points[1]);
        }
        self.build(&points, false, solid)
    }

    fn finish(&mut self, closed: bool, solid: bool) -> ToolAction {
        let mut points = std::mem::take(&mut self.vertices);
        points.dedup_by(|b, a| a.distance(*b) < DUPLICATE_VERTEX_DISTANCE);
        self.reset();
        match self.build(&points, closed, solid) {
            Some(geometry) if !geometry.is_degenerate() => {
                log::debug!("{} committed with {} vertices", self.kind.name(), points.len());
                ToolAction::CommitShape(geometry)
            }
            _ => {
                log::debug!("{} discarded: zero-size geometry", self.kind.name());
                ToolAction::Discarded
            }
        }
    }

    fn place_vertex(&mut self, ctx: &ToolContext, p: Point) -> ToolAction {
        self.vertices.push(p);
        self.cursor = Some(p);
        match self.kind.required_vertices() {
            Some(required) if self.vertices.len() >= required => self.finish(false, ctx.options.box_solid),
            _ => ToolAction::Preview,
        }
    }
}

impl Tool for ShapeTool {
    fn pointer(&mut self, ctx: &ToolContext, event: &PointerEvent) -> ToolAction {
        match *event {
            PointerEvent::Down { position, button: MouseButton::Left, modifiers } => {
                let p = self.acquire(ctx, position, modifiers);
                self.press = Some(position);
                if self.kind.is_open_ended()
                    && self.vertices.len() >= 3
                    && self.vertices[0].distance(p) <= ctx.close_threshold()
                {
                    return self.finish(true, ctx.options.box_solid);
                }
                self.place_vertex(ctx, p)
            }
            PointerEvent::Move { position, modifiers } => {
                if self.vertices.is_empty() {
                    return ToolAction::None;
                }
                self.cursor = Some(self.acquire(ctx, position, modifiers));
                ToolAction::Preview
            }
            PointerEvent::Up { position, button: MouseButton::Left, modifiers } => {
                let Some(press) = self.press.take() else {
                    return ToolAction::None;
                };
                let dragged = press.distance(position) > CLICK_DRAG_THRESHOLD;
                if dragged && !self.kind.is_open_ended() && !self.vertices.is_empty() {
                    let p = self.acquire(ctx, position, modifiers);
                    return self.place_vertex(ctx, p);
                }
                ToolAction::None
            }
            PointerEvent::DoubleClick { .. } if self.kind.is_open_ended() && !self.vertices.is_empty() => {
                self.finish(false, ctx.options.box_solid)
            }
            PointerEvent::Cancel => self.cancel(),
            _ => ToolAction::None,
        }
    }

    fn key(&mut self, ctx: &ToolContext, key: Key) -> ToolAction {
        match key {
            Key::Escape => self.cancel(),
            Key::Enter if self.kind.is_open_ended() && !self.vertices.is_empty() => {
                self.finish(false, ctx.options.box_solid)
            }
            Key::Backspace | Key::Delete if self.vertices.len() > 1 => {
                self.vertices.pop();
                ToolAction::Preview
            }
            _ => ToolAction::None,
        }
    }

    fn cancel(&mut self) -> ToolAction {
        if self.vertices.is_empty() {
            return ToolAction::None;
        }
        self.reset();
        ToolAction::Preview
    }

    fn is_active(&self) -> bool {
        !self.vertices.is_empty()
    }

    fn overlay(&self, ctx: &ToolContext) -> Vec<OverlayPrimitive> {
        let Some(preview) = self.preview(ctx.options.box_solid) else {
            return Vec::new();
        };
        let mut out: Vec<OverlayPrimitive> = preview
            .paths()
            .into_iter()
            .map(|(points, closed)| OverlayPrimitive::Polyline { points, closed })
            .collect();
        out.extend(self.vertices.iter().map(|v| OverlayPrimitive::Handle { position: *v, kind: None }));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guides::GuideSystem;
    use crate::tools::ToolOptions;
    use crate::view::ViewTransform;
    use kurbo::Size;

    struct Fixture {
        view: ViewTransform,
        guides: GuideSystem,
        options: ToolOptions,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                view: ViewTransform::new(Size::new(800.0, 600.0), Size::new(800.0, 600.0)),
                guides: GuideSystem::new(),
                options: ToolOptions::default(),
            }
        }

        fn ctx(&self) -> ToolContext<'_> {
            ToolContext {
                view: &self.view,
                guides: &self.guides,
                options: &self.options,
                canvas_size: Size::new(800.0, 600.0),
            }
        }
    }

    fn tool(kind: ShapeKind) -> ShapeTool {
        let mut t = ShapeTool::default();
        t.set_kind(kind);
        t
    }

    fn click(t: &mut ShapeTool, ctx: &ToolContext, x: f64, y: f64) -> ToolAction {
        let p = Point::new(x, y);
        let a = t.pointer(ctx, &PointerEvent::down(p));
        let b = t.pointer(ctx, &PointerEvent::up(p));
        if b == ToolAction::None { a } else { b }
    }

    #[test]
    fn test_rectangle_press_drag_release() {
        let f = Fixture::new();
        let mut t = tool(ShapeKind::Rectangle);
        t.pointer(&f.ctx(), &PointerEvent::down(Point::new(100.0, 100.0)));
        let action = t.pointer(&f.ctx(), &PointerEvent::up(Point::new(300.0, 250.0)));
        assert_eq!(action, ToolAction::CommitShape(ShapeGeometry::Rectangle(Rect::new(100.0, 100.0, 300.0, 250.0))));
        assert!(!t.is_active());
    }

    #[test]
    fn test_rectangle_click_click() {
        let f = Fixture::new();
        let mut t = tool(ShapeKind::Rectangle);
        assert_eq!(click(&mut t, &f.ctx(), 10.0, 10.0), ToolAction::Preview);
        assert!(t.is_active());
        let action = click(&mut t, &f.ctx(), 50.0, 40.0);
        assert!(matches!(action, ToolAction::CommitShape(ShapeGeometry::Rectangle(_))));
    }

    #[test]
    fn test_zero_area_rectangle_discarded() {
        let f = Fixture::new();
        let mut t = tool(ShapeKind::Rectangle);
        click(&mut t, &f.ctx(), 10.0, 10.0);
        assert_eq!(click(&mut t, &f.ctx(), 200.0, 10.0), ToolAction::Discarded);
        let mut line = tool(ShapeKind::Line);
        click(&mut line, &f.ctx(), 10.0, 10.0);
        assert_eq!(click(&mut line, &f.ctx(), 10.0, 10.0), ToolAction::Discarded);
    }

    #[test]
    fn test_line_shift_snaps_angle() {
        let f = Fixture::new();
        let mut t = tool(ShapeKind::Line);
        click(&mut t, &f.ctx(), 0.0, 0.0);
        let end = PointerEvent::Down { position: Point::new(100.0, 4.0), button: MouseButton::Left, modifiers: Modifiers::SHIFT };
        match t.pointer(&f.ctx(), &end) {
            ToolAction::CommitShape(ShapeGeometry::Line { end, .. }) => assert!(end.y.abs() < 1e-9),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_polyline_double_click_finishes() {
        let f = Fixture::new();
        let mut t = tool(ShapeKind::Polyline);
        click(&mut t, &f.ctx(), 0.0, 0.0);
        click(&mut t, &f.ctx(), 50.0, 0.0);
        click(&mut t, &f.ctx(), 50.0, 50.0);
        click(&mut t, &f.ctx(), 50.0, 50.0);
        match t.pointer(&f.ctx(), &PointerEvent::double_click(Point::new(50.0, 50.0))) {
            ToolAction::CommitShape(ShapeGeometry::Polyline { points, closed }) => {
                assert_eq!(points.len(), 3);
                assert!(!closed);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_polyline_closes_near_first_vertex() {
        let mut f = Fixture::new();
        let mut t = tool(ShapeKind::Polyline);
        click(&mut t, &f.ctx(), 0.0, 0.0);
        click(&mut t, &f.ctx(), 100.0, 0.0);
        click(&mut t, &f.ctx(), 100.0, 100.0);
        // 8 screen px away at 100%: closes.
        match click(&mut t, &f.ctx(), 8.0, 0.0) {
            ToolAction::CommitShape(ShapeGeometry::Polyline { closed, .. }) => assert!(closed),
            other => panic!("unexpected action {other:?}"),
        }
        // At 2x zoom the same screen distance is half the canvas distance.
        f.view.set_zoom(2.0);
        f.view.pan = Vec2::ZERO;
        let mut t = tool(ShapeKind::Polyline);
        click(&mut t, &f.ctx(), 0.0, 0.0);
        click(&mut t, &f.ctx(), 200.0, 0.0);
        click(&mut t, &f.ctx(), 200.0, 200.0);
        assert_eq!(click(&mut t, &f.ctx(), 12.0, 0.0), ToolAction::Preview);
        assert_eq!(t.vertices().len(), 4);
    }

    #[test]
    fn test_enter_and_escape() {
        let f = Fixture::new();
        let mut t = tool(ShapeKind::Bezier);
        click(&mut t, &f.ctx(), 0.0, 0.0);
        click(&mut t, &f.ctx(), 40.0, 30.0);
        assert!(matches!(t.key(&f.ctx(), Key::Enter), ToolAction::CommitShape(ShapeGeometry::Bezier { .. })));
        click(&mut t, &f.ctx(), 0.0, 0.0);
        assert_eq!(t.key(&f.ctx(), Key::Escape), ToolAction::Preview);
        assert!(!t.is_active());
    }

    #[test]
    fn test_arc_through_three_points() {
        let geometry = ShapeGeometry::Arc {
            start: Point::new(-10.0, 0.0),
            end: Point::new(10.0, 0.0),
            through: Point::new(0.0, -10.0),
        };
        let paths = geometry.paths();
        assert_eq!(paths.len(), 1);
        for p in &paths[0].0 {
            assert!((p.to_vec2().hypot() - 10.0).abs() < 0.5);
            assert!(p.y <= 1e-6);
        }
    }

    #[test]
    fn test_collinear_arc_is_a_line() {
        let geometry = ShapeGeometry::Arc {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 0.0),
            through: Point::new(5.0, 0.0),
        };
        assert_eq!(geometry.paths(), vec![(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)], false)]);
    }

    #[test]
    fn test_circle_inscribed() {
        let ShapeGeometry::Circle { center, radius } = ShapeGeometry::circle_in(Point::new(0.0, 0.0), Point::new(40.0, 20.0)) else {
            panic!("expected a circle");
        };
        assert_eq!(center, Point::new(20.0, 10.0));
        assert!((radius - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_box_solid_hides_three_edges() {
        let a = Point::new(100.0, 200.0);
        let b = Point::new(200.0, 200.0);
        let c = Point::new(240.0, 170.0);
        let d = Point::new(240.0, 100.0);
        let wire = ShapeGeometry::box_from_clicks(a, b, c, d, false);
        assert_eq!(wire.paths().len(), 12);
        let solid = ShapeGeometry::box_from_clicks(a, b, c, d, true);
        assert_eq!(solid.paths().len(), 9);
    }

    #[test]
    fn test_box_takes_four_clicks() {
        let f = Fixture::new();
        let mut t = tool(ShapeKind::Box3D);
        click(&mut t, &f.ctx(), 100.0, 200.0);
        click(&mut t, &f.ctx(), 200.0, 200.0);
        click(&mut t, &f.ctx(), 240.0, 170.0);
        assert!(t.is_active());
        assert!(matches!(click(&mut t, &f.ctx(), 240.0, 100.0), ToolAction::CommitShape(ShapeGeometry::Box3D { .. })));
    }

    #[test]
    fn test_preview_follows_cursor() {
        let f = Fixture::new();
        let mut t = tool(ShapeKind::Circle);
        click(&mut t, &f.ctx(), 0.0, 0.0);
        t.pointer(&f.ctx(), &PointerEvent::moved(Point::new(30.0, 30.0)));
        assert!(matches!(t.preview(false), Some(ShapeGeometry::Circle { .. })));
        assert!(!t.overlay(&f.ctx()).is_empty());
    }
}
