//! Affine and free (perspective) transform of the active item's content.
//!
//! The session keeps the source bounds; the canvas keeps the original pixels
//! and resamples from them on apply so repeated edits never compound blur.

use super::{OverlayPrimitive, Tool, ToolAction, ToolContext};
use crate::geometry::{rotate_about, Homography, Quad};
use crate::handles::{hit_test_handles, quad_handles, resize_rect, rotated_box_handles, rotation_from_cursor, HandleKind};
use crate::input::{Key, Modifiers, MouseButton, PointerEvent};
use crate::snap::ANGLE_SNAP_INCREMENT;
use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// In-progress transform, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransformState {
    /// Box with top-left `x, y` before rotation; `rotation` is in radians
    /// about the box centre.
    Affine { x: f64, y: f64, width: f64, height: f64, rotation: f64 },
    Free { corners: Quad },
}

impl TransformState {
    pub fn affine_from(rect: Rect) -> Self {
        TransformState::Affine { x: rect.x0, y: rect.y0, width: rect.width(), height: rect.height(), rotation: 0.0 }
    }

    pub fn free_from(rect: Rect) -> Self {
        TransformState::Free { corners: Quad::from_rect(rect) }
    }

    /// Destination corners.
    pub fn quad(&self) -> Quad {
        match *self {
            TransformState::Affine { x, y, width, height, rotation } => {
                let rect = Rect::new(x, y, x + width, y + height);
                let c = rect.center();
                let q = Quad::from_rect(rect);
                Quad {
                    tl: rotate_about(q.tl, c, rotation),
                    tr: rotate_about(q.tr, c, rotation),
                    br: rotate_about(q.br, c, rotation),
                    bl: rotate_about(q.bl, c, rotation),
                }
            }
            TransformState::Free { corners } => corners,
        }
    }

    /// Affine map from `source` onto this box; `None` for the free variant
    /// or a degenerate source.
    pub fn affine(&self, source: Rect) -> Option<Affine> {
        let TransformState::Affine { x, y, width, height, rotation } = *self else {
            return None;
        };
        if source.width() <= 0.0 || source.height() <= 0.0 {
            return None;
        }
        let center = Point::new(x + width / 2.0, y + height / 2.0);
        Some(
            Affine::translate(center.to_vec2())
                * Affine::rotate(rotation)
                * Affine::scale_non_uniform(width / source.width(), height / source.height())
                * Affine::translate(-source.center().to_vec2()),
        )
    }

    /// Projective map from `source` onto the destination corners.
    pub fn homography(&self, source: Rect) -> Option<Homography> {
        Homography::from_quads(&Quad::from_rect(source), &self.quad())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TransformDrag {
    handle: Option<HandleKind>,
    start: Point,
    original: TransformState,
}

/// One transform session over the active item.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSession {
    /// Content bounds when the session started.
    pub source: Rect,
    pub state: TransformState,
    drag: Option<TransformDrag>,
}

impl TransformSession {
    pub fn new(source: Rect, free: bool) -> Self {
        let state = if free { TransformState::free_from(source) } else { TransformState::affine_from(source) };
        Self { source, state, drag: None }
    }

    pub fn is_identity(&self) -> bool {
        let src = Quad::from_rect(self.source).points();
        let dst = self.state.quad().points();
        src.iter().zip(dst.iter()).all(|(a, b)| a.distance(*b) < 1e-6)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformTool {
    session: Option<TransformSession>,
}

impl TransformTool {
    pub fn begin(&mut self, source: Rect, free: bool) {
        self.session = Some(TransformSession::new(source, free));
    }

    pub fn session(&self) -> Option<&TransformSession> {
        self.session.as_ref()
    }

    /// End the session, returning it for apply.
    pub fn finish(&mut self) -> Option<TransformSession> {
        self.session.take()
    }

    /// Abort a drag, restoring the state it started from.
    pub fn end_drag(&mut self) -> ToolAction {
        match self.session.as_mut() {
            Some(s) => match s.drag.take() {
                Some(drag) => {
                    s.state = drag.original;
                    ToolAction::Preview
                }
                None => ToolAction::None,
            },
            None => ToolAction::None,
        }
    }

    fn handles(ctx: &ToolContext, state: &TransformState) -> Vec<crate::handles::Handle> {
        match *state {
            TransformState::Affine { x, y, width, height, rotation } => rotated_box_handles(
                Point::new(x + width / 2.0, y + height / 2.0),
                Size::new(width, height),
                rotation,
                Some(ctx.rotate_handle_offset()),
            ),
            TransformState::Free { corners } => quad_handles(&corners),
        }
    }

    fn drag_to(ctx: &ToolContext, drag: &TransformDrag, raw: Point, modifiers: Modifiers) -> TransformState {
        let delta = raw - drag.start;
        match (drag.original, drag.handle) {
            (TransformState::Affine { x, y, width, height, rotation }, None) => {
                let (mut nx, mut ny) = (x + delta.x, y + delta.y);
                if ctx.options.snap_translation_to_grid {
                    let snapped = ctx.guides.snap(Point::new(nx, ny)).point;
                    (nx, ny) = (snapped.x, snapped.y);
                }
                TransformState::Affine { x: nx, y: ny, width, height, rotation }
            }
            (TransformState::Affine { x, y, width, height, .. }, Some(HandleKind::Rotate)) => {
                let center = Point::new(x + width / 2.0, y + height / 2.0);
                let snap = (modifiers.shift || ctx.options.rotation_snap).then(|| {
                    if ctx.options.angle_snap_increment > 0.0 { ctx.options.angle_snap_increment } else { ANGLE_SNAP_INCREMENT }
                });
                TransformState::Affine { x, y, width, height, rotation: rotation_from_cursor(center, raw, snap) }
            }
            (TransformState::Affine { x, y, width, height, rotation }, Some(handle)) => {
                // Resize in the box's own frame, then move the centre back out.
                let center = Point::new(x + width / 2.0, y + height / 2.0);
                let local_delta = rotate_about(delta.to_point(), Point::ZERO, -rotation).to_vec2();
                let local = Rect::new(-width / 2.0, -height / 2.0, width / 2.0, height / 2.0);
                let keep = modifiers.shift || ctx.options.aspect_lock;
                let resized = resize_rect(local, handle, local_delta, keep);
                let offset = rotate_about(resized.center(), Point::ZERO, rotation).to_vec2();
                let new_center = center + offset;
                TransformState::Affine {
                    x: new_center.x - resized.width() / 2.0,
                    y: new_center.y - resized.height() / 2.0,
                    width: resized.width(),
                    height: resized.height(),
                    rotation,
                }
            }
            (TransformState::Free { mut corners }, Some(HandleKind::Corner(corner))) => {
                *corner.of_quad_mut(&mut corners) = ctx.guides.snap(raw).point;
                TransformState::Free { corners }
            }
            (TransformState::Free { corners }, _) => TransformState::Free {
                corners: Quad {
                    tl: corners.tl + delta,
                    tr: corners.tr + delta,
                    br: corners.br + delta,
                    bl: corners.bl + delta,
                },
            },
        }
    }
}

impl Tool for TransformTool {
    fn pointer(&mut self, ctx: &ToolContext, event: &PointerEvent) -> ToolAction {
        let Some(session) = self.session.as_mut() else {
            return ToolAction::None;
        };
        match *event {
            PointerEvent::Down { position, button: MouseButton::Left, .. } => {
                let p = ctx.canvas_point(position);
                let handles = Self::handles(ctx, &session.state);
                let handle = hit_test_handles(&handles, p, ctx.handle_tolerance());
                if handle.is_none() && !session.state.quad().contains(p) {
                    return ToolAction::None;
                }
                session.drag = Some(TransformDrag { handle, start: p, original: session.state });
                ToolAction::Preview
            }
            PointerEvent::Move { position, modifiers } => {
                let Some(drag) = session.drag else {
                    return ToolAction::None;
                };
                session.state = Self::drag_to(ctx, &drag, ctx.canvas_point(position), modifiers);
                ToolAction::Preview
            }
            PointerEvent::Up { button: MouseButton::Left, .. } => match session.drag.take() {
                Some(_) => ToolAction::Preview,
                None => ToolAction::None,
            },
            PointerEvent::DoubleClick { .. } if session.drag.is_none() => ToolAction::ApplyTransform,
            PointerEvent::Cancel => self.end_drag(),
            _ => ToolAction::None,
        }
    }

    fn key(&mut self, _ctx: &ToolContext, key: Key) -> ToolAction {
        match key {
            Key::Enter if self.session.as_ref().is_some_and(|s| s.drag.is_none()) => ToolAction::ApplyTransform,
            Key::Escape => self.cancel(),
            _ => ToolAction::None,
        }
    }

    /// Escape drops the whole session; nothing was written yet.
    fn cancel(&mut self) -> ToolAction {
        match self.session.take() {
            Some(_) => ToolAction::Preview,
            None => ToolAction::None,
        }
    }

    fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.drag.is_some())
    }

    fn overlay(&self, ctx: &ToolContext) -> Vec<OverlayPrimitive> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        let mut out = vec![OverlayPrimitive::Quad(session.state.quad())];
        out.extend(
            Self::handles(ctx, &session.state)
                .into_iter()
                .map(|h| OverlayPrimitive::Handle { position: h.position, kind: Some(h.kind) }),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guides::GuideSystem;
    use crate::handles::Corner;
    use crate::tools::ToolOptions;
    use crate::view::ViewTransform;

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
            ToolContext { view: &self.view, guides: &self.guides, options: &self.options, canvas_size: Size::new(800.0, 600.0) }
        }
    }

    fn drag(tool: &mut TransformTool, ctx: &ToolContext, from: Point, to: Point) {
        tool.pointer(ctx, &PointerEvent::down(from));
        tool.pointer(ctx, &PointerEvent::moved(to));
        tool.pointer(ctx, &PointerEvent::up(to));
    }

    #[test]
    fn test_affine_state_maps_source_onto_box() {
        let source = Rect::new(0.0, 0.0, 100.0, 50.0);
        let state = TransformState::Affine { x: 10.0, y: 20.0, width: 200.0, height: 100.0, rotation: 0.0 };
        let a = state.affine(source).unwrap();
        let p = a * Point::new(100.0, 50.0);
        assert!((p - Point::new(210.0, 120.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_move_body() {
        let f = Fixture::new();
        let mut tool = TransformTool::default();
        tool.begin(Rect::new(100.0, 100.0, 200.0, 200.0), false);
        drag(&mut tool, &f.ctx(), Point::new(150.0, 150.0), Point::new(170.0, 140.0));
        assert_eq!(
            tool.session().unwrap().state,
            TransformState::Affine { x: 120.0, y: 90.0, width: 100.0, height: 100.0, rotation: 0.0 }
        );
    }

    #[test]
    fn test_scale_from_corner() {
        let f = Fixture::new();
        let mut tool = TransformTool::default();
        tool.begin(Rect::new(100.0, 100.0, 200.0, 200.0), false);
        drag(&mut tool, &f.ctx(), Point::new(200.0, 200.0), Point::new(300.0, 250.0));
        let quad = tool.session().unwrap().state.quad();
        assert!((quad.tl - Point::new(100.0, 100.0)).hypot() < 1e-9);
        assert!((quad.br - Point::new(300.0, 250.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_rotation_snaps_with_shift() {
        let f = Fixture::new();
        let mut tool = TransformTool::default();
        tool.begin(Rect::new(100.0, 100.0, 200.0, 200.0), false);
        let handle = tool.session().unwrap().state.quad().tl;
        // Rotate handle sits above the top edge centre.
        let rot = Point::new(150.0, 100.0 - f.ctx().rotate_handle_offset());
        tool.pointer(&f.ctx(), &PointerEvent::down(rot));
        tool.pointer(
            &f.ctx(),
            &PointerEvent::Move { position: Point::new(300.0, 148.0), modifiers: Modifiers::SHIFT },
        );
        let TransformState::Affine { rotation, .. } = tool.session().unwrap().state else {
            panic!("expected affine state");
        };
        assert!((rotation - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert_ne!(handle, tool.session().unwrap().state.quad().tl);
    }

    #[test]
    fn test_free_corner_drag() {
        let f = Fixture::new();
        let mut tool = TransformTool::default();
        tool.begin(Rect::new(0.0, 0.0, 100.0, 100.0), true);
        drag(&mut tool, &f.ctx(), Point::new(100.0, 0.0), Point::new(120.0, -20.0));
        let session = tool.session().unwrap();
        assert_eq!(Corner::TopRight.of_quad(&session.state.quad()), Point::new(120.0, -20.0));
        let h = session.state.homography(session.source).unwrap();
        let p = h.apply(Point::new(100.0, 0.0)).unwrap();
        assert!((p - Point::new(120.0, -20.0)).hypot() < 1e-6);
    }

    #[test]
    fn test_escape_discards_session() {
        let f = Fixture::new();
        let mut tool = TransformTool::default();
        tool.begin(Rect::new(0.0, 0.0, 100.0, 100.0), false);
        assert_eq!(tool.key(&f.ctx(), Key::Escape), ToolAction::Preview);
        assert!(tool.session().is_none());
    }

    #[test]
    fn test_enter_applies() {
        let f = Fixture::new();
        let mut tool = TransformTool::default();
        tool.begin(Rect::new(0.0, 0.0, 100.0, 100.0), false);
        assert!(tool.session().unwrap().is_identity());
        assert_eq!(tool.key(&f.ctx(), Key::Enter), ToolAction::ApplyTransform);
    }
}
