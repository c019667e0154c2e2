//! Crop rectangle editing.
//!
//! The rectangle stays pending until the canvas applies it; cancelling
//! restores the rectangle the session started with.

use super::{OverlayPrimitive, Tool, ToolAction, ToolContext};
use crate::handles::{hit_test_handles, rect_handles, resize_rect, HandleKind, MIN_BOX_SIZE};
use crate::input::{Key, MouseButton, PointerEvent};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// What an applied crop affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    /// Resize the whole canvas to the rectangle.
    #[default]
    Canvas,
    /// Clear the active item outside the rectangle.
    Item,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CropDrag {
    Resize { handle: HandleKind, start: Point },
    Move { start: Point },
    Draw { start: Point },
}

#[derive(Debug, Clone, Default)]
pub struct CropTool {
    rect: Option<Rect>,
    /// Rectangle at session start, restored on cancel.
    initial: Option<Rect>,
    drag: Option<CropDrag>,
    /// Rectangle before the current drag.
    before_drag: Option<Rect>,
}

impl CropTool {
    /// Start a crop session around `rect`.
    pub fn begin(&mut self, rect: Rect) {
        self.rect = Some(rect);
        self.initial = Some(rect);
        self.drag = None;
        self.before_drag = None;
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn has_session(&self) -> bool {
        self.rect.is_some()
    }

    /// Restore the session's starting rectangle.
    pub fn reset(&mut self) {
        self.rect = self.initial;
        self.drag = None;
        self.before_drag = None;
    }

    /// End the session, returning the pending rectangle.
    pub fn finish(&mut self) -> Option<Rect> {
        self.initial = None;
        self.drag = None;
        self.before_drag = None;
        self.rect.take()
    }

    /// Abort a drag in progress, keeping the rectangle it started from.
    pub fn end_drag(&mut self) -> ToolAction {
        if self.drag.take().is_none() {
            return ToolAction::None;
        }
        self.rect = self.before_drag.take();
        ToolAction::Preview
    }
}

impl Tool for CropTool {
    fn pointer(&mut self, ctx: &ToolContext, event: &PointerEvent) -> ToolAction {
        match *event {
            PointerEvent::Down { position, button: MouseButton::Left, .. } => {
                let p = ctx.snapped(position);
                let handle = self
                    .rect
                    .and_then(|r| hit_test_handles(&rect_handles(r), p, ctx.handle_tolerance()));
                self.drag = Some(match (handle, self.rect) {
                    (Some(handle), _) => CropDrag::Resize { handle, start: p },
                    (None, Some(r)) if r.contains(p) => CropDrag::Move { start: p },
                    _ => CropDrag::Draw { start: p },
                });
                self.before_drag = self.rect;
                ToolAction::Preview
            }
            PointerEvent::Move { position, modifiers } => {
                let Some(drag) = self.drag else {
                    return ToolAction::None;
                };
                let p = ctx.snapped(position);
                self.rect = match (drag, self.before_drag) {
                    (CropDrag::Resize { handle, start }, Some(original)) => {
                        Some(resize_rect(original, handle, p - start, modifiers.shift || ctx.options.aspect_lock))
                    }
                    (CropDrag::Move { start }, Some(original)) => Some(original + (p - start)),
                    (CropDrag::Draw { start }, _) => Some(Rect::from_points(start, p)),
                    _ => self.rect,
                };
                ToolAction::Preview
            }
            PointerEvent::Up { button: MouseButton::Left, .. } => {
                if self.drag.take().is_none() {
                    return ToolAction::None;
                }
                let too_small = self
                    .rect
                    .is_none_or(|r| r.width() < MIN_BOX_SIZE || r.height() < MIN_BOX_SIZE);
                if too_small {
                    self.rect = self.before_drag;
                }
                self.before_drag = None;
                ToolAction::Preview
            }
            PointerEvent::Cancel => self.end_drag(),
            _ => ToolAction::None,
        }
    }

    fn key(&mut self, _ctx: &ToolContext, key: Key) -> ToolAction {
        match key {
            Key::Enter if self.rect.is_some() && self.drag.is_none() => ToolAction::ApplyCrop,
            Key::Escape => {
                self.reset();
                ToolAction::Preview
            }
            _ => ToolAction::None,
        }
    }

    fn cancel(&mut self) -> ToolAction {
        self.end_drag()
    }

    fn is_active(&self) -> bool {
        self.drag.is_some()
    }

    fn overlay(&self, _ctx: &ToolContext) -> Vec<OverlayPrimitive> {
        let Some(rect) = self.rect else {
            return Vec::new();
        };
        let mut out = vec![OverlayPrimitive::Rect(rect)];
        out.extend(
            rect_handles(rect)
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
    use kurbo::Size;

    fn run(tool: &mut CropTool, events: &[PointerEvent]) {
        let view = ViewTransform::new(Size::new(800.0, 600.0), Size::new(800.0, 600.0));
        let guides = GuideSystem::new();
        let options = ToolOptions::default();
        let ctx = ToolContext { view: &view, guides: &guides, options: &options, canvas_size: Size::new(800.0, 600.0) };
        for e in events {
            tool.pointer(&ctx, e);
        }
    }

    #[test]
    fn test_drag_corner_resizes() {
        let mut tool = CropTool::default();
        tool.begin(Rect::new(0.0, 0.0, 800.0, 600.0));
        run(
            &mut tool,
            &[
                PointerEvent::down(Point::new(800.0, 600.0)),
                PointerEvent::moved(Point::new(400.0, 300.0)),
                PointerEvent::up(Point::new(400.0, 300.0)),
            ],
        );
        assert_eq!(tool.rect(), Some(Rect::new(0.0, 0.0, 400.0, 300.0)));
    }

    #[test]
    fn test_drag_inside_moves() {
        let mut tool = CropTool::default();
        tool.begin(Rect::new(100.0, 100.0, 300.0, 300.0));
        run(
            &mut tool,
            &[
                PointerEvent::down(Point::new(200.0, 200.0)),
                PointerEvent::moved(Point::new(250.0, 210.0)),
                PointerEvent::up(Point::new(250.0, 210.0)),
            ],
        );
        assert_eq!(tool.rect(), Some(Rect::new(150.0, 110.0, 350.0, 310.0)));
    }

    #[test]
    fn test_tiny_draw_keeps_previous_rect() {
        let mut tool = CropTool::default();
        tool.begin(Rect::new(100.0, 100.0, 300.0, 300.0));
        run(&mut tool, &[PointerEvent::down(Point::new(500.0, 500.0)), PointerEvent::up(Point::new(500.0, 500.0))]);
        assert_eq!(tool.rect(), Some(Rect::new(100.0, 100.0, 300.0, 300.0)));
    }

    #[test]
    fn test_reset_restores_initial() {
        let mut tool = CropTool::default();
        tool.begin(Rect::new(0.0, 0.0, 100.0, 100.0));
        run(
            &mut tool,
            &[
                PointerEvent::down(Point::new(100.0, 100.0)),
                PointerEvent::moved(Point::new(50.0, 50.0)),
                PointerEvent::up(Point::new(50.0, 50.0)),
            ],
        );
        assert_ne!(tool.rect(), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        tool.reset();
        assert_eq!(tool.rect(), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn test_cancel_mid_drag() {
        let mut tool = CropTool::default();
        tool.begin(Rect::new(0.0, 0.0, 100.0, 100.0));
        run(&mut tool, &[PointerEvent::down(Point::new(100.0, 100.0)), PointerEvent::moved(Point::new(10.0, 10.0))]);
        assert!(tool.is_active());
        run(&mut tool, &[PointerEvent::Cancel]);
        assert!(!tool.is_active());
        assert_eq!(tool.rect(), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn test_overlay_has_handles() {
        let mut tool = CropTool::default();
        tool.begin(Rect::new(0.0, 0.0, 100.0, 100.0));
        let view = ViewTransform::default();
        let guides = GuideSystem::new();
        let options = ToolOptions::default();
        let ctx = ToolContext { view: &view, guides: &guides, options: &options, canvas_size: Size::new(800.0, 600.0) };
        let overlay = tool.overlay(&ctx);
        assert!(overlay.contains(&OverlayPrimitive::Handle {
            position: Point::new(100.0, 100.0),
            kind: Some(HandleKind::Corner(Corner::BottomRight)),
        }));
    }
}
