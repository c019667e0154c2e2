//! Freehand capture shared by every brush variant.
//!
//! Only geometry lives here; dab stamping happens in the canvas through a
//! [`StrokeRasterizer`](crate::raster::StrokeRasterizer) so each move event
//! costs one new segment.

use super::{OverlayPrimitive, Tool, ToolAction, ToolContext};
use crate::input::{MouseButton, PointerEvent};
use kurbo::Point;

#[derive(Debug, Clone, Default)]
pub struct FreehandTool {
    /// Constrained stroke start; anchors the line locks.
    anchor: Option<Point>,
    /// Mirror pen enabled for this stroke.
    mirrored: bool,
    /// Captured points of the primary pen.
    path: Vec<Point>,
}

impl FreehandTool {
    /// Points captured so far for the primary pen.
    pub fn path(&self) -> &[Point] {
        &self.path
    }

    /// Number of pens the current stroke drives.
    pub fn pen_count(&self) -> usize {
        if self.mirrored { 2 } else { 1 }
    }

    fn pens(&self, ctx: &ToolContext, p: Point) -> Vec<Point> {
        let mut pens = vec![p];
        if self.mirrored {
            // The axis cannot change mid-stroke, but fall back to the primary
            // point rather than dropping the second pen.
            pens.push(ctx.guides.mirror_point(p).unwrap_or(p));
        }
        pens
    }

    fn reset(&mut self) {
        self.anchor = None;
        self.mirrored = false;
        self.path.clear();
    }
}

impl Tool for FreehandTool {
    fn pointer(&mut self, ctx: &ToolContext, event: &PointerEvent) -> ToolAction {
        match *event {
            PointerEvent::Down { position, button: MouseButton::Left, .. } if self.anchor.is_none() => {
                let start = ctx.constrain(None, position).point;
                self.anchor = Some(start);
                self.mirrored = ctx.guides.mirror_point(start).is_some();
                self.path = vec![start];
                ToolAction::StrokeBegin(self.pens(ctx, start))
            }
            PointerEvent::Move { position, .. } => {
                let Some(anchor) = self.anchor else {
                    return ToolAction::None;
                };
                let p = ctx.constrain(Some(anchor), position).point;
                if self.path.last() == Some(&p) {
                    return ToolAction::None;
                }
                self.path.push(p);
                ToolAction::StrokeTo(self.pens(ctx, p))
            }
            PointerEvent::Up { button: MouseButton::Left, .. } if self.anchor.is_some() => {
                log::debug!("Freehand stroke finished with {} points", self.path.len());
                self.reset();
                ToolAction::StrokeEnd
            }
            PointerEvent::Cancel => self.cancel(),
            _ => ToolAction::None,
        }
    }

    fn cancel(&mut self) -> ToolAction {
        if self.anchor.is_none() {
            return ToolAction::None;
        }
        self.reset();
        ToolAction::StrokeAbort
    }

    fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    fn overlay(&self, _ctx: &ToolContext) -> Vec<OverlayPrimitive> {
        // Strokes paint straight into the surface.
        Vec::new()
    }
}
