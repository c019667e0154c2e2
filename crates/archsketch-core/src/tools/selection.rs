//! Marquee, lasso and magic-wand selection.

use super::{OverlayPrimitive, Tool, ToolAction, ToolContext, ToolKind};
use crate::geometry::{bounding_box, point_in_polygon};
use crate::input::{Modifiers, MouseButton, PointerEvent};
use crate::surface::{PixelRect, RasterSurface};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// How a new region combines with the existing selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    #[default]
    Replace,
    Add,
    Subtract,
    Intersect,
}

impl SelectionMode {
    /// Shift adds, alt subtracts, both intersect.
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        match (modifiers.shift, modifiers.alt) {
            (true, true) => SelectionMode::Intersect,
            (true, false) => SelectionMode::Add,
            (false, true) => SelectionMode::Subtract,
            (false, false) => SelectionMode::Replace,
        }
    }
}

/// Region produced by a selection gesture, in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionRegion {
    Rect(Rect),
    Polygon(Vec<Point>),
    /// Flood fill seeded at a point.
    Wand(Point),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRequest {
    pub region: SelectionRegion,
    pub mode: SelectionMode,
}

/// One byte per canvas pixel; non-zero is selected.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectionMask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl std::fmt::Debug for SelectionMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionMask")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("selected", &self.count())
            .finish()
    }
}

impl SelectionMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, bits: vec![0; width as usize * height as usize] }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self { width, height, bits: vec![1; width as usize * height as usize] }
    }

    pub fn from_rect(width: u32, height: u32, rect: Rect) -> Self {
        let mut mask = Self::new(width, height);
        if let Some(r) = PixelRect::from_rect_clamped(rect, width, height) {
            for y in r.y..r.y + r.height {
                let row = y as usize * width as usize;
                mask.bits[row + r.x as usize..row + (r.x + r.width) as usize].fill(1);
            }
        }
        mask
    }

    /// Pixels whose centres fall inside `polygon` (even-odd).
    pub fn from_polygon(width: u32, height: u32, polygon: &[Point]) -> Self {
        let mut mask = Self::new(width, height);
        if polygon.len() < 3 {
            return mask;
        }
        let Some(area) = bounding_box(polygon).and_then(|b| PixelRect::from_rect_clamped(b, width, height)) else {
            return mask;
        };
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                if point_in_polygon(Point::new(x as f64 + 0.5, y as f64 + 0.5), polygon) {
                    mask.bits[y as usize * width as usize + x as usize] = 1;
                }
            }
        }
        mask
    }

    /// Pixels within `tolerance` (per channel) of the seed colour; flood
    /// filled 4-connected when `contiguous`. `None` if the seed is outside.
    pub fn magic_wand(surface: &RasterSurface, seed: Point, tolerance: u8, contiguous: bool) -> Option<Self> {
        let (w, h) = surface.dimensions();
        if seed.x < 0.0 || seed.y < 0.0 || seed.x >= w as f64 || seed.y >= h as f64 {
            return None;
        }
        let (sx, sy) = (seed.x as u32, seed.y as u32);
        let target = surface.pixel(sx, sy);
        let matches = |x: u32, y: u32| {
            let p = surface.pixel(x, y);
            p.iter().zip(target.iter()).all(|(a, b)| a.abs_diff(*b) <= tolerance)
        };
        let mut mask = Self::new(w, h);
        if !contiguous {
            for y in 0..h {
                for x in 0..w {
                    if matches(x, y) {
                        mask.bits[y as usize * w as usize + x as usize] = 1;
                    }
                }
            }
            return Some(mask);
        }
        let mut stack = vec![(sx, sy)];
        mask.bits[sy as usize * w as usize + sx as usize] = 1;
        while let Some((x, y)) = stack.pop() {
            let neighbours = [
                (x.checked_sub(1), Some(y)),
                ((x + 1 < w).then_some(x + 1), Some(y)),
                (Some(x), y.checked_sub(1)),
                (Some(x), (y + 1 < h).then_some(y + 1)),
            ];
            for (nx, ny) in neighbours {
                let (Some(nx), Some(ny)) = (nx, ny) else {
                    continue;
                };
                let i = ny as usize * w as usize + nx as usize;
                if mask.bits[i] == 0 && matches(nx, ny) {
                    mask.bits[i] = 1;
                    stack.push((nx, ny));
                }
            }
        }
        Some(mask)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[y as usize * self.width as usize + x as usize] != 0
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|b| *b == 0)
    }

    pub fn invert(&mut self) {
        for b in &mut self.bits {
            *b = u8::from(*b == 0);
        }
    }

    /// Merge `other` into this mask. Masks of different sizes are ignored.
    pub fn combine(&mut self, other: &SelectionMask, mode: SelectionMode) {
        if (self.width, self.height) != (other.width, other.height) {
            log::warn!("Selection size mismatch, ignoring combine");
            return;
        }
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            let (sa, sb) = (*a != 0, *b != 0);
            *a = u8::from(match mode {
                SelectionMode::Replace => sb,
                SelectionMode::Add => sa || sb,
                SelectionMode::Subtract => sa && !sb,
                SelectionMode::Intersect => sa && sb,
            });
        }
    }

    /// Tight bounds of the selected pixels.
    pub fn bounds(&self) -> Option<PixelRect> {
        let w = self.width as usize;
        let (mut x0, mut y0, mut x1, mut y1) = (usize::MAX, usize::MAX, 0, 0);
        for (i, b) in self.bits.iter().enumerate() {
            if *b != 0 {
                let (x, y) = (i % w, i / w);
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x);
                y1 = y1.max(y);
            }
        }
        (x0 != usize::MAX).then(|| PixelRect::new(x0 as u32, y0 as u32, (x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    #[default]
    Marquee,
    Lasso,
    MagicWand,
}

impl SelectionKind {
    pub fn for_tool(tool: ToolKind) -> Option<Self> {
        match tool {
            ToolKind::Marquee => Some(SelectionKind::Marquee),
            ToolKind::Lasso => Some(SelectionKind::Lasso),
            ToolKind::MagicWand => Some(SelectionKind::MagicWand),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionTool {
    kind: SelectionKind,
    mode: SelectionMode,
    /// Marquee corner or lasso path.
    points: Vec<Point>,
    cursor: Option<Point>,
}

impl SelectionTool {
    pub fn set_kind(&mut self, kind: SelectionKind) {
        self.points.clear();
        self.cursor = None;
        self.kind = kind;
    }

    pub fn kind(&self) -> SelectionKind {
        self.kind
    }
}

impl Tool for SelectionTool {
    fn pointer(&mut self, ctx: &ToolContext, event: &PointerEvent) -> ToolAction {
        match *event {
            PointerEvent::Down { position, button: MouseButton::Left, modifiers } => {
                let p = ctx.snapped(position);
                self.mode = SelectionMode::from_modifiers(modifiers);
                match self.kind {
                    SelectionKind::MagicWand => ToolAction::Select(SelectionRequest {
                        region: SelectionRegion::Wand(ctx.canvas_point(position)),
                        mode: self.mode,
                    }),
                    SelectionKind::Marquee | SelectionKind::Lasso => {
                        self.points = vec![p];
                        self.cursor = Some(p);
                        ToolAction::Preview
                    }
                }
            }
            PointerEvent::Move { position, .. } if !self.points.is_empty() => {
                let p = match self.kind {
                    SelectionKind::Lasso => ctx.canvas_point(position),
                    _ => ctx.snapped(position),
                };
                if self.kind == SelectionKind::Lasso && self.points.last().is_none_or(|l| l.distance(p) >= 1.0) {
                    self.points.push(p);
                }
                self.cursor = Some(p);
                ToolAction::Preview
            }
            PointerEvent::Up { button: MouseButton::Left, .. } if !self.points.is_empty() => {
                let points = std::mem::take(&mut self.points);
                let cursor = self.cursor.take();
                let region = match self.kind {
                    SelectionKind::Lasso => SelectionRegion::Polygon(points),
                    _ => SelectionRegion::Rect(Rect::from_points(points[0], cursor.unwrap_or(points[0]))),
                };
                ToolAction::Select(SelectionRequest { region, mode: self.mode })
            }
            PointerEvent::Cancel => self.cancel(),
            _ => ToolAction::None,
        }
    }

    fn cancel(&mut self) -> ToolAction {
        if self.points.is_empty() {
            return ToolAction::None;
        }
        self.points.clear();
        self.cursor = None;
        ToolAction::Preview
    }

    fn is_active(&self) -> bool {
        !self.points.is_empty()
    }

    fn overlay(&self, _ctx: &ToolContext) -> Vec<OverlayPrimitive> {
        let (Some(first), Some(cursor)) = (self.points.first(), self.cursor) else {
            return Vec::new();
        };
        match self.kind {
            SelectionKind::Lasso => vec![OverlayPrimitive::Polyline { points: self.points.clone(), closed: true }],
            _ => vec![OverlayPrimitive::Rect(Rect::from_points(*first, cursor))],
        }
    }
}
