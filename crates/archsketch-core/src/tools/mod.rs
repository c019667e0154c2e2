//! Tool system: per-tool pointer state machines.
//!
//! Tools never touch the document. They read pointer positions through a
//! [`ToolContext`] (view transform + guides + options) and report what should
//! happen as a [`ToolAction`]; the canvas performs the mutation.

pub mod crop;
pub mod freehand;
pub mod selection;
pub mod shapes;
pub mod transform;

pub use crop::{CropMode, CropTool};
pub use freehand::FreehandTool;
pub use selection::{SelectionKind, SelectionMask, SelectionMode, SelectionRegion, SelectionRequest, SelectionTool};
pub use shapes::{ShapeGeometry, ShapeKind, ShapeTool};
pub use transform::{TransformSession, TransformState, TransformTool};

use crate::geometry::Quad;
use crate::guides::{ConstrainOptions, Constrained, GuideSystem};
use crate::handles::{HandleKind, HANDLE_HIT_TOLERANCE, ROTATE_HANDLE_OFFSET};
use crate::input::{Key, PointerEvent};
use crate::raster::{Brush, BrushPreset};
use crate::snap::ANGLE_SNAP_INCREMENT;
use crate::view::ViewTransform;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Default distance (screen pixels) within which a click closes a polygon.
pub const DEFAULT_CLOSE_THRESHOLD: f64 = 10.0;
/// Screen distance a press must travel before it counts as a drag.
pub const CLICK_DRAG_THRESHOLD: f64 = 3.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    Pan,
    #[default]
    Brush,
    Pencil,
    Marker,
    Airbrush,
    Eraser,
    Line,
    Polyline,
    Arc,
    Bezier,
    Rectangle,
    Circle,
    Box3D,
    Crop,
    Transform,
    FreeTransform,
    Marquee,
    Lasso,
    MagicWand,
}

impl ToolKind {
    pub fn all() -> &'static [ToolKind] {
        use ToolKind::*;
        &[
            Pan, Brush, Pencil, Marker, Airbrush, Eraser, Line, Polyline, Arc, Bezier, Rectangle, Circle, Box3D,
            Crop, Transform, FreeTransform, Marquee, Lasso, MagicWand,
        ]
    }

    /// Brush preset for the freehand variants.
    pub fn brush_preset(self) -> Option<BrushPreset> {
        match self {
            ToolKind::Brush => Some(BrushPreset::Brush),
            ToolKind::Pencil => Some(BrushPreset::Pencil),
            ToolKind::Marker => Some(BrushPreset::Marker),
            ToolKind::Airbrush => Some(BrushPreset::Airbrush),
            ToolKind::Eraser => Some(BrushPreset::Eraser),
            _ => None,
        }
    }

    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            ToolKind::Line => Some(ShapeKind::Line),
            ToolKind::Polyline => Some(ShapeKind::Polyline),
            ToolKind::Arc => Some(ShapeKind::Arc),
            ToolKind::Bezier => Some(ShapeKind::Bezier),
            ToolKind::Rectangle => Some(ShapeKind::Rectangle),
            ToolKind::Circle => Some(ShapeKind::Circle),
            ToolKind::Box3D => Some(ShapeKind::Box3D),
            _ => None,
        }
    }

    pub fn is_freehand(self) -> bool {
        self.brush_preset().is_some()
    }

    /// Tools that write pixels into the active item.
    pub fn edits_pixels(self) -> bool {
        self.is_freehand() || self.shape_kind().is_some() || self.is_transform()
    }

    pub fn is_transform(self) -> bool {
        matches!(self, ToolKind::Transform | ToolKind::FreeTransform)
    }

    pub fn is_selection(self) -> bool {
        matches!(self, ToolKind::Marquee | ToolKind::Lasso | ToolKind::MagicWand)
    }
}

/// User-adjustable tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolOptions {
    /// Brush for freehand strokes and shape outlines.
    pub brush: Brush,
    pub constrain: ConstrainOptions,
    /// Increment for shift-constrained lines and transform rotation.
    pub angle_snap_increment: f64,
    /// Always snap transform rotation, not only with shift held.
    pub rotation_snap: bool,
    /// Keep the aspect ratio when scaling a transform.
    pub aspect_lock: bool,
    /// Snap the transform translation to the grid.
    pub snap_translation_to_grid: bool,
    /// Hide the back-facing edges of a 3D box.
    pub box_solid: bool,
    pub crop_mode: CropMode,
    /// Per-channel colour tolerance of the magic wand.
    pub wand_tolerance: u8,
    pub wand_contiguous: bool,
    /// Polygon close distance in screen pixels.
    pub close_threshold: f64,
    /// Handle hit tolerance in screen pixels.
    pub handle_tolerance: f64,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            brush: Brush::default(),
            constrain: ConstrainOptions::default(),
            angle_snap_increment: ANGLE_SNAP_INCREMENT,
            rotation_snap: false,
            aspect_lock: false,
            snap_translation_to_grid: false,
            box_solid: false,
            crop_mode: CropMode::default(),
            wand_tolerance: 32,
            wand_contiguous: true,
            close_threshold: DEFAULT_CLOSE_THRESHOLD,
            handle_tolerance: HANDLE_HIT_TOLERANCE,
        }
    }
}

/// Everything a tool may read while handling an event.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub view: &'a ViewTransform,
    pub guides: &'a GuideSystem,
    pub options: &'a ToolOptions,
    pub canvas_size: Size,
}

impl<'a> ToolContext<'a> {
    /// Screen position mapped into canvas space.
    pub fn canvas_point(&self, screen: Point) -> Point {
        self.view.screen_to_canvas(screen)
    }

    /// Canvas position passed through the active guides.
    pub fn constrain(&self, anchor: Option<Point>, screen: Point) -> Constrained {
        self.constrain_with(anchor, screen, self.options.constrain)
    }

    pub fn constrain_with(&self, anchor: Option<Point>, screen: Point, options: ConstrainOptions) -> Constrained {
        self.guides.constrain(anchor, self.canvas_point(screen), options)
    }

    /// Canvas position with grid snapping only.
    pub fn snapped(&self, screen: Point) -> Point {
        self.guides.snap(self.canvas_point(screen)).point
    }

    /// Handle hit radius in canvas units.
    pub fn handle_tolerance(&self) -> f64 {
        self.view.screen_distance_to_canvas(self.options.handle_tolerance)
    }

    /// Polygon close radius in canvas units.
    pub fn close_threshold(&self) -> f64 {
        self.view.screen_distance_to_canvas(self.options.close_threshold)
    }

    pub fn rotate_handle_offset(&self) -> f64 {
        self.view.screen_distance_to_canvas(ROTATE_HANDLE_OFFSET)
    }

    pub fn canvas_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.canvas_size)
    }
}

/// What the canvas should do in response to a tool event.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    None,
    /// Only the overlay changed.
    Preview,
    /// A freehand stroke starts; one point per pen (mirrored strokes have two).
    StrokeBegin(Vec<Point>),
    StrokeTo(Vec<Point>),
    StrokeEnd,
    /// Abort the stroke and restore the pre-stroke pixels.
    StrokeAbort,
    CommitShape(ShapeGeometry),
    /// A gesture ended without producing anything.
    Discarded,
    Select(SelectionRequest),
    ApplyCrop,
    ApplyTransform,
    /// Pan the view by a screen delta.
    Pan(Vec2),
}

/// Overlay geometry in canvas coordinates, drawn above the content.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayPrimitive {
    Polyline { points: Vec<Point>, closed: bool },
    Rect(Rect),
    Quad(Quad),
    Handle { position: Point, kind: Option<HandleKind> },
    /// Brush outline under the pointer.
    Circle { center: Point, radius: f64 },
}

/// Shared behaviour of every tool state machine.
pub trait Tool {
    fn pointer(&mut self, ctx: &ToolContext, event: &PointerEvent) -> ToolAction;

    fn key(&mut self, _ctx: &ToolContext, key: Key) -> ToolAction {
        match key {
            Key::Escape => self.cancel(),
            _ => ToolAction::None,
        }
    }

    /// Abort any in-progress gesture. Never commits.
    fn cancel(&mut self) -> ToolAction;

    fn is_active(&self) -> bool;

    fn overlay(&self, ctx: &ToolContext) -> Vec<OverlayPrimitive>;
}

/// Screen-space drag tracking shared by the pan tool.
#[derive(Debug, Clone, Default)]
struct PanTool {
    last: Option<Point>,
}

impl Tool for PanTool {
    fn pointer(&mut self, _ctx: &ToolContext, event: &PointerEvent) -> ToolAction {
        match *event {
            PointerEvent::Down { position, .. } => {
                self.last = Some(position);
                ToolAction::None
            }
            PointerEvent::Move { position, .. } => match self.last {
                Some(last) => {
                    self.last = Some(position);
                    ToolAction::Pan(position - last)
                }
                None => ToolAction::None,
            },
            PointerEvent::Up { .. } => {
                self.last = None;
                ToolAction::None
            }
            _ => ToolAction::None,
        }
    }

    fn cancel(&mut self) -> ToolAction {
        self.last = None;
        ToolAction::None
    }

    fn is_active(&self) -> bool {
        self.last.is_some()
    }

    fn overlay(&self, _ctx: &ToolContext) -> Vec<OverlayPrimitive> {
        Vec::new()
    }
}

/// Manages the current tool and its state.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    current: ToolKind,
    pub options: ToolOptions,
    pan: PanTool,
    pub freehand: FreehandTool,
    pub shapes: ShapeTool,
    pub crop: CropTool,
    pub transform: TransformTool,
    pub selection: SelectionTool,
    /// Last pointer position in canvas space, for the cursor outline.
    hover: Option<Point>,
}

impl ToolManager {
    pub fn new(options: ToolOptions) -> Self {
        let mut manager = Self { options, ..Self::default() };
        manager.set_tool(ToolKind::default());
        manager
    }

    pub fn current(&self) -> ToolKind {
        self.current
    }

    /// Switch tools, aborting whatever the previous one was doing.
    pub fn set_tool(&mut self, tool: ToolKind) -> ToolAction {
        let aborted = self.cancel();
        self.current = tool;
        if let Some(preset) = tool.brush_preset() {
            let color = self.options.brush.color;
            self.options.brush = preset.brush(color);
        }
        if let Some(kind) = tool.shape_kind() {
            self.shapes.set_kind(kind);
        }
        if let Some(kind) = selection::SelectionKind::for_tool(tool) {
            self.selection.set_kind(kind);
        }
        aborted
    }

    /// Route a pointer event to the active tool.
    pub fn pointer(&mut self, view: &ViewTransform, guides: &GuideSystem, canvas_size: Size, event: &PointerEvent) -> ToolAction {
        if let Some(p) = event.position() {
            self.hover = Some(view.screen_to_canvas(p));
        }
        let ctx = ToolContext { view, guides, options: &self.options, canvas_size };
        match self.current {
            ToolKind::Pan => self.pan.pointer(&ctx, event),
            ToolKind::Brush | ToolKind::Pencil | ToolKind::Marker | ToolKind::Airbrush | ToolKind::Eraser => {
                self.freehand.pointer(&ctx, event)
            }
            ToolKind::Line
            | ToolKind::Polyline
            | ToolKind::Arc
            | ToolKind::Bezier
            | ToolKind::Rectangle
            | ToolKind::Circle
            | ToolKind::Box3D => self.shapes.pointer(&ctx, event),
            ToolKind::Crop => self.crop.pointer(&ctx, event),
            ToolKind::Transform | ToolKind::FreeTransform => self.transform.pointer(&ctx, event),
            ToolKind::Marquee | ToolKind::Lasso | ToolKind::MagicWand => self.selection.pointer(&ctx, event),
        }
    }

    pub fn key(&mut self, view: &ViewTransform, guides: &GuideSystem, canvas_size: Size, key: Key) -> ToolAction {
        let ctx = ToolContext { view, guides, options: &self.options, canvas_size };
        match self.current {
            ToolKind::Pan => self.pan.key(&ctx, key),
            ToolKind::Brush | ToolKind::Pencil | ToolKind::Marker | ToolKind::Airbrush | ToolKind::Eraser => {
                self.freehand.key(&ctx, key)
            }
            ToolKind::Line
            | ToolKind::Polyline
            | ToolKind::Arc
            | ToolKind::Bezier
            | ToolKind::Rectangle
            | ToolKind::Circle
            | ToolKind::Box3D => self.shapes.key(&ctx, key),
            ToolKind::Crop => self.crop.key(&ctx, key),
            ToolKind::Transform | ToolKind::FreeTransform => self.transform.key(&ctx, key),
            ToolKind::Marquee | ToolKind::Lasso | ToolKind::MagicWand => self.selection.key(&ctx, key),
        }
    }

    /// Abort the current gesture (pointer cancel, tool switch).
    pub fn cancel(&mut self) -> ToolAction {
        match self.current {
            ToolKind::Pan => self.pan.cancel(),
            ToolKind::Brush | ToolKind::Pencil | ToolKind::Marker | ToolKind::Airbrush | ToolKind::Eraser => {
                self.freehand.cancel()
            }
            ToolKind::Line
            | ToolKind::Polyline
            | ToolKind::Arc
            | ToolKind::Bezier
            | ToolKind::Rectangle
            | ToolKind::Circle
            | ToolKind::Box3D => self.shapes.cancel(),
            // Sessions outlive a single gesture; only the drag is dropped.
            ToolKind::Crop => self.crop.end_drag(),
            ToolKind::Transform | ToolKind::FreeTransform => self.transform.end_drag(),
            ToolKind::Marquee | ToolKind::Lasso | ToolKind::MagicWand => self.selection.cancel(),
        }
    }

    /// Whether a gesture is in progress.
    pub fn is_active(&self) -> bool {
        match self.current {
            ToolKind::Pan => self.pan.is_active(),
            ToolKind::Brush | ToolKind::Pencil | ToolKind::Marker | ToolKind::Airbrush | ToolKind::Eraser => {
                self.freehand.is_active()
            }
            ToolKind::Line
            | ToolKind::Polyline
            | ToolKind::Arc
            | ToolKind::Bezier
            | ToolKind::Rectangle
            | ToolKind::Circle
            | ToolKind::Box3D => self.shapes.is_active(),
            ToolKind::Crop => self.crop.is_active(),
            ToolKind::Transform | ToolKind::FreeTransform => self.transform.is_active(),
            ToolKind::Marquee | ToolKind::Lasso | ToolKind::MagicWand => self.selection.is_active(),
        }
    }

    /// Live preview of the active tool plus the brush cursor.
    pub fn overlay(&self, view: &ViewTransform, guides: &GuideSystem, canvas_size: Size) -> Vec<OverlayPrimitive> {
        let ctx = ToolContext { view, guides, options: &self.options, canvas_size };
        let mut out = match self.current {
            ToolKind::Pan => self.pan.overlay(&ctx),
            ToolKind::Brush | ToolKind::Pencil | ToolKind::Marker | ToolKind::Airbrush | ToolKind::Eraser => {
                self.freehand.overlay(&ctx)
            }
            ToolKind::Line
            | ToolKind::Polyline
            | ToolKind::Arc
            | ToolKind::Bezier
            | ToolKind::Rectangle
            | ToolKind::Circle
            | ToolKind::Box3D => self.shapes.overlay(&ctx),
            ToolKind::Crop => self.crop.overlay(&ctx),
            ToolKind::Transform | ToolKind::FreeTransform => self.transform.overlay(&ctx),
            ToolKind::Marquee | ToolKind::Lasso | ToolKind::MagicWand => self.selection.overlay(&ctx),
        };
        if let (Some(center), true) = (self.hover, self.current.is_freehand()) {
            out.push(OverlayPrimitive::Circle { center, radius: self.options.brush.radius() });
        }
        out
    }
}
