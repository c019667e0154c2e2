//! Canvas document and the controller that owns all mutation.
//!
//! Tools report [`ToolAction`]s; the [`Canvas`] turns them into scene edits
//! and pushes exactly one history entry per committed edit.

use crate::config::CanvasConfig;
use crate::geometry::{Homography, Quad};
use crate::guides::{GuideHandle, GuideKind, GuideSystem};
use crate::history::HistoryManager;
use crate::input::{ClickTracker, InputState, Key, MouseButton, PointerEvent};
use crate::raster::{StampMode, StrokeRasterizer, stroke_paths};
use crate::scene::{
    Direction, DropPosition, ItemId, ItemKind, ItemUpdate, ReorderOutcome, SceneError, SceneGraph,
};
use crate::storage::{ProjectFile, StorageError};
use crate::surface::{PixelRect, RasterSurface, SurfaceError};
use crate::tools::selection::SelectionRegion;
use crate::tools::{
    CropMode, OverlayPrimitive, SelectionMask, SelectionRequest, ShapeGeometry, ToolAction, ToolKind, ToolManager,
    TransformSession, TransformState,
};
use crate::view::ViewTransform;
use kurbo::{Affine, Point, Rect, Size};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("No active item")]
    NoActiveItem,
    #[error("Item {0} has no pixels")]
    NotAnObject(ItemId),
    #[error("No {0} session in progress")]
    NoSession(&'static str),
}

pub type CanvasResult<T> = Result<T, CanvasError>;

/// Everything that is saved with a project.
#[derive(Debug, Clone)]
pub struct CanvasDocument {
    pub id: String,
    pub name: String,
    pub scene: SceneGraph,
    pub guides: GuideSystem,
    pub view: ViewTransform,
}

impl CanvasDocument {
    pub fn new(config: &CanvasConfig) -> CanvasResult<Self> {
        let size = config.canvas_size();
        let scene = SceneGraph::new(size, config.max_surface_pixels)?;
        let mut guides = GuideSystem::new();
        guides.grid = config.grid();
        let view = ViewTransform::new(size, size).with_limits(config.max_zoom, config.min_zoom_fraction);
        Ok(Self { id: Uuid::new_v4().to_string(), name: "Untitled".to_string(), scene, guides, view })
    }

    pub fn canvas_size(&self) -> Size {
        self.scene.canvas_size()
    }
}

/// A freehand stroke being painted into one item.
#[derive(Debug)]
struct ActiveStroke {
    item: ItemId,
    rasterizer: StrokeRasterizer,
    /// Canvas to item-local pixels.
    to_local: Affine,
}

/// The interactive canvas: document, tools, history and input routing.
#[derive(Debug)]
pub struct Canvas {
    pub document: CanvasDocument,
    pub tools: ToolManager,
    history: HistoryManager<SceneGraph>,
    active_item: Option<ItemId>,
    selection: Option<SelectionMask>,
    config: CanvasConfig,
    input: InputState,
    /// Present when the host does not deliver double-clicks itself.
    clicks: Option<ClickTracker>,
    guide_drag: Option<GuideHandle>,
    stroke: Option<ActiveStroke>,
}

impl Canvas {
    /// New document with a background and one empty layer.
    pub fn new(config: CanvasConfig) -> CanvasResult<Self> {
        let mut document = CanvasDocument::new(&config)?;
        let layer = document.scene.add_item(ItemKind::Object, None)?;
        let history = HistoryManager::new(document.scene.clone());
        log::info!("New canvas {}x{}", config.canvas_width, config.canvas_height);
        Ok(Self::assemble(document, history, Some(layer), config))
    }

    fn assemble(
        document: CanvasDocument,
        history: HistoryManager<SceneGraph>,
        active_item: Option<ItemId>,
        config: CanvasConfig,
    ) -> Self {
        Self {
            tools: ToolManager::new(config.tool_options()),
            document,
            history,
            active_item,
            selection: None,
            config,
            input: InputState::new(),
            clicks: None,
            guide_drag: None,
            stroke: None,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.document.scene
    }

    pub fn view(&self) -> &ViewTransform {
        &self.document.view
    }

    pub fn guides(&self) -> &GuideSystem {
        &self.document.guides
    }

    pub fn canvas_size(&self) -> Size {
        self.document.canvas_size()
    }

    pub fn active_item(&self) -> Option<ItemId> {
        self.active_item
    }

    pub fn selection(&self) -> Option<&SelectionMask> {
        self.selection.as_ref()
    }

    pub fn current_tool(&self) -> ToolKind {
        self.tools.current()
    }

    /// Synthesize double-clicks from click timing for hosts without them.
    pub fn set_double_click_synthesis(&mut self, enabled: bool) {
        self.clicks = enabled.then(ClickTracker::new);
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.document.view.set_viewport(size);
    }

    pub fn fit_to_screen(&mut self) {
        self.document.view.fit_canvas(self.config.fit_padding);
    }

    pub fn toggle_guide(&mut self, kind: GuideKind) {
        let size = self.canvas_size();
        self.document.guides.toggle(kind, size);
    }

    // --- history ---

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &HistoryManager<SceneGraph> {
        &self.history
    }

    pub fn undo(&mut self) -> bool {
        self.abort_gesture();
        let Some(scene) = self.history.undo().cloned() else {
            return false;
        };
        self.restore_scene(scene);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.abort_gesture();
        let Some(scene) = self.history.redo().cloned() else {
            return false;
        };
        self.restore_scene(scene);
        true
    }

    fn commit(&mut self, label: &str) {
        debug_assert!(self.document.scene.check_invariants().is_ok());
        self.history.commit(label, self.document.scene.clone());
        log::debug!("Committed '{}' ({} history entries)", label, self.history.len());
    }

    fn restore_scene(&mut self, scene: SceneGraph) {
        self.document.scene = scene;
        self.fix_active_item();
        self.canvas_changed();
        self.restart_session();
    }

    /// Keep the active item pointing at something that exists.
    fn fix_active_item(&mut self) {
        let scene = &self.document.scene;
        if self.active_item.is_some_and(|id| scene.contains(id)) {
            return;
        }
        self.active_item = scene
            .layer_rows()
            .into_iter()
            .map(|(id, _)| id)
            .find(|id| scene.get(*id).is_some_and(|i| i.is_object() && !i.is_background()))
            .or(Some(scene.background_id()));
    }

    /// View and selection follow the canvas size.
    fn canvas_changed(&mut self) {
        let size = self.document.scene.canvas_size();
        self.document.view.set_content_size(size);
        let dims = self.document.scene.dimensions();
        if self.selection.as_ref().is_some_and(|s| (s.width(), s.height()) != dims) {
            self.selection = None;
        }
    }

    // --- tools and input ---

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.abort_gesture();
        let previous = self.tools.current();
        let aborted = self.tools.set_tool(tool);
        if let Err(e) = self.apply_action(aborted) {
            log::warn!("Failed to abort {:?}: {}", previous, e);
        }
        if previous == ToolKind::Crop {
            self.tools.crop.finish();
        }
        if previous.is_transform() {
            self.tools.transform.finish();
        }
        self.ensure_session();
        log::debug!("Tool {:?} -> {:?}", previous, tool);
    }

    pub fn set_active_item(&mut self, id: ItemId) -> CanvasResult<()> {
        if !self.document.scene.contains(id) {
            return Err(SceneError::ItemNotFound(id).into());
        }
        self.abort_gesture();
        self.active_item = Some(id);
        self.restart_session();
        Ok(())
    }

    /// Object the pixel tools write into.
    fn active_object(&self) -> CanvasResult<ItemId> {
        let id = self.active_item.ok_or(CanvasError::NoActiveItem)?;
        match self.document.scene.get(id) {
            Some(item) if item.is_object() => Ok(id),
            Some(_) => Err(CanvasError::NotAnObject(id)),
            None => Err(SceneError::ItemNotFound(id).into()),
        }
    }

    pub fn set_crop_mode(&mut self, mode: CropMode) {
        self.tools.options.crop_mode = mode;
        if self.tools.current() == ToolKind::Crop {
            self.restart_session();
        }
    }

    /// Drop any crop/transform session and start a fresh one for the
    /// current tool.
    fn restart_session(&mut self) {
        self.tools.crop.finish();
        self.tools.transform.finish();
        self.ensure_session();
    }

    fn ensure_session(&mut self) {
        match self.tools.current() {
            ToolKind::Crop if !self.tools.crop.has_session() => {
                let canvas = Rect::from_origin_size(Point::ZERO, self.canvas_size());
                let rect = match self.tools.options.crop_mode {
                    CropMode::Canvas => canvas,
                    CropMode::Item => self.active_content_rect().unwrap_or(canvas),
                };
                self.tools.crop.begin(rect);
            }
            tool if tool.is_transform() && self.tools.transform.session().is_none() => {
                match self.active_content_rect() {
                    Some(source) => self.tools.transform.begin(source, tool == ToolKind::FreeTransform),
                    None => log::debug!("Nothing to transform on the active item"),
                }
            }
            _ => {}
        }
    }

    /// Canvas-space content bounds of the active object.
    fn active_content_rect(&self) -> Option<Rect> {
        let id = self.active_object().ok()?;
        match self.document.scene.content_bounding_box(id) {
            Ok(bounds) => bounds.map(|b| b.to_rect()),
            Err(e) => {
                log::warn!("Content bounds unavailable: {}", e);
                None
            }
        }
    }

    /// Abort whatever gesture is in flight. Never commits.
    fn abort_gesture(&mut self) {
        self.guide_drag = None;
        let action = self.tools.cancel();
        if let Err(e) = self.apply_action(action) {
            log::warn!("Failed to abort gesture: {}", e);
        }
        if let Err(e) = self.abort_stroke() {
            log::warn!("Failed to restore stroke pixels: {}", e);
        }
    }

    /// Route a pointer event.
    pub fn pointer(&mut self, event: &PointerEvent) -> CanvasResult<()> {
        let previous = self.input.pointer_position;
        self.input.handle_pointer_event(event);

        match *event {
            PointerEvent::Scroll { position, delta, modifiers } => {
                if modifiers.ctrl {
                    let factor = if delta.y > 0.0 { 1.1 } else { 0.9 };
                    self.document.view.zoom_at(factor, position);
                } else {
                    self.document.view.pan_by(delta);
                }
                return Ok(());
            }
            PointerEvent::Down { button: MouseButton::Middle | MouseButton::Right, .. }
            | PointerEvent::Up { button: MouseButton::Middle | MouseButton::Right, .. } => return Ok(()),
            PointerEvent::Move { position, .. } if self.input.pan_anchor.is_some() => {
                self.document.view.pan_by(position - previous);
                return Ok(());
            }
            _ => {}
        }

        if self.drag_guide(event) {
            return Ok(());
        }

        let size = self.canvas_size();
        let action = self.tools.pointer(&self.document.view, &self.document.guides, size, event);
        self.apply_action(action)?;

        if let PointerEvent::Down { position, button: MouseButton::Left, modifiers } = *event {
            if self.clicks.as_mut().is_some_and(|c| c.register(position)) {
                let double = PointerEvent::DoubleClick { position, modifiers };
                let action = self.tools.pointer(&self.document.view, &self.document.guides, size, &double);
                self.apply_action(action)?;
            }
            self.ensure_session();
        }
        Ok(())
    }

    /// Guide handle dragging. Returns true when the event was consumed.
    fn drag_guide(&mut self, event: &PointerEvent) -> bool {
        if let Some(handle) = self.guide_drag {
            match *event {
                PointerEvent::Move { position, .. } => {
                    let p = self.document.view.screen_to_canvas(position);
                    self.document.guides.drag_handle(handle, p);
                }
                PointerEvent::Up { .. } | PointerEvent::Cancel => self.guide_drag = None,
                _ => {}
            }
            return true;
        }
        let PointerEvent::Down { position, button: MouseButton::Left, .. } = *event else {
            return false;
        };
        if self.tools.current() == ToolKind::Pan || self.tools.is_active() {
            return false;
        }
        let p = self.document.view.screen_to_canvas(position);
        let tolerance = self.document.view.screen_distance_to_canvas(self.config.handle_tolerance);
        self.guide_drag = self.document.guides.hit_test_handle(p, tolerance);
        self.guide_drag.is_some()
    }

    pub fn key(&mut self, key: Key) -> CanvasResult<()> {
        let size = self.canvas_size();
        let action = self.tools.key(&self.document.view, &self.document.guides, size, key);
        self.apply_action(action)?;
        self.ensure_session();
        Ok(())
    }

    /// Live tool preview in canvas coordinates.
    pub fn overlay(&self) -> Vec<OverlayPrimitive> {
        self.tools.overlay(&self.document.view, &self.document.guides, self.canvas_size())
    }

    fn apply_action(&mut self, action: ToolAction) -> CanvasResult<()> {
        match action {
            ToolAction::None | ToolAction::Preview => Ok(()),
            ToolAction::Discarded => {
                log::debug!("Gesture discarded");
                Ok(())
            }
            ToolAction::StrokeBegin(pens) => self.begin_stroke(&pens),
            ToolAction::StrokeTo(pens) => self.continue_stroke(&pens),
            ToolAction::StrokeEnd => self.end_stroke(),
            ToolAction::StrokeAbort => self.abort_stroke(),
            ToolAction::CommitShape(shape) => self.commit_shape(&shape),
            ToolAction::Select(request) => self.apply_selection(request),
            ToolAction::ApplyCrop => self.apply_crop(),
            ToolAction::ApplyTransform => self.apply_transform(),
            ToolAction::Pan(delta) => {
                self.document.view.pan_by(delta);
                Ok(())
            }
        }
    }

    // --- freehand ---

    fn begin_stroke(&mut self, pens: &[Point]) -> CanvasResult<()> {
        self.abort_stroke()?;
        let id = self.active_object()?;
        let scene = &mut self.document.scene;
        let base = scene.surface(id).cloned().ok_or(CanvasError::NotAnObject(id))?;
        let to_local = scene.world_transform(id).inverse();
        let mut rasterizer = StrokeRasterizer::begin(self.tools.options.brush.clone(), base, pens.len())?;
        let target = scene.surface_mut(id).ok_or(CanvasError::NotAnObject(id))?;
        for (pen, p) in pens.iter().enumerate() {
            rasterizer.add_point(target, pen, to_local * *p);
        }
        self.stroke = Some(ActiveStroke { item: id, rasterizer, to_local });
        Ok(())
    }

    fn continue_stroke(&mut self, pens: &[Point]) -> CanvasResult<()> {
        let Some(stroke) = self.stroke.as_mut() else {
            return Ok(());
        };
        let target = self.document.scene.surface_mut(stroke.item).ok_or(CanvasError::NotAnObject(stroke.item))?;
        for (pen, p) in pens.iter().enumerate() {
            stroke.rasterizer.add_point(target, pen, stroke.to_local * *p);
        }
        Ok(())
    }

    fn end_stroke(&mut self) -> CanvasResult<()> {
        let Some(stroke) = self.stroke.take() else {
            return Ok(());
        };
        if stroke.rasterizer.dirty().is_none() {
            // Nothing landed on the surface; share the old pixels again.
            self.document.scene.set_surface(stroke.item, stroke.rasterizer.base().clone())?;
            return Ok(());
        }
        let label = match stroke.rasterizer.brush().mode {
            StampMode::Erase => "Erase",
            StampMode::Paint => "Stroke",
        };
        self.commit(label);
        Ok(())
    }

    fn abort_stroke(&mut self) -> CanvasResult<()> {
        if let Some(stroke) = self.stroke.take() {
            log::debug!("Stroke aborted");
            self.document.scene.set_surface(stroke.item, stroke.rasterizer.base().clone())?;
        }
        Ok(())
    }

    // --- shapes ---

    fn commit_shape(&mut self, shape: &ShapeGeometry) -> CanvasResult<()> {
        let id = self.active_object()?;
        let mut paths = shape.paths();
        let mirrored: Vec<_> = paths
            .iter()
            .filter_map(|(points, closed)| self.document.guides.mirror_path(points).map(|m| (m, *closed)))
            .collect();
        paths.extend(mirrored);
        let to_local = self.document.scene.world_transform(id).inverse();
        let local: Vec<(Vec<Point>, bool)> = paths
            .into_iter()
            .map(|(points, closed)| (points.into_iter().map(|p| to_local * p).collect(), closed))
            .collect();
        let brush = self.tools.options.brush.clone();
        let target = self.document.scene.surface_mut(id).ok_or(CanvasError::NotAnObject(id))?;
        match stroke_paths(target, &local, &brush)? {
            Some(_) => self.commit(shape.kind().name()),
            None => log::debug!("{} fell outside the item", shape.kind().name()),
        }
        Ok(())
    }

    // --- selection ---

    fn apply_selection(&mut self, request: SelectionRequest) -> CanvasResult<()> {
        let (w, h) = self.document.scene.dimensions();
        let mask = match request.region {
            SelectionRegion::Rect(rect) => SelectionMask::from_rect(w, h, rect),
            SelectionRegion::Polygon(points) => SelectionMask::from_polygon(w, h, &points),
            SelectionRegion::Wand(seed) => {
                let id = self.active_object()?;
                let pixels = self.document.scene.rasterize_item(id)?;
                let options = &self.tools.options;
                match SelectionMask::magic_wand(&pixels, seed, options.wand_tolerance, options.wand_contiguous) {
                    Some(mask) => mask,
                    None => return Ok(()),
                }
            }
        };
        let mut next = self.selection.take().unwrap_or_else(|| SelectionMask::new(w, h));
        next.combine(&mask, request.mode);
        self.selection = (!next.is_empty()).then_some(next);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn select_all(&mut self) {
        let (w, h) = self.document.scene.dimensions();
        self.selection = Some(SelectionMask::full(w, h));
    }

    pub fn invert_selection(&mut self) {
        let (w, h) = self.document.scene.dimensions();
        let mut mask = self.selection.take().unwrap_or_else(|| SelectionMask::new(w, h));
        mask.invert();
        self.selection = (!mask.is_empty()).then_some(mask);
    }

    /// Clear the selected pixels of the active item.
    pub fn erase_selection(&mut self) -> CanvasResult<()> {
        let id = self.active_object()?;
        let Some(mask) = self.selection.as_ref() else {
            return Ok(());
        };
        let world = self.document.scene.world_transform(id);
        let surface = self.document.scene.surface_mut(id).ok_or(CanvasError::NotAnObject(id))?;
        surface.retain_masked(|x, y| {
            let c = world * Point::new(x as f64 + 0.5, y as f64 + 0.5);
            !(c.x >= 0.0 && c.y >= 0.0 && mask.contains(c.x as u32, c.y as u32))
        });
        self.commit("Erase selection");
        Ok(())
    }

    // --- crop ---

    /// Apply the pending crop rectangle.
    pub fn apply_crop(&mut self) -> CanvasResult<()> {
        let rect = self.tools.crop.finish().ok_or(CanvasError::NoSession("crop"))?;
        let result = match self.tools.options.crop_mode {
            CropMode::Canvas => self.crop_canvas(rect),
            CropMode::Item => self.crop_item(rect),
        };
        self.ensure_session();
        result
    }

    fn crop_canvas(&mut self, rect: Rect) -> CanvasResult<()> {
        let (w, h) = self.document.scene.dimensions();
        let Some(area) = PixelRect::from_rect_clamped(rect, w, h) else {
            log::debug!("Crop rectangle {:?} misses the canvas", rect);
            return Ok(());
        };
        if area == PixelRect::new(0, 0, w, h) {
            return Ok(());
        }
        self.document.scene.crop_canvas(area)?;
        self.canvas_changed();
        self.commit("Crop canvas");
        Ok(())
    }

    fn crop_item(&mut self, rect: Rect) -> CanvasResult<()> {
        let id = self.active_object()?;
        let world = self.document.scene.world_transform(id);
        let surface = self.document.scene.surface_mut(id).ok_or(CanvasError::NotAnObject(id))?;
        surface.retain_masked(|x, y| rect.contains(world * Point::new(x as f64 + 0.5, y as f64 + 0.5)));
        self.commit("Crop layer");
        Ok(())
    }

    /// Put the crop rectangle back where the session started.
    pub fn cancel_crop(&mut self) {
        self.tools.crop.reset();
    }

    // --- transform ---

    /// Rasterize the pending transform into the active item.
    pub fn apply_transform(&mut self) -> CanvasResult<()> {
        let session = self.tools.transform.finish().ok_or(CanvasError::NoSession("transform"))?;
        let result = self.bake_transform(&session);
        self.ensure_session();
        result
    }

    fn bake_transform(&mut self, session: &TransformSession) -> CanvasResult<()> {
        if session.is_identity() {
            return Ok(());
        }
        let id = self.active_object()?;
        let Some(warped) = self.transformed_surface(id, session)? else {
            log::debug!("Degenerate transform discarded");
            return Ok(());
        };
        self.document.scene.set_surface(id, Arc::new(warped))?;
        let label = match session.state {
            TransformState::Affine { .. } => "Transform",
            TransformState::Free { .. } => "Free transform",
        };
        self.commit(label);
        Ok(())
    }

    /// Resample the item's current (untransformed) pixels through the
    /// session. `None` when the target geometry is degenerate.
    fn transformed_surface(&self, id: ItemId, session: &TransformSession) -> CanvasResult<Option<RasterSurface>> {
        let scene = &self.document.scene;
        let surface = scene.surface(id).ok_or(CanvasError::NotAnObject(id))?;
        let world = scene.world_transform(id);
        let to_local = world.inverse();
        let (w, h) = surface.dimensions();
        match session.state {
            TransformState::Affine { .. } => match session.state.affine(session.source) {
                Some(a) => Ok(Some(surface.warp_affine(to_local * a * world, w, h)?)),
                None => Ok(None),
            },
            TransformState::Free { .. } => {
                let local = |q: Quad| Quad { tl: to_local * q.tl, tr: to_local * q.tr, br: to_local * q.br, bl: to_local * q.bl };
                let src = local(Quad::from_rect(session.source));
                let dst = local(session.state.quad());
                match Homography::from_quads(&src, &dst) {
                    Some(h_local) => Ok(Some(surface.warp_projective(&h_local, w, h)?)),
                    None => Ok(None),
                }
            }
        }
    }

    /// Drop the pending transform and start over from the current pixels.
    pub fn cancel_transform(&mut self) {
        self.tools.transform.finish();
        self.ensure_session();
    }

    /// Composite including the live transform preview.
    pub fn display_composite(&self) -> CanvasResult<RasterSurface> {
        let preview = match (self.tools.transform.session(), self.active_object()) {
            (Some(session), Ok(id)) if !session.is_identity() => {
                self.transformed_surface(id, session)?.map(|s| (id, s))
            }
            _ => None,
        };
        match preview {
            Some((id, surface)) => {
                let mut scene = self.document.scene.clone();
                scene.set_surface(id, Arc::new(surface))?;
                Ok(scene.composite()?)
            }
            None => Ok(self.document.scene.composite()?),
        }
    }

    // --- scene commands ---

    /// Add an item on top of `parent` (or the root). New objects become active.
    pub fn add_item(&mut self, kind: ItemKind, parent: Option<ItemId>) -> CanvasResult<ItemId> {
        let id = self.document.scene.add_item(kind, parent)?;
        if kind == ItemKind::Object {
            self.active_item = Some(id);
            self.restart_session();
        }
        self.commit(match kind {
            ItemKind::Object => "Add layer",
            ItemKind::Group => "Add group",
        });
        Ok(id)
    }

    pub fn update_item(&mut self, id: ItemId, update: ItemUpdate) -> CanvasResult<()> {
        self.document.scene.update_item(id, update)?;
        self.commit("Update item");
        Ok(())
    }

    pub fn delete_item(&mut self, id: ItemId) -> CanvasResult<Vec<ItemId>> {
        self.abort_gesture();
        let removed = self.document.scene.delete_item(id)?;
        self.fix_active_item();
        self.restart_session();
        self.commit("Delete item");
        Ok(removed)
    }

    pub fn reorder(&mut self, dragged: ItemId, target: ItemId, position: DropPosition) -> CanvasResult<ReorderOutcome> {
        self.abort_gesture();
        let outcome = self.document.scene.reorder(dragged, target, position)?;
        match outcome {
            ReorderOutcome::Moved => self.commit("Reorder"),
            ReorderOutcome::Merged(survivor) => {
                if self.active_item == Some(dragged) {
                    self.active_item = Some(survivor);
                }
                self.restart_session();
                self.commit("Merge");
            }
        }
        Ok(outcome)
    }

    /// Swap with the adjacent sibling. Returns false, without a history
    /// entry, when the item is already at the boundary.
    pub fn move_up_down(&mut self, id: ItemId, direction: Direction) -> CanvasResult<bool> {
        if !self.document.scene.move_up_down(id, direction)? {
            return Ok(false);
        }
        self.commit(match direction {
            Direction::Up => "Move up",
            Direction::Down => "Move down",
        });
        Ok(true)
    }

    pub fn can_move(&self, id: ItemId, direction: Direction) -> bool {
        self.document.scene.can_move(id, direction)
    }

    pub fn can_merge(&self, id: ItemId, direction: Direction) -> bool {
        self.document.scene.can_merge(id, direction)
    }

    pub fn merge_down(&mut self, id: ItemId) -> CanvasResult<ItemId> {
        self.merge(id, Direction::Down)
    }

    pub fn merge_up(&mut self, id: ItemId) -> CanvasResult<ItemId> {
        self.merge(id, Direction::Up)
    }

    fn merge(&mut self, id: ItemId, direction: Direction) -> CanvasResult<ItemId> {
        self.abort_gesture();
        let survivor = self.document.scene.merge(id, direction)?;
        self.active_item = Some(survivor);
        self.restart_session();
        self.commit(match direction {
            Direction::Up => "Merge up",
            Direction::Down => "Merge down",
        });
        Ok(survivor)
    }

    pub fn copy_item(&mut self, id: ItemId) -> CanvasResult<ItemId> {
        let copy = self.document.scene.copy_item(id)?;
        self.commit("Duplicate");
        Ok(copy)
    }

    pub fn group_items(&mut self, ids: &[ItemId]) -> CanvasResult<ItemId> {
        let group = self.document.scene.group_items(ids)?;
        self.commit("Group");
        Ok(group)
    }

    pub fn ungroup(&mut self, id: ItemId) -> CanvasResult<Vec<ItemId>> {
        let children = self.document.scene.ungroup(id)?;
        self.commit("Ungroup");
        Ok(children)
    }

    pub fn set_background_color(&mut self, color: Option<[u8; 4]>) {
        self.document.scene.set_background_color(color);
        self.commit("Background color");
    }

    pub fn set_background_image(&mut self, image: Option<RasterSurface>) -> CanvasResult<()> {
        self.document.scene.set_background_image(image)?;
        self.commit("Background image");
        Ok(())
    }

    /// Resize the canvas, resampling content or anchoring it top-left.
    pub fn resize_canvas(&mut self, size: Size, scale_content: bool) -> CanvasResult<()> {
        self.abort_gesture();
        let size = Size::new(size.width.max(1.0), size.height.max(1.0));
        self.document.scene.resize_canvas(size, scale_content)?;
        self.canvas_changed();
        self.restart_session();
        self.commit("Resize canvas");
        Ok(())
    }

    /// Accept new pixels for the active item (e.g. a generated image).
    /// Other sizes are resampled to the item's surface.
    pub fn replace_active_surface(&mut self, surface: RasterSurface) -> CanvasResult<()> {
        self.abort_gesture();
        let id = self.active_object()?;
        let (w, h) = self.document.scene.surface(id).map(|s| s.dimensions()).ok_or(CanvasError::NotAnObject(id))?;
        let surface = if surface.dimensions() == (w, h) { surface } else { surface.resample(w, h)? };
        self.document.scene.set_surface(id, Arc::new(surface))?;
        self.restart_session();
        self.commit("Replace pixels");
        Ok(())
    }

    /// Flatten all visible items.
    pub fn composite(&self) -> CanvasResult<RasterSurface> {
        Ok(self.document.scene.composite()?)
    }

    pub fn content_bounding_box(&self, id: ItemId) -> CanvasResult<Option<PixelRect>> {
        Ok(self.document.scene.content_bounding_box(id)?)
    }

    pub fn export_item(&self, id: ItemId) -> CanvasResult<Option<RasterSurface>> {
        Ok(self.document.scene.export_item(id)?)
    }

    // --- persistence ---

    pub fn to_project(&self) -> CanvasResult<ProjectFile> {
        let doc = &self.document;
        Ok(ProjectFile::capture(doc.id.clone(), doc.name.clone(), &doc.scene, &doc.guides, &doc.view, self.active_item)?)
    }

    /// Build a canvas from a saved project. History starts at the loaded state.
    pub fn from_project(project: &ProjectFile, config: CanvasConfig) -> CanvasResult<Self> {
        let scene = project.restore_scene(config.max_surface_pixels)?;
        let mut view = project.view.clone();
        view.set_content_size(scene.canvas_size());
        let document = CanvasDocument {
            id: project.id.clone(),
            name: project.name.clone(),
            guides: project.guides.clone().sanitized(),
            view,
            scene,
        };
        let history = HistoryManager::new(document.scene.clone());
        let mut canvas = Self::assemble(document, history, project.active_item, config);
        canvas.fix_active_item();
        Ok(canvas)
    }

    /// Replace the document with a saved project; on error nothing changes.
    pub fn load_project(&mut self, project: &ProjectFile) -> CanvasResult<()> {
        let mut loaded = Self::from_project(project, self.config.clone())?;
        loaded.document.view.set_viewport(self.document.view.viewport);
        loaded.clicks = self.clicks.take();
        *self = loaded;
        Ok(())
    }
}
