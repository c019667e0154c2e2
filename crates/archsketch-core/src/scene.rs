//! Scene graph: an ordered tree of raster objects and groups.
//!
//! Items live in an arena keyed by id. Z-order is kept in per-parent child
//! lists ordered bottom to top, with the root list holding top-level items.
//! The background item is always `root[0]`, has no parent and can never be
//! deleted, reparented or moved.
//!
//! Every mutating operation validates first and only then touches the arena,
//! so a returned error leaves the scene exactly as it was.

use crate::blend::BlendMode;
use crate::surface::{PixelRect, RasterSurface, SurfaceError, pixel_dims};
use kurbo::{Affine, Size};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for scene items.
pub type ItemId = Uuid;

pub const DEFAULT_BACKGROUND_COLOR: [u8; 4] = [255, 255, 255, 255];

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
    #[error("The background item cannot be {0}")]
    BackgroundProtected(&'static str),
    #[error("Moving {dragged} next to {target} would create a cycle")]
    WouldCreateCycle { dragged: ItemId, target: ItemId },
    #[error("Items {0} and {1} cannot be merged")]
    IncompatibleItems(ItemId, ItemId),
    #[error("Item is not a group: {0}")]
    NotAGroup(ItemId),
    #[error("Item is already at the boundary: {0}")]
    AtBoundary(ItemId),
    #[error("Invalid operation: {0}")]
    Invalid(String),
    #[error("Scene invariant violated: {0}")]
    Corrupt(String),
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
}

pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Object,
    Group,
}

/// Drop position relative to a target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropPosition {
    /// Directly above the target in z-order.
    Top,
    /// Directly below the target in z-order.
    Bottom,
    /// Merge into the target.
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

/// Result of a successful `reorder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    Moved,
    /// The dragged item was merged into this survivor.
    Merged(ItemId),
}

/// A node of the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    id: ItemId,
    kind: ItemKind,
    parent: Option<ItemId>,
    children: Vec<ItemId>,
    is_background: bool,
    surface: Option<Arc<RasterSurface>>,
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    /// Item-local to parent space.
    pub transform: Affine,
    /// Background only.
    pub background_color: Option<[u8; 4]>,
    /// Background only; always canvas-sized.
    pub background_image: Option<Arc<RasterSurface>>,
}

impl SceneItem {
    fn new(kind: ItemKind, name: String, parent: Option<ItemId>, surface: Option<Arc<RasterSurface>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            parent,
            children: Vec::new(),
            is_background: false,
            surface,
            name,
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            transform: Affine::IDENTITY,
            background_color: None,
            background_image: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    /// Child ids, bottom to top (groups only).
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    pub fn is_background(&self) -> bool {
        self.is_background
    }

    pub fn is_object(&self) -> bool {
        self.kind == ItemKind::Object
    }

    pub fn is_group(&self) -> bool {
        self.kind == ItemKind::Group
    }

    pub fn surface(&self) -> Option<&Arc<RasterSurface>> {
        self.surface.as_ref()
    }
}

/// Shallow field update for `update_item`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub visible: Option<bool>,
    pub opacity: Option<f32>,
    pub blend_mode: Option<BlendMode>,
    pub transform: Option<Affine>,
}

impl ItemUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = Some(mode);
        self
    }

    pub fn transform(mut self, transform: Affine) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// Snapshot-able scene state. Cloning is cheap: surfaces are shared until
/// written (`Arc::make_mut`).
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph {
    items: HashMap<ItemId, SceneItem>,
    root: Vec<ItemId>,
    background: ItemId,
    width: u32,
    height: u32,
    max_surface_pixels: u64,
    layer_counter: u32,
}

impl SceneGraph {
    /// New scene with a white background sized to the canvas.
    pub fn new(canvas: Size, max_surface_pixels: u64) -> SceneResult<Self> {
        let (width, height) = pixel_dims(canvas);
        let surface = RasterSurface::with_limit(width, height, max_surface_pixels)?;
        let mut bg = SceneItem::new(ItemKind::Object, "Background".to_string(), None, Some(Arc::new(surface)));
        bg.is_background = true;
        bg.background_color = Some(DEFAULT_BACKGROUND_COLOR);
        let background = bg.id;
        let mut items = HashMap::new();
        items.insert(background, bg);
        log::debug!("Created scene {}x{}", width, height);
        Ok(Self {
            items,
            root: vec![background],
            background,
            width,
            height,
            max_surface_pixels,
            layer_counter: 0,
        })
    }

    /// Rebuild a scene from persisted parts. Validates every invariant.
    pub(crate) fn from_parts(
        items: Vec<SceneItem>,
        root: Vec<ItemId>,
        width: u32,
        height: u32,
        max_surface_pixels: u64,
    ) -> SceneResult<Self> {
        let background = items
            .iter()
            .find(|i| i.is_background)
            .map(|i| i.id)
            .ok_or_else(|| SceneError::Corrupt("no background item".to_string()))?;
        let layer_counter = items.iter().filter_map(|i| name_number(&i.name)).max().unwrap_or(0);
        let mut scene = Self {
            items: items.into_iter().map(|i| (i.id, i)).collect(),
            root,
            background,
            width,
            height,
            max_surface_pixels,
            layer_counter,
        };
        scene.check_invariants()?;
        if let Some(image) = scene.background().and_then(|bg| bg.background_image.clone()) {
            if image.dimensions() != (width, height) {
                scene.fit_background_image((*image).clone())?;
            }
        }
        Ok(scene)
    }

    /// Parts for persistence, in paint order.
    pub(crate) fn item_records(&self) -> impl Iterator<Item = &SceneItem> {
        self.paint_order().into_iter().filter_map(|id| self.items.get(&id))
    }

    pub(crate) fn raw_item(
        id: ItemId,
        kind: ItemKind,
        parent: Option<ItemId>,
        children: Vec<ItemId>,
        is_background: bool,
        surface: Option<Arc<RasterSurface>>,
    ) -> SceneItem {
        let mut item = SceneItem::new(kind, String::new(), parent, surface);
        item.id = id;
        item.children = children;
        item.is_background = is_background;
        item
    }

    pub fn canvas_size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn max_surface_pixels(&self) -> u64 {
        self.max_surface_pixels
    }

    pub fn background_id(&self) -> ItemId {
        self.background
    }

    pub fn background(&self) -> Option<&SceneItem> {
        self.items.get(&self.background)
    }

    pub fn get(&self, id: ItemId) -> Option<&SceneItem> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Top-level ids, bottom to top.
    pub fn root(&self) -> &[ItemId] {
        &self.root
    }

    /// All ids depth-first in paint order (bottom first).
    pub fn paint_order(&self) -> Vec<ItemId> {
        fn walk(scene: &SceneGraph, ids: &[ItemId], out: &mut Vec<ItemId>) {
            for id in ids {
                out.push(*id);
                if let Some(item) = scene.items.get(id) {
                    walk(scene, &item.children, out);
                }
            }
        }
        let mut out = Vec::with_capacity(self.items.len());
        walk(self, &self.root, &mut out);
        out
    }

    /// Rows for a layer panel: top-most first, with nesting depth.
    pub fn layer_rows(&self) -> Vec<(ItemId, usize)> {
        fn walk(scene: &SceneGraph, ids: &[ItemId], depth: usize, out: &mut Vec<(ItemId, usize)>) {
            for id in ids.iter().rev() {
                out.push((*id, depth));
                if let Some(item) = scene.items.get(id) {
                    walk(scene, &item.children, depth + 1, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &self.root, 0, &mut out);
        out
    }

    fn item(&self, id: ItemId) -> SceneResult<&SceneItem> {
        self.items.get(&id).ok_or(SceneError::ItemNotFound(id))
    }

    fn item_mut(&mut self, id: ItemId) -> SceneResult<&mut SceneItem> {
        self.items.get_mut(&id).ok_or(SceneError::ItemNotFound(id))
    }

    fn siblings(&self, parent: Option<ItemId>) -> SceneResult<&Vec<ItemId>> {
        match parent {
            None => Ok(&self.root),
            Some(p) => Ok(&self.item(p)?.children),
        }
    }

    fn siblings_mut(&mut self, parent: Option<ItemId>) -> SceneResult<&mut Vec<ItemId>> {
        match parent {
            None => Ok(&mut self.root),
            Some(p) => Ok(&mut self.item_mut(p)?.children),
        }
    }

    /// Parent and index within the parent's child list.
    fn locate(&self, id: ItemId) -> SceneResult<(Option<ItemId>, usize)> {
        let parent = self.item(id)?.parent;
        let index = self
            .siblings(parent)?
            .iter()
            .position(|c| *c == id)
            .ok_or_else(|| SceneError::Corrupt(format!("item {id} missing from its parent list")))?;
        Ok((parent, index))
    }

    /// True if `ancestor` is `id` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: ItemId, id: ItemId) -> bool {
        let mut cursor = Some(id);
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.items.len() {
                return false;
            }
            cursor = self.items.get(&current).and_then(|i| i.parent);
        }
        false
    }

    /// Item-local to canvas transform, including ancestor groups.
    pub fn world_transform(&self, id: ItemId) -> Affine {
        let mut tf = Affine::IDENTITY;
        let mut cursor = Some(id);
        let mut steps = 0;
        while let Some(current) = cursor {
            let Some(item) = self.items.get(&current) else { break };
            tf = item.transform * tf;
            cursor = item.parent;
            steps += 1;
            if steps > self.items.len() {
                break;
            }
        }
        tf
    }

    fn next_name(&mut self, kind: ItemKind) -> String {
        self.layer_counter += 1;
        match kind {
            ItemKind::Object => format!("Layer {}", self.layer_counter),
            ItemKind::Group => format!("Group {}", self.layer_counter),
        }
    }

    fn blank_surface(&self) -> SceneResult<RasterSurface> {
        Ok(RasterSurface::with_limit(self.width, self.height, self.max_surface_pixels)?)
    }

    fn check_parent(&self, parent: Option<ItemId>) -> SceneResult<()> {
        if let Some(p) = parent {
            if !self.item(p)?.is_group() {
                return Err(SceneError::NotAGroup(p));
            }
        }
        Ok(())
    }

    /// Insert a new item at the top of `parent` (or of the root).
    pub fn add_item(&mut self, kind: ItemKind, parent: Option<ItemId>) -> SceneResult<ItemId> {
        self.check_parent(parent)?;
        let surface = match kind {
            ItemKind::Object => Some(Arc::new(self.blank_surface()?)),
            ItemKind::Group => None,
        };
        let name = self.next_name(kind);
        let item = SceneItem::new(kind, name, parent, surface);
        let id = item.id;
        self.items.insert(id, item);
        self.siblings_mut(parent)?.push(id);
        log::debug!("Added {:?} item {}", kind, id);
        Ok(id)
    }

    /// Shallow-merge metadata. Opacity is clamped to `[0, 1]`.
    pub fn update_item(&mut self, id: ItemId, update: ItemUpdate) -> SceneResult<()> {
        let item = self.item_mut(id)?;
        if let Some(name) = update.name {
            item.name = name;
        }
        if let Some(visible) = update.visible {
            item.visible = visible;
        }
        if let Some(opacity) = update.opacity {
            item.opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
        }
        if let Some(mode) = update.blend_mode {
            item.blend_mode = mode;
        }
        if let Some(transform) = update.transform {
            item.transform = transform;
        }
        Ok(())
    }

    /// Remove an item and, for groups, every descendant.
    pub fn delete_item(&mut self, id: ItemId) -> SceneResult<Vec<ItemId>> {
        let item = self.item(id)?;
        if item.is_background {
            log::warn!("Refused to delete the background item");
            return Err(SceneError::BackgroundProtected("deleted"));
        }
        let (parent, index) = self.locate(id)?;
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(item) = self.items.remove(&current) {
                stack.extend(item.children.iter().copied());
                removed.push(current);
            }
        }
        self.siblings_mut(parent)?.remove(index);
        log::debug!("Deleted {} item(s) starting at {}", removed.len(), id);
        Ok(removed)
    }

    fn sibling_in(&self, id: ItemId, direction: Direction) -> SceneResult<Option<ItemId>> {
        let (parent, index) = self.locate(id)?;
        let siblings = self.siblings(parent)?;
        let neighbor = match direction {
            Direction::Up => siblings.get(index + 1).copied(),
            Direction::Down => index.checked_sub(1).and_then(|i| siblings.get(i).copied()),
        };
        Ok(neighbor)
    }

    /// Swap with the adjacent sibling. Returns false (and changes nothing)
    /// at the edge of the parent's list; see [`SceneGraph::can_move`].
    pub fn move_up_down(&mut self, id: ItemId, direction: Direction) -> SceneResult<bool> {
        if self.item(id)?.is_background {
            return Err(SceneError::BackgroundProtected("moved"));
        }
        if !self.can_move(id, direction) {
            log::debug!("{} is already at the {:?} boundary", id, direction);
            return Ok(false);
        }
        let (parent, index) = self.locate(id)?;
        let siblings = self.siblings_mut(parent)?;
        match direction {
            Direction::Up => siblings.swap(index, index + 1),
            Direction::Down => siblings.swap(index, index - 1),
        }
        Ok(true)
    }

    pub fn can_move(&self, id: ItemId, direction: Direction) -> bool {
        match self.items.get(&id) {
            Some(item) if !item.is_background => matches!(
                self.sibling_in(id, direction),
                Ok(Some(n)) if n != self.background
            ),
            _ => false,
        }
    }

    /// Drag-and-drop in the layer panel.
    pub fn reorder(&mut self, dragged: ItemId, target: ItemId, position: DropPosition) -> SceneResult<ReorderOutcome> {
        let dragged_item = self.item(dragged)?;
        let target_item = self.item(target)?;
        if dragged_item.is_background {
            log::warn!("Refused to reorder the background item");
            return Err(SceneError::BackgroundProtected("moved"));
        }
        if dragged == target {
            return Err(SceneError::Invalid("an item cannot be dropped onto itself".to_string()));
        }

        if position == DropPosition::Middle {
            if !dragged_item.is_object() || !target_item.is_object() {
                return Err(SceneError::IncompatibleItems(dragged, target));
            }
            self.merge_into(dragged, target, false)?;
            return Ok(ReorderOutcome::Merged(target));
        }

        if target_item.is_background && position == DropPosition::Bottom {
            return Err(SceneError::BackgroundProtected("covered from below"));
        }
        if self.is_ancestor_or_self(dragged, target) {
            log::warn!("Refused reorder of {} next to its own descendant {}", dragged, target);
            return Err(SceneError::WouldCreateCycle { dragged, target });
        }

        let new_parent = target_item.parent;
        let (old_parent, old_index) = self.locate(dragged)?;
        self.siblings_mut(old_parent)?.remove(old_index);
        // Target index after removal.
        let target_index = self
            .siblings(new_parent)?
            .iter()
            .position(|c| *c == target)
            .ok_or_else(|| SceneError::Corrupt(format!("target {target} missing from its parent list")))?;
        let insert_at = match position {
            DropPosition::Top => target_index + 1,
            _ => target_index,
        };
        self.siblings_mut(new_parent)?.insert(insert_at, dragged);
        self.item_mut(dragged)?.parent = new_parent;
        debug_assert!(self.check_invariants().is_ok());
        log::debug!("Reordered {} {:?} {}", dragged, position, target);
        Ok(ReorderOutcome::Moved)
    }

    /// Merge with the adjacent sibling. Returns the surviving item.
    ///
    /// Down: the item is flattened onto the sibling below, which survives.
    /// Up: the sibling above is flattened onto this item's pixels and takes
    /// its place; the sibling survives.
    pub fn merge(&mut self, id: ItemId, direction: Direction) -> SceneResult<ItemId> {
        let neighbor = self.sibling_in(id, direction)?.ok_or(SceneError::AtBoundary(id))?;
        let (a, b) = (self.item(id)?, self.item(neighbor)?);
        if !a.is_object() || !b.is_object() {
            return Err(SceneError::IncompatibleItems(id, neighbor));
        }
        if a.is_background {
            return Err(SceneError::BackgroundProtected("merged away"));
        }
        match direction {
            Direction::Down => self.merge_into(id, neighbor, false)?,
            Direction::Up => self.merge_into(id, neighbor, true)?,
        }
        Ok(neighbor)
    }

    pub fn merge_down(&mut self, id: ItemId) -> SceneResult<ItemId> {
        self.merge(id, Direction::Down)
    }

    pub fn merge_up(&mut self, id: ItemId) -> SceneResult<ItemId> {
        self.merge(id, Direction::Up)
    }

    pub fn can_merge(&self, id: ItemId, direction: Direction) -> bool {
        let Some(a) = self.items.get(&id) else { return false };
        if !a.is_object() || a.is_background || !a.visible {
            return false;
        }
        match self.sibling_in(id, direction) {
            Ok(Some(n)) => self.items.get(&n).is_some_and(|b| b.is_object()),
            _ => false,
        }
    }

    /// Flatten `consumed` into `survivor` and delete `consumed`.
    ///
    /// With `survivor_on_top` the survivor's pixels go over the consumed
    /// item's pixels, otherwise the consumed item is drawn over the survivor.
    /// Either way the survivor's blend mode combines the two.
    fn merge_into(&mut self, consumed: ItemId, survivor: ItemId, survivor_on_top: bool) -> SceneResult<()> {
        let a = self.item(consumed)?;
        let b = self.item(survivor)?;
        if !a.visible {
            log::warn!("Refused to merge hidden item {}", consumed);
            return Err(SceneError::Invalid(format!("hidden item {consumed} cannot be merged")));
        }
        let (Some(a_surface), Some(b_surface)) = (a.surface.clone(), b.surface.clone()) else {
            return Err(SceneError::IncompatibleItems(consumed, survivor));
        };
        let into_b = self.world_transform(survivor).inverse() * self.world_transform(consumed);
        let mode = b.blend_mode;
        let a_opacity = a.opacity;

        let merged = if survivor_on_top {
            let mut out = RasterSurface::with_limit(b_surface.width(), b_surface.height(), self.max_surface_pixels)?;
            out.composite_from(&a_surface, into_b, a_opacity, BlendMode::Normal);
            out.composite_from(&b_surface, Affine::IDENTITY, 1.0, mode);
            out
        } else {
            let mut out = (*b_surface).clone();
            out.composite_from(&a_surface, into_b, a_opacity, mode);
            out
        };

        let (parent, index) = self.locate(consumed)?;
        self.items.remove(&consumed);
        self.siblings_mut(parent)?.remove(index);
        if survivor_on_top {
            // Survivor takes the consumed item's slot.
            let (sp, si) = self.locate(survivor)?;
            let list = self.siblings_mut(sp)?;
            list.remove(si);
            list.insert(index.min(list.len()), survivor);
        }
        self.item_mut(survivor)?.surface = Some(Arc::new(merged));
        log::debug!("Merged {} into {}", consumed, survivor);
        Ok(())
    }

    /// Duplicate an item (and its subtree) directly above it.
    pub fn copy_item(&mut self, id: ItemId) -> SceneResult<ItemId> {
        let (parent, index) = self.locate(id)?;
        let new_id = self.clone_subtree(id, parent)?;
        if let Some(item) = self.items.get_mut(&new_id) {
            item.name = format!("{} (copy)", item.name);
        }
        self.siblings_mut(parent)?.insert(index + 1, new_id);
        log::debug!("Copied {} as {}", id, new_id);
        Ok(new_id)
    }

    fn clone_subtree(&mut self, id: ItemId, parent: Option<ItemId>) -> SceneResult<ItemId> {
        let mut copy = self.item(id)?.clone();
        let new_id = Uuid::new_v4();
        copy.id = new_id;
        copy.parent = parent;
        copy.is_background = false;
        copy.background_color = None;
        copy.background_image = None;
        let children = std::mem::take(&mut copy.children);
        self.items.insert(new_id, copy);
        let mut new_children = Vec::with_capacity(children.len());
        for child in children {
            new_children.push(self.clone_subtree(child, Some(new_id))?);
        }
        self.item_mut(new_id)?.children = new_children;
        Ok(new_id)
    }

    /// Wrap sibling items into a new group placed at the top-most member.
    pub fn group_items(&mut self, ids: &[ItemId]) -> SceneResult<ItemId> {
        let first = *ids.first().ok_or_else(|| SceneError::Invalid("nothing to group".to_string()))?;
        let parent = self.item(first)?.parent;
        let mut indices = Vec::with_capacity(ids.len());
        for id in ids {
            let item = self.item(*id)?;
            if item.is_background {
                return Err(SceneError::BackgroundProtected("grouped"));
            }
            if item.parent != parent {
                return Err(SceneError::Invalid("grouped items must share a parent".to_string()));
            }
            indices.push(self.locate(*id)?.1);
        }
        let unique: HashSet<ItemId> = ids.iter().copied().collect();
        if unique.len() != ids.len() {
            return Err(SceneError::Invalid("duplicate ids in group request".to_string()));
        }

        let name = self.next_name(ItemKind::Group);
        let mut group = SceneItem::new(ItemKind::Group, name, parent, None);
        let group_id = group.id;
        let siblings = self.siblings(parent)?;
        // Keep the members' relative z-order.
        group.children = siblings.iter().copied().filter(|c| unique.contains(c)).collect();
        let top_index = indices.iter().copied().max().unwrap_or(0);
        let insert_at = top_index + 1 - ids.len();

        let siblings = self.siblings_mut(parent)?;
        siblings.retain(|c| !unique.contains(c));
        siblings.insert(insert_at, group_id);
        for child in &group.children {
            if let Some(item) = self.items.get_mut(child) {
                item.parent = Some(group_id);
            }
        }
        self.items.insert(group_id, group);
        log::debug!("Grouped {} item(s) into {}", ids.len(), group_id);
        Ok(group_id)
    }

    /// Dissolve a group, moving its children into its place.
    pub fn ungroup(&mut self, id: ItemId) -> SceneResult<Vec<ItemId>> {
        if !self.item(id)?.is_group() {
            return Err(SceneError::NotAGroup(id));
        }
        let (parent, index) = self.locate(id)?;
        let group = self.items.remove(&id).ok_or(SceneError::ItemNotFound(id))?;
        for child in &group.children {
            if let Some(item) = self.items.get_mut(child) {
                item.parent = parent;
                // Bake the group transform into each child.
                item.transform = group.transform * item.transform;
            }
        }
        let siblings = self.siblings_mut(parent)?;
        siblings.remove(index);
        for (offset, child) in group.children.iter().enumerate() {
            siblings.insert(index + offset, *child);
        }
        Ok(group.children)
    }

    pub fn set_background_color(&mut self, color: Option<[u8; 4]>) {
        let id = self.background;
        if let Some(bg) = self.items.get_mut(&id) {
            bg.background_color = color;
        }
    }

    /// Set or clear the background image. Images of another size are
    /// resampled to the canvas.
    pub fn set_background_image(&mut self, image: Option<RasterSurface>) -> SceneResult<()> {
        match image {
            Some(image) => self.fit_background_image(image),
            None => {
                self.item_mut(self.background)?.background_image = None;
                Ok(())
            }
        }
    }

    fn fit_background_image(&mut self, image: RasterSurface) -> SceneResult<()> {
        let image = if image.dimensions() == (self.width, self.height) {
            image
        } else {
            log::debug!("Resampling {}x{} background image to the canvas", image.width(), image.height());
            image.resample(self.width, self.height)?
        };
        self.item_mut(self.background)?.background_image = Some(Arc::new(image));
        Ok(())
    }

    /// Shared handle to an object's pixels.
    pub fn surface(&self, id: ItemId) -> Option<&Arc<RasterSurface>> {
        self.items.get(&id).and_then(|i| i.surface.as_ref())
    }

    /// Mutable pixels; copies them first if a snapshot still shares them.
    pub fn surface_mut(&mut self, id: ItemId) -> Option<&mut RasterSurface> {
        self.items.get_mut(&id).and_then(|i| i.surface.as_mut()).map(Arc::make_mut)
    }

    /// Replace an object's pixels.
    pub fn set_surface(&mut self, id: ItemId, surface: Arc<RasterSurface>) -> SceneResult<()> {
        let item = self.item_mut(id)?;
        if !item.is_object() {
            return Err(SceneError::NotAGroup(id));
        }
        item.surface = Some(surface);
        Ok(())
    }

    /// Resize every surface, either resampling or anchoring top-left.
    /// All new surfaces are built before any is swapped in.
    pub fn resize_canvas(&mut self, size: Size, scale_content: bool) -> SceneResult<()> {
        let (width, height) = pixel_dims(size);
        let pixels = width as u64 * height as u64;
        if pixels > self.max_surface_pixels {
            return Err(SurfaceError::TooLarge { width, height, limit: self.max_surface_pixels }.into());
        }
        let (sx, sy) = (width as f64 / self.width as f64, height as f64 / self.height as f64);
        let mut replaced = Vec::new();
        for (id, item) in &self.items {
            let Some(surface) = &item.surface else { continue };
            let next = if scale_content {
                surface.resample(
                    (surface.width() as f64 * sx).round() as u32,
                    (surface.height() as f64 * sy).round() as u32,
                )?
            } else {
                surface.resize_anchored(width, height, [0, 0, 0, 0])?
            };
            replaced.push((*id, next));
        }
        let image = match self.background().and_then(|bg| bg.background_image.as_ref()) {
            Some(image) if scale_content => Some(image.resample(width, height)?),
            Some(image) => Some(image.resize_anchored(width, height, [0, 0, 0, 0])?),
            None => None,
        };
        if let Some(bg) = self.items.get_mut(&self.background) {
            bg.background_image = image.map(Arc::new);
        }
        for (id, surface) in replaced {
            if let Some(item) = self.items.get_mut(&id) {
                item.surface = Some(Arc::new(surface));
                if scale_content {
                    // Keep translations proportional.
                    let c = item.transform.as_coeffs();
                    item.transform = Affine::new([c[0], c[1], c[2], c[3], c[4] * sx, c[5] * sy]);
                }
            }
        }
        log::info!("Canvas resized {}x{} -> {}x{} (scale: {})", self.width, self.height, width, height, scale_content);
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Crop the whole canvas to `rect`. Item transforms are baked in.
    pub fn crop_canvas(&mut self, rect: PixelRect) -> SceneResult<()> {
        let shift = Affine::translate((-(rect.x as f64), -(rect.y as f64)));
        let mut replaced = Vec::new();
        for id in self.paint_order() {
            let item = self.item(id)?;
            let Some(surface) = &item.surface else { continue };
            let world = self.world_transform(id);
            let next = if world == Affine::IDENTITY {
                surface.crop(rect.x as i64, rect.y as i64, rect.width, rect.height)?
            } else {
                surface.warp_affine(shift * world, rect.width, rect.height)?
            };
            replaced.push((id, next));
        }
        let image = match self.background().and_then(|bg| bg.background_image.as_ref()) {
            Some(image) => Some(image.crop(rect.x as i64, rect.y as i64, rect.width, rect.height)?),
            None => None,
        };
        if let Some(bg) = self.items.get_mut(&self.background) {
            bg.background_image = image.map(Arc::new);
        }
        for (id, surface) in replaced {
            if let Some(item) = self.items.get_mut(&id) {
                item.surface = Some(Arc::new(surface));
            }
        }
        for item in self.items.values_mut() {
            item.transform = Affine::IDENTITY;
        }
        self.width = rect.width.max(1);
        self.height = rect.height.max(1);
        log::info!("Canvas cropped to {:?}", rect);
        Ok(())
    }

    /// Draw one item (recursively for groups) onto `target` in canvas space.
    fn render_item(&self, id: ItemId, target: &mut RasterSurface, parent_tf: Affine, opacity: f32, mode: BlendMode) -> SceneResult<()> {
        let item = self.item(id)?;
        let tf = parent_tf * item.transform;
        if item.is_background {
            if let Some(color) = item.background_color {
                let fill = RasterSurface::filled(target.width(), target.height(), color)?;
                target.composite_from(&fill, Affine::IDENTITY, opacity, BlendMode::Normal);
            }
            if let Some(image) = &item.background_image {
                target.composite_from(image, Affine::IDENTITY, opacity, BlendMode::Normal);
            }
        }
        match item.kind {
            ItemKind::Object => {
                if let Some(surface) = &item.surface {
                    target.composite_from(surface, tf, opacity, mode);
                }
            }
            ItemKind::Group => {
                // Groups composite in isolation, then blend as one layer.
                let mut layer = RasterSurface::with_limit(target.width(), target.height(), self.max_surface_pixels)?;
                for child_id in &item.children {
                    let child = self.item(*child_id)?;
                    if child.visible {
                        self.render_item(*child_id, &mut layer, tf, child.opacity, child.blend_mode)?;
                    }
                }
                target.composite_from(&layer, Affine::IDENTITY, opacity, mode);
            }
        }
        Ok(())
    }

    /// Flatten all visible items honouring order, opacity and blend modes.
    pub fn composite(&self) -> SceneResult<RasterSurface> {
        let mut out = self.blank_surface()?;
        for id in &self.root {
            let item = self.item(*id)?;
            if item.visible {
                self.render_item(*id, &mut out, Affine::IDENTITY, item.opacity, item.blend_mode)?;
            }
        }
        Ok(out)
    }

    /// Canvas-space rendering of one item without its opacity or blend mode.
    pub fn rasterize_item(&self, id: ItemId) -> SceneResult<RasterSurface> {
        let parent_tf = match self.item(id)?.parent {
            Some(p) => self.world_transform(p),
            None => Affine::IDENTITY,
        };
        let mut out = self.blank_surface()?;
        self.render_item(id, &mut out, parent_tf, 1.0, BlendMode::Normal)?;
        Ok(out)
    }

    /// Rasterized item cropped to its content bounding box, or `None` when
    /// the item is fully transparent.
    pub fn export_item(&self, id: ItemId) -> SceneResult<Option<RasterSurface>> {
        let full = self.rasterize_item(id)?;
        match full.content_bounding_box() {
            Some(r) => Ok(Some(full.crop(r.x as i64, r.y as i64, r.width, r.height)?)),
            None => Ok(None),
        }
    }

    /// Content bounding box of one item in canvas space.
    pub fn content_bounding_box(&self, id: ItemId) -> SceneResult<Option<PixelRect>> {
        Ok(self.rasterize_item(id)?.content_bounding_box())
    }

    /// Validate structural invariants.
    pub fn check_invariants(&self) -> SceneResult<()> {
        let corrupt = |msg: String| Err(SceneError::Corrupt(msg));
        let Some(bg) = self.items.get(&self.background) else {
            return corrupt("background missing".to_string());
        };
        if !bg.is_background || bg.parent.is_some() || self.root.first() != Some(&self.background) {
            return corrupt("background must be the first root item".to_string());
        }
        if self.items.values().filter(|i| i.is_background).count() != 1 {
            return corrupt("exactly one background item required".to_string());
        }
        let mut seen = HashSet::new();
        let mut stack: Vec<(ItemId, Option<ItemId>)> = self.root.iter().map(|id| (*id, None)).collect();
        while let Some((id, expected_parent)) = stack.pop() {
            if !seen.insert(id) {
                return corrupt(format!("item {id} reachable twice"));
            }
            let Some(item) = self.items.get(&id) else {
                return corrupt(format!("dangling id {id}"));
            };
            if item.parent != expected_parent {
                return corrupt(format!("item {id} has a stale parent link"));
            }
            match item.kind {
                ItemKind::Object if item.surface.is_none() || !item.children.is_empty() => {
                    return corrupt(format!("object {id} must have a surface and no children"));
                }
                ItemKind::Group if item.surface.is_some() => {
                    return corrupt(format!("group {id} must not own a surface"));
                }
                _ => {}
            }
            stack.extend(item.children.iter().map(|c| (*c, Some(id))));
        }
        if seen.len() != self.items.len() {
            return corrupt("unreachable items in arena".to_string());
        }
        Ok(())
    }
}

/// Number in a generated "Layer N" / "Group N" name.
fn name_number(name: &str) -> Option<u32> {
    name.strip_prefix("Layer ")
        .or_else(|| name.strip_prefix("Group "))
        .and_then(|n| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::DEFAULT_MAX_SURFACE_PIXELS;

    fn scene() -> SceneGraph {
        SceneGraph::new(Size::new(100.0, 100.0), DEFAULT_MAX_SURFACE_PIXELS).unwrap()
    }

    #[test]
    fn test_new_scene_has_background_only() {
        let s = scene();
        assert_eq!(s.len(), 1);
        assert!(s.background().unwrap().is_background());
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_add_item_goes_on_top() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        let b = s.add_item(ItemKind::Object, None).unwrap();
        assert_eq!(s.root(), &[s.background_id(), a, b]);
        assert_eq!(s.surface(a).unwrap().dimensions(), (100, 100));
    }

    #[test]
    fn test_add_to_object_parent_rejected() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        assert!(matches!(s.add_item(ItemKind::Object, Some(a)), Err(SceneError::NotAGroup(_))));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_surface_too_large() {
        let mut s = SceneGraph::new(Size::new(10.0, 10.0), 100).unwrap();
        assert!(s.add_item(ItemKind::Object, None).is_ok());
        let err = s.resize_canvas(Size::new(20.0, 20.0), false).unwrap_err();
        assert!(matches!(err, SceneError::Surface(SurfaceError::TooLarge { .. })));
        assert_eq!(s.dimensions(), (10, 10));
    }

    #[test]
    fn test_delete_cascades() {
        let mut s = scene();
        let g = s.add_item(ItemKind::Group, None).unwrap();
        let c1 = s.add_item(ItemKind::Object, Some(g)).unwrap();
        let inner = s.add_item(ItemKind::Group, Some(g)).unwrap();
        let c2 = s.add_item(ItemKind::Object, Some(inner)).unwrap();
        let removed = s.delete_item(g).unwrap();
        assert_eq!(removed.len(), 4);
        for id in [g, c1, inner, c2] {
            assert!(!s.contains(id));
        }
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_background_cannot_be_deleted_or_moved() {
        let mut s = scene();
        let bg = s.background_id();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        assert!(matches!(s.delete_item(bg), Err(SceneError::BackgroundProtected(_))));
        assert!(s.reorder(bg, a, DropPosition::Top).is_err());
        assert!(s.reorder(a, bg, DropPosition::Bottom).is_err());
        assert!(!s.move_up_down(a, Direction::Down).unwrap());
        assert!(s.move_up_down(bg, Direction::Up).is_err());
        assert!(!s.can_move(a, Direction::Down));
        assert_eq!(s.root()[0], bg);
    }

    #[test]
    fn test_move_up_down() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        let b = s.add_item(ItemKind::Object, None).unwrap();
        assert!(s.can_move(a, Direction::Up));
        s.move_up_down(a, Direction::Up).unwrap();
        assert_eq!(s.root(), &[s.background_id(), b, a]);
        let before = s.clone();
        assert!(!s.move_up_down(a, Direction::Up).unwrap());
        assert_eq!(s, before);
    }

    #[test]
    fn test_reorder_into_group_scope() {
        let mut s = scene();
        let g = s.add_item(ItemKind::Group, None).unwrap();
        let child = s.add_item(ItemKind::Object, Some(g)).unwrap();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        s.reorder(a, child, DropPosition::Bottom).unwrap();
        assert_eq!(s.get(a).unwrap().parent(), Some(g));
        assert_eq!(s.get(g).unwrap().children(), &[a, child]);
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_reorder_cycle_rejected() {
        let mut s = scene();
        let g = s.add_item(ItemKind::Group, None).unwrap();
        let inner = s.add_item(ItemKind::Group, Some(g)).unwrap();
        let leaf = s.add_item(ItemKind::Object, Some(inner)).unwrap();
        let before = s.clone();
        let err = s.reorder(g, leaf, DropPosition::Top).unwrap_err();
        assert!(matches!(err, SceneError::WouldCreateCycle { .. }));
        assert_eq!(s, before);
    }

    #[test]
    fn test_middle_drop_on_group_rejected() {
        let mut s = scene();
        let g = s.add_item(ItemKind::Group, None).unwrap();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        assert!(matches!(
            s.reorder(a, g, DropPosition::Middle),
            Err(SceneError::IncompatibleItems(_, _))
        ));
        assert!(s.contains(a));
    }

    #[test]
    fn test_merge_down_composites_and_removes() {
        let mut s = scene();
        let b = s.add_item(ItemKind::Object, None).unwrap();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        s.surface_mut(b).unwrap().fill([0, 0, 255, 255]);
        s.surface_mut(a).unwrap().fill([255, 0, 0, 255]);
        s.update_item(a, ItemUpdate::default().opacity(0.5)).unwrap();
        let survivor = s.merge_down(a).unwrap();
        assert_eq!(survivor, b);
        assert!(!s.contains(a));
        let expected = crate::blend::blend_pixel([0, 0, 255, 255], [255, 0, 0, 255], BlendMode::Normal, 0.5);
        assert_eq!(s.surface(b).unwrap().pixel(50, 50), expected);
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_merge_up_keeps_z_order() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        let c = s.add_item(ItemKind::Object, None).unwrap();
        let top = s.add_item(ItemKind::Object, None).unwrap();
        s.surface_mut(a).unwrap().fill([255, 0, 0, 255]);
        s.surface_mut(c).unwrap().put_pixel(0, 0, [0, 255, 0, 255]);
        let survivor = s.merge_up(a).unwrap();
        assert_eq!(survivor, c);
        assert_eq!(s.root(), &[s.background_id(), c, top]);
        let surface = s.surface(c).unwrap();
        assert_eq!(surface.pixel(0, 0), [0, 255, 0, 255]);
        assert_eq!(surface.pixel(5, 5), [255, 0, 0, 255]);
    }

    #[test]
    fn test_merge_with_group_rejected() {
        let mut s = scene();
        let _g = s.add_item(ItemKind::Group, None).unwrap();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        assert!(!s.can_merge(a, Direction::Down));
        assert!(matches!(s.merge_down(a), Err(SceneError::IncompatibleItems(_, _))));
        assert!(matches!(s.merge_up(a), Err(SceneError::AtBoundary(_))));
    }

    #[test]
    fn test_copy_item() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        s.surface_mut(a).unwrap().put_pixel(1, 1, [9, 9, 9, 255]);
        let copy = s.copy_item(a).unwrap();
        assert_eq!(s.root(), &[s.background_id(), a, copy]);
        let item = s.get(copy).unwrap();
        assert!(item.name.ends_with("(copy)"));
        assert_eq!(s.surface(copy).unwrap().pixel(1, 1), [9, 9, 9, 255]);
        // Writing the copy leaves the original alone.
        s.surface_mut(copy).unwrap().clear();
        assert_eq!(s.surface(a).unwrap().pixel(1, 1), [9, 9, 9, 255]);
    }

    #[test]
    fn test_copy_background_is_plain_object() {
        let mut s = scene();
        let copy = s.copy_item(s.background_id()).unwrap();
        assert!(!s.get(copy).unwrap().is_background());
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_group_and_ungroup() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        let b = s.add_item(ItemKind::Object, None).unwrap();
        let c = s.add_item(ItemKind::Object, None).unwrap();
        let g = s.group_items(&[c, a]).unwrap();
        assert_eq!(s.root(), &[s.background_id(), b, g]);
        assert_eq!(s.get(g).unwrap().children(), &[a, c]);
        s.check_invariants().unwrap();
        let children = s.ungroup(g).unwrap();
        assert_eq!(children, vec![a, c]);
        assert_eq!(s.root(), &[s.background_id(), b, a, c]);
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_export_item_crops_to_content() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        assert!(s.export_item(a).unwrap().is_none());
        let surface = s.surface_mut(a).unwrap();
        for y in 20..30 {
            for x in 10..40 {
                surface.put_pixel(x, y, [1, 2, 3, 255]);
            }
        }
        let out = s.export_item(a).unwrap().unwrap();
        assert_eq!(out.dimensions(), (30, 10));
    }

    #[test]
    fn test_composite_honours_visibility() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        s.surface_mut(a).unwrap().fill([255, 0, 0, 255]);
        assert_eq!(s.composite().unwrap().pixel(0, 0), [255, 0, 0, 255]);
        s.update_item(a, ItemUpdate::default().visible(false)).unwrap();
        assert_eq!(s.composite().unwrap().pixel(0, 0), DEFAULT_BACKGROUND_COLOR);
    }

    #[test]
    fn test_resize_anchored_and_scaled() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        s.surface_mut(a).unwrap().put_pixel(0, 0, [1, 1, 1, 255]);
        s.resize_canvas(Size::new(150.0, 80.0), false).unwrap();
        assert_eq!(s.dimensions(), (150, 80));
        assert_eq!(s.surface(a).unwrap().dimensions(), (150, 80));
        assert_eq!(s.surface(a).unwrap().pixel(0, 0), [1, 1, 1, 255]);
        s.resize_canvas(Size::new(300.0, 160.0), true).unwrap();
        assert_eq!(s.surface(a).unwrap().dimensions(), (300, 160));
    }

    #[test]
    fn test_crop_canvas() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        s.surface_mut(a).unwrap().put_pixel(30, 40, [5, 5, 5, 255]);
        s.crop_canvas(PixelRect::new(20, 20, 50, 50)).unwrap();
        assert_eq!(s.dimensions(), (50, 50));
        assert_eq!(s.surface(a).unwrap().pixel(10, 20), [5, 5, 5, 255]);
    }

    /// Red left half, blue right half.
    fn split_image(width: u32, height: u32) -> RasterSurface {
        let mut image = RasterSurface::filled(width, height, [0, 0, 255, 255]).unwrap();
        for y in 0..height {
            for x in 0..width / 2 {
                image.put_pixel(x, y, [255, 0, 0, 255]);
            }
        }
        image
    }

    fn image_scene() -> SceneGraph {
        let mut s = scene();
        s.set_background_color(None);
        s.set_background_image(Some(split_image(100, 100))).unwrap();
        s
    }

    #[test]
    fn test_background_image_is_fitted_to_canvas() {
        let mut s = scene();
        s.set_background_image(Some(split_image(50, 20))).unwrap();
        let image = s.background().unwrap().background_image.clone().unwrap();
        assert_eq!(image.dimensions(), (100, 100));
        s.set_background_image(None).unwrap();
        assert!(s.background().unwrap().background_image.is_none());
    }

    #[test]
    fn test_crop_canvas_crops_background_image() {
        let mut s = image_scene();
        s.crop_canvas(PixelRect::new(50, 0, 50, 100)).unwrap();
        let out = s.composite().unwrap();
        assert_eq!(out.dimensions(), (50, 100));
        assert_eq!(out.pixel(10, 50), [0, 0, 255, 255]);
        assert_eq!(out.pixel(45, 50), [0, 0, 255, 255]);
    }

    #[test]
    fn test_resize_anchors_background_image() {
        let mut s = image_scene();
        s.resize_canvas(Size::new(200.0, 100.0), false).unwrap();
        let out = s.composite().unwrap();
        assert_eq!(out.pixel(20, 50), [255, 0, 0, 255]);
        assert_eq!(out.pixel(80, 50), [0, 0, 255, 255]);
        assert_eq!(out.pixel(150, 50), [0, 0, 0, 0]);
    }

    #[test]
    fn test_resize_scales_background_image() {
        let mut s = image_scene();
        s.resize_canvas(Size::new(200.0, 100.0), true).unwrap();
        let out = s.composite().unwrap();
        assert_eq!(out.pixel(80, 50), [255, 0, 0, 255]);
        assert_eq!(out.pixel(150, 50), [0, 0, 255, 255]);
    }

    #[test]
    fn test_hidden_item_is_not_merged() {
        let mut s = scene();
        let b = s.add_item(ItemKind::Object, None).unwrap();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        s.surface_mut(a).unwrap().fill([255, 0, 0, 255]);
        s.update_item(a, ItemUpdate::default().visible(false)).unwrap();
        assert!(!s.can_merge(a, Direction::Down));
        let before = s.clone();
        assert!(matches!(s.merge_down(a), Err(SceneError::Invalid(_))));
        assert!(s.reorder(a, b, DropPosition::Middle).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn test_layer_names_continue_after_rebuild() {
        let mut s = scene();
        let a = s.add_item(ItemKind::Object, None).unwrap();
        let b = s.add_item(ItemKind::Object, None).unwrap();
        let c = s.add_item(ItemKind::Object, None).unwrap();
        s.delete_item(a).unwrap();
        s.delete_item(b).unwrap();
        assert_eq!(s.get(c).unwrap().name, "Layer 3");
        let items: Vec<SceneItem> = s.item_records().cloned().collect();
        let mut rebuilt =
            SceneGraph::from_parts(items, s.root().to_vec(), 100, 100, DEFAULT_MAX_SURFACE_PIXELS).unwrap();
        let next = rebuilt.add_item(ItemKind::Object, None).unwrap();
        assert_eq!(rebuilt.get(next).unwrap().name, "Layer 4");
    }
}
