//! Versioned JSON project format.
//!
//! Rasters travel as PNG data URIs. Restoring builds every surface and
//! validates the scene before anything is handed back, so a corrupt file
//! never replaces a working document.

use super::{StorageError, StorageResult};
use crate::blend::BlendMode;
use crate::guides::GuideSystem;
use crate::scene::{ItemId, ItemKind, SceneGraph, SceneItem};
use crate::surface::{RasterSurface, SurfaceError};
use crate::view::ViewTransform;
use kurbo::Affine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Newest project format this build writes and reads.
pub const PROJECT_VERSION: u32 = 1;

/// One scene item with its pixels encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub kind: ItemKind,
    #[serde(default)]
    pub parent: Option<ItemId>,
    #[serde(default)]
    pub children: Vec<ItemId>,
    #[serde(default)]
    pub is_background: bool,
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default = "default_transform")]
    pub transform: Affine,
    /// `data:image/png;base64,...`
    #[serde(default)]
    pub surface: Option<String>,
    #[serde(default)]
    pub background_color: Option<[u8; 4]>,
    #[serde(default)]
    pub background_image: Option<String>,
}

fn default_visible() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}

fn default_transform() -> Affine {
    Affine::IDENTITY
}

impl ItemRecord {
    fn capture(item: &SceneItem) -> StorageResult<Self> {
        Ok(Self {
            id: item.id(),
            kind: item.kind(),
            parent: item.parent(),
            children: item.children().to_vec(),
            is_background: item.is_background(),
            name: item.name.clone(),
            visible: item.visible,
            opacity: item.opacity,
            blend_mode: item.blend_mode,
            transform: item.transform,
            surface: item.surface().map(|s| s.to_data_uri()).transpose()?,
            background_color: item.background_color,
            background_image: item.background_image.as_ref().map(|s| s.to_data_uri()).transpose()?,
        })
    }

    fn restore(&self, width: u32, height: u32, max_pixels: u64) -> StorageResult<SceneItem> {
        let surface = match (&self.kind, &self.surface) {
            (ItemKind::Object, Some(uri)) => Some(decode_sized(uri, width, height, max_pixels)?),
            (ItemKind::Object, None) => Some(RasterSurface::with_limit(width, height, max_pixels)?),
            (ItemKind::Group, Some(_)) => {
                return Err(StorageError::Corrupt(format!("group {} carries pixels", self.id)));
            }
            (ItemKind::Group, None) => None,
        };
        let mut item = SceneGraph::raw_item(
            self.id,
            self.kind,
            self.parent,
            self.children.clone(),
            self.is_background,
            surface.map(Arc::new),
        );
        item.name = self.name.clone();
        item.visible = self.visible;
        item.opacity = self.opacity.clamp(0.0, 1.0);
        item.blend_mode = self.blend_mode;
        item.transform = self.transform;
        item.background_color = self.background_color;
        item.background_image = match &self.background_image {
            Some(uri) => Some(Arc::new(RasterSurface::from_data_uri_with_limit(uri, max_pixels)?)),
            None => None,
        };
        Ok(item)
    }
}

/// Decode a raster into a buffer of exactly the canvas size.
fn decode_sized(uri: &str, width: u32, height: u32, max_pixels: u64) -> StorageResult<RasterSurface> {
    let decoded = RasterSurface::from_data_uri_with_limit(uri, max_pixels)?;
    if decoded.dimensions() == (width, height) {
        return Ok(decoded);
    }
    log::warn!(
        "Raster {}x{} does not match the {}x{} canvas, anchoring top-left",
        decoded.width(),
        decoded.height(),
        width,
        height
    );
    Ok(decoded.resize_anchored(width, height, [0, 0, 0, 0])?)
}

/// A saved project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: u32,
    pub id: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Items in paint order.
    pub items: Vec<ItemRecord>,
    /// Top-level ids, bottom first.
    pub root: Vec<ItemId>,
    #[serde(default)]
    pub guides: GuideSystem,
    pub view: ViewTransform,
    #[serde(default)]
    pub active_item: Option<ItemId>,
}

impl ProjectFile {
    pub fn capture(
        id: impl Into<String>,
        name: impl Into<String>,
        scene: &SceneGraph,
        guides: &GuideSystem,
        view: &ViewTransform,
        active_item: Option<ItemId>,
    ) -> StorageResult<Self> {
        let (width, height) = scene.dimensions();
        let items = scene.item_records().map(ItemRecord::capture).collect::<StorageResult<Vec<_>>>()?;
        Ok(Self {
            version: PROJECT_VERSION,
            id: id.into(),
            name: name.into(),
            width,
            height,
            items,
            root: scene.root().to_vec(),
            guides: guides.clone(),
            view: view.clone(),
            active_item,
        })
    }

    /// Rebuild the scene. Fails without side effects on any bad record.
    pub fn restore_scene(&self, max_surface_pixels: u64) -> StorageResult<SceneGraph> {
        if self.version > PROJECT_VERSION {
            return Err(StorageError::UnsupportedVersion { found: self.version, supported: PROJECT_VERSION });
        }
        if self.width == 0 || self.height == 0 {
            return Err(StorageError::Corrupt(format!("canvas size {}x{}", self.width, self.height)));
        }
        if self.width as u64 * self.height as u64 > max_surface_pixels {
            return Err(SurfaceError::TooLarge { width: self.width, height: self.height, limit: max_surface_pixels }.into());
        }
        let items = self
            .items
            .iter()
            .map(|r| r.restore(self.width, self.height, max_surface_pixels))
            .collect::<StorageResult<Vec<_>>>()?;
        let scene = SceneGraph::from_parts(items, self.root.clone(), self.width, self.height, max_surface_pixels)?;
        log::info!("Restored project '{}' with {} items", self.name, scene.len());
        Ok(scene)
    }

    pub fn to_json(&self) -> StorageResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> StorageResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
