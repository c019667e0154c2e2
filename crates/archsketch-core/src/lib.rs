//! ArchSketch Core Library
//!
//! Platform-agnostic canvas engine: layered raster scene, drawing guides,
//! tools, undo history and project persistence. Rendering to a window is
//! left to `archsketch-render` and the host application.

pub mod blend;
pub mod canvas;
pub mod config;
pub mod geometry;
pub mod guides;
pub mod handles;
pub mod history;
pub mod input;
pub mod raster;
pub mod scene;
pub mod snap;
pub mod storage;
pub mod surface;
pub mod tools;
pub mod view;

pub use blend::BlendMode;
pub use canvas::{Canvas, CanvasDocument, CanvasError, CanvasResult};
pub use config::CanvasConfig;
pub use guides::{GuideKind, GuideSystem};
pub use history::HistoryManager;
pub use input::{InputState, Key, Modifiers, MouseButton, PointerEvent};
pub use raster::{Brush, BrushPreset};
pub use scene::{Direction, DropPosition, ItemId, ItemKind, ItemUpdate, SceneError, SceneGraph, SceneItem};
pub use storage::{ProjectFile, Storage, StorageError};
pub use surface::{PixelRect, RasterSurface, SurfaceError};
pub use tools::{ToolAction, ToolKind, ToolManager};
pub use view::ViewTransform;
