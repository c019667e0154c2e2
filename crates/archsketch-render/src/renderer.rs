//! Renderer trait abstraction.

use archsketch_core::blend::BlendMode;
use archsketch_core::canvas::{Canvas, CanvasError};
use archsketch_core::surface::{RasterSurface, SurfaceError};
use kurbo::{Affine, Size};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
    #[error("Canvas error: {0}")]
    Canvas(#[from] CanvasError),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a Canvas,
    /// Viewport size in pixels.
    pub viewport_size: Size,
    /// Area around the canvas.
    pub workspace_color: Color,
    /// Ruler, mirror and orthogonal axes.
    pub guide_color: Color,
    /// Tool previews and handles.
    pub overlay_color: Color,
    /// Selection outline.
    pub selection_color: Color,
    pub show_guides: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context for the canvas' current viewport.
    pub fn new(canvas: &'a Canvas) -> Self {
        Self {
            canvas,
            viewport_size: canvas.view().viewport,
            workspace_color: Color::from_rgba8(228, 228, 231, 255),
            guide_color: Color::from_rgba8(14, 165, 233, 200),
            overlay_color: Color::from_rgba8(59, 130, 246, 255),
            selection_color: Color::from_rgba8(236, 72, 153, 255),
            show_guides: true,
        }
    }

    pub fn with_viewport(mut self, size: Size) -> Self {
        self.viewport_size = size;
        self
    }

    pub fn with_workspace(mut self, color: Color) -> Self {
        self.workspace_color = color;
        self
    }

    pub fn with_guides(mut self, show: bool) -> Self {
        self.show_guides = show;
        self
    }

    /// Canvas to viewport mapping.
    pub fn transform(&self) -> Affine {
        self.canvas.view().transform()
    }

    pub(crate) fn viewport_pixels(&self) -> RenderResult<(u32, u32)> {
        let Size { width, height } = self.viewport_size;
        if !(width >= 1.0 && height >= 1.0 && width.is_finite() && height.is_finite()) {
            return Err(RendererError::InvalidViewport { width, height });
        }
        Ok((width.round() as u32, height.round() as u32))
    }
}

/// One rendered frame: three stacked layers of the viewport's size.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Workspace plus the composited artwork.
    pub content: RasterSurface,
    pub guides: RasterSurface,
    /// Tool previews, handles, cursor outline and selection.
    pub ui: RasterSurface,
}

impl Frame {
    /// Stack the layers into one image.
    pub fn flatten(&self) -> RasterSurface {
        let mut out = self.content.clone();
        out.composite_from(&self.guides, Affine::IDENTITY, 1.0, BlendMode::Normal);
        out.composite_from(&self.ui, Affine::IDENTITY, 1.0, BlendMode::Normal);
        out
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.content.dimensions()
    }
}

/// Trait for rendering backends.
pub trait Renderer: Send + Sync {
    /// Produce all layers for the current canvas state.
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<Frame>;

    /// Get the workspace color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.workspace_color
    }
}

pub(crate) fn rgba(color: Color) -> [u8; 4] {
    let c = color.to_rgba8();
    [c.r, c.g, c.b, c.a]
}
