//! ArchSketch Render Library
//!
//! Turns a [`Canvas`](archsketch_core::Canvas) into three viewport-sized
//! layers: the composited artwork, the guide overlays and the tool
//! affordances. The default implementation rasterizes on the CPU.

mod renderer;
mod software;

pub use renderer::{Frame, RenderContext, RenderResult, Renderer, RendererError};
pub use software::SoftwareRenderer;
