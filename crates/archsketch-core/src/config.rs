//! Engine configuration.

use crate::guides::{DEFAULT_GRID_SPACING, DEFAULT_ISO_ANGLE, GridGuide, GridKind};
use crate::handles::HANDLE_HIT_TOLERANCE;
use crate::raster::Brush;
use crate::snap::ANGLE_SNAP_INCREMENT;
use crate::surface::DEFAULT_MAX_SURFACE_PIXELS;
use crate::tools::{DEFAULT_CLOSE_THRESHOLD, ToolOptions};
use crate::view::{DEFAULT_FIT_PADDING, DEFAULT_MIN_ZOOM_FRACTION, MAX_ZOOM};
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Canvas engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub max_zoom: f64,
    /// Fraction of the viewport used by "fit".
    pub fit_padding: f64,
    /// Smallest zoom as a fraction of the fit zoom.
    pub min_zoom_fraction: f64,
    /// Screen pixels.
    pub close_threshold: f64,
    /// Screen pixels.
    pub handle_tolerance: f64,
    pub max_surface_pixels: u64,
    pub brush: Brush,
    pub grid_spacing: f64,
    pub grid_major_frequency: u32,
    pub grid_iso_angle: f64,
    pub angle_snap_increment: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1920,
            canvas_height: 1080,
            max_zoom: MAX_ZOOM,
            fit_padding: DEFAULT_FIT_PADDING,
            min_zoom_fraction: DEFAULT_MIN_ZOOM_FRACTION,
            close_threshold: DEFAULT_CLOSE_THRESHOLD,
            handle_tolerance: HANDLE_HIT_TOLERANCE,
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
            brush: Brush::default(),
            grid_spacing: DEFAULT_GRID_SPACING,
            grid_major_frequency: 5,
            grid_iso_angle: DEFAULT_ISO_ANGLE,
            angle_snap_increment: ANGLE_SNAP_INCREMENT,
        }
    }
}

impl CanvasConfig {
    /// Parse a (possibly partial) JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn canvas_size(&self) -> Size {
        Size::new(self.canvas_width.max(1) as f64, self.canvas_height.max(1) as f64)
    }

    /// Initial tool settings.
    pub fn tool_options(&self) -> ToolOptions {
        ToolOptions {
            brush: self.brush.clone(),
            angle_snap_increment: self.angle_snap_increment,
            close_threshold: self.close_threshold,
            handle_tolerance: self.handle_tolerance,
            ..ToolOptions::default()
        }
    }

    /// Grid settings; the grid starts hidden.
    pub fn grid(&self) -> GridGuide {
        GridGuide::new(GridKind::None, self.grid_spacing, self.grid_major_frequency, self.grid_iso_angle)
    }
}
