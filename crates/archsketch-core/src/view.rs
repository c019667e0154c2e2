//! View transform for pan/zoom.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Upper zoom bound (3x).
pub const MAX_ZOOM: f64 = 3.0;

/// Lowest zoom ever allowed, whatever the viewport.
pub const ABSOLUTE_MIN_ZOOM: f64 = 0.02;

/// Fraction of the "fit whole canvas" zoom below which the user cannot zoom out.
pub const DEFAULT_MIN_ZOOM_FRACTION: f64 = 0.25;

/// Default padding factor for `fit_to_extents`.
pub const DEFAULT_FIT_PADDING: f64 = 0.9;

/// Maps canvas-local coordinates to screen coordinates: `screen = canvas * zoom + pan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Current zoom factor.
    pub zoom: f64,
    /// Screen-space translation.
    pub pan: Vec2,
    /// Viewport size in screen pixels.
    pub viewport: Size,
    /// Canvas (content) size in canvas pixels.
    pub content: Size,
    /// Derived lower zoom bound.
    min_zoom: f64,
    /// Fixed upper zoom bound.
    #[serde(default = "default_max_zoom")]
    max_zoom: f64,
    #[serde(default = "default_min_zoom_fraction")]
    min_zoom_fraction: f64,
}

fn default_max_zoom() -> f64 {
    MAX_ZOOM
}

fn default_min_zoom_fraction() -> f64 {
    DEFAULT_MIN_ZOOM_FRACTION
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0), Size::new(800.0, 600.0))
    }
}

impl ViewTransform {
    /// Create a view for the given viewport and canvas size at 100% zoom.
    pub fn new(viewport: Size, content: Size) -> Self {
        let mut view = Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            viewport,
            content,
            min_zoom: ABSOLUTE_MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            min_zoom_fraction: DEFAULT_MIN_ZOOM_FRACTION,
        };
        view.recompute_min_zoom();
        view
    }

    /// Override the zoom limits (from configuration).
    pub fn with_limits(mut self, max_zoom: f64, min_zoom_fraction: f64) -> Self {
        self.max_zoom = max_zoom.max(ABSOLUTE_MIN_ZOOM);
        self.min_zoom_fraction = min_zoom_fraction.clamp(0.01, 1.0);
        self.recompute_min_zoom();
        self
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Canvas → screen affine.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    /// Screen → canvas affine.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.pan)
    }

    /// `(p - pan) / zoom`
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    /// `p * zoom + pan`
    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        Point::new(
            canvas.x * self.zoom + self.pan.x,
            canvas.y * self.zoom + self.pan.y,
        )
    }

    /// Convert a screen-space distance into canvas units.
    pub fn screen_distance_to_canvas(&self, distance: f64) -> f64 {
        distance / self.zoom
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Zoom by `factor`, keeping the canvas point under `pivot` (screen) fixed.
    pub fn zoom_at(&mut self, factor: f64, pivot: Point) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        self.set_zoom_about(new_zoom, pivot);
    }

    /// Set an absolute zoom (clamped), pivoting on the viewport centre.
    pub fn set_zoom(&mut self, zoom: f64) {
        let center = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
        let zoom = if zoom.is_finite() { zoom } else { 1.0 };
        self.set_zoom_about(zoom.clamp(self.min_zoom, self.max_zoom), center);
    }

    fn set_zoom_about(&mut self, new_zoom: f64, pivot: Point) {
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        // pan' = pivot - (pivot - pan) / zoom * zoom'
        let ratio = new_zoom / self.zoom;
        self.pan = Vec2::new(
            pivot.x - (pivot.x - self.pan.x) * ratio,
            pivot.y - (pivot.y - self.pan.y) * ratio,
        );
        self.zoom = new_zoom;
    }

    /// Fit `target` (canvas coordinates) into the viewport and centre it.
    pub fn fit_to_extents(&mut self, target: Rect, padding: f64) {
        if target.width() <= 0.0 || target.height() <= 0.0 {
            log::debug!("fit_to_extents ignored for empty rect {:?}", target);
            return;
        }
        let fit = (self.viewport.width / target.width()).min(self.viewport.height / target.height());
        self.zoom = (fit * padding).clamp(self.min_zoom, self.max_zoom);

        let center = target.center();
        self.pan = Vec2::new(
            self.viewport.width / 2.0 - center.x * self.zoom,
            self.viewport.height / 2.0 - center.y * self.zoom,
        );
    }

    /// Fit the whole canvas.
    pub fn fit_canvas(&mut self, padding: f64) {
        let rect = Rect::from_origin_size(Point::ZERO, self.content);
        self.fit_to_extents(rect, padding);
    }

    /// Reset to 100% with the canvas at the top-left of the viewport.
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
    }

    /// Host viewport resized.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = Size::new(viewport.width.max(1.0), viewport.height.max(1.0));
        self.recompute_min_zoom();
    }

    /// Canvas resized.
    pub fn set_content_size(&mut self, content: Size) {
        self.content = Size::new(content.width.max(1.0), content.height.max(1.0));
        self.recompute_min_zoom();
    }

    /// `min_zoom` is a fraction of the zoom that fits the whole canvas, so the
    /// canvas can never be shrunk below a visible size.
    fn recompute_min_zoom(&mut self) {
        let fit = (self.viewport.width / self.content.width.max(1.0))
            .min(self.viewport.height / self.content.height.max(1.0));
        self.min_zoom = (fit.min(1.0) * self.min_zoom_fraction).clamp(ABSOLUTE_MIN_ZOOM, self.max_zoom);
        if self.zoom < self.min_zoom {
            self.zoom = self.min_zoom;
        }
    }

    /// Zoom as a UI percentage.
    pub fn zoom_percent(&self) -> f64 {
        self.zoom * 100.0
    }

    /// The part of the canvas currently visible, in canvas coordinates.
    pub fn visible_canvas_rect(&self) -> Rect {
        let a = self.screen_to_canvas(Point::ZERO);
        let b = self.screen_to_canvas(Point::new(self.viewport.width, self.viewport.height));
        Rect::from_points(a, b)
    }
}
