//! CPU renderer built on the core rasterizer.

use crate::renderer::{Frame, RenderContext, RenderResult, Renderer, rgba};
use archsketch_core::blend::BlendMode;
use archsketch_core::guides::{GuideSystem, PerspectiveAxis, VanishingPoint};
use archsketch_core::handles::HandleKind;
use archsketch_core::raster::{Brush, BrushPreset, fill_polygon, stroke_paths};
use archsketch_core::surface::RasterSurface;
use archsketch_core::tools::OverlayPrimitive;
use kurbo::{Affine, Point, Rect, Vec2};

/// Half the side of a handle square, in screen pixels.
const HANDLE_HALF: f64 = 4.0;
const CIRCLE_SEGMENTS: usize = 48;

/// Renders each layer into its own RGBA buffer.
#[derive(Debug, Clone)]
pub struct SoftwareRenderer {
    /// Guide and overlay line width in screen pixels.
    pub line_width: f64,
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self { line_width: 1.0 }
    }
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn render_content(&self, ctx: &RenderContext, width: u32, height: u32) -> RenderResult<RasterSurface> {
        let mut layer = RasterSurface::filled(width, height, rgba(self.background_color(ctx)))?;
        let artwork = ctx.canvas.display_composite()?;
        layer.composite_from(&artwork, ctx.transform(), 1.0, BlendMode::Normal);
        Ok(layer)
    }

    fn render_guides(&self, ctx: &RenderContext, width: u32, height: u32) -> RenderResult<RasterSurface> {
        let mut layer = Layer::new(width, height, ctx.transform())?;
        if !ctx.show_guides {
            return Ok(layer.surface);
        }
        let guides = ctx.canvas.guides();
        let color = rgba(ctx.guide_color);
        let w = self.line_width;

        if let Some(grid) = guides.active_grid() {
            let canvas = Rect::from_origin_size(Point::ZERO, ctx.canvas.canvas_size());
            let bounds = ctx.canvas.view().visible_canvas_rect().intersect(canvas);
            if bounds.area() > 0.0 {
                let (major, minor): (Vec<_>, Vec<_>) = grid.lines(bounds).into_iter().partition(|l| l.major);
                let faint = [color[0], color[1], color[2], color[3] / 3];
                layer.lines(minor.iter().map(|l| (l.line.start, l.line.end)), faint, w)?;
                layer.lines(major.iter().map(|l| (l.line.start, l.line.end)), color, w)?;
            }
        }
        if let Some(ruler) = guides.active_ruler() {
            layer.lines([(ruler.start, ruler.end)], color, w)?;
        }
        if let Some(mirror) = guides.active_mirror() {
            let (a, b) = layer.extend(mirror.start, mirror.end - mirror.start);
            layer.lines([(a, b)], color, w)?;
        }
        if let Some(ortho) = guides.active_orthogonal() {
            let center = Rect::from_origin_size(Point::ZERO, ctx.canvas.canvas_size()).center();
            let theta = ortho.angle.to_radians();
            let x_axis = Vec2::new(theta.cos(), theta.sin());
            let y_axis = Vec2::new(-theta.sin(), theta.cos());
            let axes = [layer.extend(center, x_axis), layer.extend(center, y_axis)];
            layer.lines(axes, color, w)?;
        }
        self.render_perspective(&mut layer, guides)?;

        let handle_color = rgba(ctx.overlay_color);
        if !guides.locked {
            for (_, p) in guides.handles() {
                layer.handle(p, handle_color, false, w)?;
            }
        }
        Ok(layer.surface)
    }

    fn render_perspective(&self, layer: &mut Layer, guides: &GuideSystem) -> RenderResult<()> {
        let Some(perspective) = guides.active_perspective() else {
            return Ok(());
        };
        let gp = perspective.guide_point;
        for axis in PerspectiveAxis::ALL {
            let color = axis.color();
            let faint = [color[0], color[1], color[2], color[3] / 2];
            let mut rays = Vec::new();
            match perspective.vanishing_point(axis) {
                Some(VanishingPoint::Finite(vp)) => {
                    for line in perspective.axis_lines(axis) {
                        rays.push((line.start, vp));
                    }
                    rays.push((gp, vp));
                }
                Some(VanishingPoint::AtInfinity(dir)) => {
                    for line in perspective.axis_lines(axis) {
                        rays.push(layer.extend(line.start, dir));
                    }
                    rays.push(layer.extend(gp, dir));
                }
                None => log::debug!("Perspective axis {:?} has no direction", axis),
            }
            layer.lines(rays, color, self.line_width)?;
            let extra = perspective.extra_lines(axis).iter().map(|l| (l.start, l.end));
            layer.lines(extra, faint, self.line_width)?;
        }
        Ok(())
    }

    fn render_ui(&self, ctx: &RenderContext, width: u32, height: u32) -> RenderResult<RasterSurface> {
        let mut layer = Layer::new(width, height, ctx.transform())?;
        let color = rgba(ctx.overlay_color);
        let w = self.line_width.max(1.5);

        if let Some(bounds) = ctx.canvas.selection().and_then(|s| s.bounds()) {
            layer.outline(&rect_points(bounds.to_rect()), rgba(ctx.selection_color), w)?;
        }
        for primitive in ctx.canvas.overlay() {
            match primitive {
                OverlayPrimitive::Polyline { points, closed } => {
                    let screen: Vec<Point> = points.iter().map(|p| layer.to_screen * *p).collect();
                    layer.screen_paths(&[(screen, closed)], color, w)?;
                }
                OverlayPrimitive::Rect(rect) => layer.outline(&rect_points(rect), color, w)?,
                OverlayPrimitive::Quad(quad) => layer.outline(&quad.points(), color, w)?,
                OverlayPrimitive::Handle { position, kind } => {
                    layer.handle(position, color, kind == Some(HandleKind::Rotate), w)?;
                }
                OverlayPrimitive::Circle { center, radius } => {
                    let c = layer.to_screen * center;
                    let r = (radius * ctx.canvas.view().zoom).max(1.0);
                    layer.screen_paths(&[(circle_points(c, r), true)], [60, 60, 60, 220], 1.0)?;
                }
            }
        }
        Ok(layer.surface)
    }
}

impl Renderer for SoftwareRenderer {
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<Frame> {
        let (width, height) = ctx.viewport_pixels()?;
        let frame = Frame {
            content: self.render_content(ctx, width, height)?,
            guides: self.render_guides(ctx, width, height)?,
            ui: self.render_ui(ctx, width, height)?,
        };
        log::trace!("Rendered {}x{} frame", width, height);
        Ok(frame)
    }
}

/// One transparent layer plus the canvas-to-screen mapping.
struct Layer {
    surface: RasterSurface,
    to_screen: Affine,
    viewport: Rect,
}

impl Layer {
    fn new(width: u32, height: u32, to_screen: Affine) -> RenderResult<Self> {
        Ok(Self {
            surface: RasterSurface::new(width, height)?,
            to_screen,
            viewport: Rect::new(0.0, 0.0, width as f64, height as f64),
        })
    }

    /// Canvas-space segment through `p` along `dir`, long enough to cross
    /// the whole viewport.
    fn extend(&self, p: Point, dir: Vec2) -> (Point, Point) {
        let len = dir.hypot();
        if len < 1e-9 {
            return (p, p);
        }
        let inv = self.to_screen.inverse();
        let visible = Rect::from_points(inv * Point::ZERO, inv * Point::new(self.viewport.x1, self.viewport.y1));
        let reach = visible.width().hypot(visible.height()) + p.distance(visible.center());
        let d = dir * (reach / len);
        (p - d, p + d)
    }

    /// Canvas-space segments, clipped to the viewport.
    fn lines(&mut self, segments: impl IntoIterator<Item = (Point, Point)>, color: [u8; 4], width: f64) -> RenderResult<()> {
        let bounds = self.viewport.inflate(width, width);
        let paths: Vec<(Vec<Point>, bool)> = segments
            .into_iter()
            .filter_map(|(a, b)| clip_segment(self.to_screen * a, self.to_screen * b, bounds))
            .map(|(a, b)| (vec![a, b], false))
            .collect();
        self.screen_paths(&paths, color, width)
    }

    /// Closed canvas-space outline.
    fn outline(&mut self, points: &[Point], color: [u8; 4], width: f64) -> RenderResult<()> {
        let screen: Vec<Point> = points.iter().map(|p| self.to_screen * *p).collect();
        self.screen_paths(&[(screen, true)], color, width)
    }

    fn screen_paths(&mut self, paths: &[(Vec<Point>, bool)], color: [u8; 4], width: f64) -> RenderResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        stroke_paths(&mut self.surface, paths, &line_brush(color, width))?;
        Ok(())
    }

    /// Constant-size marker at a canvas position.
    fn handle(&mut self, position: Point, color: [u8; 4], round: bool, width: f64) -> RenderResult<()> {
        let c = self.to_screen * position;
        if !self.viewport.inflate(HANDLE_HALF, HANDLE_HALF).contains(c) {
            return Ok(());
        }
        let shape = if round {
            circle_points(c, HANDLE_HALF + 1.0)
        } else {
            rect_points(Rect::new(c.x - HANDLE_HALF, c.y - HANDLE_HALF, c.x + HANDLE_HALF, c.y + HANDLE_HALF)).to_vec()
        };
        fill_polygon(&mut self.surface, &shape, &line_brush([255, 255, 255, 255], width))?;
        self.screen_paths(&[(shape, true)], color, width)
    }
}

fn line_brush(color: [u8; 4], width: f64) -> Brush {
    BrushPreset::Pencil.brush(color).with_size(width)
}

fn rect_points(r: Rect) -> [Point; 4] {
    [Point::new(r.x0, r.y0), Point::new(r.x1, r.y0), Point::new(r.x1, r.y1), Point::new(r.x0, r.y1)]
}

fn circle_points(center: Point, radius: f64) -> Vec<Point> {
    (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let t = i as f64 / CIRCLE_SEGMENTS as f64 * std::f64::consts::TAU;
            center + Vec2::new(t.cos(), t.sin()) * radius
        })
        .collect()
}

/// Liang-Barsky clip of `a -> b` against `bounds`.
fn clip_segment(a: Point, b: Point, bounds: Rect) -> Option<(Point, Point)> {
    let d = b - a;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    let checks = [
        (-d.x, a.x - bounds.x0),
        (d.x, bounds.x1 - a.x),
        (-d.y, a.y - bounds.y0),
        (d.y, bounds.y1 - a.y),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((a + d * t0, a + d * t1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RendererError;
    use archsketch_core::guides::GuideKind;
    use archsketch_core::tools::ToolKind;
    use archsketch_core::{Canvas, CanvasConfig};
    use kurbo::Size;

    fn canvas(w: u32, h: u32) -> Canvas {
        Canvas::new(CanvasConfig { canvas_width: w, canvas_height: h, ..Default::default() }).unwrap()
    }

    #[test]
    fn test_frame_matches_viewport() {
        let c = canvas(100, 80);
        let frame = SoftwareRenderer::new().render(&RenderContext::new(&c)).unwrap();
        assert_eq!(frame.dimensions(), (100, 80));
        assert_eq!(frame.guides.dimensions(), (100, 80));
        assert_eq!(frame.content.pixel(50, 40), [255, 255, 255, 255]);
        assert!(frame.guides.is_blank());
        assert!(frame.ui.is_blank());
    }

    #[test]
    fn test_workspace_outside_canvas() {
        let c = canvas(100, 80);
        let ctx = RenderContext::new(&c).with_viewport(Size::new(200.0, 160.0));
        let frame = SoftwareRenderer::new().render(&ctx).unwrap();
        assert_eq!(frame.content.pixel(150, 120), rgba(ctx.workspace_color));
        assert_eq!(frame.content.pixel(10, 10), [255, 255, 255, 255]);
    }

    #[test]
    fn test_mirror_axis_drawn() {
        let mut c = canvas(100, 80);
        c.toggle_guide(GuideKind::Mirror);
        let mut renderer = SoftwareRenderer::new();
        let frame = renderer.render(&RenderContext::new(&c)).unwrap();
        assert!(frame.guides.pixel(49, 40)[3] > 0 || frame.guides.pixel(50, 40)[3] > 0);
        assert_eq!(frame.guides.pixel(10, 40)[3], 0);

        let hidden = renderer.render(&RenderContext::new(&c).with_guides(false)).unwrap();
        assert!(hidden.guides.is_blank());
    }

    #[test]
    fn test_far_vanishing_points_render() {
        let mut c = canvas(100, 80);
        c.toggle_guide(GuideKind::Perspective);
        let frame = SoftwareRenderer::new().render(&RenderContext::new(&c)).unwrap();
        assert!(!frame.guides.is_blank());
    }

    #[test]
    fn test_crop_overlay_in_ui_layer() {
        let mut c = canvas(100, 80);
        c.set_tool(ToolKind::Crop);
        let frame = SoftwareRenderer::new().render(&RenderContext::new(&c)).unwrap();
        assert!(!frame.ui.is_blank());
        let flat = frame.flatten();
        assert_ne!(flat, frame.content);
    }

    #[test]
    fn test_invalid_viewport() {
        let c = canvas(10, 10);
        let ctx = RenderContext::new(&c).with_viewport(Size::ZERO);
        let err = SoftwareRenderer::new().render(&ctx).unwrap_err();
        assert!(matches!(err, RendererError::InvalidViewport { .. }));
    }

    #[test]
    fn test_clip_segment() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let (a, b) = clip_segment(Point::new(-10.0, 5.0), Point::new(20.0, 5.0), bounds).unwrap();
        assert!((a.x - 0.0).abs() < 1e-9 && (b.x - 10.0).abs() < 1e-9);
        assert!(clip_segment(Point::new(-10.0, -5.0), Point::new(20.0, -5.0), bounds).is_none());
    }
}
