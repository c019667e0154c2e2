//! Brush stamping and shape rasterization.
//!
//! Strokes are built in a coverage mask first and then composited against
//! the pre-stroke pixels, so overlapping dabs never stack past the brush
//! opacity. Freehand strokes composite incrementally (only the area touched
//! by the newest segment); shapes rasterize once at commit.

use crate::blend::{BlendMode, blend_pixel, erase_pixel};
use crate::surface::{PixelRect, RasterSurface, SurfaceError, SurfaceResult};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const FULL_COVERAGE: u16 = u16::MAX;

pub const MIN_BRUSH_SIZE: f64 = 0.5;
pub const MAX_BRUSH_SIZE: f64 = 500.0;

/// How a dab modifies the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StampMode {
    /// Source-over with the brush blend mode.
    #[default]
    Paint,
    /// Destination-out.
    Erase,
}

/// Brush parameters shared by freehand and shape tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Brush {
    pub color: [u8; 4],
    /// Diameter in canvas pixels.
    pub size: f64,
    /// Stroke-level opacity cap.
    pub opacity: f32,
    /// Per-dab coverage build-up.
    pub flow: f32,
    /// 1.0 = hard edge, 0.0 = fully soft.
    pub hardness: f32,
    /// Dab spacing as a fraction of the diameter.
    pub spacing: f64,
    pub mode: StampMode,
    pub blend: BlendMode,
}

impl Default for Brush {
    fn default() -> Self {
        BrushPreset::Brush.brush([0, 0, 0, 255])
    }
}

impl Brush {
    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.set_size(size);
        self
    }

    pub fn set_size(&mut self, size: f64) {
        self.size = if size.is_finite() { size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE) } else { MIN_BRUSH_SIZE };
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn set_flow(&mut self, flow: f32) {
        self.flow = flow.clamp(0.0, 1.0);
    }

    pub fn set_hardness(&mut self, hardness: f32) {
        self.hardness = hardness.clamp(0.0, 1.0);
    }

    pub fn radius(&self) -> f64 {
        self.size / 2.0
    }

    /// Distance between consecutive dabs.
    pub fn step(&self) -> f64 {
        (self.size * self.spacing).max(0.5)
    }

    /// Dab alpha at `dist` from the centre: solid core, smoothstep falloff and
    /// half a pixel of anti-aliasing.
    fn dab_alpha(&self, dist: f64) -> f32 {
        let radius = self.radius();
        let outer = radius + 0.5;
        let solid = (radius * self.hardness as f64 - 0.5).max(0.0);
        if dist <= solid {
            return 1.0;
        }
        if dist >= outer {
            return 0.0;
        }
        let t = ((dist - solid) / (outer - solid)) as f32;
        let x = 1.0 - t.clamp(0.0, 1.0);
        x * x * (3.0 - 2.0 * x)
    }
}

/// Freehand brush variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BrushPreset {
    Pencil,
    #[default]
    Brush,
    Marker,
    Airbrush,
    Eraser,
}

impl BrushPreset {
    pub fn all() -> &'static [BrushPreset] {
        &[
            BrushPreset::Pencil,
            BrushPreset::Brush,
            BrushPreset::Marker,
            BrushPreset::Airbrush,
            BrushPreset::Eraser,
        ]
    }

    pub fn brush(self, color: [u8; 4]) -> Brush {
        let base = Brush {
            color,
            size: 8.0,
            opacity: 1.0,
            flow: 1.0,
            hardness: 0.75,
            spacing: 0.15,
            mode: StampMode::Paint,
            blend: BlendMode::Normal,
        };
        match self {
            BrushPreset::Pencil => Brush { size: 2.0, hardness: 1.0, spacing: 0.1, ..base },
            BrushPreset::Brush => base,
            BrushPreset::Marker => Brush { size: 14.0, opacity: 0.5, hardness: 0.9, spacing: 0.1, ..base },
            BrushPreset::Airbrush => Brush { size: 30.0, hardness: 0.0, flow: 0.08, spacing: 0.05, ..base },
            BrushPreset::Eraser => Brush { size: 20.0, hardness: 0.8, mode: StampMode::Erase, ..base },
        }
    }
}

/// Per-pixel stroke coverage with a dirty rectangle.
#[derive(Debug, Clone)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<u16>,
}

impl CoverageMask {
    pub fn new(width: u32, height: u32) -> SurfaceResult<Self> {
        let len = width as usize * height as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| SurfaceError::Allocation { bytes: len * 2 })?;
        data.resize(len, 0);
        Ok(Self { width, height, data })
    }

    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] as f32 / FULL_COVERAGE as f32
        } else {
            0.0
        }
    }

    fn clip(&self, rect: Rect) -> Option<PixelRect> {
        let x0 = rect.x0.floor().max(0.0);
        let y0 = rect.y0.floor().max(0.0);
        let x1 = rect.x1.ceil().min(self.width as f64);
        let y1 = rect.y1.ceil().min(self.height as f64);
        (x1 > x0 && y1 > y0).then(|| PixelRect::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Stamp one dab. Returns the touched area.
    pub fn stamp(&mut self, center: Point, brush: &Brush) -> Option<PixelRect> {
        let reach = brush.radius() + 1.0;
        let area = self.clip(Rect::new(center.x - reach, center.y - reach, center.x + reach, center.y + reach))?;
        let flow = brush.flow;
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                let dist = Point::new(x as f64 + 0.5, y as f64 + 0.5).distance(center);
                let a = brush.dab_alpha(dist) * flow;
                if a <= 0.0 {
                    continue;
                }
                let cell = &mut self.data[(y * self.width + x) as usize];
                let cov = *cell as f32 / FULL_COVERAGE as f32;
                let next = cov + a * (1.0 - cov);
                *cell = (next * FULL_COVERAGE as f32).round().min(FULL_COVERAGE as f32) as u16;
            }
        }
        Some(area)
    }

    /// Stamp dabs along `a -> b`, continuing the spacing from `carry`.
    /// `carry` is the distance travelled since the last dab.
    pub fn stamp_segment(&mut self, a: Point, b: Point, brush: &Brush, carry: &mut f64) -> Option<PixelRect> {
        let step = brush.step();
        let len = a.distance(b);
        let mut dirty: Option<PixelRect> = None;
        let mut t = step - *carry;
        while t <= len {
            let p = a.lerp(b, if len > 0.0 { t / len } else { 0.0 });
            dirty = union(dirty, self.stamp(p, brush));
            t += step;
        }
        *carry = len - (t - step);
        dirty
    }

    /// Even-odd scanline fill at pixel centres.
    pub fn fill_polygon(&mut self, polygon: &[Point]) -> Option<PixelRect> {
        if polygon.len() < 3 {
            return None;
        }
        let bounds = crate::geometry::bounding_box(polygon)?;
        let area = self.clip(bounds)?;
        let mut xs: Vec<f64> = Vec::new();
        for y in area.y..area.y + area.height {
            let yc = y as f64 + 0.5;
            xs.clear();
            let mut j = polygon.len() - 1;
            for i in 0..polygon.len() {
                let (pi, pj) = (polygon[i], polygon[j]);
                if (pi.y > yc) != (pj.y > yc) {
                    xs.push(pj.x + (yc - pj.y) * (pi.x - pj.x) / (pi.y - pj.y));
                }
                j = i;
            }
            xs.sort_by(f64::total_cmp);
            for pair in xs.chunks_exact(2) {
                let start = (pair[0] - 0.5).ceil().max(area.x as f64) as u32;
                let end = (pair[1] - 0.5).ceil().min((area.x + area.width) as f64) as u32;
                for x in start..end {
                    self.data[(y * self.width + x) as usize] = FULL_COVERAGE;
                }
            }
        }
        Some(area)
    }

    /// Write `base` blended with the brush through this mask into `target`
    /// over `area`. `base` may be the target itself (pass `None`).
    pub fn composite(&self, target: &mut RasterSurface, base: Option<&RasterSurface>, brush: &Brush, area: PixelRect) {
        for y in area.y..(area.y + area.height).min(self.height) {
            for x in area.x..(area.x + area.width).min(self.width) {
                let cov = self.coverage(x, y);
                let under = match base {
                    Some(b) => b.pixel(x, y),
                    None => target.pixel(x, y),
                };
                if cov <= 0.0 {
                    if base.is_some() {
                        target.put_pixel(x, y, under);
                    }
                    continue;
                }
                let alpha = cov * brush.opacity;
                let out = match brush.mode {
                    StampMode::Paint => blend_pixel(under, brush.color, brush.blend, alpha),
                    StampMode::Erase => erase_pixel(under, alpha),
                };
                target.put_pixel(x, y, out);
            }
        }
    }
}

fn union(a: Option<PixelRect>, b: Option<PixelRect>) -> Option<PixelRect> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let x0 = a.x.min(b.x);
            let y0 = a.y.min(b.y);
            let x1 = (a.x + a.width).max(b.x + b.width);
            let y1 = (a.y + a.height).max(b.y + b.height);
            Some(PixelRect::new(x0, y0, x1 - x0, y1 - y0))
        }
        (a, None) => a,
        (None, b) => b,
    }
}

#[derive(Debug, Clone, Default)]
struct Pen {
    last: Option<Point>,
    carry: f64,
}

/// Incremental freehand rasterizer.
///
/// Several pens share one coverage mask so mirrored strokes do not
/// double-blend where they overlap.
#[derive(Debug)]
pub struct StrokeRasterizer {
    brush: Brush,
    base: Arc<RasterSurface>,
    mask: CoverageMask,
    pens: Vec<Pen>,
    dirty: Option<PixelRect>,
}

impl StrokeRasterizer {
    /// `base` is the surface content before the stroke.
    pub fn begin(brush: Brush, base: Arc<RasterSurface>, pens: usize) -> SurfaceResult<Self> {
        let mask = CoverageMask::new(base.width(), base.height())?;
        Ok(Self {
            brush,
            base,
            mask,
            pens: vec![Pen::default(); pens.max(1)],
            dirty: None,
        })
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Pre-stroke pixels.
    pub fn base(&self) -> &Arc<RasterSurface> {
        &self.base
    }

    /// Area touched so far.
    pub fn dirty(&self) -> Option<PixelRect> {
        self.dirty
    }

    /// Extend pen `pen` to `p` and repaint only the newly touched area.
    pub fn add_point(&mut self, target: &mut RasterSurface, pen: usize, p: Point) -> Option<PixelRect> {
        let state = self.pens.get_mut(pen)?;
        let touched = match state.last {
            None => {
                state.carry = 0.0;
                self.mask.stamp(p, &self.brush)
            }
            Some(last) => self.mask.stamp_segment(last, p, &self.brush, &mut state.carry),
        };
        state.last = Some(p);
        let area = touched?;
        self.mask.composite(target, Some(&self.base), &self.brush, area);
        self.dirty = union(self.dirty, Some(area));
        Some(area)
    }
}

/// Stroke a polyline once into `target`.
pub fn stroke_polyline(target: &mut RasterSurface, points: &[Point], brush: &Brush, closed: bool) -> SurfaceResult<Option<PixelRect>> {
    stroke_paths(target, &[(points.to_vec(), closed)], brush)
}

/// Stroke several `(points, closed)` paths through one shared mask, so
/// crossings and mirrored copies blend once.
pub fn stroke_paths(target: &mut RasterSurface, paths: &[(Vec<Point>, bool)], brush: &Brush) -> SurfaceResult<Option<PixelRect>> {
    if paths.iter().all(|(points, _)| points.is_empty()) {
        return Ok(None);
    }
    let mut mask = CoverageMask::new(target.width(), target.height())?;
    let mut dirty = None;
    for (points, closed) in paths {
        let Some(&first) = points.first() else {
            continue;
        };
        dirty = union(dirty, mask.stamp(first, brush));
        let mut carry = 0.0;
        let tail = (*closed && points.len() > 2).then_some(first);
        for (a, b) in points.iter().copied().zip(points.iter().copied().skip(1).chain(tail)) {
            dirty = union(dirty, mask.stamp_segment(a, b, brush, &mut carry));
            // Always dab the vertex so corners are not cut by spacing.
            dirty = union(dirty, mask.stamp(b, brush));
        }
    }
    if let Some(area) = dirty {
        mask.composite(target, None, brush, area);
    }
    Ok(dirty)
}

/// Fill a polygon once into `target` with the brush colour and opacity.
pub fn fill_polygon(target: &mut RasterSurface, polygon: &[Point], brush: &Brush) -> SurfaceResult<Option<PixelRect>> {
    let mut mask = CoverageMask::new(target.width(), target.height())?;
    let dirty = mask.fill_polygon(polygon);
    if let Some(area) = dirty {
        mask.composite(target, None, brush, area);
    }
    Ok(dirty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pencil() -> Brush {
        BrushPreset::Pencil.brush([0, 0, 0, 255])
    }

    #[test]
    fn test_brush_setters_clamp() {
        let mut b = Brush::default();
        b.set_size(-4.0);
        assert_eq!(b.size, MIN_BRUSH_SIZE);
        b.set_opacity(3.0);
        assert_eq!(b.opacity, 1.0);
        b.set_hardness(-1.0);
        assert_eq!(b.hardness, 0.0);
    }

    #[test]
    fn test_single_dab() {
        let mut s = RasterSurface::new(20, 20).unwrap();
        let brush = pencil().with_size(4.0);
        stroke_polyline(&mut s, &[Point::new(10.0, 10.0)], &brush, false).unwrap();
        assert_eq!(s.pixel(10, 10), [0, 0, 0, 255]);
        assert_eq!(s.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_overlapping_dabs_respect_opacity() {
        let mut s = RasterSurface::new(40, 10).unwrap();
        let mut brush = BrushPreset::Marker.brush([255, 0, 0, 255]);
        brush.set_opacity(0.5);
        stroke_polyline(&mut s, &[Point::new(5.0, 5.0), Point::new(35.0, 5.0)], &brush, false).unwrap();
        let a = s.pixel(20, 5)[3] as i32;
        assert!((a - 128).abs() <= 1, "alpha {a}");
    }

    #[test]
    fn test_incremental_matches_base() {
        let base = Arc::new(RasterSurface::filled(30, 30, [255, 255, 255, 255]).unwrap());
        let mut target = (*base).clone();
        let mut r = StrokeRasterizer::begin(pencil(), base.clone(), 1).unwrap();
        r.add_point(&mut target, 0, Point::new(5.0, 5.0));
        r.add_point(&mut target, 0, Point::new(25.0, 5.0));
        assert_eq!(target.pixel(15, 5), [0, 0, 0, 255]);
        assert_eq!(target.pixel(15, 20), [255, 255, 255, 255]);
        let dirty = r.dirty().unwrap();
        assert!(dirty.x <= 5 && dirty.x + dirty.width >= 25);
        // Base is untouched.
        assert_eq!(base.pixel(15, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn test_spacing_carry_over_is_continuous() {
        let mut mask = CoverageMask::new(100, 5).unwrap();
        let brush = pencil();
        let mut carry = 0.0;
        mask.stamp(Point::new(0.5, 2.5), &brush);
        for i in 0..90 {
            let a = Point::new(0.5 + i as f64 * 0.07, 2.5);
            let b = Point::new(0.5 + (i + 1) as f64 * 0.07, 2.5);
            mask.stamp_segment(a, b, &brush, &mut carry);
        }
        // Tiny segments still produce a gap-free line.
        for x in 0..6 {
            assert!(mask.coverage(x, 2) > 0.9);
        }
    }

    #[test]
    fn test_eraser_clears() {
        let mut s = RasterSurface::filled(20, 20, [0, 0, 255, 255]).unwrap();
        let eraser = BrushPreset::Eraser.brush([0, 0, 0, 255]).with_size(6.0);
        stroke_polyline(&mut s, &[Point::new(10.0, 10.0)], &eraser, false).unwrap();
        assert_eq!(s.pixel(10, 10)[3], 0);
        assert_eq!(s.pixel(0, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn test_shared_mask_blends_crossing_once() {
        let mut s = RasterSurface::new(40, 40).unwrap();
        let mut brush = BrushPreset::Marker.brush([0, 0, 255, 255]);
        brush.set_opacity(0.5);
        let paths = vec![
            (vec![Point::new(5.0, 20.0), Point::new(35.0, 20.0)], false),
            (vec![Point::new(20.0, 5.0), Point::new(20.0, 35.0)], false),
        ];
        stroke_paths(&mut s, &paths, &brush).unwrap();
        let crossing = s.pixel(20, 20)[3] as i32;
        let arm = s.pixel(10, 20)[3] as i32;
        assert!((crossing - arm).abs() <= 1, "crossing {crossing} arm {arm}");
        assert_eq!(stroke_paths(&mut s, &[], &brush).unwrap(), None);
    }

    #[test]
    fn test_fill_polygon_square() {
        let mut s = RasterSurface::new(20, 20).unwrap();
        let square = [
            Point::new(5.0, 5.0),
            Point::new(15.0, 5.0),
            Point::new(15.0, 15.0),
            Point::new(5.0, 15.0),
        ];
        fill_polygon(&mut s, &square, &pencil()).unwrap();
        assert_eq!(s.content_bounding_box(), Some(PixelRect::new(5, 5, 10, 10)));
    }
}
