//! Owned RGBA raster surfaces.
//!
//! Every object item owns one `RasterSurface`. Pixels are straight-alpha RGBA8.
//! Allocation is checked against a pixel limit and reported as
//! [`SurfaceError`] instead of aborting the process.

use crate::blend::{BlendMode, blend_pixel, erase_pixel};
use crate::geometry::Homography;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbaImage, imageops::FilterType};
use kurbo::{Affine, Point, Rect, Size};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Default upper bound on surface area (8192 x 8192).
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 8192 * 8192;

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Raster allocation and codec errors.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Surface {width}x{height} exceeds the limit of {limit} pixels")]
    TooLarge { width: u32, height: u32, limit: u64 },
    #[error("Failed to allocate {bytes} bytes for a raster surface")]
    Allocation { bytes: usize },
    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Integer pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.x as f64,
            self.y as f64,
            (self.x + self.width) as f64,
            (self.y + self.height) as f64,
        )
    }

    /// Pixel-snapped intersection of `rect` with a `width x height` area.
    pub fn from_rect_clamped(rect: Rect, width: u32, height: u32) -> Option<Self> {
        let x0 = rect.x0.min(rect.x1).round().clamp(0.0, width as f64) as u32;
        let y0 = rect.y0.min(rect.y1).round().clamp(0.0, height as f64) as u32;
        let x1 = rect.x0.max(rect.x1).round().clamp(0.0, width as f64) as u32;
        let y1 = rect.y0.max(rect.y1).round().clamp(0.0, height as f64) as u32;
        (x1 > x0 && y1 > y0).then(|| Self::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// Convert a floating canvas size to surface dimensions (at least 1x1).
pub fn pixel_dims(size: Size) -> (u32, u32) {
    let dim = |v: f64| {
        if v.is_finite() {
            v.round().clamp(1.0, u32::MAX as f64) as u32
        } else {
            1
        }
    };
    (dim(size.width), dim(size.height))
}

fn check_limit(width: u32, height: u32, limit: u64) -> SurfaceResult<u64> {
    let pixels = width as u64 * height as u64;
    if pixels > limit {
        return Err(SurfaceError::TooLarge { width, height, limit });
    }
    Ok(pixels)
}

fn alloc_buffer(width: u32, height: u32, limit: u64) -> SurfaceResult<Vec<u8>> {
    let pixels = check_limit(width, height, limit)?;
    let bytes = usize::try_from(pixels * 4).map_err(|_| SurfaceError::Allocation { bytes: usize::MAX })?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes).map_err(|_| SurfaceError::Allocation { bytes })?;
    buf.resize(bytes, 0);
    Ok(buf)
}

/// Straight-alpha RGBA8 pixel buffer.
#[derive(Clone, PartialEq)]
pub struct RasterSurface {
    image: RgbaImage,
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl RasterSurface {
    /// Transparent surface. Zero dimensions are clamped to 1.
    pub fn new(width: u32, height: u32) -> SurfaceResult<Self> {
        Self::with_limit(width, height, DEFAULT_MAX_SURFACE_PIXELS)
    }

    pub fn with_limit(width: u32, height: u32, max_pixels: u64) -> SurfaceResult<Self> {
        let (width, height) = (width.max(1), height.max(1));
        let buf = alloc_buffer(width, height, max_pixels)?;
        let bytes = buf.len();
        let image = RgbaImage::from_raw(width, height, buf).ok_or(SurfaceError::Allocation { bytes })?;
        Ok(Self { image })
    }

    /// Surface filled with a solid colour.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> SurfaceResult<Self> {
        let mut s = Self::new(width, height)?;
        s.fill(color);
        Ok(s)
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width() as f64, self.height() as f64)
    }

    /// Raw RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.image
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    /// Pixel at `(x, y)`; transparent outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x < self.width() && y < self.height() {
            self.image.get_pixel(x, y).0
        } else {
            [0, 0, 0, 0]
        }
    }

    /// Write a pixel; ignored outside the surface.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, image::Rgba(rgba));
        }
    }

    /// Blend `rgba` onto the pixel at `(x, y)`.
    pub fn blend_at(&mut self, x: u32, y: u32, rgba: [u8; 4], mode: BlendMode, opacity: f32) {
        if x < self.width() && y < self.height() {
            let px = self.image.get_pixel_mut(x, y);
            px.0 = blend_pixel(px.0, rgba, mode, opacity);
        }
    }

    /// Destination-out at `(x, y)`.
    pub fn erase_at(&mut self, x: u32, y: u32, amount: f32) {
        if x < self.width() && y < self.height() {
            let px = self.image.get_pixel_mut(x, y);
            px.0 = erase_pixel(px.0, amount);
        }
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        for px in self.image.pixels_mut() {
            px.0 = color;
        }
    }

    pub fn clear(&mut self) {
        self.image.fill(0);
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p.0[3] == 0)
    }

    /// Copy of the region starting at `(x, y)`. Area outside the surface is
    /// transparent.
    pub fn crop(&self, x: i64, y: i64, width: u32, height: u32) -> SurfaceResult<Self> {
        let mut out = Self::new(width, height)?;
        let (sw, sh) = (self.width() as i64, self.height() as i64);
        for oy in 0..out.height() {
            let sy = y + oy as i64;
            if sy < 0 || sy >= sh {
                continue;
            }
            for ox in 0..out.width() {
                let sx = x + ox as i64;
                if sx < 0 || sx >= sw {
                    continue;
                }
                out.put_pixel(ox, oy, self.pixel(sx as u32, sy as u32));
            }
        }
        Ok(out)
    }

    /// Rescale to `width x height` with bilinear filtering.
    pub fn resample(&self, width: u32, height: u32) -> SurfaceResult<Self> {
        let (width, height) = (width.max(1), height.max(1));
        check_limit(width, height, DEFAULT_MAX_SURFACE_PIXELS)?;
        if (width, height) == self.dimensions() {
            return Ok(self.clone());
        }
        Ok(Self {
            image: image::imageops::resize(&self.image, width, height, FilterType::Triangle),
        })
    }

    /// New size with content anchored top-left; new area filled with `fill`.
    pub fn resize_anchored(&self, width: u32, height: u32, fill: [u8; 4]) -> SurfaceResult<Self> {
        let mut out = Self::new(width, height)?;
        if fill[3] != 0 {
            out.fill(fill);
        }
        let (cw, ch) = (self.width().min(out.width()), self.height().min(out.height()));
        for y in 0..ch {
            for x in 0..cw {
                out.put_pixel(x, y, self.pixel(x, y));
            }
        }
        Ok(out)
    }

    /// Minimal rectangle enclosing every non-transparent pixel, or `None` if
    /// the surface is fully transparent.
    pub fn content_bounding_box(&self) -> Option<PixelRect> {
        let w = self.width();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0u32, 0u32);
        let mut found = false;
        for (y, row) in self.data().chunks_exact(w as usize * 4).enumerate() {
            let y = y as u32;
            for (x, px) in row.chunks_exact(4).enumerate() {
                if px[3] != 0 {
                    let x = x as u32;
                    found = true;
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                    min_y = min_y.min(y);
                    max_y = max_y.max(y);
                }
            }
        }
        found.then(|| PixelRect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Premultiplied texel as normalized floats; zero outside the surface.
    #[inline]
    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return [0.0; 4];
        }
        let p = self.image.get_pixel(x as u32, y as u32).0;
        let a = p[3] as f32 / 255.0;
        [
            p[0] as f32 / 255.0 * a,
            p[1] as f32 / 255.0 * a,
            p[2] as f32 / 255.0 * a,
            a,
        ]
    }

    /// Bilinear sample at canvas position `(x, y)` (pixel centres at +0.5).
    pub fn sample_bilinear(&self, x: f64, y: f64) -> [u8; 4] {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = (fx - x0) as f32;
        let ty = (fy - y0) as f32;
        let (xi, yi) = (x0 as i64, y0 as i64);

        let p00 = self.texel(xi, yi);
        let p10 = self.texel(xi + 1, yi);
        let p01 = self.texel(xi, yi + 1);
        let p11 = self.texel(xi + 1, yi + 1);

        let mut acc = [0.0f32; 4];
        for c in 0..4 {
            let top = p00[c] * (1.0 - tx) + p10[c] * tx;
            let bottom = p01[c] * (1.0 - tx) + p11[c] * tx;
            acc[c] = top * (1.0 - ty) + bottom * ty;
        }
        let a = acc[3];
        if a <= 1.0 / 512.0 {
            return [0, 0, 0, 0];
        }
        let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
        [to_u8(acc[0] / a), to_u8(acc[1] / a), to_u8(acc[2] / a), to_u8(a)]
    }

    /// Render this surface through `transform` (source -> destination) into a
    /// new `width x height` surface, sampling the original pixels.
    pub fn warp_affine(&self, transform: Affine, width: u32, height: u32) -> SurfaceResult<Self> {
        let mut out = Self::new(width, height)?;
        if transform.determinant().abs() < 1e-12 {
            return Ok(out);
        }
        let inv = transform.inverse();
        let w = out.width() as usize;
        let buf: &mut [u8] = &mut out.image;
        buf.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
            for x in 0..w {
                let src = inv * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                row[x * 4..x * 4 + 4].copy_from_slice(&self.sample_bilinear(src.x, src.y));
            }
        });
        Ok(out)
    }

    /// Projective counterpart of [`warp_affine`](Self::warp_affine); `homography`
    /// maps source positions to destination positions.
    pub fn warp_projective(&self, homography: &Homography, width: u32, height: u32) -> SurfaceResult<Self> {
        let mut out = Self::new(width, height)?;
        let Some(inv) = homography.inverse() else {
            return Ok(out);
        };
        let w = out.width() as usize;
        let buf: &mut [u8] = &mut out.image;
        buf.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
            for x in 0..w {
                if let Some(src) = inv.apply(Point::new(x as f64 + 0.5, y as f64 + 0.5)) {
                    row[x * 4..x * 4 + 4].copy_from_slice(&self.sample_bilinear(src.x, src.y));
                }
            }
        });
        Ok(out)
    }

    /// Draw `src` onto this surface through `transform` with opacity and blend.
    pub fn composite_from(&mut self, src: &RasterSurface, transform: Affine, opacity: f32, mode: BlendMode) {
        if opacity <= 0.0 {
            return;
        }
        let w = self.width() as usize;
        let buf: &mut [u8] = &mut self.image;

        if transform == Affine::IDENTITY {
            let sw = src.width() as usize;
            let sh = src.height() as usize;
            let src_data = src.data();
            buf.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
                if y >= sh {
                    return;
                }
                for x in 0..w.min(sw) {
                    let i = (y * sw + x) * 4;
                    let top = [src_data[i], src_data[i + 1], src_data[i + 2], src_data[i + 3]];
                    let base = [row[x * 4], row[x * 4 + 1], row[x * 4 + 2], row[x * 4 + 3]];
                    row[x * 4..x * 4 + 4].copy_from_slice(&blend_pixel(base, top, mode, opacity));
                }
            });
            return;
        }

        if transform.determinant().abs() < 1e-12 {
            return;
        }
        let inv = transform.inverse();
        buf.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
            for x in 0..w {
                let p = inv * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let top = src.sample_bilinear(p.x, p.y);
                if top[3] == 0 {
                    continue;
                }
                let base = [row[x * 4], row[x * 4 + 1], row[x * 4 + 2], row[x * 4 + 3]];
                row[x * 4..x * 4 + 4].copy_from_slice(&blend_pixel(base, top, mode, opacity));
            }
        });
    }

    /// Zero the alpha of every pixel where `mask` is unset.
    pub fn retain_masked(&mut self, mask: impl Fn(u32, u32) -> bool + Sync) {
        let w = self.width() as usize;
        let buf: &mut [u8] = &mut self.image;
        buf.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
            for x in 0..w {
                if !mask(x as u32, y as u32) {
                    row[x * 4..x * 4 + 4].fill(0);
                }
            }
        });
    }

    /// Encode as PNG.
    pub fn to_png_bytes(&self) -> SurfaceResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Decode any supported image container (PNG, JPEG, WebP).
    pub fn from_encoded_bytes(bytes: &[u8]) -> SurfaceResult<Self> {
        Self::from_encoded_bytes_with_limit(bytes, DEFAULT_MAX_SURFACE_PIXELS)
    }

    pub fn from_encoded_bytes_with_limit(bytes: &[u8], max_pixels: u64) -> SurfaceResult<Self> {
        let decoded = image::load_from_memory(bytes)?;
        check_limit(decoded.width(), decoded.height(), max_pixels)?;
        Ok(Self { image: decoded.to_rgba8() })
    }

    /// `data:image/png;base64,...`
    pub fn to_data_uri(&self) -> SurfaceResult<String> {
        let png = self.to_png_bytes()?;
        Ok(format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(png)))
    }

    /// Decode a base64 image data URI.
    pub fn from_data_uri(uri: &str) -> SurfaceResult<Self> {
        Self::from_data_uri_with_limit(uri, DEFAULT_MAX_SURFACE_PIXELS)
    }

    pub fn from_data_uri_with_limit(uri: &str, max_pixels: u64) -> SurfaceResult<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| SurfaceError::InvalidDataUri("missing data: scheme".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| SurfaceError::InvalidDataUri("missing payload separator".to_string()))?;
        if !header.ends_with(";base64") || !header.starts_with("image/") {
            return Err(SurfaceError::InvalidDataUri(format!("unsupported header '{header}'")));
        }
        let bytes = STANDARD.decode(payload)?;
        Self::from_encoded_bytes_with_limit(&bytes, max_pixels)
    }
}
