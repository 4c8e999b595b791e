//! Source image abstraction consumed by the encoder.
//!
//! The encoder only needs bounds, a per-pixel color query, an optional
//! palette, and an optional cheap opacity signal. [`Image::raw_row`] lets
//! buffer-backed images skip the per-pixel path entirely.

use crate::color::{ColorModel, PaletteEntry, Rgba64};

/// Axis-aligned pixel rectangle, `min` inclusive, `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub min_x: i64,
    /// Top edge.
    pub min_y: i64,
    /// Right edge (exclusive).
    pub max_x: i64,
    /// Bottom edge (exclusive).
    pub max_y: i64,
}

impl Rect {
    /// Rectangle from explicit corners.
    pub const fn new(min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Rectangle anchored at the origin.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i64, height as i64)
    }

    /// Width in pixels (may be zero or negative for degenerate rectangles).
    #[inline]
    pub const fn dx(&self) -> i64 {
        self.max_x - self.min_x
    }

    /// Height in pixels.
    #[inline]
    pub const fn dy(&self) -> i64 {
        self.max_y - self.min_y
    }

    fn area(&self) -> usize {
        (self.dx().max(0) as usize) * (self.dy().max(0) as usize)
    }

    fn offset(&self, x: i64, y: i64) -> usize {
        debug_assert!(x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y);
        (y - self.min_y) as usize * self.dx() as usize + (x - self.min_x) as usize
    }
}

/// One row of samples in a layout the encoder can copy without conversion.
#[derive(Debug, Clone, Copy)]
pub enum RawRow<'a> {
    /// One 8-bit luminance byte per pixel.
    Gray8(&'a [u8]),
    /// Four bytes per pixel, alpha-premultiplied.
    Rgba8(&'a [u8]),
    /// Four bytes per pixel, straight alpha.
    Nrgba8(&'a [u8]),
    /// One palette index per pixel.
    Index8(&'a [u8]),
    /// Four 16-bit samples per pixel, straight alpha.
    Nrgba16(&'a [u16]),
}

impl RawRow<'_> {
    /// Number of samples in the row.
    pub fn len(&self) -> usize {
        match self {
            RawRow::Gray8(s) | RawRow::Rgba8(s) | RawRow::Nrgba8(s) | RawRow::Index8(s) => s.len(),
            RawRow::Nrgba16(s) => s.len(),
        }
    }

    /// Whether the row holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples per pixel for this layout.
    pub fn channels(&self) -> usize {
        match self {
            RawRow::Gray8(_) | RawRow::Index8(_) => 1,
            RawRow::Rgba8(_) | RawRow::Nrgba8(_) | RawRow::Nrgba16(_) => 4,
        }
    }
}

/// A raster image the encoder can read from.
pub trait Image {
    /// Pixel bounds of the image.
    fn bounds(&self) -> Rect;

    /// Declared color model.
    fn color_model(&self) -> ColorModel;

    /// Premultiplied color of the pixel at `(x, y)`, inside [`Image::bounds`].
    fn pixel(&self, x: i64, y: i64) -> Rgba64;

    /// Palette for [`ColorModel::Paletted`] images.
    fn palette(&self) -> Option<&[PaletteEntry]> {
        None
    }

    /// Palette index of the pixel at `(x, y)`. Only called when
    /// [`Image::palette`] returns `Some`.
    fn color_index(&self, _x: i64, _y: i64) -> u8 {
        0
    }

    /// Cheap opacity answer, if the image can give one without scanning.
    ///
    /// `None` makes the encoder scan every pixel's alpha instead.
    fn is_opaque(&self) -> Option<bool> {
        None
    }

    /// Row `y` (absolute coordinate) in a directly copyable layout.
    ///
    /// The slice must hold exactly `bounds().dx()` pixels, that is
    /// `dx * channels` samples for the chosen [`RawRow`] variant. A row of
    /// any other length is ignored and the row is read through
    /// [`Image::pixel`] instead.
    fn raw_row(&self, _y: i64) -> Option<RawRow<'_>> {
        None
    }
}

macro_rules! buffer_common {
    ($name:ident, $sample:ty, $channels:expr) => {
        impl $name {
            /// Zero-filled image covering `rect`.
            pub fn new(rect: Rect) -> Self {
                Self {
                    rect,
                    pix: vec![0; rect.area() * $channels],
                }
            }

            /// Image covering `rect` with the given samples in row-major order.
            ///
            /// Returns `None` if `pix` does not match the rectangle.
            pub fn from_samples(rect: Rect, pix: Vec<$sample>) -> Option<Self> {
                (pix.len() == rect.area() * $channels).then_some(Self { rect, pix })
            }

            /// Samples in row-major order.
            pub fn samples(&self) -> &[$sample] {
                &self.pix
            }

            fn at(&self, x: i64, y: i64) -> &[$sample] {
                let i = self.rect.offset(x, y) * $channels;
                &self.pix[i..i + $channels]
            }

            fn at_mut(&mut self, x: i64, y: i64) -> &mut [$sample] {
                let i = self.rect.offset(x, y) * $channels;
                &mut self.pix[i..i + $channels]
            }

            #[allow(dead_code)]
            fn row(&self, y: i64) -> &[$sample] {
                let w = self.rect.dx() as usize * $channels;
                let start = (y - self.rect.min_y) as usize * w;
                &self.pix[start..start + w]
            }
        }
    };
}

/// 8-bit grayscale image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    rect: Rect,
    pix: Vec<u8>,
}
buffer_common!(GrayImage, u8, 1);

impl GrayImage {
    /// Set the luminance at `(x, y)`.
    pub fn set(&mut self, x: i64, y: i64, v: u8) {
        self.at_mut(x, y)[0] = v;
    }
}

impl Image for GrayImage {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn color_model(&self) -> ColorModel {
        ColorModel::Gray
    }
    fn pixel(&self, x: i64, y: i64) -> Rgba64 {
        Rgba64::from_gray8(self.at(x, y)[0])
    }
    fn is_opaque(&self) -> Option<bool> {
        Some(true)
    }
    fn raw_row(&self, y: i64) -> Option<RawRow<'_>> {
        Some(RawRow::Gray8(self.row(y)))
    }
}

/// 16-bit grayscale image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gray16Image {
    rect: Rect,
    pix: Vec<u16>,
}
buffer_common!(Gray16Image, u16, 1);

impl Gray16Image {
    /// Set the luminance at `(x, y)`.
    pub fn set(&mut self, x: i64, y: i64, v: u16) {
        self.at_mut(x, y)[0] = v;
    }
}

impl Image for Gray16Image {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn color_model(&self) -> ColorModel {
        ColorModel::Gray16
    }
    fn pixel(&self, x: i64, y: i64) -> Rgba64 {
        let v = self.at(x, y)[0];
        Rgba64::opaque(v, v, v)
    }
    fn is_opaque(&self) -> Option<bool> {
        Some(true)
    }
}

/// 8-bit alpha-premultiplied RGBA image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    rect: Rect,
    pix: Vec<u8>,
}
buffer_common!(RgbaImage, u8, 4);

impl RgbaImage {
    /// Set the premultiplied color at `(x, y)`.
    pub fn set(&mut self, x: i64, y: i64, rgba: [u8; 4]) {
        self.at_mut(x, y).copy_from_slice(&rgba);
    }
}

impl Image for RgbaImage {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn color_model(&self) -> ColorModel {
        ColorModel::Rgba
    }
    fn pixel(&self, x: i64, y: i64) -> Rgba64 {
        let p = self.at(x, y);
        Rgba64::from_rgba8(p[0], p[1], p[2], p[3])
    }
    fn is_opaque(&self) -> Option<bool> {
        Some(self.pix.chunks_exact(4).all(|p| p[3] == 0xff))
    }
    fn raw_row(&self, y: i64) -> Option<RawRow<'_>> {
        Some(RawRow::Rgba8(self.row(y)))
    }
}

/// 8-bit straight-alpha RGBA image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NrgbaImage {
    rect: Rect,
    pix: Vec<u8>,
}
buffer_common!(NrgbaImage, u8, 4);

impl NrgbaImage {
    /// Set the straight-alpha color at `(x, y)`.
    pub fn set(&mut self, x: i64, y: i64, rgba: [u8; 4]) {
        self.at_mut(x, y).copy_from_slice(&rgba);
    }
}

impl Image for NrgbaImage {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn color_model(&self) -> ColorModel {
        ColorModel::Nrgba
    }
    fn pixel(&self, x: i64, y: i64) -> Rgba64 {
        let p = self.at(x, y);
        Rgba64::from_nrgba8(p[0], p[1], p[2], p[3])
    }
    fn raw_row(&self, y: i64) -> Option<RawRow<'_>> {
        Some(RawRow::Nrgba8(self.row(y)))
    }
}

/// 16-bit alpha-premultiplied RGBA image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rgba64Image {
    rect: Rect,
    pix: Vec<u16>,
}
buffer_common!(Rgba64Image, u16, 4);

impl Rgba64Image {
    /// Set the premultiplied color at `(x, y)`.
    pub fn set(&mut self, x: i64, y: i64, c: Rgba64) {
        self.at_mut(x, y).copy_from_slice(&[c.r, c.g, c.b, c.a]);
    }
}

impl Image for Rgba64Image {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn color_model(&self) -> ColorModel {
        ColorModel::Rgba64
    }
    fn pixel(&self, x: i64, y: i64) -> Rgba64 {
        let p = self.at(x, y);
        Rgba64 {
            r: p[0],
            g: p[1],
            b: p[2],
            a: p[3],
        }
    }
}

/// 16-bit straight-alpha RGBA image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nrgba64Image {
    rect: Rect,
    pix: Vec<u16>,
}
buffer_common!(Nrgba64Image, u16, 4);

impl Nrgba64Image {
    /// Set the straight-alpha color at `(x, y)`.
    pub fn set(&mut self, x: i64, y: i64, rgba: [u16; 4]) {
        self.at_mut(x, y).copy_from_slice(&rgba);
    }
}

impl Image for Nrgba64Image {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn color_model(&self) -> ColorModel {
        ColorModel::Nrgba64
    }
    fn pixel(&self, x: i64, y: i64) -> Rgba64 {
        let p = self.at(x, y);
        Rgba64::from_nrgba64(p[0], p[1], p[2], p[3])
    }
    fn is_opaque(&self) -> Option<bool> {
        Some(self.pix.chunks_exact(4).all(|p| p[3] == 0xffff))
    }
    fn raw_row(&self, y: i64) -> Option<RawRow<'_>> {
        Some(RawRow::Nrgba16(self.row(y)))
    }
}

/// Palette-indexed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedImage {
    rect: Rect,
    pix: Vec<u8>,
    palette: Vec<PaletteEntry>,
}

impl PalettedImage {
    /// Image with every pixel set to index 0.
    pub fn new(rect: Rect, palette: Vec<PaletteEntry>) -> Self {
        Self {
            rect,
            pix: vec![0; rect.area()],
            palette,
        }
    }

    /// Set the palette index at `(x, y)`.
    pub fn set_index(&mut self, x: i64, y: i64, index: u8) {
        let i = self.rect.offset(x, y);
        self.pix[i] = index;
    }

    /// Palette entries.
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.palette
    }
}

impl Image for PalettedImage {
    fn bounds(&self) -> Rect {
        self.rect
    }
    fn color_model(&self) -> ColorModel {
        ColorModel::Paletted
    }
    fn pixel(&self, x: i64, y: i64) -> Rgba64 {
        let index = self.pix[self.rect.offset(x, y)] as usize;
        self.palette
            .get(index)
            .map(|e| e.to_rgba64())
            .unwrap_or_default()
    }
    fn palette(&self) -> Option<&[PaletteEntry]> {
        Some(&self.palette)
    }
    fn color_index(&self, x: i64, y: i64) -> u8 {
        self.pix[self.rect.offset(x, y)]
    }
    fn is_opaque(&self) -> Option<bool> {
        let palette = &self.palette;
        Some(
            self.pix
                .iter()
                .all(|&i| palette.get(i as usize).is_some_and(|e| e.a == 0xff)),
        )
    }
    fn raw_row(&self, y: i64) -> Option<RawRow<'_>> {
        let w = self.rect.dx() as usize;
        let start = (y - self.rect.min_y) as usize * w;
        Some(RawRow::Index8(&self.pix[start..start + w]))
    }
}
