//! Color values and conversions between the sample layouts PNG stores.
//!
//! Source images hand out pixels as alpha-premultiplied 16-bit [`Rgba64`]
//! values; PNG stores straight (non-premultiplied) samples, so the encoder
//! converts through the helpers here.

/// Color model declared by a source image.
///
/// This is what the encoder inspects to decide the PNG color type and bit
/// depth, before looking at any pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorModel {
    /// 8-bit luminance.
    Gray,
    /// 16-bit luminance.
    Gray16,
    /// 8-bit alpha mask (color is implied white).
    Alpha,
    /// 16-bit alpha mask.
    Alpha16,
    /// 8-bit alpha-premultiplied RGBA.
    Rgba,
    /// 8-bit straight-alpha RGBA.
    Nrgba,
    /// 16-bit alpha-premultiplied RGBA.
    Rgba64,
    /// 16-bit straight-alpha RGBA.
    Nrgba64,
    /// Palette indices; the image must also expose its palette.
    Paletted,
}

impl ColorModel {
    /// Whether samples of this model carry 8 bits of precision per channel.
    #[inline]
    pub const fn is_8bit(self) -> bool {
        matches!(
            self,
            ColorModel::Gray | ColorModel::Alpha | ColorModel::Rgba | ColorModel::Nrgba
        )
    }
}

/// Alpha-premultiplied 16-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba64 {
    /// Red, premultiplied by alpha.
    pub r: u16,
    /// Green, premultiplied by alpha.
    pub g: u16,
    /// Blue, premultiplied by alpha.
    pub b: u16,
    /// Alpha.
    pub a: u16,
}

impl Rgba64 {
    /// Fully opaque color from 16-bit channels.
    #[inline]
    pub const fn opaque(r: u16, g: u16, b: u16) -> Self {
        Self {
            r,
            g,
            b,
            a: 0xffff,
        }
    }

    /// Widen an 8-bit premultiplied RGBA color.
    #[inline]
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: widen(r),
            g: widen(g),
            b: widen(b),
            a: widen(a),
        }
    }

    /// Premultiply an 8-bit straight-alpha color.
    #[inline]
    pub fn from_nrgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        let a = widen(a) as u32;
        Self {
            r: (widen(r) as u32 * a / 0xffff) as u16,
            g: (widen(g) as u32 * a / 0xffff) as u16,
            b: (widen(b) as u32 * a / 0xffff) as u16,
            a: a as u16,
        }
    }

    /// Premultiply a 16-bit straight-alpha color.
    #[inline]
    pub fn from_nrgba64(r: u16, g: u16, b: u16, a: u16) -> Self {
        let a32 = a as u32;
        Self {
            r: (r as u32 * a32 / 0xffff) as u16,
            g: (g as u32 * a32 / 0xffff) as u16,
            b: (b as u32 * a32 / 0xffff) as u16,
            a,
        }
    }

    /// Opaque gray from an 8-bit luminance value.
    #[inline]
    pub const fn from_gray8(y: u8) -> Self {
        let y = widen(y);
        Self::opaque(y, y, y)
    }

    /// Whether the alpha channel is at its maximum.
    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.a == 0xffff
    }

    /// 8-bit luminance (ITU-R BT.601 weights, 16.16 fixed point).
    #[inline]
    pub fn to_gray8(self) -> u8 {
        (luma(self) >> 24) as u8
    }

    /// 16-bit luminance.
    #[inline]
    pub fn to_gray16(self) -> u16 {
        (luma(self) >> 16) as u16
    }

    /// Un-premultiplied 16-bit channels `[r, g, b, a]`.
    #[inline]
    pub fn to_nrgba64(self) -> [u16; 4] {
        match self.a {
            0xffff => [self.r, self.g, self.b, 0xffff],
            0 => [0, 0, 0, 0],
            a => {
                let a = a as u32;
                [
                    (self.r as u32 * 0xffff / a) as u16,
                    (self.g as u32 * 0xffff / a) as u16,
                    (self.b as u32 * 0xffff / a) as u16,
                    a as u16,
                ]
            }
        }
    }

    /// Un-premultiplied 8-bit channels `[r, g, b, a]`.
    #[inline]
    pub fn to_nrgba8(self) -> [u8; 4] {
        let [r, g, b, a] = self.to_nrgba64();
        [(r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8, (a >> 8) as u8]
    }
}

/// A palette entry: straight (non-premultiplied) RGB plus alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaletteEntry {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha; 255 is fully opaque.
    pub a: u8,
}

impl PaletteEntry {
    /// Opaque palette entry.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Palette entry with explicit alpha.
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Premultiplied 16-bit form of this entry.
    #[inline]
    pub fn to_rgba64(self) -> Rgba64 {
        Rgba64::from_nrgba8(self.r, self.g, self.b, self.a)
    }
}

#[inline]
const fn widen(v: u8) -> u16 {
    (v as u16) << 8 | v as u16
}

#[inline]
fn luma(c: Rgba64) -> u32 {
    19595 * c.r as u32 + 38470 * c.g as u32 + 7471 * c.b as u32 + (1 << 15)
}
