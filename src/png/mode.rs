//! Choice of PNG color type and bit depth for a source image.

use crate::color::ColorModel;
use crate::error::{Error, Result};
use crate::image::Image;

/// PNG color type values as stored in IHDR.
const CT_GRAYSCALE: u8 = 0;
const CT_TRUECOLOR: u8 = 2;
const CT_PALETTED: u8 = 3;
const CT_TRUECOLOR_ALPHA: u8 = 6;

/// Pixel representation used for one encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingMode {
    /// 8-bit grayscale.
    Gray8,
    /// 16-bit grayscale.
    Gray16,
    /// 8-bit RGB.
    Truecolor8,
    /// 16-bit RGB.
    Truecolor16,
    /// 8-bit RGBA, straight alpha.
    TruecolorAlpha8,
    /// 16-bit RGBA, straight alpha.
    TruecolorAlpha16,
    /// 1-bit palette indices.
    Paletted1,
    /// 2-bit palette indices.
    Paletted2,
    /// 4-bit palette indices.
    Paletted4,
    /// 8-bit palette indices.
    Paletted8,
}

impl EncodingMode {
    /// Bits per pixel in the packed scanline.
    #[inline]
    pub const fn bits_per_pixel(self) -> usize {
        match self {
            EncodingMode::Paletted1 => 1,
            EncodingMode::Paletted2 => 2,
            EncodingMode::Paletted4 => 4,
            EncodingMode::Gray8 | EncodingMode::Paletted8 => 8,
            EncodingMode::Gray16 => 16,
            EncodingMode::Truecolor8 => 24,
            EncodingMode::TruecolorAlpha8 => 32,
            EncodingMode::Truecolor16 => 48,
            EncodingMode::TruecolorAlpha16 => 64,
        }
    }

    /// Whole bytes per pixel, used as the filter stride. Zero for sub-byte
    /// modes, which are never filtered.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        self.bits_per_pixel() / 8
    }

    /// Length of one scanline including the leading filter-type byte.
    #[inline]
    pub const fn row_len(self, width: usize) -> usize {
        1 + (self.bits_per_pixel() * width).div_ceil(8)
    }

    /// IHDR bit depth.
    #[inline]
    pub const fn bit_depth(self) -> u8 {
        match self {
            EncodingMode::Paletted1 => 1,
            EncodingMode::Paletted2 => 2,
            EncodingMode::Paletted4 => 4,
            EncodingMode::Gray8
            | EncodingMode::Paletted8
            | EncodingMode::Truecolor8
            | EncodingMode::TruecolorAlpha8 => 8,
            EncodingMode::Gray16 | EncodingMode::Truecolor16 | EncodingMode::TruecolorAlpha16 => {
                16
            }
        }
    }

    /// IHDR color type.
    #[inline]
    pub const fn color_type(self) -> u8 {
        match self {
            EncodingMode::Gray8 | EncodingMode::Gray16 => CT_GRAYSCALE,
            EncodingMode::Truecolor8 | EncodingMode::Truecolor16 => CT_TRUECOLOR,
            EncodingMode::TruecolorAlpha8 | EncodingMode::TruecolorAlpha16 => CT_TRUECOLOR_ALPHA,
            EncodingMode::Paletted1
            | EncodingMode::Paletted2
            | EncodingMode::Paletted4
            | EncodingMode::Paletted8 => CT_PALETTED,
        }
    }

    /// Whether this mode stores palette indices.
    #[inline]
    pub const fn is_paletted(self) -> bool {
        self.color_type() == CT_PALETTED
    }
}

/// Smallest paletted mode able to index `len` entries.
pub fn palette_mode(len: usize) -> Result<EncodingMode> {
    match len {
        1..=2 => Ok(EncodingMode::Paletted1),
        3..=4 => Ok(EncodingMode::Paletted2),
        5..=16 => Ok(EncodingMode::Paletted4),
        17..=256 => Ok(EncodingMode::Paletted8),
        _ => Err(Error::InvalidPaletteLength { len }),
    }
}

/// Whether every pixel of `image` is fully opaque.
///
/// Uses the image's own answer when it has one, otherwise scans alpha.
pub fn is_opaque(image: &dyn Image) -> bool {
    if let Some(opaque) = image.is_opaque() {
        return opaque;
    }
    let b = image.bounds();
    (b.min_y..b.max_y).all(|y| (b.min_x..b.max_x).all(|x| image.pixel(x, y).is_opaque()))
}

/// Pick the encoding mode for `image`.
pub fn select_mode(image: &dyn Image) -> Result<EncodingMode> {
    if let Some(palette) = image.palette() {
        return palette_mode(palette.len());
    }

    let mode = match image.color_model() {
        ColorModel::Gray => EncodingMode::Gray8,
        ColorModel::Gray16 => EncodingMode::Gray16,
        ColorModel::Paletted => {
            return Err(Error::UnsupportedColorModel("paletted image without palette"))
        }
        model if model.is_8bit() => {
            if is_opaque(image) {
                EncodingMode::Truecolor8
            } else {
                EncodingMode::TruecolorAlpha8
            }
        }
        _ => {
            if is_opaque(image) {
                EncodingMode::Truecolor16
            } else {
                EncodingMode::TruecolorAlpha16
            }
        }
    };
    Ok(mode)
}
