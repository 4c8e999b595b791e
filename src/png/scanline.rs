//! Conversion of source pixels into packed PNG scanline bytes.

use crate::image::{Image, RawRow};

use super::mode::EncodingMode;

/// Fill `out` (the scanline without its filter byte) with row `y` of
/// `image` laid out for `mode`.
///
/// Truecolor modes drop alpha, so the caller must have confirmed the image
/// is opaque before choosing one.
pub fn convert_row(image: &dyn Image, mode: EncodingMode, y: i64, out: &mut [u8]) {
    let b = image.bounds();
    let width = b.dx() as usize;
    debug_assert_eq!(out.len(), mode.row_len(width) - 1);

    if convert_raw_row(image.raw_row(y), mode, width, out) {
        return;
    }

    let xs = b.min_x..b.max_x;
    match mode {
        EncodingMode::Gray8 => {
            for (o, x) in out.iter_mut().zip(xs) {
                *o = image.pixel(x, y).to_gray8();
            }
        }
        EncodingMode::Gray16 => {
            for (o, x) in out.chunks_exact_mut(2).zip(xs) {
                o.copy_from_slice(&image.pixel(x, y).to_gray16().to_be_bytes());
            }
        }
        EncodingMode::Truecolor8 => {
            for (o, x) in out.chunks_exact_mut(3).zip(xs) {
                let c = image.pixel(x, y);
                o[0] = (c.r >> 8) as u8;
                o[1] = (c.g >> 8) as u8;
                o[2] = (c.b >> 8) as u8;
            }
        }
        EncodingMode::Truecolor16 => {
            for (o, x) in out.chunks_exact_mut(6).zip(xs) {
                let c = image.pixel(x, y);
                o[0..2].copy_from_slice(&c.r.to_be_bytes());
                o[2..4].copy_from_slice(&c.g.to_be_bytes());
                o[4..6].copy_from_slice(&c.b.to_be_bytes());
            }
        }
        EncodingMode::TruecolorAlpha8 => {
            for (o, x) in out.chunks_exact_mut(4).zip(xs) {
                o.copy_from_slice(&image.pixel(x, y).to_nrgba8());
            }
        }
        EncodingMode::TruecolorAlpha16 => {
            for (o, x) in out.chunks_exact_mut(8).zip(xs) {
                for (dst, v) in o.chunks_exact_mut(2).zip(image.pixel(x, y).to_nrgba64()) {
                    dst.copy_from_slice(&v.to_be_bytes());
                }
            }
        }
        EncodingMode::Paletted8 => {
            for (o, x) in out.iter_mut().zip(xs) {
                *o = image.color_index(x, y);
            }
        }
        EncodingMode::Paletted1 | EncodingMode::Paletted2 | EncodingMode::Paletted4 => {
            pack_indices(xs.map(|x| image.color_index(x, y)), mode.bits_per_pixel(), out);
        }
    }
}

/// Copy a raw row when its layout already matches `mode`. Returns whether
/// `out` was filled; a row whose length does not match `width` pixels is
/// ignored so the per-pixel path takes over.
fn convert_raw_row(
    row: Option<RawRow<'_>>,
    mode: EncodingMode,
    width: usize,
    out: &mut [u8],
) -> bool {
    let Some(row) = row else {
        return false;
    };
    if row.len() != width * row.channels() {
        log::trace!(
            "raw row holds {} samples, expected {}; converting per pixel",
            row.len(),
            width * row.channels()
        );
        return false;
    }
    match (row, mode) {
        (RawRow::Gray8(src), EncodingMode::Gray8)
        | (RawRow::Index8(src), EncodingMode::Paletted8)
        | (RawRow::Nrgba8(src), EncodingMode::TruecolorAlpha8) => {
            out.copy_from_slice(src);
            true
        }
        // Opaque, so premultiplied and straight samples agree.
        (RawRow::Rgba8(src) | RawRow::Nrgba8(src), EncodingMode::Truecolor8) => {
            for (o, p) in out.chunks_exact_mut(3).zip(src.chunks_exact(4)) {
                o.copy_from_slice(&p[..3]);
            }
            true
        }
        (RawRow::Nrgba16(src), EncodingMode::TruecolorAlpha16) => {
            for (o, v) in out.chunks_exact_mut(2).zip(src) {
                o.copy_from_slice(&v.to_be_bytes());
            }
            true
        }
        (RawRow::Nrgba16(src), EncodingMode::Truecolor16) => {
            for (o, p) in out.chunks_exact_mut(6).zip(src.chunks_exact(4)) {
                for (dst, v) in o.chunks_exact_mut(2).zip(&p[..3]) {
                    dst.copy_from_slice(&v.to_be_bytes());
                }
            }
            true
        }
        (RawRow::Index8(src), EncodingMode::Paletted1)
        | (RawRow::Index8(src), EncodingMode::Paletted2)
        | (RawRow::Index8(src), EncodingMode::Paletted4) => {
            pack_indices(src.iter().copied(), mode.bits_per_pixel(), out);
            true
        }
        _ => false,
    }
}

/// Pack sub-byte palette indices most-significant first. A partial final
/// byte is shifted so its unused low bits are zero.
pub fn pack_indices(indices: impl Iterator<Item = u8>, bits: usize, out: &mut [u8]) {
    debug_assert!(
        matches!(bits, 1 | 2 | 4),
        "pack_indices expected bit depth 1, 2, or 4"
    );
    let per_byte = 8 / bits;
    let mask = ((1u16 << bits) - 1) as u8;
    let mut acc: u8 = 0;
    let mut count = 0;
    let mut i = 0;
    for v in indices {
        acc = (acc << bits) | (v & mask);
        count += 1;
        if count == per_byte {
            out[i] = acc;
            i += 1;
            acc = 0;
            count = 0;
        }
    }
    if count > 0 {
        acc <<= bits * (per_byte - count);
        out[i] = acc;
    }
}
