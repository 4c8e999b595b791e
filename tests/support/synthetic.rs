//! Synthetic test image generation.
//!
//! Generates deterministic test patterns as in-memory image buffers. All
//! functions produce reproducible output suitable for regression testing.

use pngscribe::image::{GrayImage, NrgbaImage, PalettedImage, Rect, RgbaImage};
use pngscribe::PaletteEntry;

fn rgba_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> RgbaImage {
    let mut img = RgbaImage::new(Rect::from_size(width, height));
    for y in 0..height {
        for x in 0..width {
            img.set(x as i64, y as i64, f(x, y));
        }
    }
    img
}

/// A solid opaque color.
pub fn solid_color(width: u32, height: u32, r: u8, g: u8, b: u8) -> RgbaImage {
    rgba_from_fn(width, height, |_, _| [r, g, b, 255])
}

/// Grayscale diagonal gradient (top-left to bottom-right).
pub fn gradient_gray(width: u32, height: u32) -> GrayImage {
    let mut img = GrayImage::new(Rect::from_size(width, height));
    let max_dist = (width + height).max(1);
    for y in 0..height {
        for x in 0..width {
            img.set(x as i64, y as i64, (((x + y) * 255) / max_dist) as u8);
        }
    }
    img
}

/// RGB gradient (red horizontal, green vertical, blue diagonal).
pub fn gradient_rgb(width: u32, height: u32) -> RgbaImage {
    rgba_from_fn(width, height, |x, y| {
        let r = ((x * 255) / width.max(1)) as u8;
        let g = ((y * 255) / height.max(1)) as u8;
        let b = (((x + y) * 127) / (width + height).max(1)) as u8;
        [r, g, b, 255]
    })
}

/// Black and white checkerboard.
pub fn checkerboard(width: u32, height: u32, cell_size: u32) -> RgbaImage {
    let cell_size = cell_size.max(1);
    rgba_from_fn(width, height, |x, y| {
        let v = if (x / cell_size + y / cell_size) % 2 == 0 {
            255
        } else {
            0
        };
        [v, v, v, 255]
    })
}

/// Pseudo-random opaque noise from a simple LCG, deterministic per seed.
pub fn noise(width: u32, height: u32, seed: u32) -> RgbaImage {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        (state >> 16) as u8
    };
    let mut img = RgbaImage::new(Rect::from_size(width, height));
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let px = [next(), next(), next(), 255];
            img.set(x, y, px);
        }
    }
    img
}

/// Straight-alpha image whose alpha fades left to right.
pub fn alpha_fade(width: u32, height: u32) -> NrgbaImage {
    let mut img = NrgbaImage::new(Rect::from_size(width, height));
    for y in 0..height {
        for x in 0..width {
            let a = ((x * 255) / width.saturating_sub(1).max(1)) as u8;
            img.set(x as i64, y as i64, [200, (y * 10) as u8, 40, a]);
        }
    }
    img
}

/// Color bars, grayscale ramp and checkerboard in horizontal thirds.
pub fn test_pattern(width: u32, height: u32) -> RgbaImage {
    rgba_from_fn(width, height, |x, y| {
        let [r, g, b] = if y < height / 3 {
            match x * 8 / width.max(1) {
                0 => [255, 255, 255],
                1 => [255, 255, 0],
                2 => [0, 255, 255],
                3 => [0, 255, 0],
                4 => [255, 0, 255],
                5 => [255, 0, 0],
                6 => [0, 0, 255],
                _ => [0, 0, 0],
            }
        } else if y < 2 * height / 3 {
            let v = ((x * 255) / width.max(1)) as u8;
            [v, v, v]
        } else if (x / 8 + (y - 2 * height / 3) / 8) % 2 == 0 {
            [255, 255, 255]
        } else {
            [0, 0, 0]
        };
        [r, g, b, 255]
    })
}

/// Vertical stripes cycling through `colors` palette entries.
pub fn paletted_stripes(width: u32, height: u32, colors: usize) -> PalettedImage {
    let palette = (0..colors)
        .map(|i| {
            let v = (i * 255 / colors.max(2).saturating_sub(1)) as u8;
            PaletteEntry::rgb(v, 255 - v, v / 2)
        })
        .collect();
    let mut img = PalettedImage::new(Rect::from_size(width, height), palette);
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            img.set_index(x, y, (x as usize % colors.max(1)) as u8);
        }
    }
    img
}

/// Predefined test image dimensions for edge case testing.
pub const EDGE_CASE_DIMENSIONS: &[(u32, u32, &str)] = &[
    (1, 1, "minimum"),
    (2, 2, "tiny"),
    (7, 7, "not_power_of_2"),
    (15, 17, "odd_dimensions"),
    (1, 100, "tall_narrow"),
    (100, 1, "wide_short"),
    (256, 256, "standard_small"),
];
