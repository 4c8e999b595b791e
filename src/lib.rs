//! # pngscribe
//!
//! A streaming PNG encoder for in-memory raster images.
//!
//! The encoder picks the smallest lossless PNG representation for an image
//! (grayscale, truecolor, truecolor with alpha, or 1/2/4/8-bit paletted),
//! packs each scanline, chooses a per-row filter, and deflates the rows into
//! IDAT chunks. Optional ancillary metadata (gamma, chromaticities, sRGB
//! intent, timestamps, ICC profiles, physical dimensions, histograms, text
//! and XMP) is written alongside.
//!
//! Deflate comes from `flate2` and chunk checksums from `crc32fast`.
//!
//! ## Example
//!
//! ```rust
//! use pngscribe::image::{GrayImage, Rect};
//! use pngscribe::png::{EncodeContext, Encoder, Metadata, Source, TextEntry};
//!
//! let mut img = GrayImage::new(Rect::from_size(4, 4));
//! img.set(1, 1, 200);
//!
//! let mut meta = Metadata::new();
//! meta.gamma = Some(45455);
//! meta.push_text(TextEntry::text("Title", "dot"));
//!
//! let mut out = Vec::new();
//! Encoder::max_compression()
//!     .encode_with_options(&EncodeContext::new(), &mut out, Source::Fresh(&img), &[&meta])
//!     .unwrap();
//! assert_eq!(&out[1..4], b"PNG");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod color;
pub mod compress;
pub mod error;
pub mod image;
pub mod png;

pub use color::{ColorModel, PaletteEntry, Rgba64};
pub use compress::CompressionLevel;
pub use error::{Error, ErrorKind, HookFailure, Result};
pub use image::{Image, Rect};
pub use png::{encode, Encoder};
