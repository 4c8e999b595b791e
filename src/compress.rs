//! Compression presets and the zlib helper used by compressed text and
//! ICC profile chunks.
//!
//! Deflate itself comes from `flate2`; this module only maps the named
//! presets the encoder exposes onto it.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::Result;

/// Compression method byte for zlib/deflate in zTXt, iTXt and iCCP.
pub const METHOD_DEFLATE: u8 = 0;

/// Named compression presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionLevel {
    /// The compressor's default trade-off.
    #[default]
    Default,
    /// Stored blocks only. Rows are also left unfiltered.
    None,
    /// Fastest compression.
    BestSpeed,
    /// Smallest output.
    BestCompression,
}

impl CompressionLevel {
    /// The `flate2` level this preset maps to.
    #[inline]
    pub fn to_flate2(self) -> Compression {
        match self {
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::None => Compression::none(),
            CompressionLevel::BestSpeed => Compression::fast(),
            CompressionLevel::BestCompression => Compression::best(),
        }
    }
}

/// Compress `input` as a complete zlib stream.
///
/// Returns the compressed bytes and the PNG compression method byte.
pub fn zlib_compress(input: &[u8], level: CompressionLevel) -> Result<(Vec<u8>, u8)> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(input.len() / 2 + 16), level.to_flate2());
    encoder.write_all(input)?;
    Ok((encoder.finish()?, METHOD_DEFLATE))
}
