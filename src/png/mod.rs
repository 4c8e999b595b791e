//! PNG encoder implementation.
//!
//! Writes any [`Image`] as a non-interlaced PNG (ISO/IEC 15948). The
//! pixel representation is chosen from the image's color model, palette and
//! opacity; rows are filtered adaptively and deflated into IDAT chunks.
//! Ancillary metadata is supplied as a [`Metadata`] write option.
//!
//! ```
//! use pngscribe::image::{Rect, RgbaImage};
//! use pngscribe::png;
//!
//! let mut img = RgbaImage::new(Rect::from_size(2, 1));
//! img.set(0, 0, [255, 0, 0, 255]);
//! img.set(1, 0, [0, 0, 255, 255]);
//!
//! let mut out = Vec::new();
//! png::encode(&mut out, &img).unwrap();
//! assert_eq!(&out[..8], &png::chunk::PNG_SIGNATURE);
//! ```

mod ancillary;
pub mod chunk;
mod deferred;
pub mod filter;
pub mod idat;
pub mod metadata;
pub mod mode;
pub mod options;
pub mod pool;
pub mod scanline;

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::color::PaletteEntry;
use crate::compress::CompressionLevel;
use crate::error::{Error, Result};
use crate::image::Image;

use self::ancillary::AncillaryContext;
use self::chunk::ChunkWriter;
use self::deferred::DeferredChunks;
use self::filter::FILTER_NONE;
use self::idat::{Compressor, IdatStream};
use self::mode::EncodingMode;

pub use self::deferred::Deferred;
pub use self::metadata::{
    Chroma, HookError, IccProfile, Metadata, PhysicalDimensions, SrgbIntent, TextEntry, TextKind,
    Timestamp, Unit, XmpPacket,
};
pub use self::options::{EncodeContext, WriteOption};
pub use self::pool::{BufferPool, EncoderBuffer, SharedBufferPool};

/// Width and height must be below this.
const MAX_DIMENSION: i64 = 1 << 32;

/// What to encode.
#[derive(Clone, Copy)]
pub enum Source<'a> {
    /// Pixels read through the [`Image`] trait.
    Fresh(&'a dyn Image),
    /// Chunks captured from an existing PNG, written back as they are.
    Deferred(&'a Deferred),
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Fresh(image) => f
                .debug_tuple("Fresh")
                .field(&image.bounds())
                .field(&image.color_model())
                .finish(),
            Source::Deferred(d) => f.debug_tuple("Deferred").field(d).finish(),
        }
    }
}

impl<'a> From<&'a Deferred> for Source<'a> {
    fn from(d: &'a Deferred) -> Self {
        Source::Deferred(d)
    }
}

/// PNG encoder configuration.
#[derive(Clone, Default)]
pub struct Encoder {
    /// Deflate preset for IDAT, zTXt, iTXt and iCCP.
    pub compression_level: CompressionLevel,
    /// Where per-call buffers come from. Without a pool every call
    /// allocates its own.
    pub buffer_pool: Option<Arc<dyn BufferPool>>,
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("compression_level", &self.compression_level)
            .field("buffer_pool", &self.buffer_pool.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Encoder {
    /// Default compression, no pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Speed-focused preset.
    pub fn fast() -> Self {
        Self::new().with_compression_level(CompressionLevel::BestSpeed)
    }

    /// Balanced preset (the default).
    pub fn balanced() -> Self {
        Self::new().with_compression_level(CompressionLevel::Default)
    }

    /// Highest compression preset; slowest.
    pub fn max_compression() -> Self {
        Self::new().with_compression_level(CompressionLevel::BestCompression)
    }

    /// Stored deflate blocks and unfiltered rows.
    pub fn uncompressed() -> Self {
        Self::new().with_compression_level(CompressionLevel::None)
    }

    /// Set the compression preset.
    pub fn with_compression_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = level;
        self
    }

    /// Share buffers between calls through `pool`.
    pub fn with_buffer_pool(mut self, pool: Arc<dyn BufferPool>) -> Self {
        self.buffer_pool = Some(pool);
        self
    }

    /// Encode `image` to `w` without options.
    pub fn encode<W: Write>(&self, w: W, image: &dyn Image) -> Result<()> {
        self.encode_with_options(&EncodeContext::new(), w, Source::Fresh(image), &[])
    }

    /// Encode `source` to `w`.
    ///
    /// `options` may hold at most one [`Metadata`]; any other option type
    /// is rejected. Options are checked, and the image validated, before
    /// anything is written. Once writing starts the first failure is
    /// returned and nothing more is written, leaving a truncated stream.
    pub fn encode_with_options<W: Write>(
        &self,
        ctx: &EncodeContext,
        w: W,
        source: Source<'_>,
        options: &[&dyn WriteOption],
    ) -> Result<()> {
        let mut buffer = self
            .buffer_pool
            .as_ref()
            .and_then(|pool| pool.acquire())
            .unwrap_or_default();
        let result = self.encode_session(&mut buffer, ctx, w, source, options);
        if let Some(pool) = &self.buffer_pool {
            pool.release(buffer);
        }
        result
    }

    fn encode_session<W: Write>(
        &self,
        buffer: &mut EncoderBuffer,
        ctx: &EncodeContext,
        w: W,
        source: Source<'_>,
        options: &[&dyn WriteOption],
    ) -> Result<()> {
        let metadata = parse_options(options)?;
        let plan = match source {
            Source::Fresh(image) => plan_fresh(image)?,
            Source::Deferred(d) => Plan::Deferred(d.chunks()?),
        };

        let cx = AncillaryContext {
            level: self.compression_level,
            ctx,
            options,
        };
        let mut chunks = ChunkWriter::new(w);
        chunks.write_signature()?;

        match &plan {
            Plan::Fresh {
                width,
                height,
                mode,
                ..
            } => chunks.write_chunk(b"IHDR", &ihdr_payload(*width, *height, *mode))?,
            Plan::Deferred(d) => chunks.write_chunk(b"IHDR", d.ihdr)?,
        }

        if let Some(meta) = metadata {
            ancillary::write_leading(&mut chunks, meta, &cx)?;
        }

        match &plan {
            Plan::Fresh { image, mode, .. } => {
                if let (true, Some(palette)) = (mode.is_paletted(), image.palette()) {
                    write_plte_and_trns(&mut chunks, palette)?;
                }
            }
            Plan::Deferred(d) => {
                if let Some(plte) = d.plte {
                    chunks.write_chunk(b"PLTE", plte)?;
                }
                if let Some(trns) = d.trns {
                    chunks.write_chunk(b"tRNS", trns)?;
                }
            }
        }

        if let Some(meta) = metadata {
            ancillary::write_hist(&mut chunks, meta)?;
        }

        match &plan {
            Plan::Fresh { image, mode, .. } => {
                let written =
                    write_image(&mut chunks, buffer, *image, *mode, self.compression_level);
                match written {
                    Ok(n) => log::debug!("wrote {n} IDAT chunk(s)"),
                    Err(e) => return Err(chunks.fail(e)),
                }
            }
            Plan::Deferred(d) => {
                if let Some(idat) = d.idat {
                    chunks.write_chunk(b"IDAT", idat)?;
                }
            }
        }

        chunks.write_chunk(b"IEND", &[])?;
        chunks.finish()
    }
}

/// Encode `image` to `w` with the default [`Encoder`].
pub fn encode<W: Write>(w: W, image: &dyn Image) -> Result<()> {
    Encoder::default().encode(w, image)
}

/// Validated source, ready to write.
enum Plan<'a> {
    Fresh {
        image: &'a dyn Image,
        width: u32,
        height: u32,
        mode: EncodingMode,
    },
    Deferred(DeferredChunks<'a>),
}

/// Pick out the metadata bundle and validate it.
fn parse_options<'a>(options: &[&'a dyn WriteOption]) -> Result<Option<&'a Metadata>> {
    let mut metadata: Option<&'a Metadata> = None;
    for &opt in options {
        let Some(meta) = opt.as_any().downcast_ref::<Metadata>() else {
            log::warn!("rejecting unknown write option {}", opt.name());
            return Err(Error::UnknownOption(opt.name().to_owned()));
        };
        if metadata.is_some() {
            log::warn!("rejecting second metadata option");
            return Err(Error::MultipleMetadata);
        }
        if let Err(e) = meta.validate() {
            log::warn!("rejecting metadata: {e}");
            return Err(e);
        }
        metadata = Some(meta);
    }
    Ok(metadata)
}

/// Check dimensions and choose the encoding mode.
fn plan_fresh(image: &dyn Image) -> Result<Plan<'_>> {
    let b = image.bounds();
    let (w, h) = (b.dx(), b.dy());
    if w <= 0 || h <= 0 || w >= MAX_DIMENSION || h >= MAX_DIMENSION {
        return Err(Error::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    let mode = mode::select_mode(image)?;
    log::debug!("encoding {w}x{h} image as {mode:?}");
    Ok(Plan::Fresh {
        image,
        width: w as u32,
        height: h as u32,
        mode,
    })
}

/// IHDR: width, height, bit depth, color type, then zero compression,
/// filter and interlace methods.
fn ihdr_payload(width: u32, height: u32, mode: EncodingMode) -> [u8; 13] {
    let mut out = [0u8; 13];
    out[..4].copy_from_slice(&width.to_be_bytes());
    out[4..8].copy_from_slice(&height.to_be_bytes());
    out[8] = mode.bit_depth();
    out[9] = mode.color_type();
    out
}

/// Write PLTE, and tRNS up to the last entry that is not fully opaque.
fn write_plte_and_trns<W: Write>(
    chunks: &mut ChunkWriter<W>,
    palette: &[PaletteEntry],
) -> Result<()> {
    let plte: Vec<u8> = palette.iter().flat_map(|e| [e.r, e.g, e.b]).collect();
    chunks.write_chunk(b"PLTE", &plte)?;

    if let Some(last) = palette.iter().rposition(|e| e.a != 0xff) {
        let trns: Vec<u8> = palette[..=last].iter().map(|e| e.a).collect();
        chunks.write_chunk(b"tRNS", &trns)?;
    }
    Ok(())
}

/// Convert, filter and compress every row. Returns the IDAT chunk count.
fn write_image<W: Write>(
    chunks: &mut ChunkWriter<W>,
    buffer: &mut EncoderBuffer,
    image: &dyn Image,
    mode: EncodingMode,
    level: CompressionLevel,
) -> Result<usize> {
    let b = image.bounds();
    let bpp = mode.bytes_per_pixel();
    let filtering = !mode.is_paletted() && level != CompressionLevel::None;

    let EncoderBuffer {
        scratch,
        compressor,
        idat,
    } = buffer;
    scratch.prepare(mode.row_len(b.dx() as usize));
    let compressor = Compressor::reuse(compressor, level);
    let mut stream = IdatStream::new(compressor, idat, chunks);

    for y in b.min_y..b.max_y {
        scanline::convert_row(image, mode, y, scratch.current_mut());
        let filter = if filtering {
            scratch.select(bpp)
        } else {
            FILTER_NONE
        };
        log::trace!("row {y}: filter {filter}");
        stream.write(scratch.filtered(filter))?;
        scratch.advance();
    }
    stream.finish()
}
