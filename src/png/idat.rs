//! Streaming of filtered scanlines through deflate into IDAT chunks.

use std::io::Write;

use flate2::{Compress, FlushCompress, Status};

use crate::compress::CompressionLevel;
use crate::error::{Error, Result};

use super::chunk::ChunkWriter;

/// Compressed bytes gathered before an IDAT chunk is emitted.
pub const IDAT_BUFFER_SIZE: usize = 1 << 15;

/// A zlib compressor remembered together with the preset it was built for.
#[derive(Debug)]
pub struct Compressor {
    stream: Compress,
    level: CompressionLevel,
}

impl Compressor {
    /// Fresh zlib stream at `level`.
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            stream: Compress::new(level.to_flate2(), true),
            level,
        }
    }

    /// Preset this compressor was built for.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Reuse `slot` if it was built for `level`, else replace it.
    pub fn reuse(slot: &mut Option<Compressor>, level: CompressionLevel) -> &mut Compressor {
        match slot {
            Some(c) if c.level == level => {
                log::trace!("resetting pooled compressor at {:?}", level);
                c.stream.reset();
            }
            _ => {
                log::debug!("initializing compressor at {:?}", level);
                *slot = Some(Compressor::new(level));
            }
        }
        slot.get_or_insert_with(|| Compressor::new(level))
    }
}

/// Deflate stream whose output is cut into IDAT chunks.
pub struct IdatStream<'a, W: Write> {
    compressor: &'a mut Compressor,
    buf: &'a mut Vec<u8>,
    chunks: &'a mut ChunkWriter<W>,
    idat_count: usize,
}

impl<'a, W: Write> IdatStream<'a, W> {
    /// Start a stream. `buf` is cleared and grown to hold a full IDAT.
    pub fn new(
        compressor: &'a mut Compressor,
        buf: &'a mut Vec<u8>,
        chunks: &'a mut ChunkWriter<W>,
    ) -> Self {
        buf.clear();
        buf.reserve(IDAT_BUFFER_SIZE);
        Self {
            compressor,
            buf,
            chunks,
            idat_count: 0,
        }
    }

    /// Compress `input`, emitting IDAT chunks as the buffer fills.
    pub fn write(&mut self, mut input: &[u8]) -> Result<()> {
        while !input.is_empty() {
            self.make_room()?;
            let consumed = self.step(input, FlushCompress::None)?.0;
            input = &input[consumed..];
        }
        Ok(())
    }

    /// Finish the zlib stream and emit the remaining bytes. Returns the
    /// number of IDAT chunks written.
    pub fn finish(mut self) -> Result<usize> {
        loop {
            self.make_room()?;
            if self.step(&[], FlushCompress::Finish)?.1 == Status::StreamEnd {
                break;
            }
        }
        if !self.buf.is_empty() {
            self.emit()?;
        }
        Ok(self.idat_count)
    }

    /// One compressor call; returns bytes consumed and the stream status.
    fn step(&mut self, input: &[u8], flush: FlushCompress) -> Result<(usize, Status)> {
        let stream = &mut self.compressor.stream;
        let (in_before, out_before) = (stream.total_in(), stream.total_out());
        let status = stream.compress_vec(input, self.buf, flush)?;
        let consumed = (stream.total_in() - in_before) as usize;
        if consumed == 0 && stream.total_out() == out_before && status != Status::StreamEnd {
            return Err(Error::Sink {
                kind: std::io::ErrorKind::Other,
                message: "deflate made no progress".into(),
            });
        }
        Ok((consumed, status))
    }

    fn make_room(&mut self) -> Result<()> {
        if self.buf.len() >= IDAT_BUFFER_SIZE || self.buf.len() == self.buf.capacity() {
            self.emit()?;
        }
        Ok(())
    }

    fn emit(&mut self) -> Result<()> {
        self.chunks.write_chunk(b"IDAT", &self.buf[..])?;
        self.idat_count += 1;
        self.buf.clear();
        Ok(())
    }
}
