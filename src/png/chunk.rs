//! PNG chunk framing.
//!
//! Every chunk is `length (u32 BE) + tag + payload + CRC32(tag + payload)`.
//! [`ChunkWriter`] keeps the first failure it sees and refuses to write
//! anything afterwards, so a failed encode never interleaves later chunks
//! with a half-written one.

use std::io::Write;

use crate::error::{Error, Result};

/// PNG file signature (magic bytes).
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Writes framed chunks to a sink, with a sticky error.
#[derive(Debug)]
pub struct ChunkWriter<W: Write> {
    sink: W,
    err: Option<Error>,
    chunks_written: usize,
}

impl<W: Write> ChunkWriter<W> {
    /// Wrap `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            err: None,
            chunks_written: 0,
        }
    }

    /// The recorded error, if any write has failed.
    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Number of chunks successfully written.
    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }

    /// Record `err` unless an earlier error is already held, then return
    /// whichever error is now sticky.
    pub fn fail(&mut self, err: Error) -> Error {
        self.err.get_or_insert(err).clone()
    }

    fn check(&self) -> Result<()> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Write the 8-byte PNG signature.
    pub fn write_signature(&mut self) -> Result<()> {
        self.check()?;
        if let Err(e) = self.sink.write_all(&PNG_SIGNATURE) {
            return Err(self.fail(e.into()));
        }
        Ok(())
    }

    /// Write one chunk. A no-op returning the held error if a previous
    /// write failed.
    pub fn write_chunk(&mut self, tag: &[u8; 4], payload: &[u8]) -> Result<()> {
        self.check()?;
        debug_assert!(tag.is_ascii(), "chunk tags are ASCII");

        let len = match payload_len(tag, payload.len()) {
            Ok(len) => len,
            Err(e) => return Err(self.fail(e)),
        };

        let mut header = [0u8; 8];
        header[..4].copy_from_slice(&len.to_be_bytes());
        header[4..].copy_from_slice(tag);

        let mut crc = crc32fast::Hasher::new();
        crc.update(tag);
        crc.update(payload);
        let footer = crc.finalize().to_be_bytes();

        let written = self
            .sink
            .write_all(&header)
            .and_then(|_| self.sink.write_all(payload))
            .and_then(|_| self.sink.write_all(&footer));
        if let Err(e) = written {
            return Err(self.fail(e.into()));
        }
        self.chunks_written += 1;
        Ok(())
    }

    /// Flush the sink and return the held error, if any.
    pub fn finish(&mut self) -> Result<()> {
        self.check()?;
        if let Err(e) = self.sink.flush() {
            return Err(self.fail(e.into()));
        }
        Ok(())
    }
}

/// The 32-bit length field for a payload of `len` bytes.
fn payload_len(tag: &[u8; 4], len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::ChunkTooLarge { tag: *tag, len })
}
