//! Pre-encoded chunks re-emitted without touching pixels.
//!
//! A [`Deferred`] holds chunk blobs captured from an existing PNG, each
//! being the chunk payload followed by the 4-byte CRC it was read with.
//! Encoding one skips mode selection and compression entirely: the
//! payloads are written back with fresh CRCs and new metadata is layered
//! around them.

use crate::error::{Error, Result};

/// CRC trailer length of a captured blob.
const CRC_LEN: usize = 4;

/// Captured IHDR, PLTE, tRNS and IDAT chunks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deferred {
    ihdr: Vec<u8>,
    plte: Option<Vec<u8>>,
    trns: Option<Vec<u8>>,
    idat: Option<Vec<u8>>,
}

/// Payloads of a [`Deferred`] with their CRCs removed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeferredChunks<'a> {
    pub ihdr: &'a [u8],
    pub plte: Option<&'a [u8]>,
    pub trns: Option<&'a [u8]>,
    pub idat: Option<&'a [u8]>,
}

impl Deferred {
    /// Start from a captured IHDR blob.
    pub fn new(ihdr: Vec<u8>) -> Self {
        Self {
            ihdr,
            ..Self::default()
        }
    }

    /// Attach a captured PLTE blob.
    pub fn with_plte(mut self, blob: Vec<u8>) -> Self {
        self.plte = Some(blob);
        self
    }

    /// Attach a captured tRNS blob.
    pub fn with_trns(mut self, blob: Vec<u8>) -> Self {
        self.trns = Some(blob);
        self
    }

    /// Attach the captured image data: one IDAT payload plus CRC, which
    /// may hold the concatenation of several original IDAT chunks.
    pub fn with_idat(mut self, blob: Vec<u8>) -> Self {
        self.idat = Some(blob);
        self
    }

    /// Strip the CRC trailer of every blob, failing if any blob is too
    /// short to have one.
    pub(crate) fn chunks(&self) -> Result<DeferredChunks<'_>> {
        Ok(DeferredChunks {
            ihdr: strip_crc(b"IHDR", &self.ihdr)?,
            plte: self.plte.as_deref().map(|b| strip_crc(b"PLTE", b)).transpose()?,
            trns: self.trns.as_deref().map(|b| strip_crc(b"tRNS", b)).transpose()?,
            idat: self.idat.as_deref().map(|b| strip_crc(b"IDAT", b)).transpose()?,
        })
    }
}

fn strip_crc<'a>(tag: &[u8; 4], blob: &'a [u8]) -> Result<&'a [u8]> {
    match blob.len().checked_sub(CRC_LEN) {
        Some(len) => Ok(&blob[..len]),
        None => Err(Error::MalformedDeferredChunk {
            tag: *tag,
            len: blob.len(),
        }),
    }
}
