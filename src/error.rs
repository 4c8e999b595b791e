//! Error types for the pngscribe library.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Result type alias for pngscribe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The image or its palette cannot be represented as PNG.
    Format,
    /// A valid request the PNG container cannot carry (e.g. oversized chunk).
    Unsupported,
    /// The write options were malformed or failed validation.
    Option,
    /// The output sink or the compressor failed.
    Sink,
    /// A user-supplied metadata encode hook failed.
    Hook,
}

/// Errors that can occur during PNG encoding.
///
/// Errors are `Clone` so that an encode session can keep the first failure
/// and hand it back from every later write.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Image width or height outside `(0, 2^32)`.
    InvalidDimensions {
        /// Image width.
        width: i64,
        /// Image height.
        height: i64,
    },
    /// Palette length outside `1..=256`.
    InvalidPaletteLength {
        /// Number of palette entries supplied.
        len: usize,
    },
    /// The source color model has no PNG representation.
    UnsupportedColorModel(&'static str),
    /// A captured chunk blob is too short to hold its trailing CRC.
    MalformedDeferredChunk {
        /// Tag of the chunk being transplanted.
        tag: [u8; 4],
        /// Length of the captured blob.
        len: usize,
    },
    /// Chunk payload does not fit the 32-bit length field.
    ChunkTooLarge {
        /// Tag of the oversized chunk.
        tag: [u8; 4],
        /// Payload length in bytes.
        len: usize,
    },
    /// More than one metadata bundle was supplied.
    MultipleMetadata,
    /// A write option of a type this encoder does not know.
    UnknownOption(String),
    /// The metadata bundle failed validation.
    InvalidMetadata(String),
    /// Failure reported by the output sink or the compressor.
    Sink {
        /// I/O error kind (`Other` for compressor failures).
        kind: io::ErrorKind,
        /// Human-readable message.
        message: String,
    },
    /// Failure reported by an ICC or XMP encode hook.
    Hook(HookFailure),
}

/// The error an ICC or XMP hook returned, shared so [`Error`] stays `Clone`.
///
/// Two failures compare equal when their messages match.
#[derive(Debug, Clone)]
pub struct HookFailure(Arc<dyn StdError + Send + Sync>);

impl HookFailure {
    /// The hook's own error value.
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for HookFailure {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.to_string() == other.0.to_string()
    }
}

impl Eq for HookFailure {}

impl From<Box<dyn StdError + Send + Sync>> for HookFailure {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        HookFailure(Arc::from(err))
    }
}

impl From<&str> for HookFailure {
    fn from(msg: &str) -> Self {
        Box::<dyn StdError + Send + Sync>::from(msg).into()
    }
}

impl Error {
    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDimensions { .. }
            | Error::InvalidPaletteLength { .. }
            | Error::UnsupportedColorModel(_)
            | Error::MalformedDeferredChunk { .. } => ErrorKind::Format,
            Error::ChunkTooLarge { .. } => ErrorKind::Unsupported,
            Error::MultipleMetadata | Error::UnknownOption(_) | Error::InvalidMetadata(_) => {
                ErrorKind::Option
            }
            Error::Sink { .. } => ErrorKind::Sink,
            Error::Hook(_) => ErrorKind::Hook,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDimensions { width, height } => {
                write!(f, "invalid image size: {}x{}", width, height)
            }
            Error::InvalidPaletteLength { len } => {
                write!(f, "bad palette length: {}", len)
            }
            Error::UnsupportedColorModel(model) => {
                write!(f, "unsupported color model: {}", model)
            }
            Error::MalformedDeferredChunk { tag, len } => {
                write!(
                    f,
                    "captured {} chunk is only {} bytes",
                    String::from_utf8_lossy(tag),
                    len
                )
            }
            Error::ChunkTooLarge { tag, len } => {
                write!(
                    f,
                    "{} chunk is too large: {}",
                    String::from_utf8_lossy(tag),
                    len
                )
            }
            Error::MultipleMetadata => write!(f, "multiple metadata bundles passed"),
            Error::UnknownOption(name) => {
                write!(f, "unknown write option of type {} given", name)
            }
            Error::InvalidMetadata(msg) => write!(f, "invalid metadata: {}", msg),
            Error::Sink { message, .. } => write!(f, "write failed: {}", message),
            Error::Hook(msg) => write!(f, "metadata encode hook failed: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Hook(failure) => Some(failure.get_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Sink {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<flate2::CompressError> for Error {
    fn from(err: flate2::CompressError) -> Self {
        Error::Sink {
            kind: io::ErrorKind::Other,
            message: err.to_string(),
        }
    }
}
