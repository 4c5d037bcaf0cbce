//! Error types for the fallible seams behind the host boundary.
//!
//! None of these cross [`crate::RequestChannel::analyze`]: the worker and the
//! channel fold every failure into an [`crate::AnalysisOutcome`].

use thiserror::Error;

/// Invalid pixel buffer construction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    /// Width or height is zero
    #[error("image has zero size ({width}x{height})")]
    ZeroSize {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
    },
    /// Byte count does not match `width * height * channels`
    #[error("buffer holds {actual} bytes, expected {expected}")]
    LengthMismatch {
        /// Bytes required by the dimensions and layout
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },
}

/// Failure turning an [`crate::ImageSource`] into pixels
#[derive(Debug, Error)]
pub enum IngestError {
    /// Reading the file failed
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    /// The base64 payload is malformed
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The bytes are not a raster format the `image` crate understands
    #[error("failed to decode image: {0}")]
    Format(#[from] image::ImageError),
    /// The decoded raster is unusable
    #[error(transparent)]
    Buffer(#[from] ImageError),
}

/// Invalid configuration value
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Decoder source name not recognized
    #[error("unknown decoder source '{0}' (expected auto, bundled or fallback)")]
    UnknownDecoder(String),
}

/// Failure bringing a decode capability up
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The backend was constructed but did not survive its self-check
    #[error("{backend} decoder failed its self-check: {reason}")]
    SelfCheck {
        /// Backend name
        backend: &'static str,
        /// What went wrong
        reason: String,
    },
    /// Every candidate backend failed
    #[error("no decode backend could be loaded")]
    NoBackend,
}
