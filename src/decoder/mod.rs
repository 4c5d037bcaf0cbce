//! Decode capability seam and the logic layered on top of it
//!
//! The QR symbol decoding itself lives in an external library behind
//! [`DecodeCapability`]. This module holds:
//! - The capability trait, hints and result types
//! - Backends for the bundled (rxing) and fallback (rqrr) libraries
//! - Backend selection and self-check
//! - The ordered attempt sequence and EC level extraction

/// Capability trait, hints, results and metadata types
pub mod capability;
/// Backend selection and self-check
pub mod loader;
/// EC level extraction from decode metadata
pub mod metadata;
/// Fallback backend built on rqrr
pub mod rqrr_backend;
/// Bundled backend built on rxing
pub mod rxing_backend;
/// Ordered decode attempts
pub mod sequencer;

pub use capability::{
    DecodeCapability, DecodeError, DecodeHints, DecodeResult, Found, Metadata, MetadataKey,
    MetadataValue,
};
pub use loader::{CapabilityLoader, DecoderSource};
pub use metadata::extract_ec_level;
pub use sequencer::{DecodeAttempt, DecodeStrategySequencer, ImageVariant, SequenceOutcome};
