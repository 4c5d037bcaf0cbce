//! Selecting and bringing up a decode backend.

use super::capability::{DecodeCapability, DecodeError, DecodeHints};
use super::rqrr_backend::RqrrDecoder;
use super::rxing_backend::RxingDecoder;
use crate::error::{ConfigError, LoadError};
use crate::models::ImageBuffer;
use std::fmt;
use std::str::FromStr;

/// Side length of the blank probe image used by the self-check
const SELF_CHECK_SIZE: usize = 32;

/// Which decoding library the worker loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderSource {
    /// Bundled first, fallback if the bundled one fails its self-check
    #[default]
    Auto,
    /// rxing only
    Bundled,
    /// rqrr only
    Fallback,
}

impl FromStr for DecoderSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DecoderSource::Auto),
            "bundled" | "rxing" => Ok(DecoderSource::Bundled),
            "fallback" | "rqrr" => Ok(DecoderSource::Fallback),
            _ => Err(ConfigError::UnknownDecoder(s.to_string())),
        }
    }
}

impl fmt::Display for DecoderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecoderSource::Auto => "auto",
            DecoderSource::Bundled => "bundled",
            DecoderSource::Fallback => "fallback",
        })
    }
}

/// Produces a ready capability, or the reason none is available.
/// Runs once, on the worker thread.
pub type CapabilityLoader =
    Box<dyn FnOnce() -> Result<Box<dyn DecodeCapability>, LoadError> + Send>;

/// Loader for a configured source
pub fn loader_for(source: DecoderSource) -> CapabilityLoader {
    Box::new(move || load(source))
}

/// Load and self-check the capability named by `source`
pub fn load(source: DecoderSource) -> Result<Box<dyn DecodeCapability>, LoadError> {
    match source {
        DecoderSource::Bundled => checked(RxingDecoder::new()),
        DecoderSource::Fallback => checked(RqrrDecoder::new()),
        DecoderSource::Auto => checked(RxingDecoder::new()).or_else(|err| {
            tracing::info!(%err, "bundled decoder unavailable, trying fallback");
            checked(RqrrDecoder::new()).map_err(|err| {
                tracing::debug!(%err, "fallback decoder unavailable");
                LoadError::NoBackend
            })
        }),
    }
}

fn checked<C: DecodeCapability + 'static>(
    capability: C,
) -> Result<Box<dyn DecodeCapability>, LoadError> {
    self_check(&capability)?;
    Ok(Box::new(capability))
}

/// Run the capability once against a blank image.
///
/// "No symbol" is the expected answer; only an internal fault fails the check.
pub fn self_check(capability: &dyn DecodeCapability) -> Result<(), LoadError> {
    let probe = ImageBuffer::from_luma(
        SELF_CHECK_SIZE,
        SELF_CHECK_SIZE,
        vec![255u8; SELF_CHECK_SIZE * SELF_CHECK_SIZE],
    )
    .map_err(|err| LoadError::SelfCheck {
        backend: capability.name(),
        reason: err.to_string(),
    })?;

    match capability.decode(&probe, &DecodeHints::qr()) {
        Ok(_) | Err(DecodeError::NotFound) => Ok(()),
        Err(DecodeError::Fault(reason)) => Err(LoadError::SelfCheck {
            backend: capability.name(),
            reason,
        }),
    }
}
