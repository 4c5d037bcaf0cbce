//! Fallback decoder: rqrr, a pure-Rust port of quirc.
//!
//! rqrr has no hint support of its own. Inverted decoding is emulated by
//! running a second pass over the negated luminance plane; `try_harder` and
//! `character_set` are accepted and ignored.

use super::capability::{
    DecodeCapability, DecodeError, DecodeHints, Found, Metadata, MetadataKey, MetadataValue,
    panic_message,
};
use crate::models::{ECLevel, ImageBuffer};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// rqrr-backed [`DecodeCapability`]
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    /// Create the decoder
    pub fn new() -> Self {
        Self
    }
}

fn decode_plane(luma: &[u8], width: usize, height: usize) -> Result<Found, DecodeError> {
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| luma[y * width + x]);
    let grids = prepared.detect_grids();
    let grid = grids.first().ok_or(DecodeError::NotFound)?;
    let (meta, text) = grid.decode().map_err(|err| {
        tracing::trace!(?err, "rqrr grid failed to decode");
        DecodeError::NotFound
    })?;

    let mut metadata = Metadata::new();
    if let Some(level) = ECLevel::from_format_bits(meta.ecc_level) {
        metadata.insert(
            MetadataKey::ErrorCorrectionLevel,
            MetadataValue::Text(level.as_str().to_string()),
        );
    }
    metadata.insert(
        MetadataKey::SymbolVersion,
        MetadataValue::Integer(meta.version.0 as i64),
    );
    metadata.insert(
        MetadataKey::MaskPattern,
        MetadataValue::Integer(meta.mask as i64),
    );

    Ok(Found { text, metadata })
}

impl DecodeCapability for RqrrDecoder {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn decode(&self, image: &ImageBuffer, hints: &DecodeHints) -> Result<Found, DecodeError> {
        if !hints.accepts_qr() {
            return Err(DecodeError::NotFound);
        }

        let (width, height) = (image.width(), image.height());
        let also_inverted = hints.also_inverted;

        let result = catch_unwind(AssertUnwindSafe(|| {
            match decode_plane(&image.to_luma(), width, height) {
                Err(DecodeError::NotFound) if also_inverted => {
                    decode_plane(image.inverted().as_bytes(), width, height)
                }
                other => other,
            }
        }));

        result.unwrap_or_else(|payload| Err(DecodeError::Fault(panic_message(payload.as_ref()))))
    }
}
