//! Bundled decoder: rxing, a Rust port of ZXing.
//!
//! Supports every hint natively, including inverted decoding.

use super::capability::{
    DecodeCapability, DecodeError, DecodeHints, Found, Metadata, MetadataKey, MetadataValue,
    panic_message,
};
use crate::models::{BarcodeFormat, ImageBuffer};
use rxing::common::HybridBinarizer;
use rxing::{
    BinaryBitmap, Luma8LuminanceSource, MultiFormatReader, RXingResultMetadataType,
    RXingResultMetadataValue, Reader,
};
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// rxing-backed [`DecodeCapability`]
#[derive(Debug, Default, Clone, Copy)]
pub struct RxingDecoder;

impl RxingDecoder {
    /// Create the decoder
    pub fn new() -> Self {
        Self
    }
}

fn rxing_hints(hints: &DecodeHints) -> rxing::DecodeHints {
    let formats: HashSet<rxing::BarcodeFormat> = hints
        .possible_formats
        .iter()
        .map(|f| match f {
            BarcodeFormat::QrCode => rxing::BarcodeFormat::QR_CODE,
        })
        .collect();

    rxing::DecodeHints {
        TryHarder: Some(hints.try_harder),
        AlsoInverted: Some(hints.also_inverted),
        PossibleFormats: Some(formats),
        CharacterSet: Some(hints.character_set.clone()),
        ..rxing::DecodeHints::default()
    }
}

/// The hint table `MultiFormatReader::decode_with_hints` takes
fn rxing_hint_dictionary(hints: &DecodeHints) -> rxing::DecodingHintDictionary {
    rxing_hints(hints).into()
}

fn convert_metadata<'a, I>(raw: I) -> Metadata
where
    I: IntoIterator<Item = (&'a RXingResultMetadataType, &'a RXingResultMetadataValue)>,
{
    raw.into_iter()
        .map(|(key, value)| {
            let key = match key {
                RXingResultMetadataType::ERROR_CORRECTION_LEVEL => {
                    MetadataKey::ErrorCorrectionLevel
                }
                other => MetadataKey::Other(format!("{other:?}")),
            };
            let value = match value {
                RXingResultMetadataValue::ErrorCorrectionLevel(level) => {
                    MetadataValue::Text(level.clone())
                }
                other => MetadataValue::Text(format!("{other:?}")),
            };
            (key, value)
        })
        .collect()
}

impl DecodeCapability for RxingDecoder {
    fn name(&self) -> &'static str {
        "rxing"
    }

    fn decode(&self, image: &ImageBuffer, hints: &DecodeHints) -> Result<Found, DecodeError> {
        let luma = image.to_luma();
        let (width, height) = (image.width() as u32, image.height() as u32);
        let hints = rxing_hint_dictionary(hints);

        let result = catch_unwind(AssertUnwindSafe(move || {
            let source = Luma8LuminanceSource::new(luma, width, height);
            let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
            let mut reader = MultiFormatReader::default();
            reader.decode_with_hints(&mut bitmap, &hints)
        }));

        match result {
            Err(payload) => Err(DecodeError::Fault(panic_message(payload.as_ref()))),
            Ok(Err(err)) => {
                tracing::trace!(?err, "rxing found no symbol");
                Err(DecodeError::NotFound)
            }
            Ok(Ok(decoded)) => Ok(Found {
                text: decoded.getText().to_string(),
                metadata: convert_metadata(decoded.getRXingResultMetadata().iter()),
            }),
        }
    }
}
