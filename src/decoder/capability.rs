use crate::models::{BarcodeFormat, ImageBuffer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Decoder configuration for one attempt.
///
/// Constructed once per attempt and never mutated; the `with_*` methods
/// return a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeHints {
    /// Spend more time looking for a symbol
    pub try_harder: bool,
    /// Also try the photometric negative of the image
    pub also_inverted: bool,
    /// Symbologies the decoder may report
    pub possible_formats: HashSet<BarcodeFormat>,
    /// Character set used to interpret byte segments
    pub character_set: String,
}

impl DecodeHints {
    /// QR-only, exhaustive, UTF-8, normal polarity
    pub fn qr() -> Self {
        Self {
            try_harder: true,
            also_inverted: false,
            possible_formats: HashSet::from([BarcodeFormat::QrCode]),
            character_set: "UTF-8".to_string(),
        }
    }

    /// Same hints with `also_inverted` set
    pub fn with_also_inverted(&self, also_inverted: bool) -> Self {
        Self {
            also_inverted,
            ..self.clone()
        }
    }

    /// Whether QR symbols are accepted
    pub fn accepts_qr(&self) -> bool {
        self.possible_formats.contains(&BarcodeFormat::QrCode)
    }
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self::qr()
    }
}

/// Key in a decode result's metadata table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKey {
    /// Error correction level of the symbol
    ErrorCorrectionLevel,
    /// Symbol version
    SymbolVersion,
    /// Data mask pattern
    MaskPattern,
    /// ISO/IEC 15424 symbology identifier
    SymbologyIdentifier,
    /// Anything a backend reports that has no dedicated key
    Other(String),
}

/// Value in a decode result's metadata table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Text(s) => f.write_str(s),
            MetadataValue::Integer(v) => write!(f, "{v}"),
            MetadataValue::Bytes(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Metadata table, ordered by key
pub type Metadata = BTreeMap<MetadataKey, MetadataValue>;

/// A decoded symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    /// Decoded text
    pub text: String,
    /// Backend-reported metadata
    pub metadata: Metadata,
}

/// Outcome of running the decode attempt sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A symbol was decoded
    Found(Found),
    /// No attempt found a symbol
    NotFound,
}

/// Why a single decode call did not return a symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No symbol was recognized
    NotFound,
    /// The backend failed internally (including panics)
    Fault(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NotFound => f.write_str("no symbol found"),
            DecodeError::Fault(msg) => write!(f, "decoder fault: {msg}"),
        }
    }
}

/// A loaded QR decoding library.
///
/// Implementations binarize the image themselves; callers only choose the
/// image variant and the hints.
pub trait DecodeCapability: Send {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Decode one symbol from `image`
    fn decode(&self, image: &ImageBuffer, hints: &DecodeHints) -> Result<Found, DecodeError>;
}

impl<T: DecodeCapability + ?Sized> DecodeCapability for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode(&self, image: &ImageBuffer, hints: &DecodeHints) -> Result<Found, DecodeError> {
        (**self).decode(image, hints)
    }
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
