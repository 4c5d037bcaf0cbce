use super::ECLevel;
use serde::{Serialize, Serializer};
use std::fmt;

/// Symbology reported in every outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BarcodeFormat {
    /// Model 2 QR code
    #[default]
    QrCode,
}

impl BarcodeFormat {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            BarcodeFormat::QrCode => "QR_CODE",
        }
    }
}

impl Serialize for BarcodeFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Why an analysis did not produce a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The decode capability could not be loaded; permanent for this worker
    LibraryUnavailable,
    /// Every attempt ran and none found a symbol
    NotFound,
    /// No response arrived within the channel's timeout
    Timeout,
    /// Something unexpected failed while preprocessing or decoding
    InternalFault(String),
    /// The image source could not be turned into pixels
    InvalidImage(String),
}

impl ErrorKind {
    /// Wire tag, without detail
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::LibraryUnavailable => "LibraryUnavailable",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::InternalFault(_) => "InternalFault",
            ErrorKind::InvalidImage(_) => "InvalidImage",
        }
    }

    /// Detail message for faults
    pub fn message(&self) -> Option<&str> {
        match self {
            ErrorKind::InternalFault(msg) | ErrorKind::InvalidImage(msg) => Some(msg),
            _ => None,
        }
    }

    /// "Try again" states that should not be surfaced as alarming errors
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::NotFound | ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => write!(f, "{}: {}", self.tag(), msg),
            None => f.write_str(self.tag()),
        }
    }
}

/// Result of one analysis, as delivered to the host.
///
/// Serializes to
/// `{success, data?, ecLevel?, format: "QR_CODE", attemptIndex?, error?, message?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    /// Whether a symbol was decoded
    pub success: bool,
    /// Decoded text
    pub data: Option<String>,
    /// Error correction level, when the decoder reported one
    pub ec_level: Option<ECLevel>,
    /// Always QR
    pub format: BarcodeFormat,
    /// 1-based index of the attempt that succeeded
    pub attempt_index: Option<u8>,
    /// Failure kind when `success` is false
    pub error: Option<ErrorKind>,
}

impl AnalysisOutcome {
    /// Successful decode
    pub fn found(data: String, ec_level: Option<ECLevel>, attempt_index: u8) -> Self {
        Self {
            success: true,
            data: Some(data),
            ec_level,
            format: BarcodeFormat::QrCode,
            attempt_index: Some(attempt_index),
            error: None,
        }
    }

    /// Failed analysis
    pub fn failed(error: ErrorKind) -> Self {
        Self {
            success: false,
            data: None,
            ec_level: None,
            format: BarcodeFormat::QrCode,
            attempt_index: None,
            error: Some(error),
        }
    }

    /// JSON wire form
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"format":"QR_CODE","error":"InternalFault"}"#.to_string()
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireOutcome<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ec_level: Option<ECLevel>,
    format: BarcodeFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempt_index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl Serialize for AnalysisOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireOutcome {
            success: self.success,
            data: self.data.as_deref(),
            ec_level: self.ec_level,
            format: self.format,
            attempt_index: self.attempt_index,
            error: self.error.as_ref().map(ErrorKind::tag),
            message: self.error.as_ref().and_then(ErrorKind::message),
        }
        .serialize(serializer)
    }
}
