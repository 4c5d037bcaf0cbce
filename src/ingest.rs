//! Turning whatever the host holds into an [`ImageBuffer`].

use crate::error::IngestError;
use crate::models::ImageBuffer;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;
use std::path::PathBuf;

/// Where the pixels of a request come from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// An image file on disk
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...)
    Bytes(Vec<u8>),
    /// Base64 of encoded image bytes, optionally as a `data:` URI
    Base64(String),
    /// Already-decoded pixels
    Pixels(ImageBuffer),
}

impl ImageSource {
    /// Decode into pixels
    pub fn load(self) -> Result<ImageBuffer, IngestError> {
        match self {
            ImageSource::Path(path) => decode_bytes(&fs::read(path)?),
            ImageSource::Bytes(bytes) => decode_bytes(&bytes),
            ImageSource::Base64(text) => decode_bytes(&STANDARD.decode(strip_data_uri(&text))?),
            ImageSource::Pixels(image) => Ok(image),
        }
    }
}

impl From<ImageBuffer> for ImageSource {
    fn from(image: ImageBuffer) -> Self {
        ImageSource::Pixels(image)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

fn decode_bytes(bytes: &[u8]) -> Result<ImageBuffer, IngestError> {
    let img = image::load_from_memory(bytes)?;
    Ok(ImageBuffer::from_dynamic(img)?)
}

/// `data:image/png;base64,AAAA` -> `AAAA`; surrounding whitespace is dropped
fn strip_data_uri(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with("data:") {
        if let Some((_, payload)) = text.split_once(";base64,") {
            return payload;
        }
    }
    text
}
