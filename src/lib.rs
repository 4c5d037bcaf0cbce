//! qr_ec_probe - QR payload and error-correction level probing
//!
//! Takes an image, runs up to three decode attempts against a QR decoding
//! library (original pixels, then the original with inverted polarity
//! allowed, then a contrast-boosted grayscale variant with inverted polarity
//! allowed), and reports the payload, the symbol's error-correction level
//! and which attempt won.
//!
//! Decoding runs on a dedicated worker thread behind an async
//! [`RequestChannel`] with a per-request timeout.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Async request/response boundary to the decode worker
pub mod channel;
/// Runtime settings and environment overrides
pub mod config;
/// Decode capability, backends, attempt sequencing and metadata
pub mod decoder;
/// Error types
pub mod error;
/// Image ingestion from files, bytes and base64
pub mod ingest;
/// Core data structures (ImageBuffer, ECLevel, AnalysisOutcome)
pub mod models;
/// Dataset helpers for the CLI and benches
pub mod tools;
/// Image preprocessing (grayscale, contrast enhancement)
pub mod utils;
/// Decode worker lifecycle and request execution
pub mod worker;

pub use channel::RequestChannel;
pub use config::ProbeConfig;
pub use decoder::DecoderSource;
pub use ingest::ImageSource;
pub use models::{AnalysisOutcome, BarcodeFormat, ECLevel, ErrorKind, ImageBuffer, PixelLayout};
pub use utils::enhance::enhance;
pub use worker::WorkerState;

/// Analyze a single image on a fresh worker.
///
/// Convenient for one-off calls; reuse a [`RequestChannel`] when analyzing
/// many images so the decoder is only loaded once.
pub async fn analyze_image(source: impl Into<ImageSource>, config: ProbeConfig) -> AnalysisOutcome {
    let channel = match RequestChannel::spawn(config) {
        Ok(channel) => channel,
        Err(err) => {
            return AnalysisOutcome::failed(ErrorKind::InternalFault(format!(
                "could not start decode worker: {err}"
            )));
        }
    };
    let outcome = channel.analyze(source.into()).await;
    channel.shutdown();
    outcome
}
