mod common;

use common::{blank, render, render_plain, to_rgba};
use qr_ec_probe::decoder::{CapabilityLoader, DecodeCapability, DecodeError, DecodeHints, Found};
use qr_ec_probe::error::LoadError;
use qr_ec_probe::{
    AnalysisOutcome, DecoderSource, ECLevel, ErrorKind, ImageBuffer, ImageSource, ProbeConfig,
    RequestChannel, WorkerState, analyze_image, enhance,
};
use qrcode::EcLevel;
use std::time::Duration;

const URL: &str = "https://example.com";

fn channel(source: DecoderSource) -> RequestChannel {
    RequestChannel::spawn(ProbeConfig::default().with_decoder_source(source))
        .expect("worker thread starts")
}

#[tokio::test]
async fn test_example_url_at_level_m_decodes_on_first_attempt() {
    let channel = channel(DecoderSource::Auto);
    let outcome = channel.submit(render_plain(URL, EcLevel::M)).await;

    assert_eq!(
        outcome,
        AnalysisOutcome::found(URL.to_string(), Some(ECLevel::M), 1)
    );
    let json: serde_json::Value = serde_json::from_str(&outcome.to_json()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "success": true,
            "data": URL,
            "ecLevel": "M",
            "format": "QR_CODE",
            "attemptIndex": 1
        })
    );
    assert!(channel.is_ready());
}

#[tokio::test]
async fn test_every_level_is_recovered_by_bundled_decoder() {
    let channel = channel(DecoderSource::Bundled);
    let cases = [
        (EcLevel::L, ECLevel::L),
        (EcLevel::M, ECLevel::M),
        (EcLevel::Q, ECLevel::Q),
        (EcLevel::H, ECLevel::H),
    ];
    for (encoded, expected) in cases {
        let outcome = channel.submit(render_plain("level probe", encoded)).await;
        assert!(outcome.success, "{:?}: {:?}", encoded, outcome.error);
        assert_eq!(outcome.ec_level, Some(expected));
        assert_eq!(outcome.data.as_deref(), Some("level probe"));
    }
}

#[tokio::test]
async fn test_every_level_is_recovered_by_fallback_decoder() {
    let channel = channel(DecoderSource::Fallback);
    for (encoded, expected) in [(EcLevel::L, ECLevel::L), (EcLevel::H, ECLevel::H)] {
        let outcome = channel.submit(render_plain(URL, encoded)).await;
        assert_eq!(outcome.ec_level, Some(expected));
        assert_eq!(outcome.attempt_index, Some(1));
    }
}

#[tokio::test]
async fn test_inverted_symbol_needs_inverted_hint() {
    let channel = channel(DecoderSource::Bundled);
    let inverted = render(URL, EcLevel::Q, 255, 0);
    let outcome = channel.submit(inverted).await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.attempt_index, Some(2));
    assert_eq!(outcome.ec_level, Some(ECLevel::Q));
}

#[tokio::test]
async fn test_low_contrast_symbol_needs_enhancement() {
    let channel = channel(DecoderSource::Bundled);
    let faint = render(URL, EcLevel::M, 110, 150);
    let outcome = channel.submit(faint).await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.attempt_index, Some(3));
    assert_eq!(outcome.data.as_deref(), Some(URL));
    assert_eq!(outcome.ec_level, Some(ECLevel::M));
}

#[tokio::test]
async fn test_low_contrast_symbol_with_fallback_decoder() {
    let channel = channel(DecoderSource::Fallback);
    let outcome = channel.submit(render(URL, EcLevel::M, 120, 140)).await;
    assert_eq!(outcome.attempt_index, Some(3));
    assert_eq!(outcome.data.as_deref(), Some(URL));
}

#[tokio::test]
async fn test_blank_image_is_not_found() {
    let channel = channel(DecoderSource::Auto);
    let outcome = channel.submit(blank()).await;

    assert_eq!(outcome, AnalysisOutcome::failed(ErrorKind::NotFound));
    assert_eq!(outcome.attempt_index, None);
    assert_eq!(outcome.ec_level, None);
    let json: serde_json::Value = serde_json::from_str(&outcome.to_json()).unwrap();
    assert_eq!(json["error"], "NotFound");
    assert_eq!(json.get("attemptIndex"), None);
}

#[tokio::test]
async fn test_rgba_input_decodes() {
    let channel = channel(DecoderSource::Auto);
    let outcome = channel
        .submit(to_rgba(&render_plain(URL, EcLevel::H)))
        .await;
    assert_eq!(outcome.ec_level, Some(ECLevel::H));
}

#[tokio::test]
async fn test_double_enhancement_restores_polarity() {
    let channel = channel(DecoderSource::Bundled);
    let twice = enhance(&enhance(&render_plain(URL, EcLevel::M)));
    let outcome = channel.submit(twice).await;
    assert_eq!(outcome.attempt_index, Some(1));
    assert_eq!(outcome.data.as_deref(), Some(URL));
}

#[tokio::test]
async fn test_analyze_image_accepts_encoded_png() {
    let image = render_plain(URL, EcLevel::L);
    let mut png = Vec::new();
    image
        .to_dynamic()
        .unwrap()
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .unwrap();

    let outcome = analyze_image(ImageSource::Bytes(png), ProbeConfig::default()).await;
    assert_eq!(outcome.data.as_deref(), Some(URL));
    assert_eq!(outcome.ec_level, Some(ECLevel::L));
}

/// Sleeps on one-pixel-wide images, answers immediately otherwise
struct SlowOnNarrow;

impl DecodeCapability for SlowOnNarrow {
    fn name(&self) -> &'static str {
        "slow-on-narrow"
    }

    fn decode(&self, image: &ImageBuffer, _: &DecodeHints) -> Result<Found, DecodeError> {
        if image.width() == 1 {
            std::thread::sleep(Duration::from_millis(500));
        }
        Ok(Found {
            text: format!("width {}", image.width()),
            metadata: Default::default(),
        })
    }
}

fn narrow(width: usize) -> ImageBuffer {
    ImageBuffer::from_luma(width, 1, vec![0; width]).unwrap()
}

#[tokio::test]
async fn test_timeout_resolves_once_and_late_response_is_dropped() {
    let loader: CapabilityLoader = Box::new(|| Ok(Box::new(SlowOnNarrow) as Box<dyn DecodeCapability>));
    let config = ProbeConfig::default().with_timeout(Duration::from_millis(350));
    let channel = RequestChannel::spawn_with_loader(config, loader).unwrap();
    assert_eq!(channel.wait_until_settled().await, WorkerState::Ready);

    let first = channel.submit(narrow(1)).await;
    assert_eq!(first, AnalysisOutcome::failed(ErrorKind::Timeout));
    assert_eq!(channel.pending_count(), 0);

    // the slow answer for the first request arrives while this one waits
    let second = channel.submit(narrow(2)).await;
    assert_eq!(second.data.as_deref(), Some("width 2"));
    assert_eq!(channel.pending_count(), 0);
}

#[tokio::test]
async fn test_unavailable_library_fails_every_request() {
    let loader: CapabilityLoader = Box::new(|| {
        Err(LoadError::SelfCheck {
            backend: "rxing",
            reason: "missing".into(),
        })
    });
    let channel = RequestChannel::spawn_with_loader(ProbeConfig::default(), loader).unwrap();
    for _ in 0..2 {
        let outcome = channel.submit(render_plain(URL, EcLevel::M)).await;
        assert_eq!(outcome, AnalysisOutcome::failed(ErrorKind::LibraryUnavailable));
    }
    assert_eq!(channel.state(), WorkerState::LoadFailed);
    assert!(!channel.is_ready());
}
