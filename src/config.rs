use crate::decoder::DecoderSource;
use crate::utils::grayscale::PARALLEL_THRESHOLD_PX;
use std::time::Duration;

/// Default time the channel waits for the worker, per request
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_source(name: &str, default: DecoderSource) -> DecoderSource {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<DecoderSource>().ok())
        .unwrap_or(default)
}

/// Settings for a [`crate::RequestChannel`] and its worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// How long `analyze` waits for the worker before reporting `Timeout`
    pub timeout: Duration,
    /// Which decoding library the worker loads
    pub decoder_source: DecoderSource,
    /// Pixel count above which enhancement runs row-parallel
    pub parallel_threshold_px: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            decoder_source: DecoderSource::Auto,
            parallel_threshold_px: PARALLEL_THRESHOLD_PX,
        }
    }
}

impl ProbeConfig {
    /// Defaults overridden by `QR_PROBE_TIMEOUT_MS`, `QR_PROBE_DECODER` and
    /// `QR_PROBE_PARALLEL_PX`. Unparsable values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: Duration::from_millis(parse_env_u64(
                "QR_PROBE_TIMEOUT_MS",
                DEFAULT_TIMEOUT_MS,
            )),
            decoder_source: parse_env_source("QR_PROBE_DECODER", defaults.decoder_source),
            parallel_threshold_px: parse_env_usize(
                "QR_PROBE_PARALLEL_PX",
                defaults.parallel_threshold_px,
            ),
        }
    }

    /// Same config with another timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Same config with another decoder source
    pub fn with_decoder_source(mut self, source: DecoderSource) -> Self {
        self.decoder_source = source;
        self
    }
}
