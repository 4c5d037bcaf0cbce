//! Ordered decode attempts, cheapest first.
//!
//! 1. original image, normal polarity
//! 2. original image, also inverted
//! 3. contrast-enhanced copy, also inverted
//!
//! The first attempt that finds a symbol wins. Attempts run one after the
//! other and none is retried, so the reported attempt index is stable for a
//! given image and backend.

use super::capability::{DecodeCapability, DecodeError, DecodeHints, DecodeResult};
use crate::models::ImageBuffer;
use crate::utils::enhance::enhance_with_threshold;
use crate::utils::grayscale::PARALLEL_THRESHOLD_PX;

/// Which image an attempt decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVariant {
    /// The image as submitted
    Original,
    /// Output of [`crate::utils::enhance::enhance`] on the original
    Enhanced,
}

/// One entry of the attempt plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeAttempt {
    /// 1-based position
    pub index: u8,
    /// Image variant to decode
    pub variant: ImageVariant,
    /// Hints for this attempt
    pub hints: DecodeHints,
}

/// The fixed attempt plan
pub fn attempt_plan() -> [DecodeAttempt; 3] {
    let base = DecodeHints::qr();
    [
        DecodeAttempt {
            index: 1,
            variant: ImageVariant::Original,
            hints: base.clone(),
        },
        DecodeAttempt {
            index: 2,
            variant: ImageVariant::Original,
            hints: base.with_also_inverted(true),
        },
        DecodeAttempt {
            index: 3,
            variant: ImageVariant::Enhanced,
            hints: base.with_also_inverted(true),
        },
    ]
}

/// What the sequence produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceOutcome {
    /// Decoded symbol or `NotFound`
    pub result: DecodeResult,
    /// Index of the winning attempt; `None` when nothing was found
    pub attempt_index: Option<u8>,
}

/// Runs [`attempt_plan`] against a capability
#[derive(Debug, Clone)]
pub struct DecodeStrategySequencer {
    attempts: [DecodeAttempt; 3],
    parallel_threshold_px: usize,
}

impl DecodeStrategySequencer {
    /// Sequencer with the default plan
    pub fn new() -> Self {
        Self::with_parallel_threshold(PARALLEL_THRESHOLD_PX)
    }

    /// Sequencer whose enhancement step goes row-parallel above `px` pixels
    pub fn with_parallel_threshold(px: usize) -> Self {
        Self {
            attempts: attempt_plan(),
            parallel_threshold_px: px,
        }
    }

    /// The plan this sequencer runs
    pub fn attempts(&self) -> &[DecodeAttempt] {
        &self.attempts
    }

    /// Run attempts in order until one finds a symbol.
    ///
    /// Decoder faults count as "not found" for that attempt. The original
    /// buffer is only ever borrowed immutably; the enhanced variant is a new
    /// buffer built on first use.
    pub fn decode(&self, original: &ImageBuffer, decoder: &dyn DecodeCapability) -> SequenceOutcome {
        let mut enhanced: Option<ImageBuffer> = None;

        for attempt in &self.attempts {
            let image: &ImageBuffer = match attempt.variant {
                ImageVariant::Original => original,
                ImageVariant::Enhanced => enhanced.get_or_insert_with(|| {
                    enhance_with_threshold(original, self.parallel_threshold_px)
                }),
            };

            match decoder.decode(image, &attempt.hints) {
                Ok(found) => {
                    tracing::debug!(
                        attempt = attempt.index,
                        variant = ?attempt.variant,
                        inverted = attempt.hints.also_inverted,
                        backend = decoder.name(),
                        "decode attempt succeeded"
                    );
                    return SequenceOutcome {
                        result: DecodeResult::Found(found),
                        attempt_index: Some(attempt.index),
                    };
                }
                Err(DecodeError::NotFound) => {
                    tracing::debug!(
                        attempt = attempt.index,
                        variant = ?attempt.variant,
                        inverted = attempt.hints.also_inverted,
                        "decode attempt found nothing"
                    );
                }
                Err(DecodeError::Fault(reason)) => {
                    tracing::debug!(
                        attempt = attempt.index,
                        variant = ?attempt.variant,
                        %reason,
                        "decode attempt faulted, treating as not found"
                    );
                }
            }
        }

        SequenceOutcome {
            result: DecodeResult::NotFound,
            attempt_index: None,
        }
    }
}

impl Default for DecodeStrategySequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::capability::{Found, Metadata};
    use std::sync::Mutex;

    /// Records every call and answers from a script keyed by attempt order
    struct Scripted {
        answers: Vec<Result<Found, DecodeError>>,
        calls: Mutex<Vec<(Vec<u8>, bool)>>,
    }

    impl Scripted {
        fn new(answers: Vec<Result<Found, DecodeError>>) -> Self {
            Self {
                answers,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl DecodeCapability for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn decode(&self, image: &ImageBuffer, hints: &DecodeHints) -> Result<Found, DecodeError> {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.len();
            calls.push((image.as_bytes().to_vec(), hints.also_inverted));
            self.answers.get(n).cloned().unwrap_or(Err(DecodeError::NotFound))
        }
    }

    fn found(text: &str) -> Result<Found, DecodeError> {
        Ok(Found {
            text: text.into(),
            metadata: Metadata::new(),
        })
    }

    fn sample() -> ImageBuffer {
        ImageBuffer::from_luma(2, 1, vec![120, 140]).unwrap()
    }

    #[test]
    fn test_plan_order() {
        let plan = attempt_plan();
        assert_eq!(plan.iter().map(|a| a.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(!plan[0].hints.also_inverted);
        assert!(plan[1].hints.also_inverted);
        assert!(plan[2].hints.also_inverted);
        assert_eq!(plan[2].variant, ImageVariant::Enhanced);
        assert!(plan.iter().all(|a| a.hints.try_harder && a.hints.accepts_qr()));

        // every constructor runs the same fixed plan
        assert_eq!(DecodeStrategySequencer::new().attempts(), &plan[..]);
        assert_eq!(
            DecodeStrategySequencer::with_parallel_threshold(0).attempts(),
            &plan[..]
        );
    }

    #[test]
    fn test_first_success_stops() {
        let decoder = Scripted::new(vec![found("hello")]);
        let outcome = DecodeStrategySequencer::new().decode(&sample(), &decoder);
        assert_eq!(outcome.attempt_index, Some(1));
        assert_eq!(decoder.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_second_attempt_is_inverted_original() {
        let decoder = Scripted::new(vec![Err(DecodeError::NotFound), found("neg")]);
        let outcome = DecodeStrategySequencer::new().decode(&sample(), &decoder);
        assert_eq!(outcome.attempt_index, Some(2));
        let calls = decoder.calls.lock().unwrap();
        assert_eq!(calls[1], (vec![120, 140], true));
    }

    #[test]
    fn test_third_attempt_uses_enhanced_copy() {
        let decoder = Scripted::new(vec![
            Err(DecodeError::NotFound),
            Err(DecodeError::Fault("boom".into())),
            found("faint"),
        ]);
        let original = sample();
        let outcome = DecodeStrategySequencer::new().decode(&original, &decoder);
        assert_eq!(outcome.attempt_index, Some(3));
        let calls = decoder.calls.lock().unwrap();
        assert_eq!(calls[2].0, crate::utils::enhance::enhance(&original).as_bytes());
        assert_eq!(original.as_bytes(), &[120, 140]);
    }

    #[test]
    fn test_all_fail_has_no_index() {
        let decoder = Scripted::new(vec![
            Err(DecodeError::NotFound),
            Err(DecodeError::NotFound),
            Err(DecodeError::Fault("bad".into())),
        ]);
        let outcome = DecodeStrategySequencer::new().decode(&sample(), &decoder);
        assert_eq!(outcome.result, DecodeResult::NotFound);
        assert_eq!(outcome.attempt_index, None);
        assert_eq!(decoder.calls.lock().unwrap().len(), 3);
    }
}
