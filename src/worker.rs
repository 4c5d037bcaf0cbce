//! Decode worker: owns the decode capability and runs one request at a time.
//!
//! Lifecycle: `Uninitialized -> Loading -> Ready | LoadFailed`. Both end
//! states are terminal; there is no reload.

use crate::decoder::capability::panic_message;
use crate::decoder::{
    CapabilityLoader, DecodeCapability, DecodeResult, DecodeStrategySequencer, extract_ec_level,
};
use crate::models::{AnalysisOutcome, ErrorKind, ImageBuffer};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::sync::{mpsc, watch};

/// Lifecycle of a [`DecodeWorker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, load not started
    Uninitialized,
    /// Capability load in progress
    Loading,
    /// Capability loaded and self-checked
    Ready,
    /// No capability could be loaded
    LoadFailed,
}

impl WorkerState {
    /// Whether loading has finished, successfully or not
    pub fn is_settled(&self) -> bool {
        matches!(self, WorkerState::Ready | WorkerState::LoadFailed)
    }
}

/// Identity of one submitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Message from the channel to the worker
#[derive(Debug)]
pub struct WorkerRequest {
    /// Request identity, echoed in the response
    pub id: RequestId,
    /// Image to analyze, owned by the worker from here on
    pub image: ImageBuffer,
}

/// Message from the worker back to the channel
#[derive(Debug)]
pub struct WorkerResponse {
    /// Identity of the request this answers
    pub id: RequestId,
    /// Result of the analysis
    pub outcome: AnalysisOutcome,
}

/// Holds the decode capability and turns images into [`AnalysisOutcome`]s
pub struct DecodeWorker {
    capability: Option<Box<dyn DecodeCapability>>,
    sequencer: DecodeStrategySequencer,
    state: watch::Sender<WorkerState>,
}

impl DecodeWorker {
    /// New worker in `Uninitialized`
    pub fn new(sequencer: DecodeStrategySequencer) -> Self {
        let (state, _) = watch::channel(WorkerState::Uninitialized);
        Self {
            capability: None,
            sequencer,
            state,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Observe lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    fn transition(&self, next: WorkerState) {
        let prev = self.state.send_replace(next);
        tracing::debug!(from = ?prev, to = ?next, "decode worker state change");
    }

    /// Load the capability. Only the first call has any effect.
    pub fn load(&mut self, loader: CapabilityLoader) {
        if self.state() != WorkerState::Uninitialized {
            tracing::debug!(state = ?self.state(), "decode worker already loaded, ignoring");
            return;
        }
        self.transition(WorkerState::Loading);

        match catch_unwind(AssertUnwindSafe(loader)) {
            Ok(Ok(capability)) => {
                tracing::info!(backend = capability.name(), "decoder ready");
                self.capability = Some(capability);
                self.transition(WorkerState::Ready);
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, "QR decoding unavailable: decoder failed to load");
                self.transition(WorkerState::LoadFailed);
            }
            Err(payload) => {
                tracing::warn!(
                    panic = %panic_message(payload.as_ref()),
                    "QR decoding unavailable: decoder panicked while loading"
                );
                self.transition(WorkerState::LoadFailed);
            }
        }
    }

    /// Analyze one image.
    ///
    /// Never panics: faults inside preprocessing or decoding become
    /// `InternalFault`.
    pub fn execute(&self, image: &ImageBuffer) -> AnalysisOutcome {
        let capability = match (self.state(), self.capability.as_deref()) {
            (WorkerState::Ready, Some(capability)) => capability,
            (WorkerState::LoadFailed, _) => {
                return AnalysisOutcome::failed(ErrorKind::LibraryUnavailable);
            }
            (state, _) => {
                return AnalysisOutcome::failed(ErrorKind::InternalFault(format!(
                    "decoder not ready ({state:?})"
                )));
            }
        };

        let run = catch_unwind(AssertUnwindSafe(|| {
            self.sequencer.decode(image, capability)
        }));

        match run {
            Ok(sequence) => match (sequence.result, sequence.attempt_index) {
                (DecodeResult::Found(found), Some(index)) => {
                    let ec_level = extract_ec_level(&found.metadata);
                    if ec_level.is_none() {
                        tracing::debug!(attempt = index, "decoder reported no EC level");
                    }
                    AnalysisOutcome::found(found.text, ec_level, index)
                }
                (DecodeResult::Found(_), None) => AnalysisOutcome::failed(
                    ErrorKind::InternalFault("decode result without attempt index".into()),
                ),
                (DecodeResult::NotFound, _) => AnalysisOutcome::failed(ErrorKind::NotFound),
            },
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(%message, "decode request faulted");
                AnalysisOutcome::failed(ErrorKind::InternalFault(message))
            }
        }
    }

    /// Worker loop: load, then answer requests in arrival order until the
    /// request channel closes or nobody listens for responses.
    ///
    /// Requests that arrive while loading wait in the queue.
    pub fn run(
        mut self,
        loader: CapabilityLoader,
        mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
        responses: mpsc::UnboundedSender<WorkerResponse>,
    ) {
        self.load(loader);

        while let Some(WorkerRequest { id, image }) = requests.blocking_recv() {
            tracing::debug!(request = %id, width = image.width(), height = image.height(), "decoding");
            let outcome = self.execute(&image);
            if responses.send(WorkerResponse { id, outcome }).is_err() {
                break;
            }
        }
        tracing::debug!("decode worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{DecodeError, DecodeHints, Found, Metadata, MetadataKey, MetadataValue};
    use crate::error::LoadError;
    use crate::models::ECLevel;

    struct Fixed(Result<Found, DecodeError>);

    impl DecodeCapability for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn decode(&self, _: &ImageBuffer, _: &DecodeHints) -> Result<Found, DecodeError> {
            self.0.clone()
        }
    }

    struct Panics;

    impl DecodeCapability for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        fn decode(&self, _: &ImageBuffer, _: &DecodeHints) -> Result<Found, DecodeError> {
            panic!("decoder exploded")
        }
    }

    fn image() -> ImageBuffer {
        ImageBuffer::from_luma(4, 4, vec![200u8; 16]).unwrap()
    }

    fn ready(capability: impl DecodeCapability + 'static) -> DecodeWorker {
        let mut worker = DecodeWorker::new(DecodeStrategySequencer::new());
        worker.load(Box::new(move || Ok(Box::new(capability) as Box<dyn DecodeCapability>)));
        worker
    }

    #[test]
    fn test_lifecycle_ready() {
        let mut worker = DecodeWorker::new(DecodeStrategySequencer::new());
        assert_eq!(worker.state(), WorkerState::Uninitialized);
        worker.load(Box::new(|| {
            Ok(Box::new(Fixed(Err(DecodeError::NotFound))) as Box<dyn DecodeCapability>)
        }));
        assert_eq!(worker.state(), WorkerState::Ready);

        // second load is ignored
        worker.load(Box::new(|| Err(LoadError::NoBackend)));
        assert_eq!(worker.state(), WorkerState::Ready);
    }

    #[test]
    fn test_load_failure_is_terminal() {
        let mut worker = DecodeWorker::new(DecodeStrategySequencer::new());
        worker.load(Box::new(|| Err(LoadError::NoBackend)));
        assert_eq!(worker.state(), WorkerState::LoadFailed);
        assert_eq!(
            worker.execute(&image()),
            AnalysisOutcome::failed(ErrorKind::LibraryUnavailable)
        );
    }

    #[test]
    fn test_panicking_loader_fails_load() {
        let mut worker = DecodeWorker::new(DecodeStrategySequencer::new());
        worker.load(Box::new(|| -> Result<Box<dyn DecodeCapability>, LoadError> {
            panic!("missing symbols")
        }));
        assert_eq!(worker.state(), WorkerState::LoadFailed);
    }

    #[test]
    fn test_execute_before_load_is_not_ready() {
        let worker = DecodeWorker::new(DecodeStrategySequencer::new());
        let outcome = worker.execute(&image());
        assert!(matches!(outcome.error, Some(ErrorKind::InternalFault(_))));
    }

    #[test]
    fn test_found_with_ec_level() {
        let mut metadata = Metadata::new();
        metadata.insert(
            MetadataKey::ErrorCorrectionLevel,
            MetadataValue::Text("H".into()),
        );
        let worker = ready(Fixed(Ok(Found {
            text: "payload".into(),
            metadata,
        })));
        assert_eq!(
            worker.execute(&image()),
            AnalysisOutcome::found("payload".into(), Some(ECLevel::H), 1)
        );
    }

    #[test]
    fn test_found_without_ec_level_still_succeeds() {
        let worker = ready(Fixed(Ok(Found {
            text: "bare".into(),
            metadata: Metadata::new(),
        })));
        let outcome = worker.execute(&image());
        assert!(outcome.success);
        assert_eq!(outcome.ec_level, None);
    }

    #[test]
    fn test_not_found() {
        let worker = ready(Fixed(Err(DecodeError::NotFound)));
        assert_eq!(
            worker.execute(&image()),
            AnalysisOutcome::failed(ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_panic_inside_sequence_is_internal_fault() {
        let worker = ready(Panics);
        let outcome = worker.execute(&image());
        assert_eq!(
            outcome.error,
            Some(ErrorKind::InternalFault("decoder exploded".into()))
        );
    }

    #[test]
    fn test_state_is_observable() {
        let mut worker = DecodeWorker::new(DecodeStrategySequencer::new());
        let rx = worker.subscribe();
        worker.load(Box::new(|| Err(LoadError::NoBackend)));
        assert_eq!(*rx.borrow(), WorkerState::LoadFailed);
    }
}
