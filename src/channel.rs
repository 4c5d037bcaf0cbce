//! Async request/response boundary between the host and the decode worker.
//!
//! ```text
//! analyze() --WorkerRequest{id}--> [decode thread] --WorkerResponse{id}--> dispatcher
//!     ^                                                                       |
//!     +-------------------- oneshot (PendingRequest) <------------------------+
//! ```
//!
//! Each request is registered in the pending table before it is handed to the
//! worker. Whichever comes first, the worker's response or the timeout,
//! removes the entry; the other path finds nothing and does nothing. A
//! response for an id that is no longer pending is dropped.
//!
//! Only one request is in flight at a time: concurrent `analyze` calls queue
//! on an async gate and run in turn.

use crate::config::ProbeConfig;
use crate::decoder::{CapabilityLoader, DecodeStrategySequencer, loader};
use crate::ingest::ImageSource;
use crate::models::{AnalysisOutcome, ErrorKind, ImageBuffer};
use crate::worker::{DecodeWorker, RequestId, WorkerRequest, WorkerResponse, WorkerState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};

/// A request waiting for its outcome
struct PendingRequest {
    submitted_at: Instant,
    resolve: oneshot::Sender<AnalysisOutcome>,
}

type PendingTable = Arc<Mutex<HashMap<RequestId, PendingRequest>>>;

fn lock(table: &PendingTable) -> MutexGuard<'_, HashMap<RequestId, PendingRequest>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Host-facing handle to a decode worker
pub struct RequestChannel {
    next_id: AtomicU64,
    pending: PendingTable,
    requests: Mutex<Option<mpsc::UnboundedSender<WorkerRequest>>>,
    gate: tokio::sync::Mutex<()>,
    state: watch::Receiver<WorkerState>,
    timeout: Duration,
}

impl RequestChannel {
    /// Start a worker thread that loads the configured decoder.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: ProbeConfig) -> std::io::Result<Self> {
        let loader = loader::loader_for(config.decoder_source);
        Self::spawn_with_loader(config, loader)
    }

    /// Start a worker thread that loads its capability with `loader`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_with_loader(
        config: ProbeConfig,
        loader: CapabilityLoader,
    ) -> std::io::Result<Self> {
        let worker = DecodeWorker::new(DecodeStrategySequencer::with_parallel_threshold(
            config.parallel_threshold_px,
        ));
        let state = worker.subscribe();

        let (request_tx, request_rx) = mpsc::unbounded_channel::<WorkerRequest>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<WorkerResponse>();

        std::thread::Builder::new()
            .name("qr-decode-worker".into())
            .spawn(move || worker.run(loader, request_rx, response_tx))?;

        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(dispatch(response_rx, Arc::clone(&pending)));

        Ok(Self {
            next_id: AtomicU64::new(1),
            pending,
            requests: Mutex::new(Some(request_tx)),
            gate: tokio::sync::Mutex::new(()),
            state,
            timeout: config.timeout,
        })
    }

    /// Current worker lifecycle state
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Whether the decoder is loaded and usable
    pub fn is_ready(&self) -> bool {
        self.state() == WorkerState::Ready
    }

    /// Wait until loading has finished; returns `Ready` or `LoadFailed`
    pub async fn wait_until_settled(&self) -> WorkerState {
        let mut state = self.state.clone();
        match state.wait_for(WorkerState::is_settled).await {
            Ok(settled) => *settled,
            // worker thread gone before settling
            Err(_) => WorkerState::LoadFailed,
        }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requests registered and not yet resolved
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Stop accepting requests. The worker exits once its queue is drained.
    pub fn shutdown(&self) {
        let sender = self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            tracing::debug!("request channel shut down");
        }
    }

    /// Load `source` and analyze it. Never fails; problems are reported in
    /// the outcome.
    pub async fn analyze(&self, source: ImageSource) -> AnalysisOutcome {
        match source.load() {
            Ok(image) => self.submit(image).await,
            Err(err) => {
                tracing::debug!(%err, "image could not be ingested");
                AnalysisOutcome::failed(ErrorKind::InvalidImage(err.to_string()))
            }
        }
    }

    /// Hand `image` to the worker and wait for its outcome or the timeout,
    /// whichever comes first. Resolves exactly once.
    pub async fn submit(&self, image: ImageBuffer) -> AnalysisOutcome {
        let _turn = self.gate.lock().await;

        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (resolve, mut outcome_rx) = oneshot::channel();
        lock(&self.pending).insert(
            id,
            PendingRequest {
                submitted_at: Instant::now(),
                resolve,
            },
        );

        let sent = {
            let requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
            requests
                .as_ref()
                .is_some_and(|tx| tx.send(WorkerRequest { id, image }).is_ok())
        };
        if !sent {
            lock(&self.pending).remove(&id);
            return AnalysisOutcome::failed(ErrorKind::InternalFault(
                "decode worker is not running".into(),
            ));
        }

        match tokio::time::timeout(self.timeout, &mut outcome_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => worker_gone(),
            Err(_) => {
                let expired = lock(&self.pending).remove(&id);
                match expired {
                    Some(request) => {
                        tracing::info!(
                            request = %id,
                            waited_ms = request.submitted_at.elapsed().as_millis() as u64,
                            "decode request timed out"
                        );
                        AnalysisOutcome::failed(ErrorKind::Timeout)
                    }
                    // the response claimed the entry first and is on its way
                    None => outcome_rx.await.unwrap_or_else(|_| worker_gone()),
                }
            }
        }
    }
}

fn worker_gone() -> AnalysisOutcome {
    AnalysisOutcome::failed(ErrorKind::InternalFault(
        "decode worker dropped the request".into(),
    ))
}

async fn dispatch(mut responses: mpsc::UnboundedReceiver<WorkerResponse>, pending: PendingTable) {
    while let Some(WorkerResponse { id, outcome }) = responses.recv().await {
        let entry = lock(&pending).remove(&id);
        match entry {
            Some(request) => {
                tracing::debug!(
                    request = %id,
                    success = outcome.success,
                    elapsed_ms = request.submitted_at.elapsed().as_millis() as u64,
                    "delivering outcome"
                );
                // receiver may have been dropped with its analyze() future
                let _ = request.resolve.send(outcome);
            }
            None => tracing::debug!(request = %id, "discarding late response"),
        }
    }
}
