//! Remote job protocol: submit, poll, extract.
//!
//! [`RemoteJobs`] drives any [`JobBackend`] through the submit -> poll ->
//! extract sequence. Nothing here retries: every transport or decoding
//! failure goes straight back to the caller, who decides whether to poll
//! again.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::envelope::extract_output;
use crate::error::JobError;
use crate::job::{classify, JobStatus, NormalizedResult, RunState};
use crate::types::{InputRef, JobHandle};

/// Error type returned by backend implementations.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// A service that runs recipe jobs out of process.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Start one job for `input` and return its handle.
    async fn start(&self, input: &InputRef) -> Result<JobHandle, BackendError>;

    /// Report the current state of a job.
    async fn get_status(&self, handle: &JobHandle) -> Result<RunState, BackendError>;

    /// Fetch the raw, still-encoded output of a finished job.
    async fn get_output(&self, handle: &JobHandle) -> Result<String, BackendError>;

    /// Whether `handle` is well formed for this backend. Malformed handles
    /// are rejected before any request is made.
    fn accepts_handle(&self, _handle: &JobHandle) -> bool {
        true
    }
}

/// Result of [`RemoteJobs::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Not finished; poll again later.
    Running(JobStatus),
    /// Finished, successfully or not.
    Done(NormalizedResult),
}

/// Bounds for [`RemoteJobs::await_terminal`].
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Delay between consecutive polls.
    pub interval: Duration,
    /// Give up after this long. `None` waits until cancelled.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// Number of terminal statuses [`RemoteJobs`] remembers by default.
pub const DEFAULT_LATCH_CAPACITY: usize = 4096;

/// Terminal statuses keyed by handle, oldest evicted first once full.
struct TerminalLatch {
    statuses: HashMap<JobHandle, JobStatus>,
    order: VecDeque<JobHandle>,
    capacity: usize,
}

impl TerminalLatch {
    fn new(capacity: usize) -> Self {
        Self {
            statuses: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, handle: &JobHandle) -> Option<&JobStatus> {
        self.statuses.get(handle)
    }

    /// Record `status` unless one is already latched; return the latched one.
    fn latch(&mut self, handle: &JobHandle, status: JobStatus) -> JobStatus {
        if let Some(existing) = self.statuses.get(handle) {
            return existing.clone();
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.statuses.remove(&oldest);
            }
        }
        self.order.push_back(handle.clone());
        self.statuses.insert(handle.clone(), status.clone());
        status
    }

    fn len(&self) -> usize {
        self.statuses.len()
    }
}

/// Client side of the remote job protocol.
///
/// The first terminal status seen for a handle is latched, so later polls
/// return it without another round trip and can never regress. The latch
/// holds at most `DEFAULT_LATCH_CAPACITY` handles (see
/// [`RemoteJobs::with_latch_capacity`]); an evicted handle is queried
/// again from the backend.
pub struct RemoteJobs {
    backend: Arc<dyn JobBackend>,
    terminal: RwLock<TerminalLatch>,
}

impl RemoteJobs {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self::with_latch_capacity(backend, DEFAULT_LATCH_CAPACITY)
    }

    pub fn with_latch_capacity(backend: Arc<dyn JobBackend>, capacity: usize) -> Self {
        Self {
            backend,
            terminal: RwLock::new(TerminalLatch::new(capacity)),
        }
    }

    /// Number of handles whose terminal status is currently latched.
    pub async fn latched(&self) -> usize {
        self.terminal.read().await.len()
    }

    /// Start a job. A second call with the same input starts a second job.
    pub async fn submit(&self, input: &InputRef) -> Result<JobHandle, JobError> {
        let handle = self
            .backend
            .start(input)
            .await
            .map_err(|e| JobError::Submission(e.to_string()))?;

        tracing::info!(run_id = %handle, "Recipe job submitted");
        Ok(handle)
    }

    fn ensure_known(&self, handle: &JobHandle) -> Result<(), JobError> {
        if self.backend.accepts_handle(handle) {
            Ok(())
        } else {
            Err(JobError::UnknownHandle(handle.to_string()))
        }
    }

    /// Query the backend once and classify the answer.
    pub async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, JobError> {
        self.ensure_known(handle)?;
        if let Some(status) = self.terminal.read().await.get(handle) {
            return Ok(status.clone());
        }

        let state = self
            .backend
            .get_status(handle)
            .await
            .map_err(|e| JobError::Poll(e.to_string()))?;
        let status = classify(&state);

        if status.is_terminal() {
            let status = self.terminal.write().await.latch(handle, status);
            tracing::info!(run_id = %handle, status = status.label(), "Recipe job finished");
            return Ok(status);
        }

        tracing::debug!(run_id = %handle, status = status.label(), "Recipe job still running");
        Ok(status)
    }

    /// Fetch and unwrap the output of a successfully terminated job.
    ///
    /// Pure with respect to the stored output: repeated calls return the
    /// same result as long as the backend serves the same bytes.
    pub async fn extract(&self, handle: &JobHandle) -> Result<NormalizedResult, JobError> {
        self.ensure_known(handle)?;
        let raw = self
            .backend
            .get_output(handle)
            .await
            .map_err(|e| JobError::Fetch(e.to_string()))?;

        extract_output(&raw).inspect_err(|e| {
            tracing::warn!(run_id = %handle, error = %e, "Could not read job output");
        })
    }

    /// Poll once and, when the job has finished, produce its result.
    pub async fn check(&self, handle: &JobHandle) -> Result<CheckOutcome, JobError> {
        match self.poll(handle).await? {
            JobStatus::TerminatedSuccess => Ok(CheckOutcome::Done(self.extract(handle).await?)),
            JobStatus::TerminatedFailure(message) => {
                Ok(CheckOutcome::Done(NormalizedResult::Failure(message)))
            }
            running => Ok(CheckOutcome::Running(running)),
        }
    }

    /// Poll until the job is terminal, the timeout elapses, or `cancel` fires.
    pub async fn await_terminal(
        &self,
        handle: &JobHandle,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<JobStatus, JobError> {
        let deadline = options.timeout.map(|t| Instant::now() + t);

        loop {
            let status = self.poll(handle).await?;
            if status.is_terminal() {
                return Ok(status);
            }

            let expired = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => return Err(JobError::Cancelled),
                _ = expired => {
                    tracing::warn!(run_id = %handle, "Gave up waiting for recipe job");
                    return Err(JobError::DeadlineExceeded);
                }
                _ = tokio::time::sleep(options.interval) => {}
            }
        }
    }

    /// Wait for the job and return its recipe text.
    ///
    /// A job that finished with an error yields [`JobError::BackendFailure`].
    pub async fn wait_for_recipes(
        &self,
        handle: &JobHandle,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<String, JobError> {
        let result = match self.await_terminal(handle, options, cancel).await? {
            JobStatus::TerminatedFailure(message) => NormalizedResult::Failure(message),
            _ => self.extract(handle).await?,
        };
        result.into_recipes()
    }
}
