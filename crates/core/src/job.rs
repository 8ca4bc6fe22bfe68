//! Job lifecycle classification and normalized outcomes.
//!
//! Backends report their own lifecycle vocabulary; they translate it into a
//! [`RunState`] and [`classify`] reduces that to the four-state
//! [`JobStatus`] the rest of the relay works with.

use serde::Serialize;

use crate::error::JobError;

/// Fallback message when a backend fails a job without saying why.
pub const GENERIC_FAILURE_MESSAGE: &str = "Job failed";

// ---------------------------------------------------------------------------
// Backend-neutral run state
// ---------------------------------------------------------------------------

/// Coarse lifecycle phase reported by a job backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Accepted but not yet executing (queued, blocked, waiting for retry).
    Pending,
    /// Executing or tearing down.
    Running,
    /// Finished; consult the result flag.
    Terminated,
    /// Finished without ever producing a result (skipped, internal error).
    Aborted,
}

/// A single status observation from a job backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub lifecycle: Lifecycle,
    /// `Some(true)` when the backend marked the result successful. Only
    /// meaningful once the lifecycle is terminal.
    pub succeeded: Option<bool>,
    /// Backend-supplied annotation, used as the failure message.
    pub message: Option<String>,
}

impl RunState {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            succeeded: None,
            message: None,
        }
    }

    pub fn with_result(mut self, succeeded: bool) -> Self {
        self.succeeded = Some(succeeded);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Caller-facing job status.
///
/// `Pending` and `Running` both mean "poll again later". The two terminal
/// variants are absorbing: see [`JobStatus::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    TerminatedSuccess,
    TerminatedFailure(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TerminatedSuccess | Self::TerminatedFailure(_))
    }

    /// Combine a previously observed status with a fresh observation.
    ///
    /// Once terminal, the earlier status wins.
    pub fn advance(self, next: JobStatus) -> JobStatus {
        if self.is_terminal() {
            self
        } else {
            next
        }
    }

    /// Lowercase label used in logs and API payloads.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::TerminatedSuccess => "succeeded",
            Self::TerminatedFailure(_) => "failed",
        }
    }
}

/// Reduce a backend observation to a [`JobStatus`].
///
/// A terminated run without an explicit success flag counts as failed.
pub fn classify(state: &RunState) -> JobStatus {
    match state.lifecycle {
        Lifecycle::Pending => JobStatus::Pending,
        Lifecycle::Running => JobStatus::Running,
        Lifecycle::Terminated if state.succeeded == Some(true) => JobStatus::TerminatedSuccess,
        Lifecycle::Terminated | Lifecycle::Aborted => JobStatus::TerminatedFailure(
            state
                .message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string(),
        ),
    }
}

// ---------------------------------------------------------------------------
// NormalizedResult
// ---------------------------------------------------------------------------

/// The only result shape handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NormalizedResult {
    /// Recipe text exactly as the model produced it.
    Recipes(String),
    /// The job finished but reported an error.
    Failure(String),
}

impl NormalizedResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Recipes(_))
    }

    /// The recipe text, or [`JobError::BackendFailure`] with the job's message.
    pub fn into_recipes(self) -> Result<String, JobError> {
        match self {
            Self::Recipes(text) => Ok(text),
            Self::Failure(message) => Err(JobError::BackendFailure(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_result_converts_to_backend_failure() {
        assert_eq!(
            NormalizedResult::Recipes("Stew".into()).into_recipes(),
            Ok("Stew".to_string())
        );
        assert_eq!(
            NormalizedResult::Failure("OOM".into()).into_recipes(),
            Err(JobError::BackendFailure("OOM".into()))
        );
    }

    #[test]
    fn pending_and_running_lifecycles_are_not_terminal() {
        assert_eq!(classify(&RunState::new(Lifecycle::Pending)), JobStatus::Pending);
        assert_eq!(classify(&RunState::new(Lifecycle::Running)), JobStatus::Running);
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn terminated_success_is_classified_as_success() {
        let state = RunState::new(Lifecycle::Terminated).with_result(true);
        assert_eq!(classify(&state), JobStatus::TerminatedSuccess);
    }

    #[test]
    fn terminated_failure_uses_backend_message() {
        let state = RunState::new(Lifecycle::Terminated)
            .with_result(false)
            .with_message("OOM");
        assert_eq!(classify(&state), JobStatus::TerminatedFailure("OOM".into()));
    }

    #[test]
    fn failure_without_message_uses_fallback() {
        let state = RunState::new(Lifecycle::Terminated)
            .with_result(false)
            .with_message("   ");
        assert_eq!(
            classify(&state),
            JobStatus::TerminatedFailure(GENERIC_FAILURE_MESSAGE.into())
        );
    }

    #[test]
    fn aborted_runs_fail_even_if_flagged_successful() {
        let state = RunState::new(Lifecycle::Aborted).with_result(true);
        assert!(matches!(classify(&state), JobStatus::TerminatedFailure(_)));
    }

    #[test]
    fn terminal_status_never_reverts() {
        let done = JobStatus::TerminatedFailure("OOM".into());
        assert_eq!(done.clone().advance(JobStatus::Running), done);
        assert_eq!(
            JobStatus::Pending.advance(JobStatus::Running),
            JobStatus::Running
        );
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(JobStatus::TerminatedFailure("OOM".into())).unwrap();
        assert_eq!(json["state"], "terminated_failure");
        assert_eq!(json["message"], "OOM");
    }
}
