use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with key {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Which JSON layer of a job output failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// The outer delivery envelope returned by the backend.
    Envelope,
    /// The JSON string nested inside the delivery envelope.
    Result,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Envelope => f.write_str("envelope"),
            Self::Result => f.write_str("result"),
        }
    }
}

/// Why a structurally valid output could not be reduced to a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractReason {
    /// The envelope carried no nested result string (or an empty one).
    MissingResult,
    /// The completion had an empty `choices` sequence.
    NoChoices,
    /// A key on the path to `choices[0].message.content` was absent.
    Shape,
}

impl fmt::Display for ExtractReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingResult => f.write_str("missing result"),
            Self::NoChoices => f.write_str("no choices"),
            Self::Shape => f.write_str("shape"),
        }
    }
}

/// Errors raised by the job submission / polling / extraction protocol.
///
/// None of these are retried internally. `BackendFailure` is the only
/// variant that describes a job outcome rather than a transport or decoding
/// fault; callers normally see it as [`NormalizedResult::Failure`] instead.
///
/// [`NormalizedResult::Failure`]: crate::job::NormalizedResult::Failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Job submission failed: {0}")]
    Submission(String),

    #[error("Job status query failed: {0}")]
    Poll(String),

    #[error("Job output fetch failed: {0}")]
    Fetch(String),

    /// The handle cannot name a job on this backend.
    #[error("No job with handle '{0}'")]
    UnknownHandle(String),

    #[error("Malformed job output ({0})")]
    Parse(ParseStage),

    #[error("Unexpected job output ({0})")]
    Extract(ExtractReason),

    #[error("A task is already registered under '{0}'")]
    DuplicateKey(String),

    #[error("Job reported failure: {0}")]
    BackendFailure(String),

    #[error("Wait for job was cancelled")]
    Cancelled,

    #[error("Job did not finish before the deadline")]
    DeadlineExceeded,
}

impl JobError {
    /// True for errors caused by a payload the backend produced but we
    /// could not read. These are shown to users as a generic message.
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Extract(_))
    }
}
