//! Layered job output envelopes.
//!
//! A finished notebook run delivers its output as JSON inside JSON:
//!
//! ```text
//! DeliveryEnvelope  {"notebook_output": {"result": "<string>"}}
//!   ResultEnvelope  {"status": "success" | "error", "message"?, "data"}
//!     completion    {"choices": [{"message": {"content": "<recipe>"}}]}
//! ```
//!
//! Each layer has its own type and its own failure, so a caller can tell
//! which unwrap step rejected a payload. [`extract_output`] runs all of
//! them left to right and fails closed on the first problem.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExtractReason, JobError, ParseStage};
use crate::job::NormalizedResult;

/// Message used when a job reports an error without any detail.
pub const GENERIC_JOB_ERROR: &str = "The recipe job reported an error";

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";

// ---------------------------------------------------------------------------
// Layer 1: delivery envelope
// ---------------------------------------------------------------------------

/// Outer wrapper returned by the job backend's output endpoint.
#[derive(Debug, Deserialize)]
pub struct DeliveryEnvelope {
    #[serde(default)]
    pub notebook_output: Option<NotebookOutput>,
}

/// Value the notebook passed to its exit call.
#[derive(Debug, Deserialize)]
pub struct NotebookOutput {
    #[serde(default)]
    pub result: Option<String>,
    /// Set by the backend when the exit value exceeded its size limit.
    #[serde(default)]
    pub truncated: bool,
}

impl DeliveryEnvelope {
    pub fn parse(raw: &str) -> Result<Self, JobError> {
        serde_json::from_str(raw).map_err(|_| JobError::Parse(ParseStage::Envelope))
    }

    /// Take the nested, still-encoded result string.
    pub fn into_result_text(self) -> Result<String, JobError> {
        let output = self
            .notebook_output
            .ok_or(JobError::Extract(ExtractReason::MissingResult))?;

        if output.truncated {
            tracing::warn!("Notebook output was truncated by the backend");
        }

        match output.result {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(JobError::Extract(ExtractReason::MissingResult)),
        }
    }
}

// ---------------------------------------------------------------------------
// Layer 2: result envelope
// ---------------------------------------------------------------------------

/// `{status, message?, data}` record written by the recipe computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl ResultEnvelope {
    pub fn parse(text: &str) -> Result<Self, JobError> {
        serde_json::from_str(text).map_err(|_| JobError::Parse(ParseStage::Result))
    }

    /// Successful computation carrying a model completion.
    pub fn success(completion: Value) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: None,
            data: completion,
        }
    }

    /// Failed computation.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: STATUS_ERROR.to_string(),
            data: Value::String(message.clone()),
            message: Some(message),
        }
    }

    /// Reduce to a [`NormalizedResult`].
    ///
    /// A non-success status is a valid outcome, not an error.
    pub fn into_normalized(self) -> Result<NormalizedResult, JobError> {
        if self.status != STATUS_SUCCESS {
            return Ok(NormalizedResult::Failure(self.failure_message()));
        }
        completion_content(&self.data).map(NormalizedResult::Recipes)
    }

    fn failure_message(&self) -> String {
        let from_data = match &self.data {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        };
        self.message
            .as_deref()
            .or(from_data)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(GENERIC_JOB_ERROR)
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Layer 3: model completion
// ---------------------------------------------------------------------------

/// Read `choices[0].message.content` from a chat completion.
pub fn completion_content(completion: &Value) -> Result<String, JobError> {
    let choices = completion
        .get("choices")
        .and_then(Value::as_array)
        .ok_or(JobError::Extract(ExtractReason::Shape))?;

    let first = choices
        .first()
        .ok_or(JobError::Extract(ExtractReason::NoChoices))?;

    first
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(JobError::Extract(ExtractReason::Shape))
}

/// Unwrap a raw job output all the way down to a [`NormalizedResult`].
pub fn extract_output(raw: &str) -> Result<NormalizedResult, JobError> {
    let text = DeliveryEnvelope::parse(raw)?.into_result_text()?;
    ResultEnvelope::parse(&text)?.into_normalized()
}

/// Remove a surrounding Markdown code fence (optionally tagged `json`).
///
/// Models often wrap structured answers in a fence even when asked not to.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_prefix('\n').unwrap_or(rest))
        .unwrap_or(trimmed);
    let body = body
        .strip_suffix("```")
        .map(|rest| rest.strip_suffix('\n').unwrap_or(rest))
        .unwrap_or(body);
    body.trim()
}
