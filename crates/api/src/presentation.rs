//! Mapping from job protocol values to the JSON returned to clients.

use recipe_core::envelope::strip_code_fence;
use recipe_core::job::{JobStatus, NormalizedResult};
use serde::Serialize;

/// What a client sees when it polls a job or task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    /// `pending`, `running`, `succeeded` or `failed`.
    pub status: &'static str,
    /// Recipe text exactly as the model returned it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// The recipe parsed as JSON, when the text (minus any Markdown code
    /// fence) is valid JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<serde_json::Value>,
    /// Failure message to show in place of results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobView {
    /// View of a job that has not produced a result yet.
    pub fn in_progress(status: &JobStatus) -> Self {
        Self {
            status: status.label(),
            text: None,
            recipe: None,
            message: None,
        }
    }

    pub fn finished(result: &NormalizedResult) -> Self {
        match result {
            NormalizedResult::Recipes(text) => Self {
                status: "succeeded",
                recipe: serde_json::from_str(strip_code_fence(text)).ok(),
                text: Some(text.clone()),
                message: None,
            },
            NormalizedResult::Failure(message) => Self {
                status: "failed",
                text: None,
                recipe: None,
                message: Some(message.clone()),
            },
        }
    }
}
