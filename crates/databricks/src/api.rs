//! REST API client for the Databricks HTTP endpoints.
//!
//! Wraps job run submission, run status, run output retrieval and SQL
//! statement execution using [`reqwest`].

use serde::{Deserialize, Serialize};

/// HTTP client for a single Databricks workspace.
#[derive(Clone)]
pub struct DatabricksApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

/// Response returned by `POST /jobs/run-now`.
#[derive(Debug, Deserialize)]
pub struct RunNowResponse {
    /// Identifier of the newly triggered run.
    pub run_id: i64,
    #[serde(default)]
    pub number_in_job: Option<i64>,
}

/// Subset of `GET /jobs/runs/get` that the relay reads.
#[derive(Debug, Deserialize)]
pub struct RunResponse {
    pub run_id: i64,
    pub state: RunStateResponse,
}

/// Lifecycle block of a run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunStateResponse {
    pub life_cycle_state: LifeCycleState,
    #[serde(default)]
    pub result_state: Option<ResultState>,
    #[serde(default)]
    pub state_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifeCycleState {
    Queued,
    Pending,
    Running,
    Terminating,
    Terminated,
    Skipped,
    InternalError,
    Blocked,
    WaitingForRetry,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultState {
    Success,
    Failed,
    Timedout,
    Canceled,
    #[serde(other)]
    Other,
}

/// Body of `POST /sql/statements`.
#[derive(Debug, Serialize)]
pub struct StatementRequest {
    pub statement: String,
    pub warehouse_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<StatementParameter>,
    pub wait_timeout: String,
}

/// Named `:marker` parameter bound into a statement.
#[derive(Debug, Serialize)]
pub struct StatementParameter {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl StatementParameter {
    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            kind: "STRING",
        }
    }
}

/// Response of `POST /sql/statements`.
#[derive(Debug, Deserialize)]
pub struct StatementResponse {
    pub statement_id: String,
    pub status: StatementStatus,
    #[serde(default)]
    pub result: Option<StatementResult>,
}

#[derive(Debug, Deserialize)]
pub struct StatementStatus {
    /// `PENDING`, `RUNNING`, `SUCCEEDED`, `FAILED`, `CANCELED` or `CLOSED`.
    pub state: String,
    #[serde(default)]
    pub error: Option<StatementErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct StatementErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub data_array: Vec<Vec<Option<String>>>,
}

/// Errors from the Databricks REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum DatabricksApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Databricks returned a non-2xx status code.
    #[error("Databricks API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl DatabricksApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Workspace URL, e.g. `https://adb-123.azuredatabricks.net`.
    /// * `token`    - Personal access token sent as a bearer token.
    pub fn new(base_url: String, token: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Trigger a run of an existing job with notebook parameters.
    pub async fn run_now(
        &self,
        job_id: i64,
        notebook_params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<RunNowResponse, DatabricksApiError> {
        let body = serde_json::json!({
            "job_id": job_id,
            "notebook_params": notebook_params,
        });

        let response = self
            .client
            .post(format!("{}/api/2.1/jobs/run-now", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieve the metadata and lifecycle state of a run.
    pub async fn get_run(&self, run_id: i64) -> Result<RunResponse, DatabricksApiError> {
        let response = self
            .client
            .get(format!("{}/api/2.1/jobs/runs/get", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("run_id", run_id)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieve the output of a run as unparsed text.
    ///
    /// The body is left encoded; decoding it is the extractor's job.
    pub async fn get_run_output(&self, run_id: i64) -> Result<String, DatabricksApiError> {
        let response = self
            .client
            .get(format!("{}/api/2.1/jobs/runs/get-output", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("run_id", run_id)])
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.text().await?)
    }

    /// Execute a SQL statement on a warehouse and wait for the result.
    pub async fn execute_statement(
        &self,
        request: &StatementRequest,
    ) -> Result<StatementResponse, DatabricksApiError> {
        let response = self
            .client
            .post(format!("{}/api/2.0/sql/statements", self.base_url))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`DatabricksApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, DatabricksApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DatabricksApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DatabricksApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
