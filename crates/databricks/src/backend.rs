//! [`JobBackend`] implementation backed by a Databricks notebook job.
//!
//! Each recipe request triggers one run of a pre-configured job. The
//! notebook receives the image URL as the `blob_url` widget and exits with
//! a JSON `{status, data}` record, which Databricks wraps in its own output
//! envelope.

use std::collections::BTreeMap;

use async_trait::async_trait;
use recipe_core::job::{Lifecycle, RunState};
use recipe_core::protocol::{BackendError, JobBackend};
use recipe_core::types::{InputRef, JobHandle};

use crate::api::{DatabricksApi, LifeCycleState, ResultState, RunStateResponse};

/// Notebook widget that receives the image reference.
pub const IMAGE_PARAM: &str = "blob_url";

/// Runs recipe jobs as Databricks notebook runs.
pub struct DatabricksJobs {
    api: DatabricksApi,
    job_id: i64,
    /// Extra notebook parameters sent with every run (e.g. model API key).
    extra_params: BTreeMap<String, String>,
}

impl DatabricksJobs {
    pub fn new(api: DatabricksApi, job_id: i64) -> Self {
        Self {
            api,
            job_id,
            extra_params: BTreeMap::new(),
        }
    }

    /// Add a notebook parameter passed to every run.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(name.into(), value.into());
        self
    }

    fn notebook_params(&self, input: &InputRef) -> serde_json::Map<String, serde_json::Value> {
        let mut params: serde_json::Map<_, _> = self
            .extra_params
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        params.insert(
            IMAGE_PARAM.to_string(),
            serde_json::Value::String(input.to_image_url()),
        );
        params
    }
}

fn parse_run_id(handle: &JobHandle) -> Result<i64, BackendError> {
    handle
        .as_str()
        .parse()
        .map_err(|_| format!("'{handle}' is not a Databricks run id").into())
}

/// Translate a Databricks lifecycle block into the backend-neutral form.
pub fn to_run_state(state: &RunStateResponse) -> RunState {
    let lifecycle = match state.life_cycle_state {
        LifeCycleState::Queued
        | LifeCycleState::Pending
        | LifeCycleState::Blocked
        | LifeCycleState::WaitingForRetry => Lifecycle::Pending,
        LifeCycleState::Running | LifeCycleState::Terminating => Lifecycle::Running,
        LifeCycleState::Terminated => Lifecycle::Terminated,
        LifeCycleState::Skipped | LifeCycleState::InternalError => Lifecycle::Aborted,
        LifeCycleState::Unknown => {
            tracing::warn!("Unrecognised Databricks lifecycle state, treating as pending");
            Lifecycle::Pending
        }
    };

    RunState {
        lifecycle,
        succeeded: state.result_state.map(|r| r == ResultState::Success),
        message: state.state_message.clone(),
    }
}

#[async_trait]
impl JobBackend for DatabricksJobs {
    async fn start(&self, input: &InputRef) -> Result<JobHandle, BackendError> {
        let response = self
            .api
            .run_now(self.job_id, &self.notebook_params(input))
            .await?;

        tracing::debug!(
            job_id = self.job_id,
            run_id = response.run_id,
            "Databricks run triggered",
        );
        Ok(JobHandle::from(response.run_id))
    }

    async fn get_status(&self, handle: &JobHandle) -> Result<RunState, BackendError> {
        let run = self.api.get_run(parse_run_id(handle)?).await?;
        Ok(to_run_state(&run.state))
    }

    async fn get_output(&self, handle: &JobHandle) -> Result<String, BackendError> {
        Ok(self.api.get_run_output(parse_run_id(handle)?).await?)
    }

    fn accepts_handle(&self, handle: &JobHandle) -> bool {
        parse_run_id(handle).is_ok()
    }
}
