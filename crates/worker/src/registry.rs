//! Task registry: submit-and-poll over locally executed recipe inference.
//!
//! Each submitted photo becomes a [`TaskEntry`] whose computation runs on
//! the [`WorkerPool`]. The first poll that sees a successful outcome hands
//! the photo to the [`RecordStore`], guarded by the store's
//! compare-and-swap so concurrent polls persist it once.

use std::sync::Arc;
use std::time::Duration;

use recipe_core::backends::{RecordStore, VisionBackend};
use recipe_core::envelope::ResultEnvelope;
use recipe_core::error::JobError;
use recipe_core::job::NormalizedResult;
use recipe_core::task::{SideEffectState, TaskEntry, TaskStore};
use recipe_core::types::InputRef;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::pool::WorkerPool;

/// Result of [`TaskRegistry::poll_and_maybe_advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPoll {
    Pending,
    Done(NormalizedResult),
    NotFound,
}

/// Collaborators shared by every computation.
struct Inference {
    vision: Arc<dyn VisionBackend>,
    prompt: String,
    task_timeout: Duration,
}

pub struct TaskRegistry {
    store: Arc<dyn TaskStore>,
    pool: WorkerPool,
    inference: Arc<Inference>,
    records: Option<Arc<dyn RecordStore>>,
    shutdown: CancellationToken,
}

impl TaskRegistry {
    pub fn new(
        store: Arc<dyn TaskStore>,
        pool: WorkerPool,
        vision: Arc<dyn VisionBackend>,
        prompt: String,
        task_timeout: Duration,
    ) -> Self {
        Self {
            store,
            pool,
            inference: Arc::new(Inference {
                vision,
                prompt,
                task_timeout,
            }),
            records: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Persist successful uploads to `records`.
    pub fn with_records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    /// Register `key` and start inference on `image_base64`, an image of
    /// type `content_type`.
    ///
    /// Returns as soon as the work is queued. A key that is already
    /// registered is rejected with [`JobError::DuplicateKey`].
    pub async fn submit(
        &self,
        key: &str,
        image_base64: String,
        content_type: &str,
    ) -> Result<(), JobError> {
        let entry = Arc::new(TaskEntry::new(
            key,
            image_base64,
            content_type,
            self.shutdown.child_token(),
        ));
        self.store.put(Arc::clone(&entry)).await?;

        // The deadline covers time spent waiting for a pool permit.
        let deadline = Instant::now() + self.inference.task_timeout;
        let inference = Arc::clone(&self.inference);
        self.pool.spawn("inference", async move {
            let result = inference.run(&entry, deadline).await;
            tracing::info!(
                task_key = entry.key(),
                success = result.is_success(),
                "Task finished",
            );
            entry.complete(result);
        });

        tracing::info!(task_key = key, "Task submitted");
        Ok(())
    }

    /// Report the task's state, firing the persistence side effect the
    /// first time a successful outcome is observed.
    pub async fn poll_and_maybe_advance(&self, key: &str) -> TaskPoll {
        let Some(entry) = self.store.get(key).await else {
            return TaskPoll::NotFound;
        };
        let Some(outcome) = entry.outcome() else {
            return TaskPoll::Pending;
        };

        if outcome.is_success() {
            self.maybe_persist(&entry).await;
        }
        TaskPoll::Done(outcome.clone())
    }

    async fn maybe_persist(&self, entry: &Arc<TaskEntry>) {
        let Some(records) = &self.records else {
            return;
        };
        let claimed = self
            .store
            .compare_and_swap(
                entry.key(),
                SideEffectState::NotSubmitted,
                SideEffectState::Submitted,
            )
            .await;
        if !claimed {
            return;
        }

        let records = Arc::clone(records);
        let entry = Arc::clone(entry);
        self.pool.spawn("persist", async move {
            match records.insert(entry.key(), entry.input_snapshot()).await {
                Ok(()) => tracing::info!(task_key = entry.key(), "Image record stored"),
                Err(e) => tracing::error!(
                    task_key = entry.key(),
                    error = %e,
                    "Failed to store image record",
                ),
            }
        });
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }

    /// Cancel running computations and drain the pool.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown.cancel();
        if !self.pool.shutdown(grace).await {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Worker pool did not drain before the grace period",
            );
        }
    }
}

impl Inference {
    async fn run(&self, entry: &TaskEntry, deadline: Instant) -> NormalizedResult {
        let work = self.infer(entry);
        tokio::select! {
            _ = entry.cancel_token().cancelled() => {
                NormalizedResult::Failure(JobError::Cancelled.to_string())
            }
            result = tokio::time::timeout_at(deadline, work) => {
                result.unwrap_or_else(|_| {
                    tracing::warn!(task_key = entry.key(), "Task exceeded its deadline");
                    NormalizedResult::Failure(JobError::DeadlineExceeded.to_string())
                })
            }
        }
    }

    async fn infer(&self, entry: &TaskEntry) -> NormalizedResult {
        let envelope = match self.inference_call(&entry.image()).await {
            Ok(completion) => ResultEnvelope::success(completion),
            Err(message) => ResultEnvelope::error(message),
        };

        envelope.into_normalized().unwrap_or_else(|e| {
            tracing::warn!(task_key = entry.key(), error = %e, "Unreadable completion");
            NormalizedResult::Failure(e.to_string())
        })
    }

    async fn inference_call(&self, image: &InputRef) -> Result<serde_json::Value, String> {
        self.vision
            .complete(&self.prompt, image)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Vision request failed");
                e.to_string()
            })
    }
}
