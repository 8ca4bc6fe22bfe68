//! Local-execution task records and the store seam that owns them.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::job::NormalizedResult;
use crate::types::InputRef;

/// Whether the persistence side effect for a task has been handed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffectState {
    NotSubmitted,
    Submitted,
}

/// One locally executed recipe computation.
///
/// The outcome cell is written exactly once by the computation; everything
/// else is fixed at submission.
#[derive(Debug)]
pub struct TaskEntry {
    key: String,
    input_snapshot: String,
    content_type: String,
    outcome: OnceLock<NormalizedResult>,
    cancel: CancellationToken,
}

impl TaskEntry {
    /// `input_snapshot` is the base64-encoded image the task was started
    /// with, of MIME type `content_type`.
    pub fn new(
        key: impl Into<String>,
        input_snapshot: String,
        content_type: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            key: key.into(),
            input_snapshot,
            content_type: content_type.into(),
            outcome: OnceLock::new(),
            cancel,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn input_snapshot(&self) -> &str {
        &self.input_snapshot
    }

    /// The snapshot as an inline image reference.
    pub fn image(&self) -> InputRef {
        InputRef::Base64 {
            data: self.input_snapshot.clone(),
            mime: self.content_type.clone(),
        }
    }

    /// `None` while the computation is still running.
    pub fn outcome(&self) -> Option<&NormalizedResult> {
        self.outcome.get()
    }

    /// Record the computation's result. Returns `false` if one was already set.
    pub fn complete(&self, result: NormalizedResult) -> bool {
        self.outcome.set(result).is_ok()
    }

    /// Token that stops the computation if it is still running.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Storage for [`TaskEntry`] records, keyed by request token.
///
/// Implementations must make [`compare_and_swap`](TaskStore::compare_and_swap)
/// atomic with respect to concurrent callers.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Arc<TaskEntry>>;

    /// Insert a new entry. Fails with [`JobError::DuplicateKey`] if the key
    /// is taken; existing entries are never overwritten.
    async fn put(&self, entry: Arc<TaskEntry>) -> Result<(), JobError>;

    /// Move the entry's side-effect state from `current` to `new`.
    ///
    /// Returns `true` only for the caller that performed the transition;
    /// `false` if the state was not `current` or the key is unknown.
    async fn compare_and_swap(
        &self,
        key: &str,
        current: SideEffectState,
        new: SideEffectState,
    ) -> bool;

    async fn side_effect_state(&self, key: &str) -> Option<SideEffectState>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_is_written_once() {
        let entry = TaskEntry::new(
            "cat.jpg",
            "AAAA".into(),
            "image/jpeg",
            CancellationToken::new(),
        );
        assert!(entry.outcome().is_none());
        assert!(entry.complete(NormalizedResult::Recipes("Soup".into())));
        assert!(!entry.complete(NormalizedResult::Failure("late".into())));
        assert_eq!(
            entry.outcome(),
            Some(&NormalizedResult::Recipes("Soup".into()))
        );
    }

    #[test]
    fn image_keeps_the_upload_content_type() {
        let entry = TaskEntry::new(
            "dish.webp",
            "UklG".into(),
            "image/webp",
            CancellationToken::new(),
        );
        assert_eq!(entry.image().to_image_url(), "data:image/webp;base64,UklG");
    }
}
