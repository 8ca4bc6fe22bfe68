//! In-memory [`TaskStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use recipe_core::error::JobError;
use recipe_core::task::{SideEffectState, TaskEntry, TaskStore};
use tokio::sync::RwLock;

/// Process-lifetime task store. Entries are never removed.
#[derive(Default)]
pub struct InMemoryTaskStore {
    entries: RwLock<HashMap<String, (Arc<TaskEntry>, SideEffectState)>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, key: &str) -> Option<Arc<TaskEntry>> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|(entry, _)| Arc::clone(entry))
    }

    async fn put(&self, entry: Arc<TaskEntry>) -> Result<(), JobError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(entry.key()) {
            return Err(JobError::DuplicateKey(entry.key().to_string()));
        }
        entries.insert(
            entry.key().to_string(),
            (entry, SideEffectState::NotSubmitted),
        );
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        current: SideEffectState,
        new: SideEffectState,
    ) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some((_, state)) if *state == current => {
                *state = new;
                true
            }
            _ => false,
        }
    }

    async fn side_effect_state(&self, key: &str) -> Option<SideEffectState> {
        self.entries.read().await.get(key).map(|(_, state)| *state)
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
