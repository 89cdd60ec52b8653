//! The history screen.

use serde::Serialize;
use tracing::warn;

use super::{Failure, ViewResult};
use crate::domain::{Identity, SearchHistoryEntry};
use crate::ports::DataStore;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchHistoryView {
    entries: Vec<SearchHistoryEntry>,
}

impl SearchHistoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[SearchHistoryEntry] {
        &self.entries
    }

    pub async fn load(&mut self, store: &dyn DataStore, who: &Identity) -> ViewResult {
        let entries = store.get_search_history(who).await.map_err(|e| {
            warn!("Failed to load search history for {}: {}", who.user_id, e);
            Failure::new("Error fetching search history", e)
        })?;
        self.entries = entries;
        Ok(None)
    }
}
