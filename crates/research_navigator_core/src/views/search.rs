//! The search page: free-text query, the advanced-search form, and the
//! results of the last successful search.

use serde::Serialize;
use tracing::{info, warn};

use super::{Failure, ViewResult};
use crate::domain::{AdvancedSearchParams, Identity, Paper, PaperQuery};
use crate::ports::{DataStore, PaperSearchService, PortError, PortResult};

pub const ADVANCED_FIELDS_REQUIRED: &str = "Please fill in at least one advanced search field.";
pub const QUERY_REQUIRED: &str = "Please enter a search query.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchView {
    query: String,
    advanced_open: bool,
    advanced: AdvancedSearchParams,
    papers: Vec<Paper>,
    error: Option<String>,
}

impl SearchView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_advanced_open(&self) -> bool {
        self.advanced_open
    }

    pub fn advanced(&self) -> &AdvancedSearchParams {
        &self.advanced
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Typing only triggers a search once there is something to search for.
    pub fn should_auto_search(&self) -> bool {
        !self.query.trim().is_empty()
    }

    pub fn set_advanced_open(&mut self, open: bool) {
        self.advanced_open = open;
    }

    pub fn set_advanced(&mut self, params: AdvancedSearchParams) {
        self.advanced = params;
    }

    pub fn clear_advanced(&mut self) {
        self.advanced = AdvancedSearchParams::default();
    }

    /// Builds the outgoing query, or the validation error to show instead.
    pub fn validate(&self) -> PortResult<PaperQuery> {
        if self.advanced_open {
            if self.advanced.is_blank() {
                return Err(PortError::Validation(ADVANCED_FIELDS_REQUIRED.to_string()));
            }
            return Ok(PaperQuery {
                query: self.query.trim().to_string(),
                advanced: Some(self.advanced.clone()),
            });
        }

        if self.query.trim().is_empty() {
            return Err(PortError::Validation(QUERY_REQUIRED.to_string()));
        }
        Ok(PaperQuery {
            query: self.query.trim().to_string(),
            advanced: None,
        })
    }

    /// Runs the current query. With `history`, a successful search is also
    /// recorded; a failed recording is logged and does not fail the search.
    pub async fn search(
        &mut self,
        papers: &dyn PaperSearchService,
        history: Option<(&dyn DataStore, &Identity)>,
    ) -> ViewResult {
        self.error = None;

        let query = match self.validate() {
            Ok(query) => query,
            Err(e) => {
                let message = match &e {
                    PortError::Validation(message) => message.clone(),
                    other => other.to_string(),
                };
                self.error = Some(message.clone());
                return Err(Failure::new(message, e));
            }
        };

        let results = match papers.search(&query).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Paper search for '{}' failed: {}", query.query, e);
                self.error = Some("Failed to fetch papers".to_string());
                return Err(Failure::new("Failed to fetch papers", e));
            }
        };

        info!("Paper search for '{}' returned {} results", query.query, results.len());
        self.papers = results;

        if let Some((store, who)) = history {
            let filters = query
                .advanced
                .as_ref()
                .map(AdvancedSearchParams::to_filters)
                .unwrap_or_default();
            if let Err(e) = store.add_search_history(who, &query.query, filters).await {
                warn!("Failed to record search history for {}: {}", who.user_id, e);
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PaperAuthor;
    use crate::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingSearch {
        calls: AtomicUsize,
        last: Mutex<Option<PaperQuery>>,
        fail: bool,
    }

    #[async_trait]
    impl PaperSearchService for RecordingSearch {
        async fn search(&self, query: &PaperQuery) -> PortResult<Vec<Paper>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(query.clone());
            if self.fail {
                return Err(PortError::RemoteRead("503".into()));
            }
            Ok(vec![Paper {
                paper_id: Some("p1".into()),
                title: format!("About {}", query.query),
                authors: vec![PaperAuthor {
                    author_id: None,
                    name: "A. Author".into(),
                }],
                year: Some(2021),
                url: None,
                abstract_text: None,
            }])
        }
    }

    #[tokio::test]
    async fn blank_advanced_form_is_never_sent() {
        let api = RecordingSearch::default();
        let mut view = SearchView::new();
        view.set_query("transformers");
        view.set_advanced_open(true);

        let failure = view.search(&api, None).await.unwrap_err();

        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(failure.notice.message, ADVANCED_FIELDS_REQUIRED);
        assert_eq!(view.error(), Some(ADVANCED_FIELDS_REQUIRED));
    }

    #[tokio::test]
    async fn advanced_params_only_travel_while_open() {
        let api = RecordingSearch::default();
        let mut view = SearchView::new();
        view.set_query("graphs");
        view.set_advanced(AdvancedSearchParams {
            paper_author: "Erdos".into(),
            ..Default::default()
        });

        view.search(&api, None).await.unwrap();
        assert!(api.last.lock().unwrap().as_ref().unwrap().advanced.is_none());

        view.set_advanced_open(true);
        view.search(&api, None).await.unwrap();
        let sent = api.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.advanced.unwrap().paper_author, "Erdos");
        assert_eq!(view.papers().len(), 1);
    }

    #[tokio::test]
    async fn failed_search_keeps_previous_results() {
        let mut view = SearchView::new();
        view.set_query("first");
        view.search(&RecordingSearch::default(), None).await.unwrap();

        let broken = RecordingSearch {
            fail: true,
            ..Default::default()
        };
        view.set_query("second");
        let failure = view.search(&broken, None).await.unwrap_err();

        assert!(matches!(failure.cause, PortError::RemoteRead(_)));
        assert_eq!(view.papers()[0].title, "About first");
        assert_eq!(view.error(), Some("Failed to fetch papers"));
    }

    #[tokio::test]
    async fn successful_search_is_recorded_when_asked() {
        let store = InMemoryStore::new();
        let me = Identity {
            user_id: Uuid::new_v4(),
            access_token: "token".into(),
        };
        let mut view = SearchView::new();
        view.set_query("quantum");
        view.set_advanced_open(true);
        view.set_advanced(AdvancedSearchParams {
            paper_year: "2019".into(),
            ..Default::default()
        });

        let recorder: &dyn DataStore = &store;
        view.search(&RecordingSearch::default(), Some((recorder, &me)))
            .await
            .unwrap();

        let history = store.get_search_history(&me).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query, "quantum");
        assert_eq!(history[0].filters.get("paperYear").map(String::as_str), Some("2019"));
    }

    #[test]
    fn clearing_restores_defaults() {
        let mut view = SearchView::new();
        view.set_advanced(AdvancedSearchParams {
            field: "biology".into(),
            ..Default::default()
        });
        view.clear_advanced();
        assert_eq!(view.advanced(), &AdvancedSearchParams::default());
        assert!(!view.should_auto_search());
    }
}
