//! services/api/src/adapters/paper_search.rs
//!
//! The paper-search adapter: one GET against the external search API per
//! query. Results are passed through without normalization or caching.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use research_navigator_core::domain::{Paper, PaperQuery};
use research_navigator_core::ports::{PaperSearchService, PortError, PortResult};
use serde::Deserialize;
use tracing::{debug, error};

/// The result fields requested for every paper.
pub const RESULT_FIELDS: &str = "title,authors,year,url,abstract";

pub struct SemanticScholarAdapter {
    client: Client,
    endpoint: String,
    limit: u32,
}

impl SemanticScholarAdapter {
    pub fn new(client: Client, endpoint: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            limit,
        }
    }
}

/// The query string for `query`: the base parameters followed by the
/// advanced-search fields under their own names.
pub fn query_params(query: &PaperQuery, limit: u32) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("query", query.query.clone()),
        ("limit", limit.to_string()),
        ("fields", RESULT_FIELDS.to_string()),
    ];
    if let Some(advanced) = &query.advanced {
        params.extend(advanced.to_params());
    }
    params
}

#[derive(Deserialize)]
struct SearchResponse {
    /// Absent or `null` when nothing matched.
    #[serde(default)]
    data: Option<Vec<Paper>>,
}

#[async_trait]
impl PaperSearchService for SemanticScholarAdapter {
    async fn search(&self, query: &PaperQuery) -> PortResult<Vec<Paper>> {
        let params = query_params(query, self.limit);
        debug!("Searching papers with {:?}", params);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Error calling search API: {}", e);
                PortError::RemoteRead(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            error!("Search API rate limit hit");
            return Err(PortError::RemoteRead("search API rate limit reached".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Search API answered {}: {}", status, body);
            return Err(PortError::RemoteRead(format!("search API answered {status}")));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            error!("Malformed search API response: {}", e);
            PortError::RemoteRead(format!("malformed search response: {e}"))
        })?;
        Ok(parsed.data.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_navigator_core::domain::AdvancedSearchParams;

    #[test]
    fn plain_query_sends_base_parameters_only() {
        let query = PaperQuery {
            query: "diffusion models".into(),
            advanced: None,
        };
        assert_eq!(
            query_params(&query, 10),
            vec![
                ("query", "diffusion models".to_string()),
                ("limit", "10".to_string()),
                ("fields", RESULT_FIELDS.to_string()),
            ]
        );
    }

    #[test]
    fn advanced_fields_are_merged_under_their_names() {
        let query = PaperQuery {
            query: String::new(),
            advanced: Some(AdvancedSearchParams {
                paper_name: "BERT".into(),
                paper_year: "2018".into(),
                ..Default::default()
            }),
        };
        let params = query_params(&query, 5);
        assert!(params.contains(&("paperName", "BERT".to_string())));
        assert!(params.contains(&("paperYear", "2018".to_string())));
        assert!(params.contains(&("publicationType", "journal".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "paperAuthor"));
    }

    #[test]
    fn missing_data_means_no_results() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"total": 0, "offset": 0}"#).unwrap();
        assert!(parsed.data.is_none());
        let parsed: SearchResponse = serde_json::from_str(r#"{"total": 0, "data": null}"#).unwrap();
        assert!(parsed.data.unwrap_or_default().is_empty());
    }
}
