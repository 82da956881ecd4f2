//! Electronic Code of Federal Regulations full-text search.

use async_trait::async_trait;
use tracing::debug;

use super::{LegalSource, fetch_json, normalize_results};
use crate::document::LegalDocument;
use crate::error::Result;
use crate::normalizer::SourceKind;

const DEFAULT_BASE_URL: &str = "https://www.ecfr.gov/api/search/v1";

/// The API caps a page at this many results.
const MAX_PER_PAGE: usize = 100;

/// Regulation search against the public eCFR API. No key is needed.
pub struct EcfrSource {
    client: reqwest::Client,
    base_url: String,
    title: Option<u32>,
}

impl EcfrSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, base_url: DEFAULT_BASE_URL.to_string(), title: None }
    }

    /// Restrict results to one CFR title (e.g. 29 for Labor).
    pub fn with_title(mut self, title: u32) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn query_params(&self, query: &str, max_results: usize) -> Vec<(&'static str, String)> {
        let mut params =
            vec![("query", query.to_string()), ("per_page", max_results.min(MAX_PER_PAGE).to_string())];
        if let Some(title) = self.title {
            params.push(("title", title.to_string()));
        }
        params
    }
}

#[async_trait]
impl LegalSource for EcfrSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Ecfr
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<LegalDocument>> {
        debug!(query, max_results, title = ?self.title, "searching eCFR");
        let request = self.client.get(&self.base_url).query(&self.query_params(query, max_results));
        let body = fetch_json(self.kind(), request).await?;
        Ok(normalize_results(&body, "results", self.kind(), max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_capped() {
        let source = EcfrSource::new(reqwest::Client::new()).with_title(29);
        let params = source.query_params("disability", 500);
        assert!(params.contains(&("per_page", "100".to_string())));
        assert!(params.contains(&("title", "29".to_string())));
    }
}
