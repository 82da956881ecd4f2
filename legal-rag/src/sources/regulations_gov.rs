//! Regulations.gov documents search.

use async_trait::async_trait;
use tracing::debug;

use super::{LegalSource, fetch_json, normalize_results};
use crate::document::LegalDocument;
use crate::error::Result;
use crate::normalizer::SourceKind;

const DEFAULT_BASE_URL: &str = "https://api.regulations.gov/v4";
const MAX_PAGE_SIZE: usize = 250;

/// Rulemaking-document search against the Regulations.gov v4 API.
pub struct RegulationsGovSource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl RegulationsGovSource {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self { client, api_key: api_key.into(), base_url: DEFAULT_BASE_URL.to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LegalSource for RegulationsGovSource {
    fn kind(&self) -> SourceKind {
        SourceKind::RegulationsGov
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<LegalDocument>> {
        debug!(query, max_results, "searching Regulations.gov");
        let params = [
            ("filter[searchTerm]", query.to_string()),
            ("page[size]", max_results.min(MAX_PAGE_SIZE).to_string()),
        ];
        let request = self
            .client
            .get(format!("{}/documents", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .query(&params);
        let body = fetch_json(self.kind(), request).await?;
        Ok(normalize_results(&body, "data", self.kind(), max_results))
    }
}
