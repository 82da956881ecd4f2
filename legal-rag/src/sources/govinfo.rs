//! GovInfo package search over the CFR collection.

use async_trait::async_trait;
use tracing::debug;

use super::{LegalSource, fetch_json, normalize_results};
use crate::document::LegalDocument;
use crate::error::Result;
use crate::normalizer::SourceKind;

const DEFAULT_BASE_URL: &str = "https://api.govinfo.gov";
const DEFAULT_COLLECTION: &str = "CFR";

/// Federal regulation search against the GovInfo API.
pub struct GovInfoSource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    collection: String,
}

impl GovInfoSource {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    /// Search a different GovInfo collection code.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LegalSource for GovInfoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::GovInfo
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<LegalDocument>> {
        debug!(query, max_results, collection = self.collection.as_str(), "searching GovInfo");
        let params = [
            ("query", query.to_string()),
            ("pageSize", max_results.to_string()),
            ("offsetMark", "*".to_string()),
            ("collection", self.collection.clone()),
            ("api_key", self.api_key.clone()),
        ];
        let request = self.client.get(format!("{}/search", self.base_url)).query(&params);
        let body = fetch_json(self.kind(), request).await?;
        Ok(normalize_results(&body, "results", self.kind(), max_results))
    }
}
