//! CourtListener opinion search.

use async_trait::async_trait;
use tracing::debug;

use super::{LegalSource, fetch_json, normalize_results};
use crate::document::LegalDocument;
use crate::error::Result;
use crate::normalizer::SourceKind;

const DEFAULT_BASE_URL: &str = "https://www.courtlistener.com/api/rest/v3";

/// Case-law search against the CourtListener REST API.
///
/// Works anonymously at a low rate limit; a token raises it.
pub struct CourtListenerSource {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
    court: Option<String>,
}

impl CourtListenerSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, token: None, base_url: DEFAULT_BASE_URL.to_string(), court: None }
    }

    /// Authenticate with an API token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Restrict results to one court identifier (e.g. `scotus`).
    pub fn with_court(mut self, court: impl Into<String>) -> Self {
        self.court = Some(court.into());
        self
    }

    /// Point at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn query_params(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("type", "o".to_string()),
            ("order_by", "score desc".to_string()),
        ];
        if let Some(court) = &self.court {
            params.push(("court", court.clone()));
        }
        params
    }
}

#[async_trait]
impl LegalSource for CourtListenerSource {
    fn kind(&self) -> SourceKind {
        SourceKind::CourtListener
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<LegalDocument>> {
        debug!(query, max_results, authenticated = self.token.is_some(), "searching CourtListener");
        let mut request =
            self.client.get(format!("{}/search/", self.base_url)).query(&self.query_params(query));
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {token}"));
        }
        let body = fetch_json(self.kind(), request).await?;
        Ok(normalize_results(&body, "results", self.kind(), max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn court_filter_is_sent_when_set() {
        let source = CourtListenerSource::new(reqwest::Client::new()).with_court("scotus");
        let params = source.query_params("miranda");
        assert!(params.contains(&("court", "scotus".to_string())));
        assert!(params.contains(&("type", "o".to_string())));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let source = CourtListenerSource::new(reqwest::Client::new()).with_base_url("http://localhost:9/");
        assert_eq!(source.base_url, "http://localhost:9");
    }
}
