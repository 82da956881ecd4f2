//! Clients for the external legal-data REST APIs.
//!
//! Each [`LegalSource`] fetches raw JSON for a query and runs it through the
//! [normalizer](crate::normalizer); records that fail to normalize are
//! dropped there. Failures are never retried: an HTTP 429 is reported like
//! any other non-success status.

mod courtlistener;
mod ecfr;
mod govinfo;
mod regulations_gov;

pub use courtlistener::CourtListenerSource;
pub use ecfr::EcfrSource;
pub use govinfo::GovInfoSource;
pub use regulations_gov::RegulationsGovSource;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::SourceCredentials;
use crate::document::LegalDocument;
use crate::error::{LegalRagError, Result};
use crate::normalizer::{SourceKind, normalize_batch};

/// A searchable legal-data API.
#[async_trait]
pub trait LegalSource: Send + Sync {
    /// Which API this is; selects the normalizer field map.
    fn kind(&self) -> SourceKind;

    /// Search for up to `max_results` documents matching `query`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<LegalDocument>>;

    /// Display name used in logs and errors.
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Send a prepared GET request and return its JSON body.
pub(crate) async fn fetch_json(source: SourceKind, request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await.map_err(|e| {
        error!(source = source.as_str(), error = %e, "request failed");
        LegalRagError::source_fetch(source.as_str(), format!("request failed: {e}"))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(source = source.as_str(), %status, "API error");
        return Err(LegalRagError::source_fetch(
            source.as_str(),
            format!("API returned {status}: {}", body.chars().take(200).collect::<String>()),
        ));
    }

    response.json().await.map_err(|e| {
        error!(source = source.as_str(), error = %e, "failed to parse response");
        LegalRagError::source_fetch(source.as_str(), format!("failed to parse response: {e}"))
    })
}

/// Normalize the array at `key` in `body`, keeping at most `max_results` records.
pub(crate) fn normalize_results(
    body: &Value,
    key: &str,
    source: SourceKind,
    max_results: usize,
) -> Vec<LegalDocument> {
    let records = body.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    debug!(source = source.as_str(), raw_count = records.len(), "fetched records");
    normalize_batch(records.iter().take(max_results), source)
}

/// Which sources a fetch should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelection {
    /// Every source whose credentials are configured.
    All,
    /// One source, named explicitly.
    Only(SourceKind),
}

/// Documents gathered from several sources, with the sources that failed.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Normalized documents from every source that succeeded.
    pub documents: Vec<LegalDocument>,
    /// `(source name, error)` for every source that failed.
    pub failures: Vec<(String, LegalRagError)>,
}

/// The set of sources enabled for a run.
pub struct SourceSet {
    sources: Vec<Box<dyn LegalSource>>,
}

impl SourceSet {
    /// Wrap explicitly constructed sources.
    pub fn new(sources: Vec<Box<dyn LegalSource>>) -> Self {
        Self { sources }
    }

    /// Build the sources selected by `selection` from configured credentials.
    ///
    /// With [`SourceSelection::All`], sources lacking a credential are
    /// skipped: GovInfo and Regulations.gov need an API key and CourtListener
    /// needs a token. eCFR needs none. Naming CourtListener explicitly runs
    /// it anonymously.
    ///
    /// # Errors
    ///
    /// Returns [`LegalRagError::Configuration`] when an explicitly selected
    /// source requires a key that is not configured.
    pub fn from_config(
        config: &SourceCredentials,
        selection: SourceSelection,
        client: reqwest::Client,
    ) -> Result<Self> {
        let mut sources: Vec<Box<dyn LegalSource>> = Vec::new();
        let wanted = |kind: SourceKind| match selection {
            SourceSelection::All => true,
            SourceSelection::Only(only) => only == kind,
        };
        let explicit = matches!(selection, SourceSelection::Only(_));

        if wanted(SourceKind::CourtListener) {
            match (&config.courtlistener_token, explicit) {
                (Some(token), _) => sources.push(Box::new(
                    CourtListenerSource::new(client.clone()).with_token(token.clone()),
                )),
                (None, true) => sources.push(Box::new(CourtListenerSource::new(client.clone()))),
                (None, false) => info!("CourtListener disabled: COURTLISTENER_API_TOKEN not set"),
            }
        }
        if wanted(SourceKind::GovInfo) {
            match &config.govinfo_api_key {
                Some(key) => sources.push(Box::new(GovInfoSource::new(client.clone(), key.clone()))),
                None if explicit => {
                    return Err(LegalRagError::Configuration("GOVINFO_API_KEY is not set".into()));
                }
                None => info!("GovInfo disabled: GOVINFO_API_KEY not set"),
            }
        }
        if wanted(SourceKind::Ecfr) {
            sources.push(Box::new(EcfrSource::new(client.clone())));
        }
        if wanted(SourceKind::RegulationsGov) {
            match &config.regulations_gov_api_key {
                Some(key) => {
                    sources.push(Box::new(RegulationsGovSource::new(client.clone(), key.clone())))
                }
                None if explicit => {
                    return Err(LegalRagError::Configuration(
                        "REGULATIONS_GOV_API_KEY is not set".into(),
                    ));
                }
                None => info!("Regulations.gov disabled: REGULATIONS_GOV_API_KEY not set"),
            }
        }

        Ok(Self { sources })
    }

    /// Names of the enabled sources.
    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Whether no source is enabled.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Query every enabled source in turn.
    ///
    /// One failing source never aborts the others; its error is reported in
    /// [`FetchReport::failures`].
    pub async fn fetch_all(&self, query: &str, max_results: usize) -> FetchReport {
        let mut report = FetchReport::default();
        for source in &self.sources {
            match source.search(query, max_results).await {
                Ok(documents) => {
                    info!(source = source.name(), count = documents.len(), "fetched documents");
                    report.documents.extend(documents);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "source failed");
                    report.failures.push((source.name().to_string(), e));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_regulations;

    struct CannedSource(Vec<LegalDocument>);

    #[async_trait]
    impl LegalSource for CannedSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Ecfr
        }

        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<LegalDocument>> {
            Ok(self.0.iter().take(max_results).cloned().collect())
        }
    }

    struct DownSource;

    #[async_trait]
    impl LegalSource for DownSource {
        fn kind(&self) -> SourceKind {
            SourceKind::GovInfo
        }

        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<LegalDocument>> {
            Err(LegalRagError::source_fetch("govinfo", "API returned 503 Service Unavailable"))
        }
    }

    fn config() -> SourceCredentials {
        SourceCredentials { govinfo_api_key: Some("gov".into()), ..Default::default() }
    }

    #[test]
    fn all_skips_sources_without_credentials() {
        let set = SourceSet::from_config(&config(), SourceSelection::All, reqwest::Client::new()).unwrap();
        assert_eq!(set.names(), vec!["govinfo", "ecfr"]);
    }

    #[test]
    fn explicit_courtlistener_runs_anonymously() {
        let selection = SourceSelection::Only(SourceKind::CourtListener);
        let set = SourceSet::from_config(&config(), selection, reqwest::Client::new()).unwrap();
        assert_eq!(set.names(), vec!["courtlistener"]);
    }

    #[test]
    fn explicit_source_without_key_is_a_configuration_error() {
        let selection = SourceSelection::Only(SourceKind::RegulationsGov);
        let result = SourceSet::from_config(&config(), selection, reqwest::Client::new());
        assert!(matches!(result, Err(LegalRagError::Configuration(_))));
    }

    #[test]
    fn normalize_results_respects_limit() {
        let body = serde_json::json!({
            "results": [
                {"title_number": 29, "section_number": "1630.2", "full_text": "a"},
                {"title_number": 29, "section_number": "1630.3", "full_text": "b"},
            ]
        });
        assert_eq!(normalize_results(&body, "results", SourceKind::Ecfr, 1).len(), 1);
        assert!(normalize_results(&body, "data", SourceKind::Ecfr, 5).is_empty());
    }

    #[tokio::test]
    async fn failing_source_does_not_abort_the_others() {
        let regulations = sample_regulations();
        let set = SourceSet::new(vec![
            Box::new(DownSource),
            Box::new(CannedSource(regulations.clone())),
        ]);

        let report = set.fetch_all("disability", 10).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "govinfo");
        assert!(matches!(report.failures[0].1, LegalRagError::SourceFetch { .. }));
        assert_eq!(report.documents.len(), regulations.len());
        assert_eq!(report.documents[0].id, regulations[0].id);
    }
}
