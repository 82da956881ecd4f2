//! Normalization of raw legal-data API payloads into [`LegalDocument`]s.
//!
//! Each source names its fields differently; [`normalize`] maps a single raw
//! record onto the canonical shape. Records missing an identifier or any text
//! are skipped (`None`), which is an expected outcome rather than an error.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::document::{DocumentType, Jurisdiction, LegalDocument, truncate_chars};
use crate::error::LegalRagError;

const SNIPPET_CHARS: usize = 200;
const COURTLISTENER_HOST: &str = "https://www.courtlistener.com";

/// Federal appellate and specialty court identifiers used by CourtListener.
const FEDERAL_COURTS: &[&str] = &[
    "scotus", "ca1", "ca2", "ca3", "ca4", "ca5", "ca6", "ca7", "ca8", "ca9", "ca10", "ca11",
    "cadc", "cafc", "cit", "uscfc", "jpml", "cavc", "armfor",
];

/// CourtListener district (`d`) and bankruptcy (`b`) courts: two-letter state
/// code, optional division, then the court letter.
static FEDERAL_TRIAL_COURT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}[nsewmc]?[db]$").expect("valid trial court pattern"));

/// State supreme court ids that collide with the trial court pattern.
const STATE_COURT_COLLISIONS: &[&str] = &["ind", "neb"];

/// The legal-data provider a raw record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// CourtListener case-law search.
    CourtListener,
    /// GovInfo package search (CFR collection).
    GovInfo,
    /// Electronic Code of Federal Regulations search.
    Ecfr,
    /// Regulations.gov documents search.
    RegulationsGov,
}

impl SourceKind {
    /// All supported sources.
    pub const ALL: [SourceKind; 4] =
        [SourceKind::CourtListener, SourceKind::GovInfo, SourceKind::Ecfr, SourceKind::RegulationsGov];

    /// Stable kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourtListener => "courtlistener",
            Self::GovInfo => "govinfo",
            Self::Ecfr => "ecfr",
            Self::RegulationsGov => "regulations-gov",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = LegalRagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "courtlistener" => Ok(Self::CourtListener),
            "govinfo" => Ok(Self::GovInfo),
            "ecfr" => Ok(Self::Ecfr),
            "regulations-gov" | "regulationsgov" => Ok(Self::RegulationsGov),
            _ => Err(LegalRagError::InvalidField { field: "source", value: s.to_string() }),
        }
    }
}

/// Map one raw payload onto a [`LegalDocument`].
///
/// Returns `None` when the record lacks an identifier or text, or carries an
/// explicit jurisdiction outside the recognized set.
pub fn normalize(raw: &Value, source: SourceKind) -> Option<LegalDocument> {
    let draft = match source {
        SourceKind::CourtListener => from_courtlistener(raw),
        SourceKind::GovInfo => from_govinfo(raw),
        SourceKind::Ecfr => from_ecfr(raw),
        SourceKind::RegulationsGov => from_regulations_gov(raw),
    };

    let Some(draft) = draft else {
        debug!(%source, "skipping record without identifier or text");
        return None;
    };

    let jurisdiction = match text_field(raw, "jurisdiction") {
        Some(label) => match label.parse::<Jurisdiction>() {
            Ok(jurisdiction) => jurisdiction,
            Err(_) => {
                warn!(%source, id = %draft.id, jurisdiction = %label, "skipping record with unrecognized jurisdiction");
                return None;
            }
        },
        None => draft.default_jurisdiction,
    };

    let snippet = if draft.snippet.trim().is_empty() {
        truncate_chars(&draft.text, SNIPPET_CHARS)
    } else {
        truncate_chars(&draft.snippet, SNIPPET_CHARS)
    };

    Some(LegalDocument {
        id: draft.id,
        case_name: draft.case_name,
        citation: draft.citation,
        court: draft.court,
        jurisdiction,
        date_filed: draft.date_filed,
        text: draft.text,
        snippet,
        url: draft.url,
        document_type: draft.document_type,
    })
}

/// Normalize a batch of raw payloads, dropping records that fail normalization.
pub fn normalize_batch<'a, I>(raws: I, source: SourceKind) -> Vec<LegalDocument>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut skipped = 0usize;
    let documents: Vec<LegalDocument> = raws
        .into_iter()
        .filter_map(|raw| {
            let doc = normalize(raw, source);
            if doc.is_none() {
                skipped += 1;
            }
            doc
        })
        .collect();
    info!(%source, normalized = documents.len(), skipped, "normalized source records");
    documents
}

/// Heuristic jurisdiction for a CourtListener court identifier.
///
/// Known federal appellate/specialty courts, district courts and bankruptcy
/// courts are federal; everything else is treated as a state court.
pub fn courtlistener_jurisdiction(court: &str) -> Jurisdiction {
    let court = court.trim().to_ascii_lowercase();
    let trial = FEDERAL_TRIAL_COURT.is_match(&court)
        && !STATE_COURT_COLLISIONS.contains(&court.as_str());
    if FEDERAL_COURTS.contains(&court.as_str()) || trial {
        Jurisdiction::Federal
    } else {
        Jurisdiction::State
    }
}

struct Draft {
    id: String,
    case_name: String,
    citation: String,
    court: String,
    default_jurisdiction: Jurisdiction,
    date_filed: String,
    text: String,
    snippet: String,
    url: String,
    document_type: DocumentType,
}

fn from_courtlistener(raw: &Value) -> Option<Draft> {
    let id = text_field(raw, "id")?;
    let snippet = text_field(raw, "snippet").unwrap_or_default();
    let text = text_field(raw, "text").or_else(|| non_empty(snippet.clone()))?;
    let court = text_field(raw, "court").unwrap_or_default();
    let citation = match raw.get("citation") {
        Some(Value::Array(items)) => items.iter().find_map(scalar_text).unwrap_or_default(),
        Some(other) => scalar_text(other).unwrap_or_default(),
        None => String::new(),
    };
    let url = text_field(raw, "absolute_url")
        .map(|path| {
            if path.starts_with('/') { format!("{COURTLISTENER_HOST}{path}") } else { path }
        })
        .unwrap_or_default();

    Some(Draft {
        id,
        case_name: text_field(raw, "caseName").unwrap_or_default(),
        citation,
        default_jurisdiction: courtlistener_jurisdiction(&court),
        court,
        date_filed: text_field(raw, "dateFiled").unwrap_or_default(),
        text,
        snippet,
        url,
        document_type: DocumentType::CaseLaw,
    })
}

fn from_govinfo(raw: &Value) -> Option<Draft> {
    let id = text_field(raw, "packageId")?;
    let title = text_field(raw, "title");
    let summary = text_field(raw, "summary");
    let text = summary.clone().or_else(|| title.clone())?;

    Some(Draft {
        id,
        case_name: title.unwrap_or_default(),
        citation: text_field(raw, "citation").unwrap_or_default(),
        court: "govinfo".to_string(),
        default_jurisdiction: Jurisdiction::Federal,
        date_filed: text_field(raw, "dateIssued").unwrap_or_default(),
        text,
        snippet: summary.unwrap_or_default(),
        url: text_field(raw, "packageLink").unwrap_or_default(),
        document_type: DocumentType::Regulation,
    })
}

fn from_ecfr(raw: &Value) -> Option<Draft> {
    let title = text_field(raw, "title_number")?;
    let section = text_field(raw, "section_number")?;
    let section_title = text_field(raw, "section_title");
    let text = text_field(raw, "full_text").or_else(|| section_title.clone())?;

    Some(Draft {
        id: format!("ecfr_{title}_{section}"),
        case_name: section_title.unwrap_or_default(),
        citation: format!("{title} CFR {section}"),
        court: "ecfr".to_string(),
        default_jurisdiction: Jurisdiction::Federal,
        date_filed: text_field(raw, "effective_date").unwrap_or_default(),
        text,
        snippet: text_field(raw, "snippet").unwrap_or_default(),
        url: text_field(raw, "html_url").unwrap_or_default(),
        document_type: DocumentType::Regulation,
    })
}

fn from_regulations_gov(raw: &Value) -> Option<Draft> {
    let id = text_field(raw, "id")?;
    let attributes = raw.get("attributes").unwrap_or(&Value::Null);
    let title = text_field(attributes, "title");
    let summary = text_field(attributes, "summary");
    let text = summary.clone().or_else(|| title.clone())?;

    Some(Draft {
        url: format!("https://www.regulations.gov/document/{id}"),
        id,
        case_name: title.unwrap_or_default(),
        citation: text_field(attributes, "documentId").unwrap_or_default(),
        court: "regulations_gov".to_string(),
        default_jurisdiction: Jurisdiction::Federal,
        date_filed: text_field(attributes, "postedDate").unwrap_or_default(),
        text,
        snippet: summary.unwrap_or_default(),
        document_type: DocumentType::RegulatoryComment,
    })
}

/// Non-empty string or number field, stringified.
fn text_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn courtlistener_record_maps_fields() {
        let raw = json!({
            "id": 4821,
            "caseName": "Miranda v. Arizona",
            "citation": ["384 U.S. 436", "86 S. Ct. 1602"],
            "court": "scotus",
            "dateFiled": "1966-06-13",
            "snippet": "custodial interrogation",
            "absolute_url": "/opinion/4821/miranda-v-arizona/",
            "text": "The prosecution may not use statements..."
        });
        let doc = normalize(&raw, SourceKind::CourtListener).unwrap();
        assert_eq!(doc.id, "4821");
        assert_eq!(doc.citation, "384 U.S. 436");
        assert_eq!(doc.jurisdiction, Jurisdiction::Federal);
        assert_eq!(doc.url, "https://www.courtlistener.com/opinion/4821/miranda-v-arizona/");
        assert_eq!(doc.document_type, DocumentType::CaseLaw);
    }

    #[test]
    fn courtlistener_text_falls_back_to_snippet() {
        let raw = json!({"id": "x1", "court": "cal", "snippet": "habitability"});
        let doc = normalize(&raw, SourceKind::CourtListener).unwrap();
        assert_eq!(doc.text, "habitability");
        assert_eq!(doc.jurisdiction, Jurisdiction::State);
        assert_eq!(doc.citation, "");
    }

    #[test]
    fn records_without_id_or_text_are_skipped() {
        assert!(normalize(&json!({"caseName": "No id", "text": "t"}), SourceKind::CourtListener).is_none());
        assert!(normalize(&json!({"id": "1", "court": "ca9"}), SourceKind::CourtListener).is_none());
        assert!(normalize(&json!({"title_number": 29}), SourceKind::Ecfr).is_none());
    }

    #[test]
    fn explicit_unrecognized_jurisdiction_is_rejected() {
        let raw = json!({"id": "1", "text": "t", "court": "ca9", "jurisdiction": "tribal"});
        assert!(normalize(&raw, SourceKind::CourtListener).is_none());
        let raw = json!({"id": "1", "text": "t", "court": "californiad", "jurisdiction": "federal"});
        assert_eq!(normalize(&raw, SourceKind::CourtListener).unwrap().jurisdiction, Jurisdiction::Federal);
    }

    #[test]
    fn court_heuristic() {
        for court in ["scotus", "ca9", "cadc", "cand", "nysd", "dcd", "ilnd"] {
            assert_eq!(courtlistener_jurisdiction(court), Jurisdiction::Federal, "{court}");
        }
        for court in ["cal", "calctapp", "nyappdiv", "tex", "md", ""] {
            assert_eq!(courtlistener_jurisdiction(court), Jurisdiction::State, "{court}");
        }
    }

    #[test]
    fn bankruptcy_courts_are_federal() {
        for court in ["canb", "nysb", "deb", "txsb"] {
            assert_eq!(courtlistener_jurisdiction(court), Jurisdiction::Federal, "{court}");
        }
    }

    #[test]
    fn state_ids_shaped_like_trial_courts_stay_state() {
        assert_eq!(courtlistener_jurisdiction("ind"), Jurisdiction::State);
        assert_eq!(courtlistener_jurisdiction("neb"), Jurisdiction::State);
        assert_eq!(courtlistener_jurisdiction("insd"), Jurisdiction::Federal);
    }

    #[test]
    fn ecfr_builds_citation_and_id() {
        let raw = json!({
            "title_number": 29,
            "section_number": "1630.2",
            "section_title": "Definitions",
            "effective_date": "2023-01-01",
            "html_url": "https://www.ecfr.gov/current/title-29/section-1630.2"
        });
        let doc = normalize(&raw, SourceKind::Ecfr).unwrap();
        assert_eq!(doc.id, "ecfr_29_1630.2");
        assert_eq!(doc.citation, "29 CFR 1630.2");
        assert_eq!(doc.text, "Definitions");
        assert_eq!(doc.jurisdiction, Jurisdiction::Federal);
        assert_eq!(doc.document_type, DocumentType::Regulation);
    }

    #[test]
    fn regulations_gov_reads_nested_attributes() {
        let raw = json!({
            "id": "EPA-HQ-OAR-2021-0317-0001",
            "attributes": {
                "title": "Methane emissions standards",
                "documentId": "EPA-HQ-OAR-2021-0317-0001",
                "postedDate": "2021-11-15T05:00:00Z",
                "summary": "Proposed standards for oil and gas sources."
            }
        });
        let doc = normalize(&raw, SourceKind::RegulationsGov).unwrap();
        assert_eq!(doc.document_type, DocumentType::RegulatoryComment);
        assert_eq!(doc.court, "regulations_gov");
        assert_eq!(doc.url, "https://www.regulations.gov/document/EPA-HQ-OAR-2021-0317-0001");
        assert_eq!(doc.snippet, "Proposed standards for oil and gas sources.");
    }

    #[test]
    fn govinfo_summary_falls_back_to_title() {
        let raw = json!({"packageId": "CFR-2023-title29-vol4", "title": "Labor"});
        let doc = normalize(&raw, SourceKind::GovInfo).unwrap();
        assert_eq!(doc.text, "Labor");
        assert_eq!(doc.snippet, "Labor");
    }

    #[test]
    fn batch_drops_only_bad_records() {
        let raws = [json!({"id": "1", "text": "a", "court": "ca1"}), json!({"text": "b"})];
        let docs = normalize_batch(&raws, SourceKind::CourtListener);
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn source_kind_parses_aliases() {
        assert_eq!("regulations_gov".parse::<SourceKind>().unwrap(), SourceKind::RegulationsGov);
        assert!("westlaw".parse::<SourceKind>().is_err());
    }
}
