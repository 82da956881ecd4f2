//! Data types for legal documents, embedding records and retrieval results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LegalRagError;

/// Origin of a legal document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Jurisdiction {
    /// Federal courts, agencies and the U.S. Code.
    Federal,
    /// State courts and state law.
    State,
}

impl Jurisdiction {
    /// All recognized jurisdictions.
    pub const ALL: [Jurisdiction; 2] = [Jurisdiction::Federal, Jurisdiction::State];

    /// The lowercase label stored in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Federal => "federal",
            Self::State => "state",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Jurisdiction {
    type Err = LegalRagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "federal" => Ok(Self::Federal),
            "state" => Ok(Self::State),
            _ => Err(LegalRagError::InvalidField { field: "jurisdiction", value: s.to_string() }),
        }
    }
}

/// Kind of legal text a document holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// A court opinion.
    CaseLaw,
    /// A codified regulation (e.g. a CFR section).
    Regulation,
    /// A rulemaking document or public comment.
    RegulatoryComment,
    /// A statute.
    Statute,
}

impl DocumentType {
    /// The snake_case label stored in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaseLaw => "case_law",
            Self::Regulation => "regulation",
            Self::RegulatoryComment => "regulatory_comment",
            Self::Statute => "statute",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = LegalRagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "case_law" => Ok(Self::CaseLaw),
            "regulation" => Ok(Self::Regulation),
            "regulatory_comment" => Ok(Self::RegulatoryComment),
            "statute" => Ok(Self::Statute),
            _ => Err(LegalRagError::InvalidField { field: "document_type", value: s.to_string() }),
        }
    }
}

/// Jurisdiction scope inferred from a question by the agentic verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JurisdictionScope {
    /// Only federal law is relevant.
    Federal,
    /// Only state law is relevant.
    State,
    /// Both federal and state law are relevant.
    Both,
    /// The question gives no usable jurisdiction signal.
    Unspecified,
}

impl JurisdictionScope {
    /// The retrieval filter implied by this scope, if any.
    pub fn filter(&self) -> Option<Jurisdiction> {
        match self {
            Self::Federal => Some(Jurisdiction::Federal),
            Self::State => Some(Jurisdiction::State),
            Self::Both | Self::Unspecified => None,
        }
    }

    /// Lenient parse of a model-produced label. Returns `None` for unknown labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "federal" => Some(Self::Federal),
            "state" => Some(Self::State),
            "both" | "all" => Some(Self::Both),
            "unspecified" | "unknown" | "none" => Some(Self::Unspecified),
            _ => None,
        }
    }
}

impl fmt::Display for JurisdictionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Federal => "federal",
            Self::State => "state",
            Self::Both => "both",
            Self::Unspecified => "unspecified",
        };
        f.write_str(label)
    }
}

/// One legal text unit: a case, regulation, regulatory comment or statute.
///
/// Serialized field names are the persisted JSONL record format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalDocument {
    /// Unique identifier within a collection.
    pub id: String,
    /// Case or regulation name.
    pub case_name: String,
    /// Citation string, e.g. `384 U.S. 436 (1966)`.
    pub citation: String,
    /// Court or source identifier, e.g. `scotus` or `ecfr`.
    pub court: String,
    /// Federal or state origin.
    pub jurisdiction: Jurisdiction,
    /// Filing or effective date as reported by the source.
    pub date_filed: String,
    /// Full text used for embedding and as answer context.
    pub text: String,
    /// Short excerpt for display.
    pub snippet: String,
    /// Link to the original source.
    pub url: String,
    /// Kind of legal text.
    pub document_type: DocumentType,
}

impl LegalDocument {
    /// Display name, falling back when the source provided none.
    pub fn display_name(&self) -> &str {
        if self.case_name.trim().is_empty() { "Unknown" } else { &self.case_name }
    }

    /// Display citation, falling back to `N/A`.
    pub fn display_citation(&self) -> &str {
        if self.citation.trim().is_empty() { "N/A" } else { &self.citation }
    }

    /// Excerpt used in prompts: the snippet if present, otherwise the leading text.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let source = if self.text.trim().is_empty() { &self.snippet } else { &self.text };
        truncate_chars(source, max_chars)
    }
}

/// A stored vector paired with the document it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    /// The document identifier (the store key).
    pub id: String,
    /// The vector embedding of the document text.
    pub embedding: Vec<f32>,
    /// The document and its filterable metadata.
    pub document: LegalDocument,
}

/// A retrieved document with its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// The retrieved document.
    pub document: LegalDocument,
    /// Cosine distance to the query (lower is more similar).
    pub distance: f32,
}

impl RetrievedDocument {
    /// Similarity expressed as `1 - distance`.
    pub fn relevance(&self) -> f32 {
        1.0 - self.distance
    }
}

/// The documents retrieved for one query, ordered by ascending distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Retrieved documents, most similar first.
    pub documents: Vec<RetrievedDocument>,
}

impl RetrievalResult {
    /// Wrap retrieved documents, sorting them by ascending distance.
    pub fn new(mut documents: Vec<RetrievedDocument>) -> Self {
        documents.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Self { documents }
    }

    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of retrieved documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Document identifiers in rank order.
    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|r| r.document.id.as_str()).collect()
    }

    /// Iterate over the retrieved documents in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &RetrievedDocument> {
        self.documents.iter()
    }
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
