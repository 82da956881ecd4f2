//! Newline-delimited JSON persistence for documents and relevance judgments.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::document::LegalDocument;
use crate::error::Result;

/// Query → identifiers of the documents judged relevant to it.
pub type RelevanceJudgments = HashMap<String, HashSet<String>>;

#[derive(Debug, Deserialize)]
struct JudgmentLine {
    query: String,
    relevant_ids: Vec<String>,
}

/// Write documents to `path`, one JSON object per line, replacing the file.
pub fn write_jsonl(path: impl AsRef<Path>, documents: &[LegalDocument]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_records(file, documents)?;
    info!(path = %path.as_ref().display(), count = documents.len(), "wrote corpus");
    Ok(())
}

/// Append documents to `path`, creating it when absent.
pub fn append_jsonl(path: impl AsRef<Path>, documents: &[LegalDocument]) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path.as_ref())?;
    write_records(file, documents)?;
    info!(path = %path.as_ref().display(), count = documents.len(), "appended to corpus");
    Ok(())
}

/// Read all documents from a JSONL corpus. Blank lines are ignored.
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<LegalDocument>> {
    let documents: Vec<LegalDocument> = read_lines(path.as_ref())?;
    info!(path = %path.as_ref().display(), count = documents.len(), "loaded corpus");
    Ok(documents)
}

/// Read relevance judgments from JSONL lines of `{"query": .., "relevant_ids": [..]}`.
///
/// Repeated queries merge their relevant sets.
pub fn read_judgments(path: impl AsRef<Path>) -> Result<RelevanceJudgments> {
    let lines: Vec<JudgmentLine> = read_lines(path.as_ref())?;
    let mut judgments = RelevanceJudgments::new();
    for line in lines {
        judgments.entry(line.query).or_default().extend(line.relevant_ids);
    }
    Ok(judgments)
}

pub(crate) fn write_records<T: Serialize>(file: File, records: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            error!(path = %path.display(), line = idx + 1, error = %e, "invalid JSONL record");
            e
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LegalRagError;
    use crate::sample::sample_corpus;

    #[test]
    fn round_trip_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        let corpus = sample_corpus();

        write_jsonl(&path, &corpus).unwrap();
        let loaded = read_jsonl(&path).unwrap();
        assert_eq!(loaded, corpus);
    }

    #[test]
    fn append_extends_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        let corpus = sample_corpus();

        write_jsonl(&path, &corpus[..3]).unwrap();
        append_jsonl(&path, &corpus[3..]).unwrap();
        assert_eq!(read_jsonl(&path).unwrap().len(), corpus.len());
    }

    #[test]
    fn records_use_flat_snake_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        write_jsonl(&path, &sample_corpus()[..1]).unwrap();

        let line = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["jurisdiction"], "federal");
        assert_eq!(value["document_type"], "case_law");
        assert_eq!(value["date_filed"], "2020-03-15");
    }

    #[test]
    fn unknown_jurisdiction_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        let mut value = serde_json::to_value(&sample_corpus()[0]).unwrap();
        value["jurisdiction"] = "county".into();
        std::fs::write(&path, format!("{value}\n")).unwrap();

        assert!(matches!(read_jsonl(&path), Err(LegalRagError::Json(_))));
    }

    #[test]
    fn judgments_merge_repeated_queries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("judgments.jsonl");
        std::fs::write(
            &path,
            "{\"query\": \"miranda\", \"relevant_ids\": [\"sample_3\"]}\n\n\
             {\"query\": \"miranda\", \"relevant_ids\": [\"sample_5\"]}\n",
        )
        .unwrap();

        let judgments = read_judgments(&path).unwrap();
        assert_eq!(judgments["miranda"].len(), 2);
    }
}
