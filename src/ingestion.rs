//! Document sources feeding the index build.
//!
//! Extraction of text from source formats (PDF parsing and the like) happens
//! outside this crate; a [`DocumentSource`] hands over plain-text documents
//! with bibliographic metadata already attached. Missing metadata fields are
//! represented as literal `"Unknown <Field>"` placeholders so downstream
//! citation formatting never sees an absent value.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::types::ClaimscopeError;

/// Bibliographic metadata inherited by every chunk of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub source_id: String,
}

impl DocMetadata {
    /// Replaces empty fields with their `"Unknown <Field>"` placeholder.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        fill_placeholder(&mut self.title, "Unknown Title");
        fill_placeholder(&mut self.author, "Unknown Author");
        fill_placeholder(&mut self.year, "Unknown Year");
        fill_placeholder(&mut self.doi, "Unknown DOI");
        fill_placeholder(&mut self.source_id, "Unknown Source");
        self
    }

    /// Inline citation tag in `(Author, Year)` form.
    pub fn citation(&self) -> String {
        format!("({}, {})", self.author, self.year)
    }
}

fn fill_placeholder(field: &mut String, placeholder: &str) {
    if field.trim().is_empty() {
        *field = placeholder.to_string();
    }
}

/// A source document as handed over by the ingestion collaborator.
///
/// Immutable once received; one document yields an ordered run of chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocMetadata,
}

/// Boundary to the ingestion collaborator that produces the corpus.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Loads the full corpus. Called once per rebuild.
    async fn load(&self) -> Result<Vec<Document>, ClaimscopeError>;
}

/// Reads `{text, metadata}` records from `*.json` files in a directory.
///
/// Each file holds one document. Files are visited in lexicographic order so
/// rebuilds over an unchanged corpus produce the same chunk ordering.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    root: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentSource for JsonDirectorySource {
    async fn load(&self) -> Result<Vec<Document>, ClaimscopeError> {
        let mut dir = fs::read_dir(&self.root).await.map_err(|err| {
            ClaimscopeError::Ingestion(format!(
                "literature directory {} unreadable: {err}",
                self.root.display()
            ))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|err| {
            ClaimscopeError::Ingestion(format!("failed to walk literature directory: {err}"))
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path).await.map_err(|err| {
                ClaimscopeError::Ingestion(format!("failed to read {}: {err}", path.display()))
            })?;
            let mut document: Document = serde_json::from_str(&content).map_err(|err| {
                ClaimscopeError::Ingestion(format!("failed to parse {}: {err}", path.display()))
            })?;
            document.metadata = document.metadata.normalized();
            debug!(path = %path.display(), "loaded document");
            documents.push(document);
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn normalized_fills_missing_fields() {
        let metadata = DocMetadata {
            title: "A Study".to_string(),
            author: String::new(),
            year: "  ".to_string(),
            doi: String::new(),
            source_id: "paper.pdf".to_string(),
        }
        .normalized();

        assert_eq!(metadata.title, "A Study");
        assert_eq!(metadata.author, "Unknown Author");
        assert_eq!(metadata.year, "Unknown Year");
        assert_eq!(metadata.doi, "Unknown DOI");
        assert_eq!(metadata.source_id, "paper.pdf");
    }

    #[test]
    fn citation_uses_author_and_year() {
        let metadata = DocMetadata {
            title: String::new(),
            author: "Doe".to_string(),
            year: "2021".to_string(),
            doi: String::new(),
            source_id: String::new(),
        };
        assert_eq!(metadata.citation(), "(Doe, 2021)");
    }

    #[tokio::test]
    async fn directory_source_loads_sorted_documents() {
        let dir = tempdir().unwrap();
        let write = |name: &str, text: &str| {
            let body = serde_json::json!({
                "text": text,
                "metadata": { "author": "Doe", "year": "2020" }
            });
            std::fs::write(dir.path().join(name), body.to_string()).unwrap();
        };
        write("b.json", "second");
        write("a.json", "first");
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = JsonDirectorySource::new(dir.path());
        let documents = source.load().await.unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].text, "first");
        assert_eq!(documents[1].text, "second");
        // Placeholders for fields the files never set.
        assert_eq!(documents[0].metadata.title, "Unknown Title");
    }

    #[tokio::test]
    async fn missing_directory_is_an_ingestion_error() {
        let source = JsonDirectorySource::new("/definitely/not/here");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, ClaimscopeError::Ingestion(_)));
    }
}
