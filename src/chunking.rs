//! Sliding-window chunking of documents into retrievable units.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ConfigError;
use crate::ingestion::{DocMetadata, Document};

/// A fixed-size, overlapping window of a source document; the unit of
/// retrieval. Position in the chunk store doubles as the row number of its
/// embedding in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub text: String,
    pub metadata: DocMetadata,
}

/// Splits document text into overlapping character windows.
///
/// A window of `chunk_size` characters slides with stride
/// `chunk_size - chunk_overlap`. The final window of a document may be
/// shorter when it reaches the end of the text; no window is dropped and no
/// window from one document is merged with another.
#[derive(Debug, Clone)]
pub struct WindowChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl WindowChunker {
    /// Creates a chunker; the stride `chunk_size - chunk_overlap` must be
    /// positive.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(ConfigError::Invalid {
                message: format!(
                    "chunk window ({chunk_size}) must exceed overlap ({chunk_overlap})"
                ),
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Chunks every document, preserving document order and in-document slide
    /// order. That ordering defines the chunk store's positional indexing.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for text in self.windows(&document.text) {
                chunks.push(Chunk {
                    id: Uuid::new_v4(),
                    text,
                    metadata: document.metadata.clone(),
                });
            }
        }
        chunks
    }

    /// Windows over one text. Operates on characters, not bytes, so multibyte
    /// input never splits a code point.
    fn windows(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let stride = self.chunk_size - self.chunk_overlap;
        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        windows
    }
}
