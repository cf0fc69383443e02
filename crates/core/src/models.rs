use serde::{Deserialize, Serialize};

/// User id recorded on chunks when the caller did not supply one.
pub const UNKNOWN_USER: &str = "unknown_user";

/// One windowed slice of a document's text, ready for embedding.
///
/// `chunk_id` is zero-based and increases across page boundaries, so the
/// sequence for a whole document is contiguous regardless of how many pages
/// contributed text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub document_id: String,
    pub user_id: String,
    pub title: String,
    pub chunk_id: u32,
    pub text: String,
    pub source_file: Option<String>,
    pub page_number: Option<u32>,
}

impl DocumentChunk {
    /// Stable identifier used as the storage key, so re-indexing the same
    /// chunk overwrites instead of duplicating.
    pub fn composite_id(&self) -> String {
        format!("{}_{}_{}", self.user_id, self.document_id, self.chunk_id)
    }
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

/// A search hit as surfaced to the generation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub title: String,
    pub text: String,
    pub score: f64,
}
