use crate::error::SearchError;
use crate::models::{EmbeddedChunk, RetrievedChunk};
use async_trait::async_trait;

/// A vector collection backend: schema management, bulk writes keyed by the
/// chunks' composite ids, and cosine similarity search.
#[async_trait]
pub trait SearchIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool, SearchError>;

    async fn create_collection(&self, name: &str, embedding_dim: usize) -> Result<(), SearchError>;

    async fn bulk_upsert(&self, name: &str, chunks: &[EmbeddedChunk]) -> Result<(), SearchError>;

    async fn similarity_search(
        &self,
        name: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, SearchError>;

    async fn delete_collection(&self, name: &str) -> Result<(), SearchError>;
}
