use crate::error::SearchError;
use crate::models::{EmbeddedChunk, RetrievedChunk};
use crate::traits::SearchIndex;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-process `SearchIndex` with exact cosine scoring.
///
/// Records are kept in insertion order, so equal scores rank by how early a
/// chunk was written. Upserts match on the composite id, mirroring how the
/// Elasticsearch store keys `_bulk` operations.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Collection>>>,
}

#[derive(Default)]
struct Collection {
    embedding_dim: usize,
    records: Vec<StoredRecord>,
}

struct StoredRecord {
    id: String,
    title: String,
    text: String,
    embedding: Vec<f32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held in `name`, zero when absent.
    pub fn record_count(&self, name: &str) -> usize {
        self.collections
            .lock()
            .map(|collections| {
                collections
                    .get(name)
                    .map(|collection| collection.records.len())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Collection>>, SearchError> {
        self.collections
            .lock()
            .map_err(|_| SearchError::Request("memory store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl SearchIndex for MemoryStore {
    async fn collection_exists(&self, name: &str) -> Result<bool, SearchError> {
        Ok(self.lock()?.contains_key(name))
    }

    async fn create_collection(&self, name: &str, embedding_dim: usize) -> Result<(), SearchError> {
        self.lock()?
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                embedding_dim,
                records: Vec::new(),
            });
        Ok(())
    }

    async fn bulk_upsert(&self, name: &str, chunks: &[EmbeddedChunk]) -> Result<(), SearchError> {
        let mut collections = self.lock()?;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| SearchError::Request(format!("no such collection: {name}")))?;

        let mismatched = chunks
            .iter()
            .filter(|embedded| embedded.embedding.len() != collection.embedding_dim)
            .count();
        if mismatched > 0 {
            return Err(SearchError::BulkRejected {
                rejected: mismatched,
                first_reason: format!(
                    "embedding dimensions do not match the collection schema ({})",
                    collection.embedding_dim
                ),
            });
        }

        for embedded in chunks {
            let record = StoredRecord {
                id: embedded.chunk.composite_id(),
                title: embedded.chunk.title.clone(),
                text: embedded.chunk.text.clone(),
                embedding: embedded.embedding.clone(),
            };
            match collection
                .records
                .iter_mut()
                .find(|existing| existing.id == record.id)
            {
                Some(existing) => *existing = record,
                None => collection.records.push(record),
            }
        }
        Ok(())
    }

    async fn similarity_search(
        &self,
        name: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        let collections = self.lock()?;
        let collection = collections
            .get(name)
            .ok_or_else(|| SearchError::Request(format!("no such collection: {name}")))?;

        let mut hits: Vec<RetrievedChunk> = collection
            .records
            .iter()
            .map(|record| RetrievedChunk {
                title: record.title.clone(),
                text: record.text.clone(),
                score: cosine_similarity(query_vector, &record.embedding),
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete_collection(&self, name: &str) -> Result<(), SearchError> {
        self.lock()?.remove(name);
        Ok(())
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    let mut dot = 0f64;
    let mut left_norm = 0f64;
    let mut right_norm = 0f64;
    for (l, r) in left.iter().zip(right.iter()) {
        dot += f64::from(*l) * f64::from(*r);
        left_norm += f64::from(*l) * f64::from(*l);
        right_norm += f64::from(*r) * f64::from(*r);
    }
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm.sqrt() * right_norm.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentChunk;

    fn embedded(chunk_id: u32, text: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: DocumentChunk {
                document_id: "doc-1".to_string(),
                user_id: "alice".to_string(),
                title: "manual.pdf".to_string(),
                chunk_id,
                text: text.to_string(),
                source_file: None,
                page_number: Some(1),
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let store = MemoryStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store.create_collection("docs", 2).await.unwrap();
        assert!(store.collection_exists("docs").await.unwrap());
    }

    #[tokio::test]
    async fn upsert_overwrites_by_composite_id() {
        let store = MemoryStore::new();
        store.create_collection("docs", 2).await.unwrap();

        store
            .bulk_upsert(
                "docs",
                &[
                    embedded(0, "first", vec![1.0, 0.0]),
                    embedded(1, "second", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        store
            .bulk_upsert("docs", &[embedded(0, "first, revised", vec![1.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(store.record_count("docs"), 2);
        let hits = store
            .similarity_search("docs", &[1.0, 0.0], 1)
            .await
            .unwrap();
        assert_eq!(hits[0].text, "first, revised");
    }

    #[tokio::test]
    async fn search_ranks_by_descending_cosine() {
        let store = MemoryStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .bulk_upsert(
                "docs",
                &[
                    embedded(0, "aligned", vec![1.0, 0.0]),
                    embedded(1, "orthogonal", vec![0.0, 1.0]),
                    embedded(2, "diagonal", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .similarity_search("docs", &[1.0, 0.0], 3)
            .await
            .unwrap();

        assert_eq!(hits[0].text, "aligned");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].text, "diagonal");
        assert_eq!(hits[2].text, "orthogonal");
        assert!(hits[2].score.abs() < 1e-6);
    }

    #[tokio::test]
    async fn top_k_truncates_the_result_list() {
        let store = MemoryStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .bulk_upsert(
                "docs",
                &[
                    embedded(0, "a", vec![1.0, 0.0]),
                    embedded(1, "b", vec![0.5, 0.5]),
                    embedded(2, "c", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .similarity_search("docs", &[1.0, 0.0], 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_a_bulk_rejection() {
        let store = MemoryStore::new();
        store.create_collection("docs", 3).await.unwrap();

        let result = store
            .bulk_upsert("docs", &[embedded(0, "short vector", vec![1.0, 0.0])])
            .await;

        assert!(matches!(
            result,
            Err(SearchError::BulkRejected { rejected: 1, .. })
        ));
        assert_eq!(store.record_count("docs"), 0);
    }

    #[tokio::test]
    async fn writes_to_a_missing_collection_fail() {
        let store = MemoryStore::new();
        let result = store
            .bulk_upsert("ghost", &[embedded(0, "text", vec![1.0])])
            .await;
        assert!(matches!(result, Err(SearchError::Request(_))));
    }

    #[tokio::test]
    async fn delete_removes_the_collection() {
        let store = MemoryStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store.delete_collection("docs").await.unwrap();
        assert!(!store.collection_exists("docs").await.unwrap());
    }
}
