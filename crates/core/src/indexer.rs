use crate::embeddings::{Embedder, EmbeddingTask};
use crate::error::{IndexError, SearchError};
use crate::models::{DocumentChunk, EmbeddedChunk};
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::SearchIndex;
use tracing::{debug, info};

/// Embeds chunks and writes them to a collection in one bulk operation.
///
/// Embedding happens first for every chunk, each call wrapped in the retry
/// policy; nothing reaches the store until all vectors exist, so a document
/// is either written whole or not at all.
pub struct ChunkIndexer<S, E> {
    store: S,
    embedder: E,
    collection: String,
    retry: RetryPolicy,
}

impl<S, E> ChunkIndexer<S, E>
where
    S: SearchIndex + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(store: S, embedder: E, collection: impl Into<String>) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
            retry: RetryPolicy::embedding(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Creates the collection when missing; returns whether it was created.
    pub async fn ensure_collection(&self) -> Result<bool, SearchError> {
        if self.store.collection_exists(&self.collection).await? {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(false);
        }
        self.store
            .create_collection(&self.collection, self.embedder.dimensions())
            .await?;
        Ok(true)
    }

    /// Returns the number of chunks written. Empty input writes nothing and
    /// succeeds with zero.
    pub async fn index(&self, chunks: &[DocumentChunk]) -> Result<usize, IndexError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        info!(
            collection = %self.collection,
            chunk_count = chunks.len(),
            "embedding chunks"
        );

        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = with_retry(&self.retry, || {
                self.embedder
                    .embed(&chunk.text, Some(&chunk.title), EmbeddingTask::Document)
            })
            .await
            .map_err(|source| IndexError::Embedding {
                chunk: chunk.composite_id(),
                source,
            })?;
            embedded.push(EmbeddedChunk {
                chunk: chunk.clone(),
                embedding: vector,
            });
        }

        self.store
            .bulk_upsert(&self.collection, &embedded)
            .await
            .map_err(IndexError::Write)?;

        info!(
            collection = %self.collection,
            indexed = embedded.len(),
            "bulk write complete"
        );
        Ok(embedded.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::EmbeddingError;
    use crate::stores::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct FailingEmbedder {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn dimensions(&self) -> usize {
            4
        }

        async fn embed(
            &self,
            _text: &str,
            _title: Option<&str>,
            _task: EmbeddingTask,
        ) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EmbeddingError::Api {
                status: 503,
                body: "overloaded".to_string(),
            })
        }
    }

    fn chunk(chunk_id: u32, text: &str) -> DocumentChunk {
        DocumentChunk {
            document_id: "doc-1".to_string(),
            user_id: "alice".to_string(),
            title: "manual.pdf".to_string(),
            chunk_id,
            text: text.to_string(),
            source_file: None,
            page_number: Some(1),
        }
    }

    #[tokio::test]
    async fn ensure_collection_reports_creation_once() {
        let store = MemoryStore::new();
        let indexer = ChunkIndexer::new(store, CharacterNgramEmbedder::new(16), "docs");

        assert!(indexer.ensure_collection().await.unwrap());
        assert!(!indexer.ensure_collection().await.unwrap());
    }

    #[tokio::test]
    async fn empty_input_succeeds_without_touching_the_store() {
        let store = MemoryStore::new();
        let indexer = ChunkIndexer::new(store.clone(), CharacterNgramEmbedder::new(16), "docs");

        let written = indexer.index(&[]).await.unwrap();

        assert_eq!(written, 0);
        assert!(!store.collection_exists("docs").await.unwrap());
    }

    #[tokio::test]
    async fn chunks_are_written_under_their_composite_ids() {
        let store = MemoryStore::new();
        let indexer = ChunkIndexer::new(store.clone(), CharacterNgramEmbedder::new(16), "docs");
        indexer.ensure_collection().await.unwrap();

        let written = indexer
            .index(&[chunk(0, "pump pressure"), chunk(1, "valve sizing")])
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(store.record_count("docs"), 2);
    }

    #[tokio::test]
    async fn reindexing_the_same_chunks_keeps_the_record_count() {
        let store = MemoryStore::new();
        let indexer = ChunkIndexer::new(store.clone(), CharacterNgramEmbedder::new(16), "docs");
        indexer.ensure_collection().await.unwrap();

        let chunks = [chunk(0, "pump pressure"), chunk(1, "valve sizing")];
        indexer.index(&chunks).await.unwrap();
        indexer.index(&chunks).await.unwrap();

        assert_eq!(store.record_count("docs"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn embedding_exhaustion_prevents_any_write() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicU32::new(0));
        let indexer = ChunkIndexer::new(
            store.clone(),
            FailingEmbedder {
                calls: calls.clone(),
            },
            "docs",
        )
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            jitter: false,
        });
        indexer.ensure_collection().await.unwrap();

        let result = indexer
            .index(&[chunk(0, "pump pressure"), chunk(1, "valve sizing")])
            .await;

        assert!(matches!(result, Err(IndexError::Embedding { .. })));
        // The first chunk burns every attempt; the second is never tried.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.record_count("docs"), 0);
    }
}
