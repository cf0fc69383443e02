use crate::embeddings::{Embedder, EmbeddingTask};
use crate::error::RetrievalError;
use crate::models::RetrievedChunk;
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::SearchIndex;
use tracing::{debug, info};

pub const DEFAULT_TOP_K: usize = 5;

/// Retrieval knobs. `query_retry` wraps only the query embedding call;
/// `None` surfaces the first embedding failure unchanged.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub top_k: usize,
    pub query_retry: Option<RetryPolicy>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            query_retry: Some(RetryPolicy::embedding()),
        }
    }
}

/// Embeds a query and runs a similarity search against one collection,
/// returning hits in the store's descending score order.
pub struct Retriever<S, E> {
    store: S,
    embedder: E,
    collection: String,
    config: RetrieverConfig,
}

impl<S, E> Retriever<S, E>
where
    S: SearchIndex + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(store: S, embedder: E, collection: impl Into<String>) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
            config: RetrieverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        self.retrieve_top_k(query, self.config.top_k).await
    }

    pub async fn retrieve_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        info!(collection = %self.collection, top_k, "running similarity search");

        let query_vector = match &self.config.query_retry {
            Some(policy) => {
                with_retry(policy, || {
                    self.embedder.embed(query, None, EmbeddingTask::Query)
                })
                .await?
            }
            None => self.embedder.embed(query, None, EmbeddingTask::Query).await?,
        };

        let hits = self
            .store
            .similarity_search(&self.collection, &query_vector, top_k)
            .await?;

        debug!(hit_count = hits.len(), "similarity search complete");
        Ok(hits)
    }
}
