use crate::agent::{AgentConfig, RagAgent};
use crate::chunking::ChunkingConfig;
use crate::embeddings::Embedder;
use crate::error::PipelineError;
use crate::extractor::{PdfExtractor, PdfSource};
use crate::generation::TextGenerator;
use crate::indexer::ChunkIndexer;
use crate::retriever::{Retriever, RetrieverConfig};
use crate::retry::RetryPolicy;
use crate::traits::SearchIndex;
use serde::Serialize;
use tracing::{info, warn};

/// A batch of PDF sources to index for one user session. When `collection`
/// is `None` the session-scoped default name is used.
#[derive(Debug, Clone)]
pub struct IndexRequest {
    pub user_id: String,
    pub session_id: String,
    pub collection: Option<String>,
    pub sources: Vec<PdfSource>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IndexSummary {
    pub collection: String,
    pub documents_indexed: usize,
    pub chunks_indexed: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunking: ChunkingConfig,
    pub embedding_retry: RetryPolicy,
    pub retriever: RetrieverConfig,
    pub agent: AgentConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            embedding_retry: RetryPolicy::embedding(),
            retriever: RetrieverConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

/// Wires extraction, indexing, retrieval, and generation together over one
/// store, one embedder, and one generator.
///
/// `index_documents` processes sources in order and stops at the first
/// failure. If that failure happens before any chunk was written and the
/// collection was created by this very call, the empty collection is
/// deleted again before the error is returned; cleanup failures are logged
/// and otherwise ignored.
pub struct RagPipeline<S, E, G> {
    store: S,
    embedder: E,
    generator: G,
    options: PipelineOptions,
}

impl<S, E, G> RagPipeline<S, E, G>
where
    S: SearchIndex + Clone + Send + Sync,
    E: Embedder + Clone + Send + Sync,
    G: TextGenerator + Clone + Send + Sync,
{
    pub fn new(store: S, embedder: E, generator: G) -> Self {
        Self {
            store,
            embedder,
            generator,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Default collection name for a user session.
    pub fn collection_name(user_id: &str, session_id: &str) -> String {
        format!("index-{user_id}-{session_id}")
    }

    pub async fn index_documents(
        &self,
        request: &IndexRequest,
    ) -> Result<IndexSummary, PipelineError> {
        let collection = request
            .collection
            .clone()
            .unwrap_or_else(|| Self::collection_name(&request.user_id, &request.session_id));

        let extractor = PdfExtractor::new(&request.user_id).with_chunking(self.options.chunking);
        let indexer = ChunkIndexer::new(self.store.clone(), self.embedder.clone(), &collection)
            .with_retry_policy(self.options.embedding_retry);

        let created = indexer.ensure_collection().await?;
        info!(
            collection = %collection,
            created,
            sources = request.sources.len(),
            "indexing documents"
        );

        let mut documents_indexed = 0;
        let mut chunks_indexed = 0;

        for source in &request.sources {
            let written = match self.index_single(&extractor, &indexer, source).await {
                Ok(written) => written,
                Err(error) => {
                    if created && chunks_indexed == 0 {
                        warn!(
                            collection = %collection,
                            "removing collection created by this call after a failed start"
                        );
                        if let Err(cleanup_error) =
                            self.store.delete_collection(&collection).await
                        {
                            warn!(
                                collection = %collection,
                                error = %cleanup_error,
                                "cleanup of the empty collection failed"
                            );
                        }
                    }
                    return Err(error);
                }
            };
            documents_indexed += 1;
            chunks_indexed += written;
        }

        info!(
            collection = %collection,
            documents_indexed,
            chunks_indexed,
            "indexing complete"
        );
        Ok(IndexSummary {
            collection,
            documents_indexed,
            chunks_indexed,
        })
    }

    async fn index_single(
        &self,
        extractor: &PdfExtractor,
        indexer: &ChunkIndexer<S, E>,
        source: &PdfSource,
    ) -> Result<usize, PipelineError> {
        let chunks = extractor.extract(source)?;
        Ok(indexer.index(&chunks).await?)
    }

    pub async fn answer(&self, collection: &str, question: &str) -> Result<String, PipelineError> {
        let retriever = Retriever::new(self.store.clone(), self.embedder.clone(), collection)
            .with_config(self.options.retriever.clone());
        let agent = RagAgent::new(retriever, self.generator.clone())
            .with_config(self.options.agent.clone());
        Ok(agent.run(question).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::{GenerationError, SearchError};
    use crate::extractor::pdf_bytes_with_pages;
    use crate::generation::GenerationRequest;
    use crate::models::{EmbeddedChunk, RetrievedChunk};
    use crate::stores::MemoryStore;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct EchoGenerator {
        captured: Arc<Mutex<Vec<GenerationRequest>>>,
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.captured.lock().unwrap().push(request.clone());
            Ok("pipeline answer".to_string())
        }
    }

    #[derive(Clone)]
    struct FailingWriteStore {
        inner: MemoryStore,
        deleted: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SearchIndex for FailingWriteStore {
        async fn collection_exists(&self, name: &str) -> Result<bool, SearchError> {
            self.inner.collection_exists(name).await
        }

        async fn create_collection(
            &self,
            name: &str,
            embedding_dim: usize,
        ) -> Result<(), SearchError> {
            self.inner.create_collection(name, embedding_dim).await
        }

        async fn bulk_upsert(
            &self,
            _name: &str,
            _chunks: &[EmbeddedChunk],
        ) -> Result<(), SearchError> {
            Err(SearchError::Request("write refused".to_string()))
        }

        async fn similarity_search(
            &self,
            name: &str,
            query_vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<RetrievedChunk>, SearchError> {
            self.inner.similarity_search(name, query_vector, top_k).await
        }

        async fn delete_collection(&self, name: &str) -> Result<(), SearchError> {
            self.deleted.lock().unwrap().push(name.to_string());
            self.inner.delete_collection(name).await
        }
    }

    fn pipeline_with_memory(
        captured: Arc<Mutex<Vec<GenerationRequest>>>,
    ) -> (
        MemoryStore,
        RagPipeline<MemoryStore, CharacterNgramEmbedder, EchoGenerator>,
    ) {
        let store = MemoryStore::new();
        let pipeline = RagPipeline::new(
            store.clone(),
            CharacterNgramEmbedder::default(),
            EchoGenerator { captured },
        );
        (store, pipeline)
    }

    #[tokio::test]
    async fn indexing_then_retrieving_finds_the_matching_chunk_first() {
        let page_one = "the hydraulic pump regulates oil pressure in the main circuit";
        let page_two = "wiring diagrams for the control cabinet follow in the appendix";
        let (store, pipeline) = pipeline_with_memory(Arc::new(Mutex::new(Vec::new())));

        let request = IndexRequest {
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            collection: None,
            sources: vec![PdfSource::bytes(pdf_bytes_with_pages(&[page_one, page_two]))],
        };
        let summary = pipeline.index_documents(&request).await.unwrap();

        assert_eq!(summary.collection, "index-user-1-sess-1");
        assert_eq!(summary.documents_indexed, 1);
        assert_eq!(summary.chunks_indexed, 2);
        assert_eq!(store.record_count(&summary.collection), 2);

        let retriever = Retriever::new(
            store.clone(),
            CharacterNgramEmbedder::default(),
            summary.collection.clone(),
        );
        let top = retriever.retrieve_top_k(page_one, 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].text, page_one);

        let both = retriever.retrieve_top_k(page_one, 2).await.unwrap();
        assert_eq!(both.len(), 2);
        assert!(both[0].score > both[1].score);
    }

    #[tokio::test]
    async fn answer_runs_the_agent_against_the_collection() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let (_store, pipeline) = pipeline_with_memory(captured.clone());

        let request = IndexRequest {
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            collection: Some("docs".to_string()),
            sources: vec![PdfSource::bytes(pdf_bytes_with_pages(&[
                "the hydraulic pump regulates oil pressure",
            ]))],
        };
        pipeline.index_documents(&request).await.unwrap();

        let answer = pipeline
            .answer("docs", "what does the hydraulic pump do?")
            .await
            .unwrap();

        assert_eq!(answer, "pipeline answer");
        let requests = captured.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].turns[0].parts[0];
        assert!(prompt.contains("Title:"));
        assert!(prompt.contains("the hydraulic pump regulates oil pressure"));
    }

    #[tokio::test]
    async fn explicit_collection_name_overrides_the_session_default() {
        let (_store, pipeline) = pipeline_with_memory(Arc::new(Mutex::new(Vec::new())));
        let request = IndexRequest {
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            collection: Some("shared-docs".to_string()),
            sources: vec![PdfSource::bytes(pdf_bytes_with_pages(&["some text here"]))],
        };
        let summary = pipeline.index_documents(&request).await.unwrap();
        assert_eq!(summary.collection, "shared-docs");
    }

    #[tokio::test]
    async fn whitespace_only_document_counts_without_chunks() {
        let (store, pipeline) = pipeline_with_memory(Arc::new(Mutex::new(Vec::new())));
        let request = IndexRequest {
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            collection: None,
            sources: vec![PdfSource::bytes(pdf_bytes_with_pages(&["   "]))],
        };

        let summary = pipeline.index_documents(&request).await.unwrap();

        assert_eq!(summary.documents_indexed, 1);
        assert_eq!(summary.chunks_indexed, 0);
        assert_eq!(store.record_count(&summary.collection), 0);
        assert!(store.collection_exists(&summary.collection).await.unwrap());
    }

    #[tokio::test]
    async fn failed_first_write_removes_the_collection_it_created() {
        let store = FailingWriteStore {
            inner: MemoryStore::new(),
            deleted: Arc::new(Mutex::new(Vec::new())),
        };
        let pipeline = RagPipeline::new(
            store.clone(),
            CharacterNgramEmbedder::default(),
            EchoGenerator {
                captured: Arc::new(Mutex::new(Vec::new())),
            },
        );
        let request = IndexRequest {
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            collection: None,
            sources: vec![PdfSource::bytes(pdf_bytes_with_pages(&["some text here"]))],
        };

        let result = pipeline.index_documents(&request).await;

        assert!(matches!(result, Err(PipelineError::Index(_))));
        assert_eq!(
            store.deleted.lock().unwrap().as_slice(),
            ["index-user-1-sess-1"]
        );
        assert!(!store
            .inner
            .collection_exists("index-user-1-sess-1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn preexisting_collections_survive_a_failed_write() {
        let inner = MemoryStore::new();
        inner.create_collection("docs", 768).await.unwrap();
        let store = FailingWriteStore {
            inner,
            deleted: Arc::new(Mutex::new(Vec::new())),
        };
        let pipeline = RagPipeline::new(
            store.clone(),
            CharacterNgramEmbedder::default(),
            EchoGenerator {
                captured: Arc::new(Mutex::new(Vec::new())),
            },
        );
        let request = IndexRequest {
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            collection: Some("docs".to_string()),
            sources: vec![PdfSource::bytes(pdf_bytes_with_pages(&["some text here"]))],
        };

        let result = pipeline.index_documents(&request).await;

        assert!(result.is_err());
        assert!(store.deleted.lock().unwrap().is_empty());
        assert!(store.inner.collection_exists("docs").await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_source_stops_the_batch_with_an_ingest_error() {
        let (_store, pipeline) = pipeline_with_memory(Arc::new(Mutex::new(Vec::new())));
        let request = IndexRequest {
            user_id: "user-1".to_string(),
            session_id: "sess-1".to_string(),
            collection: None,
            sources: vec![PdfSource::bytes(b"%PDF-1.4\n%broken".to_vec())],
        };

        let result = pipeline.index_documents(&request).await;
        assert!(matches!(result, Err(PipelineError::Ingest(_))));
    }
}
