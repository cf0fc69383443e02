pub mod agent;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod indexer;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod retriever;
pub mod retry;
pub mod stores;
pub mod traits;

pub use agent::{AgentConfig, RagAgent, DEFAULT_AGENT_NAME, DEFAULT_SYSTEM_INSTRUCTIONS};
pub use chunking::{chunk_by_words, ChunkingConfig};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbeddingTask, GeminiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{
    AgentError, EmbeddingError, GenerationError, IndexError, IngestError, PipelineError,
    RetrievalError, SearchError,
};
pub use extractor::{discover_pdf_files, PdfExtractor, PdfSource};
pub use generation::{
    GeminiGenerator, GenerationOptions, GenerationRequest, Role, TextGenerator, Turn,
};
pub use indexer::ChunkIndexer;
pub use models::{DocumentChunk, EmbeddedChunk, RetrievedChunk, UNKNOWN_USER};
pub use orchestrator::{IndexRequest, IndexSummary, PipelineOptions, RagPipeline};
pub use prompts::DEFAULT_RAG_PROMPT;
pub use retriever::{Retriever, RetrieverConfig, DEFAULT_TOP_K};
pub use retry::{with_retry, RetryPolicy};
pub use stores::{ElasticStore, MemoryStore};
pub use traits::SearchIndex;
