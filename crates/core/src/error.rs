use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("pdf extraction error: {0}")]
    Extraction(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid response from {provider}: {details}")]
    InvalidResponse { provider: String, details: String },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("bulk write rejected {rejected} document(s): {first_reason}")]
    BulkRejected { rejected: usize, first_reason: String },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding failed for chunk {chunk}: {source}")]
    Embedding {
        chunk: String,
        #[source]
        source: EmbeddingError,
    },

    #[error("index write failed: {0}")]
    Write(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("similarity search failed: {0}")]
    Search(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid response from {provider}: {details}")]
    InvalidResponse { provider: String, details: String },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("collection setup failed: {0}")]
    Collection(#[from] SearchError),

    #[error("indexing failed: {0}")]
    Index(#[from] IndexError),

    #[error("question answering failed: {0}")]
    Agent(#[from] AgentError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
