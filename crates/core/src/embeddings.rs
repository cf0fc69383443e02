use crate::error::EmbeddingError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// What the embedding is for. Document embeddings may carry a title so the
/// provider can weigh it; query embeddings never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    Document,
    Query,
}

impl EmbeddingTask {
    pub fn as_api_tag(&self) -> &'static str {
        match self {
            EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
            EmbeddingTask::Query => "SEMANTIC_SIMILARITY",
        }
    }
}

#[async_trait]
pub trait Embedder {
    fn dimensions(&self) -> usize;

    async fn embed(
        &self,
        text: &str,
        title: Option<&str>,
        task: EmbeddingTask,
    ) -> Result<Vec<f32>, EmbeddingError>;
}

/// Embedding client for the Gemini `embedContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:embedContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn build_request_body(&self, text: &str, title: Option<&str>, task: EmbeddingTask) -> Value {
        let mut body = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [ { "text": text } ] },
            "taskType": task.as_api_tag(),
            "outputDimensionality": self.dimensions,
        });
        if let Some(title) = title {
            body["title"] = json!(title);
        }
        body
    }

    fn parse_response(body: &Value) -> Result<Vec<f32>, EmbeddingError> {
        let values = body
            .pointer("/embedding/values")
            .and_then(Value::as_array)
            .ok_or_else(|| EmbeddingError::InvalidResponse {
                provider: "gemini".to_string(),
                details: "missing embedding values array".to_string(),
            })?;

        values
            .iter()
            .map(|value| {
                value.as_f64().map(|number| number as f32).ok_or_else(|| {
                    EmbeddingError::InvalidResponse {
                        provider: "gemini".to_string(),
                        details: "non-numeric embedding component".to_string(),
                    }
                })
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(
        &self,
        text: &str,
        title: Option<&str>,
        task: EmbeddingTask,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let body = self.build_request_body(text, title, task);
        debug!(model = %self.model, task = task.as_api_tag(), "requesting embedding");

        let response = self
            .client
            .post(self.endpoint_url())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        Self::parse_response(&payload)
    }
}

/// Deterministic local embedder hashing character trigrams into a
/// fixed-size L2-normalized vector. Useful offline and in tests; cosine
/// scores from it track lexical overlap rather than meaning.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let characters: Vec<char> = lowered.chars().collect();

        for window in characters.windows(3) {
            let mut hash: u64 = 1469598103934665603;
            for character in window {
                let mut buffer = [0u8; 4];
                for byte in character.encode_utf8(&mut buffer).bytes() {
                    hash ^= u64::from(byte);
                    hash = hash.wrapping_mul(1099511628211);
                }
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(
        &self,
        text: &str,
        _title: Option<&str>,
        _task: EmbeddingTask,
    ) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_text(text))
    }
}
