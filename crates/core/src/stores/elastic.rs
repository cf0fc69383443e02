use crate::error::SearchError;
use crate::models::{EmbeddedChunk, RetrievedChunk};
use crate::traits::SearchIndex;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Elasticsearch-backed `SearchIndex`.
///
/// Collections map to indices with a fixed chunk mapping; writes go through
/// the `_bulk` endpoint with the chunk's composite id as `_id`, and search
/// uses a `script_score` query computing cosine similarity against the
/// stored `dense_vector`.
#[derive(Clone)]
pub struct ElasticStore {
    client: Arc<Client>,
    endpoint: String,
    api_key: Option<String>,
}

impl ElasticStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SearchError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;
        Ok(Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("ApiKey {key}")),
            None => builder,
        }
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/{}", self.endpoint, name)
    }

    fn mapping_body(embedding_dim: usize) -> Value {
        json!({
            "mappings": {
                "properties": {
                    "document_id": {"type": "keyword"},
                    "title": {"type": "text"},
                    "user_id": {"type": "keyword"},
                    "chunk_id": {"type": "integer"},
                    "text": {"type": "text"},
                    "embedding": {"type": "dense_vector", "dims": embedding_dim},
                    "source_file": {"type": "keyword"},
                    "page_number": {"type": "integer"}
                }
            }
        })
    }

    fn search_body(query_vector: &[f32], top_k: usize) -> Value {
        json!({
            "size": top_k,
            "query": {
                "script_score": {
                    "query": {"match_all": {}},
                    "script": {
                        "source": "cosineSimilarity(params.query_vector, 'embedding')",
                        "params": {"query_vector": query_vector}
                    }
                }
            }
        })
    }
}

#[async_trait]
impl SearchIndex for ElasticStore {
    async fn collection_exists(&self, name: &str) -> Result<bool, SearchError> {
        let response = self
            .request(Method::HEAD, self.collection_url(name))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: format!("existence check for '{name}' returned {status}"),
            }),
        }
    }

    async fn create_collection(&self, name: &str, embedding_dim: usize) -> Result<(), SearchError> {
        let response = self
            .request(Method::PUT, self.collection_url(name))
            .json(&Self::mapping_body(embedding_dim))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Request(format!(
                "index creation for '{name}' failed with {}",
                response.status()
            )));
        }

        info!(collection = name, dims = embedding_dim, "created index");
        Ok(())
    }

    async fn bulk_upsert(&self, name: &str, chunks: &[EmbeddedChunk]) -> Result<(), SearchError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let payload = bulk_payload(name, chunks)?;
        let response = self
            .request(Method::POST, format!("{}/_bulk", self.endpoint))
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: format!("bulk write returned {}", response.status()),
            });
        }

        let body: Value = response.json().await?;
        check_bulk_errors(&body)?;

        debug!(collection = name, written = chunks.len(), "bulk write accepted");
        Ok(())
    }

    async fn similarity_search(
        &self,
        name: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        let response = self
            .request(Method::POST, format!("{}/_search", self.collection_url(name)))
            .json(&Self::search_body(query_vector, top_k))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: format!("search on '{name}' returned {}", response.status()),
            });
        }

        let body: Value = response.json().await?;
        Ok(parse_hits(&body))
    }

    async fn delete_collection(&self, name: &str) -> Result<(), SearchError> {
        let response = self
            .request(Method::DELETE, self.collection_url(name))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Request(format!(
                "index deletion for '{name}' failed with {}",
                response.status()
            )));
        }

        info!(collection = name, "deleted index");
        Ok(())
    }
}

fn bulk_payload(index: &str, chunks: &[EmbeddedChunk]) -> Result<String, SearchError> {
    let mut operations = Vec::with_capacity(chunks.len() * 2);
    for embedded in chunks {
        let chunk = &embedded.chunk;
        operations.push(json!({
            "index": {
                "_index": index,
                "_id": chunk.composite_id(),
            }
        }));
        operations.push(json!({
            "document_id": chunk.document_id,
            "title": chunk.title,
            "user_id": chunk.user_id,
            "chunk_id": chunk.chunk_id,
            "text": chunk.text,
            "embedding": embedded.embedding,
            "source_file": chunk.source_file,
            "page_number": chunk.page_number,
        }));
    }

    let payload = operations
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?
        .join("\n")
        + "\n";
    Ok(payload)
}

fn check_bulk_errors(body: &Value) -> Result<(), SearchError> {
    if !body
        .pointer("/errors")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return Ok(());
    }

    let mut rejected = 0;
    let mut first_reason = String::new();
    if let Some(items) = body.pointer("/items").and_then(Value::as_array) {
        for item in items {
            if let Some(error) = item.pointer("/index/error") {
                rejected += 1;
                if first_reason.is_empty() {
                    first_reason = error
                        .pointer("/reason")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown reason")
                        .to_string();
                }
            }
        }
    }

    if rejected == 0 {
        return Err(SearchError::BackendResponse {
            backend: "elasticsearch".to_string(),
            details: "bulk response flagged errors without item details".to_string(),
        });
    }
    Err(SearchError::BulkRejected {
        rejected,
        first_reason,
    })
}

fn parse_hits(body: &Value) -> Vec<RetrievedChunk> {
    let hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    hits.iter()
        .map(|hit| RetrievedChunk {
            title: hit
                .pointer("/_source/title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            text: hit
                .pointer("/_source/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            score: hit
                .pointer("/_score")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        })
        .collect()
}
