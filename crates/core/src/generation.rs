use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";

/// Harm categories switched off when safety filtering is disabled.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_api_tag(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One conversation turn; each part becomes its own text part on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![text.into()],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![text.into()],
        }
    }

    pub fn with_part(mut self, text: impl Into<String>) -> Self {
        self.parts.push(text.into());
        self
    }
}

/// Decoding and safety settings sent with every generation request. The
/// defaults pin the seed and zero the thinking budget so answers stay as
/// reproducible as the provider allows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub seed: i64,
    pub max_output_tokens: u32,
    pub thinking_budget: u32,
    pub disable_safety_filters: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 1.0,
            seed: 0,
            max_output_tokens: 65_535,
            thinking_budget: 0,
            disable_safety_filters: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub turns: Vec<Turn>,
    pub options: GenerationOptions,
}

#[async_trait]
pub trait TextGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Text generation client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_GENERATION_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn build_request_body(request: &GenerationRequest) -> Value {
        let contents: Vec<Value> = request
            .turns
            .iter()
            .map(|turn| {
                let parts: Vec<Value> =
                    turn.parts.iter().map(|text| json!({"text": text})).collect();
                json!({"role": turn.role.as_api_tag(), "parts": parts})
            })
            .collect();

        let options = &request.options;
        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": options.temperature,
                "topP": options.top_p,
                "seed": options.seed,
                "maxOutputTokens": options.max_output_tokens,
                "thinkingConfig": {"thinkingBudget": options.thinking_budget},
            },
        });

        if options.disable_safety_filters {
            let settings: Vec<Value> = SAFETY_CATEGORIES
                .iter()
                .map(|category| json!({"category": category, "threshold": "OFF"}))
                .collect();
            body["safetySettings"] = Value::Array(settings);
        }

        if !request.system_instruction.is_empty() {
            body["system_instruction"] = json!({
                "parts": [{"text": request.system_instruction}]
            });
        }

        body
    }

    fn parse_response(body: &Value) -> Result<String, GenerationError> {
        let parts = body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .ok_or_else(|| GenerationError::InvalidResponse {
                provider: "gemini".to_string(),
                details: "missing candidate content parts".to_string(),
            })?;

        Ok(parts
            .iter()
            .filter_map(|part| part.pointer("/text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = Self::build_request_body(request);
        debug!(model = %self.model, turns = request.turns.len(), "sending generation request");

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
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        Self::parse_response(&payload)
    }
}
