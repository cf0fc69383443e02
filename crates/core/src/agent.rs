use crate::embeddings::Embedder;
use crate::error::AgentError;
use crate::generation::{GenerationOptions, GenerationRequest, TextGenerator, Turn};
use crate::models::RetrievedChunk;
use crate::prompts::DEFAULT_RAG_PROMPT;
use crate::retriever::Retriever;
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::SearchIndex;
use tracing::{debug, info};

pub const DEFAULT_AGENT_NAME: &str = "RAG Agent";
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str =
    "You are a Retrieval-Augmented Generation (RAG) Assistant";

/// Behavior of the question-answering agent.
///
/// `similarity_threshold` drops retrieved chunks scoring below it before the
/// prompt is built; with nothing left the agent still answers, just with an
/// empty context block. `additional_instructions` ride along as a second
/// part of the leading model turn and are skipped entirely when empty.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub system_instructions: String,
    pub additional_instructions: String,
    pub similarity_threshold: f64,
    pub prompt_template: String,
    pub options: GenerationOptions,
    pub retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT_NAME.to_string(),
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
            additional_instructions: String::new(),
            similarity_threshold: 0.0,
            prompt_template: DEFAULT_RAG_PROMPT.to_string(),
            options: GenerationOptions::default(),
            retry: RetryPolicy::generation(),
        }
    }
}

pub struct RagAgent<S, E, G> {
    retriever: Retriever<S, E>,
    generator: G,
    config: AgentConfig,
}

impl<S, E, G> RagAgent<S, E, G>
where
    S: SearchIndex + Send + Sync,
    E: Embedder + Send + Sync,
    G: TextGenerator + Send + Sync,
{
    pub fn new(retriever: Retriever<S, E>, generator: G) -> Self {
        Self {
            retriever,
            generator,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn run(&self, query: &str) -> Result<String, AgentError> {
        info!(agent = %self.config.name, "searching for relevant documents");
        let retrieved = self.retriever.retrieve(query).await?;

        let relevant: Vec<&RetrievedChunk> = retrieved
            .iter()
            .filter(|chunk| chunk.score >= self.config.similarity_threshold)
            .collect();
        info!(
            agent = %self.config.name,
            relevant = relevant.len(),
            retrieved = retrieved.len(),
            "filtered documents by similarity threshold"
        );

        let context = format_context(&relevant);
        let prompt = self.config.prompt_template.replace("{context}", &context);
        debug!(agent = %self.config.name, prompt_chars = prompt.len(), "composed prompt");

        let mut model_turn = Turn::model(prompt);
        if !self.config.additional_instructions.is_empty() {
            model_turn = model_turn.with_part(self.config.additional_instructions.clone());
        }

        let request = GenerationRequest {
            system_instruction: self.config.system_instructions.clone(),
            turns: vec![model_turn, Turn::user(query)],
            options: self.config.options,
        };

        let answer = with_retry(&self.config.retry, || self.generator.generate(&request)).await?;
        info!(agent = %self.config.name, answer_chars = answer.len(), "response generated");
        Ok(answer)
    }
}

fn format_context(chunks: &[&RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "Title: {}\nScore: {}\nContent: {}",
                chunk.title, chunk.score, chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
