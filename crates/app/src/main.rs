use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_rag_core::{
    discover_pdf_files, ElasticStore, GeminiEmbedder, GeminiGenerator, IndexRequest, PdfSource,
    RagPipeline,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Elasticsearch base URL
    #[arg(
        long,
        env = "ELASTIC_SEARCH_URL",
        default_value = "http://localhost:9200"
    )]
    elastic_url: String,

    /// Elasticsearch API key
    #[arg(long, env = "ELASTIC_SEARCH_API_KEY")]
    elastic_api_key: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY")]
    gemini_api_key: String,

    /// Embedding model name
    #[arg(long, default_value = "gemini-embedding-001")]
    embedding_model: String,

    /// Embedding dimensionality
    #[arg(long, default_value = "768")]
    embedding_dim: usize,

    /// Generation model name
    #[arg(long, default_value = "gemini-2.5-flash")]
    generation_model: String,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, embed, and index PDF files into a collection.
    Index {
        /// User the documents belong to.
        #[arg(long, default_value = "unknown_user")]
        user: String,
        /// Session the default collection name is scoped to.
        #[arg(long, default_value = "default")]
        session: String,
        /// Collection name; defaults to index-{user}-{session}.
        #[arg(long)]
        collection: Option<String>,
        /// Folder to scan recursively for PDFs.
        #[arg(long)]
        folder: Option<PathBuf>,
        /// PDF files to index.
        files: Vec<PathBuf>,
    },
    /// Answer a question with context retrieved from a collection.
    Ask {
        /// Collection to search.
        #[arg(long)]
        collection: String,
        /// Question to answer.
        #[arg(long)]
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let store =
        ElasticStore::new(&cli.elastic_url).map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let store = match &cli.elastic_api_key {
        Some(key) => store.with_api_key(key),
        None => store,
    };
    let embedder =
        GeminiEmbedder::new(&cli.gemini_api_key).with_model(&cli.embedding_model, cli.embedding_dim);
    let generator = GeminiGenerator::new(&cli.gemini_api_key).with_model(&cli.generation_model);
    let pipeline = RagPipeline::new(store, embedder, generator);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-rag boot"
    );

    match cli.command {
        Command::Index {
            user,
            session,
            collection,
            folder,
            files,
        } => {
            let mut sources: Vec<PdfSource> =
                files.into_iter().map(PdfSource::Path).collect();
            if let Some(folder) = folder {
                let discovered = discover_pdf_files(&folder);
                if discovered.is_empty() {
                    warn!(folder = %folder.display(), "no pdf files found under folder");
                }
                sources.extend(discovered.into_iter().map(PdfSource::Path));
            }
            if sources.is_empty() {
                anyhow::bail!("nothing to index: pass PDF files or --folder");
            }

            let request = IndexRequest {
                user_id: user,
                session_id: session,
                collection,
                sources,
            };
            let summary = pipeline
                .index_documents(&request)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!(
                "{} document(s), {} chunk(s) indexed into {} at {}",
                summary.documents_indexed,
                summary.chunks_indexed,
                summary.collection,
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask {
            collection,
            question,
        } => {
            let answer = pipeline
                .answer(&collection, &question)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{answer}");
        }
    }

    Ok(())
}
