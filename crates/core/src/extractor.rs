use crate::chunking::{chunk_by_words, ChunkingConfig};
use crate::error::IngestError;
use crate::models::{DocumentChunk, UNKNOWN_USER};
use chrono::Utc;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Where a PDF comes from: a file on disk or an already-loaded buffer
/// (uploads, test fixtures).
#[derive(Debug, Clone)]
pub enum PdfSource {
    Path(PathBuf),
    Bytes {
        content: Vec<u8>,
        filename: Option<String>,
    },
}

impl PdfSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(content: Vec<u8>) -> Self {
        Self::Bytes {
            content,
            filename: None,
        }
    }

    pub fn named_bytes(content: Vec<u8>, filename: impl Into<String>) -> Self {
        Self::Bytes {
            content,
            filename: Some(filename.into()),
        }
    }
}

/// Turns PDFs into overlapping text chunks tagged with ownership metadata.
///
/// Every `extract` call mints a fresh document id, numbers pages starting at
/// one, skips pages without extractable text, and keeps a single chunk
/// counter running across pages.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    user_id: Option<String>,
    chunking: ChunkingConfig,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self {
            user_id: None,
            chunking: ChunkingConfig::default(),
        }
    }
}

impl PdfExtractor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            chunking: ChunkingConfig::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn extract(&self, source: &PdfSource) -> Result<Vec<DocumentChunk>, IngestError> {
        self.chunking.validate()?;

        let document_id = Uuid::new_v4().to_string();
        let user_id = self
            .user_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_USER.to_string());

        let (document, title, source_file) = match source {
            PdfSource::Path(path) => {
                let document = Document::load(path)
                    .map_err(|error| IngestError::Extraction(error.to_string()))?;
                let title = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.to_string_lossy().to_string());
                (document, title, path.to_string_lossy().to_string())
            }
            PdfSource::Bytes { content, filename } => {
                if content.is_empty() {
                    return Err(IngestError::InvalidInput(
                        "pdf byte buffer is empty".to_string(),
                    ));
                }
                let document = Document::load_mem(content)
                    .map_err(|error| IngestError::Extraction(error.to_string()))?;
                let title = filename.clone().unwrap_or_else(|| {
                    format!("uploaded_file_{}.pdf", Utc::now().format("%Y%m%d%H%M%S"))
                });
                let source_file = filename
                    .clone()
                    .unwrap_or_else(|| "uploaded_bytes.pdf".to_string());
                (document, title, source_file)
            }
        };

        info!(
            document_id = %document_id,
            title = %title,
            pages = document.get_pages().len(),
            "opened pdf"
        );

        let mut chunks = Vec::new();
        let mut chunk_id: u32 = 0;
        for (page_number, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_number])
                .map_err(|error| IngestError::Extraction(error.to_string()))?;

            if text.trim().is_empty() {
                warn!(page = page_number, "page has no extractable text, skipping");
                continue;
            }

            for piece in chunk_by_words(&text, &self.chunking)? {
                if piece.trim().is_empty() {
                    continue;
                }
                chunks.push(DocumentChunk {
                    document_id: document_id.clone(),
                    user_id: user_id.clone(),
                    title: title.clone(),
                    chunk_id,
                    text: piece,
                    source_file: Some(source_file.clone()),
                    page_number: Some(page_number),
                });
                chunk_id += 1;
            }
        }

        info!(
            document_id = %document_id,
            chunk_count = chunks.len(),
            "pdf extraction complete"
        );
        Ok(chunks)
    }
}

/// Recursively collects every `.pdf` under `folder`, sorted by path.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort_unstable();
    files
}

#[cfg(test)]
pub(crate) fn pdf_bytes_with_pages(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content stream should encode"),
        ));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let kid_count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => kid_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
    document.compress();

    let mut buffer = Vec::new();
    document
        .save_to(&mut buffer)
        .expect("pdf should serialize to memory");
    buffer
}
