use crate::error::IngestError;

/// Word-window chunking parameters. Overlap must stay strictly below the
/// window size or the window could not advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidInput(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn advance(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Splits `text` into overlapping word windows.
///
/// Words are whatever `split_whitespace` yields, joined back with single
/// spaces, so the exact layout of the source text does not influence the
/// output. Each window starts `chunk_size - chunk_overlap` words after the
/// previous one; the final windows may be shorter than `chunk_size`.
pub fn chunk_by_words(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += config.advance();
    }
    Ok(chunks)
}
