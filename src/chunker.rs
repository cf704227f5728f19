// Token-windowed chunking.
//
// The tokenizer is injected as a stateless codec so tests can substitute a
// deterministic one. When no tokenizer.json is configured the whitespace
// codec stands in, mirroring how the rest of the pipeline degrades when an
// optional model file is absent.
use std::sync::Arc;

use tokenizers::tokenizer::Tokenizer;
use tracing::debug;

use crate::bill_fields;
use crate::config::PipelineConfig;
use crate::types::{Chunk, ChunkKind, RawDocument, Result, SiftError};

/// Stateless encode/decode service over token pieces.
pub trait TokenCodec: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<String>>;
    fn decode(&self, tokens: &[String]) -> Result<String>;
}

/// Whitespace-delimited word tokens. Deterministic, vocabulary-free.
#[derive(Debug, Default)]
pub struct WordCodec;

impl TokenCodec for WordCodec {
    fn encode(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }

    fn decode(&self, tokens: &[String]) -> Result<String> {
        Ok(tokens.join(" "))
    }
}

/// Codec backed by a HuggingFace tokenizer file.
pub struct HfTokenCodec {
    tokenizer: Tokenizer,
}

impl HfTokenCodec {
    pub fn from_file(path: &str) -> Result<Self> {
        let tokenizer =
            Tokenizer::from_file(path).map_err(|e| SiftError::Tokenize(e.to_string()))?;
        Ok(Self { tokenizer })
    }
}

impl TokenCodec for HfTokenCodec {
    fn encode(&self, text: &str) -> Result<Vec<String>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| SiftError::Tokenize(e.to_string()))?;
        Ok(encoding.get_tokens().to_vec())
    }

    fn decode(&self, tokens: &[String]) -> Result<String> {
        let ids = tokens
            .iter()
            .map(|t| {
                self.tokenizer
                    .token_to_id(t)
                    .ok_or_else(|| SiftError::Tokenize(format!("unknown token: {t}")))
            })
            .collect::<Result<Vec<u32>>>()?;
        self.tokenizer
            .decode(&ids, true)
            .map_err(|e| SiftError::Tokenize(e.to_string()))
    }
}

pub struct Chunker {
    codec: Arc<dyn TokenCodec>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(codec: Arc<dyn TokenCodec>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            codec,
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let codec: Arc<dyn TokenCodec> = match &config.tokenizer_path {
            Some(path) => Arc::new(HfTokenCodec::from_file(path)?),
            None => Arc::new(WordCodec),
        };
        Ok(Self::new(codec, config.chunk_size, config.chunk_overlap))
    }

    /// Split a document into chunk records. Bill-named documents get an
    /// executive-summary chunk in slot 0 when field extraction found
    /// anything; regular chunks then renumber from 1 and every record's
    /// `total_chunks` counts the summary chunk.
    pub fn chunk_document(&self, doc: &RawDocument) -> Result<Vec<Chunk>> {
        let windows = self.split_windows(&doc.content)?;
        let lower = doc.filename.to_lowercase();
        let structured = if lower.contains("pge") || lower.contains("bill") {
            bill_fields::summarize(&doc.content)
        } else {
            String::new()
        };

        let offset = usize::from(!structured.is_empty());
        let total = windows.len() + offset;
        let source = doc.source.to_string_lossy().into_owned();
        let mut chunks = Vec::with_capacity(total);

        if offset == 1 {
            chunks.push(Chunk {
                content: structured,
                source: source.clone(),
                filename: doc.filename.clone(),
                chunk_id: 0,
                total_chunks: total,
                kind: ChunkKind::StructuredBillInfo,
            });
        }

        for (i, window) in windows.into_iter().enumerate() {
            chunks.push(Chunk {
                content: window,
                source: source.clone(),
                filename: doc.filename.clone(),
                chunk_id: i + offset,
                total_chunks: total,
                kind: ChunkKind::TextChunk,
            });
        }

        debug!(file = %doc.filename, chunks = chunks.len(), "chunked document");
        Ok(chunks)
    }

    /// Sliding token windows: `chunk_size` tokens per window, next window
    /// starting `chunk_size - chunk_overlap` tokens later. A text at or under
    /// the window size comes back verbatim as a single chunk.
    fn split_windows(&self, text: &str) -> Result<Vec<String>> {
        let tokens = self.codec.encode(text)?;
        if tokens.len() <= self.chunk_size {
            return Ok(vec![text.to_string()]);
        }

        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(tokens.len());
            windows.push(self.codec.decode(&tokens[start..end])?);
            if end >= tokens.len() {
                break;
            }
            start += step;
        }
        Ok(windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn word_chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(Arc::new(WordCodec), size, overlap)
    }

    fn doc(name: &str, content: &str) -> RawDocument {
        RawDocument::new(PathBuf::from(name), content.to_string())
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn exact_window_size_yields_one_chunk() {
        let chunker = word_chunker(8, 2);
        let chunks = chunker.chunk_document(&doc("a.txt", &words(8))).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].chunk_id, 0);
    }

    #[test]
    fn one_token_past_window_yields_two_overlapping_chunks() {
        let chunker = word_chunker(8, 2);
        let chunks = chunker.chunk_document(&doc("a.txt", &words(9))).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].total_chunks, 2);
        // Second window starts size - overlap = 6 tokens in, so the last two
        // tokens of chunk 0 reappear at the front of chunk 1
        assert!(chunks[0].content.ends_with("w6 w7"));
        assert!(chunks[1].content.starts_with("w6 w7"));
    }

    #[test]
    fn windows_cover_every_token_in_order() {
        let chunker = word_chunker(10, 3);
        let text = words(37);
        let chunks = chunker.chunk_document(&doc("a.txt", &text)).unwrap();

        let step = 10 - 3;
        let mut rebuilt: Vec<String> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let toks: Vec<String> = chunk.content.split_whitespace().map(str::to_string).collect();
            let skip = if i == 0 { 0 } else { toks.len().min(10 - step) };
            rebuilt.extend(toks.into_iter().skip(skip));
        }
        assert_eq!(rebuilt.join(" "), text);
    }

    #[test]
    fn bill_document_gets_summary_slot_zero() {
        let chunker = word_chunker(100, 10);
        let content = "Account 12345678 Total $150.00 due 03/01/2025, usage 450 kWh";
        let chunks = chunker.chunk_document(&doc("pge-bill.txt", content)).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].kind, ChunkKind::StructuredBillInfo);
        assert_eq!(chunks[0].chunk_id, 0);
        assert!(chunks[0].content.contains("AMOUNTS"));
        assert_eq!(chunks[1].kind, ChunkKind::TextChunk);
        assert_eq!(chunks[1].chunk_id, 1);
        assert_eq!(chunks[1].content, content);
        assert!(chunks.iter().all(|c| c.total_chunks == 2));
    }

    #[test]
    fn bill_name_without_extractable_fields_stays_plain() {
        let chunker = word_chunker(100, 10);
        let chunks = chunker
            .chunk_document(&doc("bill-notes.txt", "plain prose only"))
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::TextChunk);
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[0].total_chunks, 1);
    }

    #[test]
    fn renumbering_applies_to_multi_window_bills() {
        let chunker = word_chunker(5, 1);
        let content = format!("Total $150.00 due 03/01/2025 {}", words(12));
        let chunks = chunker.chunk_document(&doc("pge.txt", &content)).unwrap();
        assert_eq!(chunks[0].kind, ChunkKind::StructuredBillInfo);
        let ids: Vec<usize> = chunks.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, (0..chunks.len()).collect::<Vec<_>>());
        let n = chunks.len();
        assert!(chunks.iter().all(|c| c.total_chunks == n));
    }
}
