// Core types for the billsift extraction pipeline
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

// Error types
#[derive(Debug, thiserror::Error)]
pub enum SiftError {
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("DOCX error: {0}")]
    Docx(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("tokenization error: {0}")]
    Tokenize(String),
}

impl From<lopdf::Error> for SiftError {
    fn from(e: lopdf::Error) -> Self {
        SiftError::Pdf(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SiftError>;

/// Extraction technique that produced a piece of text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Native,
    Layout,
    Table,
    Char,
    Ocr,
    OcrEnhanced,
    OcrTableRegion,
}

/// A loaded file with its extracted text, before chunking.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source: PathBuf,
    pub filename: String,
    pub content: String,
}

impl RawDocument {
    pub fn new(source: PathBuf, content: String) -> Self {
        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            source,
            filename,
            content,
        }
    }
}

/// One extractor invocation's output, kept for comparison by the orchestrator.
#[derive(Debug, Clone)]
pub struct ExtractionCandidate {
    pub text: String,
    pub strategy: Strategy,
    pub char_count: usize,
}

impl ExtractionCandidate {
    pub fn new(text: String, strategy: Strategy) -> Self {
        let char_count = text.trim().chars().count();
        Self {
            text,
            strategy,
            char_count,
        }
    }
}

/// Explicit per-strategy result. A strategy that fails reports why instead of
/// relying on empty output to mean failure.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub strategy: Strategy,
    pub text: String,
    pub succeeded: bool,
    pub diagnostic: Option<String>,
}

impl StrategyOutcome {
    pub fn ok(strategy: Strategy, text: String) -> Self {
        Self {
            strategy,
            text,
            succeeded: true,
            diagnostic: None,
        }
    }

    pub fn failed(strategy: Strategy, diagnostic: impl Into<String>) -> Self {
        Self {
            strategy,
            text: String::new(),
            succeeded: false,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn trimmed_len(&self) -> usize {
        self.text.trim().len()
    }

    pub fn candidate(&self) -> ExtractionCandidate {
        ExtractionCandidate::new(self.text.clone(), self.strategy)
    }
}

/// Structured fields recovered from bill-like text. Best effort, may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillFields {
    pub amounts: BTreeSet<String>,
    pub dates: BTreeSet<String>,
    pub kwh_usage: BTreeSet<String>,
    pub therm_usage: BTreeSet<String>,
    pub account_numbers: BTreeSet<String>,
    pub service_periods: BTreeSet<String>,
}

impl BillFields {
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
            && self.dates.is_empty()
            && self.kwh_usage.is_empty()
            && self.therm_usage.is_empty()
            && self.account_numbers.is_empty()
            && self.service_periods.is_empty()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    StructuredBillInfo,
    TextChunk,
}

/// The record handed to the vector index. Immutable once created; chunk ids
/// within one document are contiguous and `total_chunks` is identical on all
/// of that document's records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub source: String,
    pub filename: String,
    pub chunk_id: usize,
    pub total_chunks: usize,
    #[serde(rename = "type")]
    pub kind: ChunkKind,
}
