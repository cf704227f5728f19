// Configuration constants for billsift
//
// The character thresholds below are empirically tuned gates for "did this
// extraction degenerate", not semantic judgments. Treat them as tunables.
use std::env;

// Orchestrator fallback-chain gates (chars of trimmed text)
pub const OCR_ACCEPT_CHARS: usize = 50;
pub const TABLE_ACCEPT_CHARS: usize = 200;
pub const RESCUE_OCR_CHARS: usize = 100;

// Native extractor: below this, a page falls back to the layout walk
pub const PAGE_TEXT_FALLBACK_CHARS: usize = 50;

// Table-aware extractor geometry tolerances (PDF points)
pub const TABLE_SNAP_TOLERANCE: f32 = 5.0;
pub const TABLE_JOIN_TOLERANCE: f32 = 5.0;
pub const TEXT_LINE_TOLERANCE: f32 = 2.0;
pub const TEXT_PASS_MIN_CHARS: usize = 50;

// OCR settings
pub const OCR_MAX_PAGES: usize = 5;
pub const BILL_OCR_MAX_PAGES: usize = 3;
// 3x the 72 dpi base resolution, compensates for small bill fonts
pub const OCR_RENDER_DPI: u32 = 216;
pub const OCR_PAGE_TIMEOUT_SECS: u64 = 60;
pub const OCR_CHAR_WHITELIST: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz.,$/()-:@# ";
// Uniform block of text, what scanned bills mostly are
pub const OCR_PAGE_SEG_MODE: &str = "6";

// Enhanced bill OCR image preprocessing
pub const CONTRAST_BOOST: f32 = 2.0;
pub const SHARPNESS_BOOST: f32 = 2.0;
pub const RULE_KERNEL_LEN: u32 = 40;
pub const TABLE_REGION_MIN_AREA: u32 = 1000;
// Vertical padding around a detected rule so the crop picks up the row text
pub const TABLE_REGION_PAD: u32 = 40;

// Chunking defaults
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Runtime configuration, sourced from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub use_ocr: bool,
    pub tokenizer_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            use_ocr: true,
            tokenizer_path: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("CHUNK_SIZE") {
            if let Ok(n) = v.parse() {
                cfg.chunk_size = n;
            }
        }
        if let Ok(v) = env::var("CHUNK_OVERLAP") {
            if let Ok(n) = v.parse() {
                cfg.chunk_overlap = n;
            }
        }
        if let Ok(v) = env::var("USE_OCR") {
            cfg.use_ocr = v.to_lowercase() == "true";
        }
        cfg.tokenizer_path = env::var("BILLSIFT_TOKENIZER_PATH").ok();
        cfg
    }
}

// External tool paths, overridable from the environment
pub fn tesseract_path() -> String {
    env::var("BILLSIFT_TESSERACT_PATH").unwrap_or_else(|_| "tesseract".to_string())
}

pub fn pdftotext_path() -> String {
    env::var("BILLSIFT_PDFTOTEXT_PATH").unwrap_or_else(|_| "pdftotext".to_string())
}

pub fn pdftoppm_path() -> String {
    env::var("BILLSIFT_PDFTOPPM_PATH").unwrap_or_else(|_| "pdftoppm".to_string())
}
