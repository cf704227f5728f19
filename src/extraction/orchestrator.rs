// Strategy selection for PDF extraction. Each strategy reports an explicit
// outcome; the orchestrator compares outcomes against fixed acceptance
// thresholds and always hands back usable text, falling through the chain
// rather than surfacing a single strategy's failure.
use std::path::Path;

use tracing::{debug, info, warn};

use crate::classifier::is_utility_bill;
use crate::config::{OCR_ACCEPT_CHARS, PipelineConfig, RESCUE_OCR_CHARS, TABLE_ACCEPT_CHARS};
use crate::extraction::{
    EnhancedOcrExtractor, Extractor, NativeExtractor, OcrExtractor, TableAwareExtractor,
};
use crate::normalize::clean_text;
use crate::types::{ExtractionCandidate, StrategyOutcome};

pub struct Orchestrator {
    native: Box<dyn Extractor>,
    table: Box<dyn Extractor>,
    bill_ocr: Box<dyn Extractor>,
    ocr: Box<dyn Extractor>,
    use_ocr: bool,
}

impl Orchestrator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            native: Box::new(NativeExtractor),
            table: Box::new(TableAwareExtractor),
            bill_ocr: Box::new(EnhancedOcrExtractor),
            ocr: Box::new(OcrExtractor),
            use_ocr: config.use_ocr,
        }
    }

    /// Swap in alternative strategies. Used by tests to drive the selection
    /// policy without real PDF tooling.
    pub fn with_extractors(
        native: Box<dyn Extractor>,
        table: Box<dyn Extractor>,
        bill_ocr: Box<dyn Extractor>,
        ocr: Box<dyn Extractor>,
        use_ocr: bool,
    ) -> Self {
        Self {
            native,
            table,
            bill_ocr,
            ocr,
            use_ocr,
        }
    }

    /// Extract text from one PDF, trying strategies in order of expected
    /// quality for the document at hand. Never fails: a document no strategy
    /// can read yields an empty string.
    pub async fn extract(&self, path: &Path) -> String {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut bill_ocr_ran = false;

        // Scanned utility bills go straight to targeted OCR. The acceptance
        // gate measures the normalized text, since that is what gets kept.
        if self.use_ocr && is_utility_bill(&filename) {
            bill_ocr_ran = true;
            let outcome = self.bill_ocr.extract(path).await;
            if outcome.succeeded {
                let cleaned = clean_text(&outcome.text);
                if cleaned.chars().count() > OCR_ACCEPT_CHARS {
                    info!(file = %filename, strategy = ?outcome.strategy, "accepted bill OCR text");
                    return cleaned;
                }
            }
            debug!(file = %filename, diagnostic = ?outcome.diagnostic, "bill OCR insufficient");
        }

        // Table-aware extraction wins outright when it finds real content
        let table = self.table.extract(path).await;
        if accepted(&table, TABLE_ACCEPT_CHARS) {
            info!(file = %filename, strategy = ?table.strategy, "accepted table-aware text");
            return clean_text(&table.text);
        }

        // Otherwise keep whichever of table/native read more. Failed
        // outcomes collapse to zero-length candidates and never win.
        let native = self.native.extract(path).await;
        let mut best = longer_of(table.candidate(), native.candidate());

        // Last resort for scans: general OCR, unless bill OCR already ran
        if self.use_ocr && !bill_ocr_ran && best.char_count < RESCUE_OCR_CHARS {
            debug!(file = %filename, chars = best.char_count, "attempting rescue OCR");
            let ocr = self.ocr.extract(path).await;
            best = longer_of(best, ocr.candidate());
        }

        if best.char_count == 0 {
            warn!(file = %filename, "no strategy produced text");
            return String::new();
        }

        info!(
            file = %filename,
            strategy = ?best.strategy,
            chars = best.char_count,
            "extraction complete"
        );
        clean_text(&best.text)
    }
}

fn accepted(outcome: &StrategyOutcome, min_chars: usize) -> bool {
    outcome.succeeded && outcome.trimmed_len() > min_chars
}

fn longer_of(a: ExtractionCandidate, b: ExtractionCandidate) -> ExtractionCandidate {
    if b.char_count > a.char_count {
        b
    } else {
        a
    }
}
