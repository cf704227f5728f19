// Extraction strategies and the fallback-chain orchestrator
pub mod content_stream;
pub mod image_prep;
pub mod native;
pub mod ocr;
pub mod orchestrator;
pub mod table_aware;
pub mod tables;

use std::path::Path;

use async_trait::async_trait;

use crate::types::{Strategy, StrategyOutcome};

/// One interchangeable extraction backend. Implementations report failure
/// through the outcome, never by panicking or erroring upward.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn strategy(&self) -> Strategy;
    async fn extract(&self, path: &Path) -> StrategyOutcome;
}

pub use native::NativeExtractor;
pub use ocr::{EnhancedOcrExtractor, OcrExtractor};
pub use orchestrator::Orchestrator;
pub use table_aware::TableAwareExtractor;
