// billsift: utility-bill document extraction and chunking for RAG ingest.
pub mod bill_fields;
pub mod chunker;
pub mod classifier;
pub mod config;
pub mod extraction;
pub mod index;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod types;

pub use config::PipelineConfig;
pub use extraction::Orchestrator;
pub use index::{MemoryIndex, ScoredChunk, VectorIndex};
pub use pipeline::{IngestReport, Pipeline};
pub use types::{Chunk, ChunkKind, RawDocument, Result, SiftError, Strategy, StrategyOutcome};
