// End-to-end ingest: walk a directory and run each file's extraction and
// chunking as one task on a bounded worker pool, then index the results.
// Per-document failures are logged and tallied, never fatal to the run.
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::chunker::Chunker;
use crate::config::PipelineConfig;
use crate::extraction::Orchestrator;
use crate::index::VectorIndex;
use crate::loader::DocumentLoader;
use crate::types::{Chunk, RawDocument, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub documents_loaded: usize,
    pub documents_failed: usize,
    pub chunks_created: usize,
}

/// What one file-level task came back with.
enum FileOutcome {
    Indexed(Vec<Chunk>),
    Empty,
    Failed(String),
}

pub struct Pipeline {
    orchestrator: Arc<Orchestrator>,
    chunker: Arc<Chunker>,
    index: Arc<dyn VectorIndex>,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig, index: Arc<dyn VectorIndex>) -> Result<Self> {
        Ok(Self::with_components(
            Orchestrator::new(config),
            Chunker::from_config(config)?,
            index,
        ))
    }

    /// Assemble from explicit parts. Used by tests to substitute a chunker
    /// with a deterministic or failing codec.
    pub fn with_components(
        orchestrator: Orchestrator,
        chunker: Chunker,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            chunker: Arc::new(chunker),
            index,
        }
    }

    /// Ingest every supported document under `root` into the index.
    /// Extraction is the expensive stage (OCR subprocesses), so each file
    /// runs load-then-chunk as one task, gated by the worker semaphore.
    pub async fn ingest(&self, root: &Path) -> Result<IngestReport> {
        let files = DocumentLoader::supported_files(root);

        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let permits = Arc::new(Semaphore::new(workers));
        let mut tasks: JoinSet<FileOutcome> = JoinSet::new();

        for path in files {
            let loader = DocumentLoader::new(Arc::clone(&self.orchestrator));
            let chunker = Arc::clone(&self.chunker);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return FileOutcome::Failed(e.to_string()),
                };
                let doc = match loader.load_file(&path).await {
                    Ok(doc) => doc,
                    Err(e) => {
                        return FileOutcome::Failed(format!("{}: {}", path.display(), e))
                    }
                };
                if doc.content.trim().is_empty() {
                    warn!(file = %doc.filename, "document produced no text");
                    return FileOutcome::Empty;
                }
                match chunker.chunk_document(&doc) {
                    Ok(chunks) => FileOutcome::Indexed(chunks),
                    Err(e) => FileOutcome::Failed(format!("{}: {}", doc.filename, e)),
                }
            });
        }

        let mut report = IngestReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(FileOutcome::Indexed(chunks)) => {
                    report.documents_loaded += 1;
                    report.chunks_created += chunks.len();
                    self.index.add(&chunks).await?;
                }
                Ok(FileOutcome::Empty) => {}
                Ok(FileOutcome::Failed(e)) => {
                    report.documents_failed += 1;
                    warn!(error = %e, "document ingest failed");
                }
                Err(e) => {
                    report.documents_failed += 1;
                    warn!(error = %e, "ingest task panicked");
                }
            }
        }

        info!(
            loaded = report.documents_loaded,
            failed = report.documents_failed,
            chunks = report.chunks_created,
            "ingest complete"
        );
        Ok(report)
    }

    /// Extract one file without indexing it, for inspection.
    pub async fn extract_file(&self, path: &Path) -> Result<RawDocument> {
        DocumentLoader::new(Arc::clone(&self.orchestrator))
            .load_file(path)
            .await
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::TokenCodec;
    use crate::index::MemoryIndex;
    use crate::types::SiftError;
    use std::fs;

    fn config() -> PipelineConfig {
        PipelineConfig {
            use_ocr: false,
            ..PipelineConfig::default()
        }
    }

    fn pipeline(index: Arc<dyn VectorIndex>) -> Pipeline {
        Pipeline::new(&config(), index).unwrap()
    }

    #[tokio::test]
    async fn ingest_counts_documents_and_chunks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "first document text body").unwrap();
        fs::write(dir.path().join("b.txt"), "second document text body").unwrap();

        let index = Arc::new(MemoryIndex::new());
        let report = pipeline(index.clone()).ingest(dir.path()).await.unwrap();

        assert_eq!(report.documents_loaded, 2);
        assert_eq!(report.documents_failed, 0);
        assert_eq!(report.chunks_created, 2);
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ingest_of_empty_directory_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(MemoryIndex::new());
        let report = pipeline(index).ingest(dir.path()).await.unwrap();
        assert_eq!(report, IngestReport::default());
    }

    #[tokio::test]
    async fn many_files_all_land_in_the_index() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..16 {
            fs::write(
                dir.path().join(format!("doc{i}.txt")),
                format!("document number {i} content"),
            )
            .unwrap();
        }

        let index = Arc::new(MemoryIndex::new());
        let report = pipeline(index.clone()).ingest(dir.path()).await.unwrap();
        assert_eq!(report.documents_loaded, 16);
        assert_eq!(index.count().await.unwrap(), 16);
    }

    struct BrokenCodec;

    impl TokenCodec for BrokenCodec {
        fn encode(&self, _text: &str) -> crate::types::Result<Vec<String>> {
            Err(SiftError::Tokenize("vocabulary unavailable".into()))
        }
        fn decode(&self, _tokens: &[String]) -> crate::types::Result<String> {
            Err(SiftError::Tokenize("vocabulary unavailable".into()))
        }
    }

    #[tokio::test]
    async fn tokenization_failure_is_fatal_per_document_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "some content").unwrap();
        fs::write(dir.path().join("b.txt"), "more content").unwrap();

        let index = Arc::new(MemoryIndex::new());
        let pipeline = Pipeline::with_components(
            Orchestrator::new(&config()),
            Chunker::new(Arc::new(BrokenCodec), 500, 50),
            index.clone(),
        );

        let report = pipeline.ingest(dir.path()).await.unwrap();
        assert_eq!(report.documents_failed, 2);
        assert_eq!(report.documents_loaded, 0);
        assert_eq!(report.chunks_created, 0);
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
