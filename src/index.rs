// Chunk storage and retrieval behind a trait, so the pipeline does not care
// whether chunks land in memory or a real vector database.
use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::types::{Chunk, Result};

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Lower is closer.
    pub distance: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn add(&self, chunks: &[Chunk]) -> Result<()>;
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;
    async fn count(&self) -> Result<usize>;
    async fn clear(&self) -> Result<()>;
}

/// In-memory index scored by word overlap with the query. Stands in for a
/// real embedding store during local runs and tests.
#[derive(Default)]
pub struct MemoryIndex {
    chunks: Mutex<Vec<Chunk>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect()
}

/// 1 - Jaccard similarity over lowercased words.
fn overlap_distance(query: &HashSet<String>, content: &str) -> f32 {
    let words = word_set(content);
    let union = query.union(&words).count();
    if union == 0 {
        return 1.0;
    }
    let shared = query.intersection(&words).count();
    1.0 - shared as f32 / union as f32
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        let mut store = self.chunks.lock().unwrap_or_else(|p| p.into_inner());
        store.extend_from_slice(chunks);
        debug!(added = chunks.len(), total = store.len(), "indexed chunks");
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_words = word_set(query);
        let store = self.chunks.lock().unwrap_or_else(|p| p.into_inner());

        let mut scored: Vec<ScoredChunk> = store
            .iter()
            .map(|chunk| ScoredChunk {
                chunk: chunk.clone(),
                distance: overlap_distance(&query_words, &chunk.content),
            })
            .collect();
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.chunks.lock().unwrap_or_else(|p| p.into_inner()).len())
    }

    async fn clear(&self) -> Result<()> {
        self.chunks.lock().unwrap_or_else(|p| p.into_inner()).clear();
        Ok(())
    }
}
