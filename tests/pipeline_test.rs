// End-to-end ingest over a fixture directory, exercising the loader,
// chunker, bill-field extraction, and index together.
use std::fs;
use std::sync::Arc;

use billsift::types::ChunkKind;
use billsift::{MemoryIndex, Pipeline, PipelineConfig, VectorIndex};

fn pipeline(index: Arc<dyn VectorIndex>) -> Pipeline {
    let config = PipelineConfig {
        use_ocr: false,
        ..PipelineConfig::default()
    };
    Pipeline::new(&config, index).unwrap()
}

#[tokio::test]
async fn bill_text_file_produces_summary_and_text_chunks() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("pge-bill.txt"),
        "Pacific Gas and Electric Company\n\
         Account Number: 12345678\n\
         Statement Date: 03/01/2025\n\
         Total Amount Due: $150.00\n\
         Electric Usage: 450 kWh\n",
    )
    .unwrap();

    let index = Arc::new(MemoryIndex::new());
    let report = pipeline(index.clone()).ingest(dir.path()).await.unwrap();

    assert_eq!(report.documents_loaded, 1);
    assert_eq!(report.documents_failed, 0);
    assert_eq!(report.chunks_created, 2);

    let mut results = index.search("bill", 10).await.unwrap();
    results.sort_by_key(|r| r.chunk.chunk_id);
    let chunks: Vec<_> = results.into_iter().map(|r| r.chunk).collect();

    assert_eq!(chunks.len(), 2);
    let summary = &chunks[0];
    assert_eq!(summary.kind, ChunkKind::StructuredBillInfo);
    assert_eq!(summary.chunk_id, 0);
    assert_eq!(summary.total_chunks, 2);
    assert!(summary.content.contains("=== EXTRACTED UTILITY BILL INFORMATION ==="));
    assert!(summary.content.contains("$150.00"));
    assert!(summary.content.contains("03/01/2025"));
    assert!(summary.content.contains("450 kWh"));
    assert!(summary.content.contains("12345678"));

    let body = &chunks[1];
    assert_eq!(body.kind, ChunkKind::TextChunk);
    assert_eq!(body.chunk_id, 1);
    assert_eq!(body.total_chunks, 2);
    assert!(body.content.contains("Pacific Gas and Electric Company"));
    assert_eq!(body.filename, "pge-bill.txt");
}

#[tokio::test]
async fn non_bill_document_has_no_summary_chunk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("meeting-notes.txt"),
        "Quarterly review notes. Attendance was good. Amount $150.00 mentioned.",
    )
    .unwrap();

    let index = Arc::new(MemoryIndex::new());
    pipeline(index.clone()).ingest(dir.path()).await.unwrap();

    let results = index.search("notes", 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.kind, ChunkKind::TextChunk);
    assert_eq!(results[0].chunk.total_chunks, 1);
}

#[tokio::test]
async fn mixed_directory_skips_unreadable_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("good.txt"), "readable content here").unwrap();
    // Invalid UTF-8 in a .txt fails the read and is tallied, not fatal
    fs::write(dir.path().join("bad.txt"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
    fs::write(dir.path().join("ignored.csv"), "a,b,c").unwrap();

    let index = Arc::new(MemoryIndex::new());
    let report = pipeline(index.clone()).ingest(dir.path()).await.unwrap();

    assert_eq!(report.documents_loaded, 1);
    assert_eq!(report.documents_failed, 1);
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn typographic_artifacts_are_normalized_on_load() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("fancy.txt"),
        "Total \u{2014} \u{201c}amount due\u{201d} is \u{2018}$98.50\u{2019}",
    )
    .unwrap();

    let index = Arc::new(MemoryIndex::new());
    pipeline(index.clone()).ingest(dir.path()).await.unwrap();

    let results = index.search("amount", 1).await.unwrap();
    let content = &results[0].chunk.content;
    assert!(content.contains("- \"amount due\" is '$98.50'"), "got: {content}");
}
