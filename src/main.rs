// billsift CLI: ingest a document directory, or run one extractor against a
// single file for inspection.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use billsift::extraction::{
    EnhancedOcrExtractor, Extractor, NativeExtractor, OcrExtractor, TableAwareExtractor,
};
use billsift::{MemoryIndex, Pipeline, PipelineConfig, VectorIndex};

#[derive(Parser)]
#[command(name = "billsift", about = "Utility bill extraction and chunking", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract and chunk every document under a directory into the index
    Ingest {
        /// Directory to walk for documents
        #[arg(long)]
        path: PathBuf,
        /// Empty the index before ingesting
        #[arg(long)]
        clear: bool,
    },
    /// Extract a single file and print the text
    Extract {
        /// File to extract
        #[arg(long)]
        file: PathBuf,
        /// Extraction strategy to apply
        #[arg(long, value_enum, default_value_t = Method::Auto)]
        method: Method,
    },
    /// Print index statistics
    Stats,
    /// Empty the index
    Clear,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Full fallback chain
    Auto,
    /// Embedded text only
    Native,
    /// Table-aware geometry passes
    Table,
    /// Page-by-page OCR
    Ocr,
    /// Bill-targeted OCR with field extraction
    Bill,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let pipeline = Pipeline::new(&config, index.clone())?;

    match cli.command {
        Command::Ingest { path, clear } => {
            if clear {
                index.clear().await?;
            }
            let report = pipeline.ingest(&path).await?;
            println!(
                "Ingested {} documents ({} failed), {} chunks",
                report.documents_loaded, report.documents_failed, report.chunks_created
            );
        }
        Command::Extract { file, method } => {
            let text = match method {
                Method::Auto => pipeline.extract_file(&file).await?.content,
                Method::Native => run_strategy(&NativeExtractor, &file).await?,
                Method::Table => run_strategy(&TableAwareExtractor, &file).await?,
                Method::Ocr => run_strategy(&OcrExtractor, &file).await?,
                Method::Bill => run_strategy(&EnhancedOcrExtractor, &file).await?,
            };
            println!("{text}");
        }
        Command::Stats => {
            println!("{} chunks indexed", index.count().await?);
        }
        Command::Clear => {
            index.clear().await?;
            println!("index cleared");
        }
    }
    Ok(())
}

async fn run_strategy(extractor: &dyn Extractor, file: &PathBuf) -> Result<String> {
    let outcome = extractor.extract(file).await;
    if outcome.succeeded {
        Ok(outcome.text)
    } else {
        anyhow::bail!(
            "{:?} extraction failed: {}",
            outcome.strategy,
            outcome.diagnostic.unwrap_or_default()
        )
    }
}
