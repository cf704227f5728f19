// Document loading: routes a file to the extractor for its format and
// normalizes whatever comes back. The directory walk lives here too; the
// pipeline fans the resulting file list out over its worker pool.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use crate::extraction::Orchestrator;
use crate::normalize::clean_text;
use crate::types::{RawDocument, Result, SiftError};

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "txt"];

pub struct DocumentLoader {
    orchestrator: Arc<Orchestrator>,
}

impl DocumentLoader {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Every supported file under `root`, in walk order. Unsupported
    /// extensions are skipped silently.
    pub fn supported_files(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                let supported = p
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
                    .map_or(false, |ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
                if !supported {
                    debug!(file = %p.display(), "unsupported extension, skipping");
                }
                supported
            })
            .collect()
    }

    /// Load one file through the extractor for its format.
    pub async fn load_file(&self, path: &Path) -> Result<RawDocument> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let content = match ext.as_str() {
            "pdf" => self.orchestrator.extract(path).await,
            "docx" | "doc" => load_docx(path)?,
            "txt" => load_text(path)?,
            other => {
                return Err(SiftError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("unsupported file type: .{}", other),
                )))
            }
        };
        Ok(RawDocument::new(path.to_path_buf(), content))
    }
}

fn load_text(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)?;
    Ok(clean_text(&raw))
}

/// Read a .docx: paragraphs as blocks, tables as pipe-joined rows.
fn load_docx(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| SiftError::Docx(e.to_string()))?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                let para_text = paragraph_text(para);
                if !para_text.is_empty() {
                    if !text.is_empty() {
                        text.push_str("\n\n");
                    }
                    text.push_str(&para_text);
                }
            }
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(tr) = row;
                    let mut cells = Vec::new();
                    for cell in &tr.cells {
                        let docx_rs::TableRowChild::TableCell(tc) = cell;
                        let mut cell_text = String::new();
                        for content in &tc.children {
                            if let docx_rs::TableCellContent::Paragraph(p) = content {
                                let pt = paragraph_text(p);
                                if !pt.is_empty() {
                                    if !cell_text.is_empty() {
                                        cell_text.push(' ');
                                    }
                                    cell_text.push_str(&pt);
                                }
                            }
                        }
                        if !cell_text.is_empty() {
                            cells.push(cell_text);
                        }
                    }
                    if !cells.is_empty() {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(&cells.join(" | "));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(clean_text(&text))
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let docx_rs::RunChild::Text(t) = rc {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::fs;

    fn loader() -> DocumentLoader {
        let config = PipelineConfig {
            use_ocr: false,
            ..PipelineConfig::default()
        };
        DocumentLoader::new(Arc::new(Orchestrator::new(&config)))
    }

    #[test]
    fn walk_keeps_supported_extensions_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bill.txt"), "x").unwrap();
        fs::write(dir.path().join("scan.PDF"), "x").unwrap();
        fs::write(dir.path().join("photo.jpg"), "x").unwrap();
        fs::write(dir.path().join("noext"), "x").unwrap();

        let mut names: Vec<String> = DocumentLoader::supported_files(dir.path())
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        assert_eq!(names, vec!["bill.txt", "scan.PDF"]);
    }

    #[test]
    fn walk_descends_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2025").join("march");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("statement.txt"), "x").unwrap();

        let files = DocumentLoader::supported_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("2025/march/statement.txt"));
    }

    #[tokio::test]
    async fn text_file_loads_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bill.txt");
        fs::write(&path, "Account  12345678\u{00A0}due").unwrap();

        let doc = loader().load_file(&path).await.unwrap();
        assert_eq!(doc.filename, "bill.txt");
        assert_eq!(doc.content, "Account 12345678 due");
    }

    #[tokio::test]
    async fn unknown_extension_errors() {
        let err = loader().load_file(Path::new("notes.md")).await.unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }
}
