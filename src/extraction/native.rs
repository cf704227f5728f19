// Native PDF extraction: embedded text layer with a layout-walk fallback,
// plus per-page table rendering.
use std::path::Path;

use async_trait::async_trait;
use lopdf::Document;
use tracing::debug;

use super::content_stream::{self, ordered_pages};
use super::tables::{infer_tables, TableSettings};
use super::Extractor;
use crate::config::{
    pdftotext_path, PAGE_TEXT_FALLBACK_CHARS, TABLE_JOIN_TOLERANCE, TABLE_SNAP_TOLERANCE,
};
use crate::types::{Result, SiftError, Strategy, StrategyOutcome};

pub struct NativeExtractor;

#[async_trait]
impl Extractor for NativeExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Native
    }

    async fn extract(&self, path: &Path) -> StrategyOutcome {
        match extract_native(path).await {
            Ok((text, strategy)) => StrategyOutcome::ok(strategy, text),
            Err(e) => StrategyOutcome::failed(Strategy::Native, e.to_string()),
        }
    }
}

/// Extract the whole document page by page. Each page block is framed with a
/// `--- Page N ---` header so page boundaries stay visible through chunking.
/// The returned strategy reports which source dominated: the embedded text
/// layer, or the layout walk it falls back to.
pub async fn extract_native(path: &Path) -> Result<(String, Strategy)> {
    let doc = Document::load(path)?;
    let mut blocks = Vec::new();
    let mut embedded_pages = 0usize;
    let mut layout_pages = 0usize;

    for (page_no, page_id) in ordered_pages(&doc) {
        let mut page_text = match doc.extract_text(&[page_no]) {
            Ok(text) => text,
            Err(e) => {
                debug!(page = page_no, error = %e, "text layer extraction failed");
                String::new()
            }
        };
        let mut from_layout = false;

        // Thin or absent text layer: walk the layout instead
        if page_text.trim().chars().count() < PAGE_TEXT_FALLBACK_CHARS {
            if let Ok(layout) = layout_page_text(path, page_no).await {
                if layout.trim().chars().count() > page_text.trim().chars().count() {
                    page_text = layout;
                    from_layout = true;
                }
            }
        }
        if !page_text.trim().is_empty() {
            if from_layout {
                layout_pages += 1;
            } else {
                embedded_pages += 1;
            }
        }

        let table_text = match content_stream::page_chars(&doc, page_id) {
            Ok(chars) => render_page_tables(&chars),
            Err(e) => {
                debug!(page = page_no, error = %e, "table detection failed");
                String::new()
            }
        };

        blocks.push(format!(
            "--- Page {} ---\n{}\n{}",
            page_no,
            page_text.trim_end(),
            table_text
        ));
    }

    Ok((blocks.join("\n"), dominant_source(embedded_pages, layout_pages)))
}

/// More layout-walk pages than embedded-layer pages means the layout walk
/// carried the extraction.
fn dominant_source(embedded_pages: usize, layout_pages: usize) -> Strategy {
    if layout_pages > embedded_pages {
        Strategy::Layout
    } else {
        Strategy::Native
    }
}

/// Layout-aware text for one page via `pdftotext -layout`, empty lines
/// dropped.
pub(crate) async fn layout_page_text(path: &Path, page: u32) -> Result<String> {
    let output = tokio::process::Command::new(pdftotext_path())
        .args([
            "-f",
            &page.to_string(),
            "-l",
            &page.to_string(),
            "-layout",
        ])
        .arg(path)
        .arg("-")
        .output()
        .await
        .map_err(|e| SiftError::Pdf(format!("pdftotext: {e}")))?;

    if !output.status.success() {
        return Err(SiftError::Pdf(format!(
            "pdftotext exited with {}",
            output.status
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();
    Ok(lines.join("\n"))
}

fn render_page_tables(chars: &[content_stream::PositionedChar]) -> String {
    let tables = infer_tables(
        chars,
        TableSettings {
            snap_tolerance: TABLE_SNAP_TOLERANCE,
            join_tolerance: TABLE_JOIN_TOLERANCE,
        },
    );

    let mut out = String::new();
    for table in tables {
        for row in table {
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            out.push_str(&row.join(" | "));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::content_stream::{PositionedChar, CHAR_ADVANCE};

    fn word(text: &str, x: f32, y: f32) -> Vec<PositionedChar> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| PositionedChar {
                ch,
                x: x + i as f32 * CHAR_ADVANCE,
                y,
            })
            .collect()
    }

    #[test]
    fn tables_render_pipe_delimited() {
        let mut chars = Vec::new();
        chars.extend(word("Electric", 10.0, 700.0));
        chars.extend(word("$120.00", 300.0, 700.0));
        chars.extend(word("Gas", 10.0, 680.0));
        chars.extend(word("$30.00", 300.0, 680.0));
        let out = render_page_tables(&chars);
        assert_eq!(out, "Electric | $120.00\nGas | $30.00\n");
    }

    #[test]
    fn no_table_shapes_render_nothing() {
        let chars = word("Just a heading line", 10.0, 700.0);
        assert_eq!(render_page_tables(&chars), "");
    }

    #[test]
    fn layout_walk_dominance_tags_the_strategy() {
        assert_eq!(dominant_source(3, 1), Strategy::Native);
        assert_eq!(dominant_source(1, 3), Strategy::Layout);
        // Nothing extracted at all still reports the nominal strategy
        assert_eq!(dominant_source(0, 0), Strategy::Native);
    }
}
