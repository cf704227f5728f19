// Geometry-tuned extraction for bill layouts: table, text, and raw character
// passes per page, each framed so provenance survives into the chunk text.
use std::path::Path;

use async_trait::async_trait;
use lopdf::Document;
use tracing::debug;

use super::content_stream::{self, ordered_pages, PositionedChar};
use super::tables::{assemble_lines, char_grid_lines, infer_tables, TableSettings};
use super::Extractor;
use crate::config::{
    TABLE_JOIN_TOLERANCE, TABLE_SNAP_TOLERANCE, TEXT_LINE_TOLERANCE, TEXT_PASS_MIN_CHARS,
};
use crate::normalize::{clean_cell_text, clean_extracted_lines};
use crate::types::{Result, Strategy, StrategyOutcome};

pub struct TableAwareExtractor;

#[async_trait]
impl Extractor for TableAwareExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Table
    }

    async fn extract(&self, path: &Path) -> StrategyOutcome {
        match extract_table_aware(path) {
            Ok((text, strategy)) => StrategyOutcome::ok(strategy, text),
            Err(e) => StrategyOutcome::failed(Strategy::Table, e.to_string()),
        }
    }
}

/// Which passes contributed to one rendered page.
#[derive(Debug, Default, Copy, Clone)]
struct PageSignals {
    text_pass: bool,
    char_pass: bool,
}

pub fn extract_table_aware(path: &Path) -> Result<(String, Strategy)> {
    let doc = Document::load(path)?;
    let mut pages = Vec::new();
    let mut text_pages = 0usize;
    let mut char_pages = 0usize;

    for (page_no, page_id) in ordered_pages(&doc) {
        let chars = match content_stream::page_chars(&doc, page_id) {
            Ok(chars) => chars,
            Err(e) => {
                debug!(page = page_no, error = %e, "character extraction failed");
                continue;
            }
        };
        let (rendered, signals) = render_page(page_no, &chars);
        text_pages += usize::from(signals.text_pass);
        char_pages += usize::from(signals.char_pass);
        pages.push(rendered);
    }

    Ok((pages.join("\n\n"), sub_strategy(text_pages, char_pages)))
}

/// The char grid is the degraded-layout fallback; when it is the only text
/// representation across the document, provenance is the char pass itself.
fn sub_strategy(text_pages: usize, char_pages: usize) -> Strategy {
    if char_pages > 0 && text_pages == 0 {
        Strategy::Char
    } else {
        Strategy::Table
    }
}

fn render_page(page_no: u32, chars: &[PositionedChar]) -> (String, PageSignals) {
    let mut sections = vec![format!("--- Page {page_no} ---")];

    // Pass 1: table shapes, cells cleaned of numeral misreads
    let tables = infer_tables(
        chars,
        TableSettings {
            snap_tolerance: TABLE_SNAP_TOLERANCE,
            join_tolerance: TABLE_JOIN_TOLERANCE,
        },
    );
    for (i, table) in tables.iter().enumerate() {
        let mut block = vec![format!("=== TABLE {} ===", i + 1)];
        for row in table {
            let cells: Vec<String> = row
                .iter()
                .map(|c| clean_cell_text(c))
                .filter(|c| !c.is_empty())
                .collect();
            if !cells.is_empty() {
                block.push(cells.join(" | "));
            }
        }
        if block.len() > 1 {
            sections.push(block.join("\n"));
        }
    }

    // Pass 2: tight-tolerance line assembly, artifact lines filtered
    let mut signals = PageSignals::default();
    let assembled = assemble_lines(chars, TEXT_LINE_TOLERANCE).join("\n");
    let text_pass = clean_extracted_lines(&assembled);
    if text_pass.chars().count() > TEXT_PASS_MIN_CHARS {
        sections.push(format!("=== TEXT CONTENT ===\n{text_pass}"));
        signals.text_pass = true;
    }

    // Pass 3: raw character grid, only when it recovers more than the
    // unfiltered line assembly did
    let char_pass = char_grid_lines(chars).join("\n");
    if char_pass.trim().chars().count() > assembled.trim().chars().count() {
        sections.push(format!("=== CHAR EXTRACTION ===\n{char_pass}"));
        signals.char_pass = true;
    }

    (sections.join("\n"), signals)
}
