// OCR extraction via the poppler/tesseract CLI tools: pages are rendered
// to PNG with pdftoppm and recognized with tesseract, each page under a
// timeout so a degenerate scan cannot stall the whole document.
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::GrayImage;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::bill_fields;
use crate::config::{
    self, BILL_OCR_MAX_PAGES, OCR_CHAR_WHITELIST, OCR_MAX_PAGES, OCR_PAGE_SEG_MODE,
    OCR_PAGE_TIMEOUT_SECS, OCR_RENDER_DPI,
};
use crate::extraction::content_stream::page_count;
use crate::extraction::image_prep::{crop_region, detect_table_regions, enhance_for_ocr};
use crate::extraction::Extractor;
use crate::types::{Result, SiftError, Strategy, StrategyOutcome};

/// Page-by-page OCR over the first few pages of a scanned document.
pub struct OcrExtractor;

#[async_trait]
impl Extractor for OcrExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Ocr
    }

    async fn extract(&self, path: &Path) -> StrategyOutcome {
        match extract_ocr(path).await {
            Ok(text) => StrategyOutcome::ok(Strategy::Ocr, text),
            Err(e) => StrategyOutcome::failed(Strategy::Ocr, e.to_string()),
        }
    }
}

/// Bill-targeted OCR: three recognition attempts per page, keeping only the
/// structured fields found, so a noisy scan yields labelled amounts and
/// dates instead of garbled prose.
pub struct EnhancedOcrExtractor;

#[async_trait]
impl Extractor for EnhancedOcrExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::OcrEnhanced
    }

    async fn extract(&self, path: &Path) -> StrategyOutcome {
        match extract_bill_ocr(path).await {
            Ok((text, strategy)) if !text.trim().is_empty() => {
                StrategyOutcome::ok(strategy, text)
            }
            Ok(_) => StrategyOutcome::failed(
                Strategy::OcrEnhanced,
                "no structured bill fields recognized",
            ),
            Err(e) => StrategyOutcome::failed(Strategy::OcrEnhanced, e.to_string()),
        }
    }
}

pub async fn extract_ocr(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path)?;
    let pages = page_count(&doc).min(OCR_MAX_PAGES);
    let mut blocks = Vec::new();

    for page_no in 1..=pages as u32 {
        let page_result = tokio::time::timeout(
            Duration::from_secs(OCR_PAGE_TIMEOUT_SECS),
            ocr_page(path, page_no),
        )
        .await;

        match page_result {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                blocks.push(format!("--- OCR Page {} ---\n{}", page_no, text.trim()));
            }
            Ok(Ok(_)) => debug!(page = page_no, "OCR produced no text"),
            Ok(Err(e)) => warn!(page = page_no, error = %e, "OCR page failed"),
            Err(_) => warn!(page = page_no, "OCR page timed out"),
        }
    }

    if blocks.is_empty() {
        return Err(SiftError::Ocr("no pages produced OCR text".into()));
    }
    Ok(blocks.join("\n\n"))
}

async fn ocr_page(path: &Path, page_no: u32) -> Result<String> {
    let workdir = TempDir::new()?;
    let png = render_page(path, page_no, workdir.path()).await?;
    recognize(&png).await
}

pub async fn extract_bill_ocr(path: &Path) -> Result<(String, Strategy)> {
    let doc = lopdf::Document::load(path)?;
    let pages = page_count(&doc).min(BILL_OCR_MAX_PAGES);
    let mut sections = Vec::new();
    let mut region_sections = 0usize;

    for page_no in 1..=pages as u32 {
        let page_result = tokio::time::timeout(
            Duration::from_secs(OCR_PAGE_TIMEOUT_SECS),
            bill_ocr_page(path, page_no),
        )
        .await;

        match page_result {
            Ok(Ok(page)) => {
                region_sections += page.region_sections;
                sections.extend(page.sections);
            }
            Ok(Err(e)) => warn!(page = page_no, error = %e, "bill OCR page failed"),
            Err(_) => warn!(page = page_no, "bill OCR page timed out"),
        }
    }

    let strategy = bill_strategy(sections.len(), region_sections);
    Ok((sections.join("\n\n"), strategy))
}

/// When every field-bearing section came out of a cropped table region, the
/// region pass alone carried the extraction.
fn bill_strategy(total_sections: usize, region_sections: usize) -> Strategy {
    if total_sections > 0 && region_sections == total_sections {
        Strategy::OcrTableRegion
    } else {
        Strategy::OcrEnhanced
    }
}

struct BillPageSections {
    sections: Vec<String>,
    region_sections: usize,
}

/// One page, three recognition attempts. Only attempts that surface
/// validated bill fields contribute output.
async fn bill_ocr_page(path: &Path, page_no: u32) -> Result<BillPageSections> {
    let workdir = TempDir::new()?;
    let png = render_page(path, page_no, workdir.path()).await?;
    let mut sections = Vec::new();
    let mut region_sections = 0usize;

    // Attempt 1: the raw render
    if let Ok(text) = recognize(&png).await {
        let fields = bill_fields::extract(&text);
        if !fields.is_empty() {
            let label = format!("Page {} - Direct OCR", page_no);
            sections.push(bill_fields::render_labelled(&label, &fields));
        }
    }

    // Attempt 2: contrast/sharpness enhanced
    let img = image::open(&png).map_err(|e| SiftError::Render(e.to_string()))?;
    let enhanced = enhance_for_ocr(&img);
    let enhanced_png = workdir.path().join("enhanced.png");
    save_gray(&enhanced, &enhanced_png)?;
    if let Ok(text) = recognize(&enhanced_png).await {
        let fields = bill_fields::extract(&text);
        if !fields.is_empty() {
            let label = format!("Page {} - Enhanced OCR", page_no);
            sections.push(bill_fields::render_labelled(&label, &fields));
        }
    }

    // Attempt 3: cropped table regions
    let gray = img.to_luma8();
    for (i, region) in detect_table_regions(&gray).into_iter().enumerate() {
        let crop = crop_region(&gray, region);
        let crop_png = workdir.path().join(format!("region-{}.png", i));
        save_gray(&crop, &crop_png)?;
        if let Ok(text) = recognize(&crop_png).await {
            let fields = bill_fields::extract(&text);
            if !fields.is_empty() {
                let label = format!("Page {} - Table Cell", page_no);
                sections.push(bill_fields::render_labelled(&label, &fields));
                region_sections += 1;
            }
        }
    }

    Ok(BillPageSections {
        sections,
        region_sections,
    })
}

fn save_gray(img: &GrayImage, path: &Path) -> Result<()> {
    img.save(path)
        .map_err(|e| SiftError::Render(e.to_string()))
}

/// Render one page to PNG with pdftoppm. The output filename carries a
/// page-number suffix whose zero padding varies with the document, so the
/// working directory is scanned for the produced file.
async fn render_page(path: &Path, page_no: u32, workdir: &Path) -> Result<PathBuf> {
    let prefix = workdir.join("page");
    let status = Command::new(config::pdftoppm_path())
        .arg("-png")
        .arg("-r")
        .arg(OCR_RENDER_DPI.to_string())
        .arg("-f")
        .arg(page_no.to_string())
        .arg("-l")
        .arg(page_no.to_string())
        .arg(path)
        .arg(&prefix)
        .status()
        .await?;

    if !status.success() {
        return Err(SiftError::Render(format!(
            "pdftoppm exited with {} on page {}",
            status, page_no
        )));
    }

    let mut entries = tokio::fs::read_dir(workdir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let p = entry.path();
        if p.extension().map_or(false, |ext| ext == "png")
            && p.file_stem()
                .and_then(|s| s.to_str())
                .map_or(false, |s| s.starts_with("page"))
        {
            return Ok(p);
        }
    }
    Err(SiftError::Render(format!(
        "pdftoppm produced no image for page {}",
        page_no
    )))
}

/// Run tesseract on one image, restricted to the characters that appear on
/// utility bills and with block segmentation suited to statement layouts.
async fn recognize(image_path: &Path) -> Result<String> {
    let output = Command::new(config::tesseract_path())
        .arg(image_path)
        .arg("stdout")
        .arg("--oem")
        .arg("3")
        .arg("--psm")
        .arg(OCR_PAGE_SEG_MODE)
        .arg("-c")
        .arg(format!("tessedit_char_whitelist={}", OCR_CHAR_WHITELIST))
        .output()
        .await?;

    if !output.status.success() {
        return Err(SiftError::Ocr(format!(
            "tesseract exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_only_sections_report_table_region_provenance() {
        assert_eq!(bill_strategy(2, 2), Strategy::OcrTableRegion);
        assert_eq!(bill_strategy(3, 2), Strategy::OcrEnhanced);
        assert_eq!(bill_strategy(0, 0), Strategy::OcrEnhanced);
    }

    #[tokio::test]
    async fn missing_document_fails_cleanly() {
        let outcome = OcrExtractor.extract(Path::new("/nonexistent/scan.pdf")).await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.strategy, Strategy::Ocr);
    }

    #[tokio::test]
    async fn enhanced_ocr_reports_failure_without_fields() {
        let outcome = EnhancedOcrExtractor
            .extract(Path::new("/nonexistent/scan.pdf"))
            .await;
        assert!(!outcome.succeeded);
        assert!(outcome.diagnostic.is_some());
    }
}
