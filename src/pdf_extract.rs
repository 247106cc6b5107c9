// src/pdf_extract.rs

use async_trait::async_trait;
use lopdf::Document;
use thiserror::Error;
use time::Date;
use tracing::{info, warn};

use crate::payslip::{PayslipParser, PayslipRecord};

/// Minimum number of non-whitespace characters we expect from a
/// "real" text PDF. Below this threshold we treat it as scanned.
const MIN_TEXT_CHARS: usize = 30;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to parse PDF: {0}")]
    Load(#[from] lopdf::Error),
    #[error("PDF has no text layer (scanned or image-only)")]
    ScannedImage,
    #[error("text extraction failed: {0}")]
    Text(String),
    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Turns a binary document into one blob of text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, document: &[u8]) -> Result<String, ExtractError>;
}

/// lopdf for the structural check, pdf-extract for the text itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, document: &[u8]) -> Result<String, ExtractError> {
        let bytes = document.to_vec();
        tokio::task::spawn_blocking(move || extract_text_from_pdf(&bytes)).await?
    }
}

/// Blocking extraction from raw PDF bytes.
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> Result<String, ExtractError> {
    // --- Phase 1: structural check with lopdf ---
    let doc = Document::load_mem(pdf_bytes)?;

    if looks_like_scanned(&doc) {
        info!("PDF structural check: likely scanned / image-only");
        return Err(ExtractError::ScannedImage);
    }

    // --- Phase 2: full text extraction ---
    let text = pdf_extract::extract_text_from_mem(pdf_bytes).map_err(|e| {
        warn!(error = %e, "pdf-extract failed");
        ExtractError::Text(e.to_string())
    })?;

    let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_TEXT_CHARS {
        info!(chars = meaningful, "Extracted text too short, treating as scanned");
        return Err(ExtractError::ScannedImage);
    }

    info!(chars = meaningful, "Text extracted successfully");
    Ok(text)
}

/// Heuristic: a page whose resources carry XObject images but no fonts
/// has nothing for the text layer to return.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false; // Can't tell, let text extraction try
    }

    let image_only_pages = pages
        .values()
        .filter_map(|id| doc.get_object(*id).ok())
        .filter_map(|obj| obj.as_dict().ok())
        .filter(|page| has_resource(doc, page, b"XObject") && !has_resource(doc, page, b"Font"))
        .count();

    let total = pages.len();
    let ratio = image_only_pages as f64 / total as f64;
    info!(
        total_pages = total,
        image_only = image_only_pages,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );

    // If ≥80% of pages are image-only, treat the whole PDF as scanned
    ratio >= 0.8
}

/// Does the page's `Resources` dictionary carry a non-empty `key` entry?
fn has_resource(doc: &Document, page: &lopdf::Dictionary, key: &[u8]) -> bool {
    page.get(b"Resources")
        .ok()
        .and_then(|r| doc.dereference(r).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|res| res.get(key).ok())
        .and_then(|x| doc.dereference(x).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|d| !d.is_empty())
}

/// Extract the document's text and parse it as a payslip.
///
/// Extraction failures propagate; the upload workflow decides what to
/// substitute.
pub async fn parse_payslip_document(
    extractor: &dyn TextExtractor,
    parser: &PayslipParser<'_>,
    document: &[u8],
    today: Date,
) -> Result<PayslipRecord, ExtractError> {
    let text = extractor.extract_text(document).await?;
    let record = parser.parse(&text, today);

    let (filled, total) = record.coverage();
    info!(
        filled,
        total,
        year = record.year,
        month = record.month,
        net_salary = record.net_salary,
        "Payslip coverage"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    struct FixedText(&'static str);

    #[async_trait]
    impl TextExtractor for FixedText {
        async fn extract_text(&self, _document: &[u8]) -> Result<String, ExtractError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_garbage_bytes() {
        let result = extract_text_from_pdf(b"this is not a pdf");
        assert!(matches!(result, Err(ExtractError::Load(_))));
    }

    #[tokio::test]
    async fn test_pdf_extractor_rejects_garbage() {
        let result = PdfTextExtractor.extract_text(b"%PDF-broken").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_parse_document_delegates_to_text_parser() {
        let extractor = FixedText("2025(令和07)年11月25日支給分 基本給(月給) 310,000 差引支給額: 250,000");
        let record = parse_payslip_document(
            &extractor,
            &PayslipParser::default(),
            b"ignored",
            date!(2026 - 01 - 01),
        )
        .await
        .unwrap();

        assert_eq!((record.year, record.month), (2025, 11));
        assert_eq!(record.base_salary, 310_000);
        assert_eq!(record.net_salary, 250_000);
    }

    #[tokio::test]
    async fn test_parse_document_propagates_extraction_failure() {
        let result = parse_payslip_document(
            &PdfTextExtractor,
            &PayslipParser::default(),
            b"not a pdf",
            date!(2026 - 01 - 01),
        )
        .await;
        assert!(matches!(result, Err(ExtractError::Load(_))));
    }
}
