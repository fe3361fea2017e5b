use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Plain text of every page, in physical order
pub fn page_texts(bytes: &[u8]) -> Result<Vec<String>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::DocumentParse(e.to_string()))?;
    debug!("Extracted plain text for {} pages", pages.len());
    Ok(pages)
}

/// Number of pages in the document
pub fn page_count(bytes: &[u8]) -> Result<u32> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| Error::DocumentParse(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Extract plain text from pages `start_page..=end_page` (1-based)
///
/// Pages are joined with a newline. A range that selects no page yields an
/// empty string, not an error.
pub fn extract_text(bytes: &[u8], start_page: i64, end_page: i64) -> Result<String> {
    let pages = page_texts(bytes)?;

    let Some(window) = page_window(start_page, end_page, pages.len() as u32) else {
        warn!(
            "Page range {}-{} selects no pages (document has {})",
            start_page,
            end_page,
            pages.len()
        );
        return Ok(String::new());
    };

    let selected: Vec<&str> = pages
        .iter()
        .enumerate()
        .filter(|(i, _)| window.contains(&(*i as u32 + 1)))
        .map(|(_, text)| text.as_str())
        .collect();

    info!("Extracted text from pages {}-{}", window.start(), window.end());

    Ok(selected.join("\n"))
}

/// Clip a 1-based inclusive page range to the document
pub(crate) fn page_window(start_page: i64, end_page: i64, page_count: u32) -> Option<RangeInclusive<u32>> {
    let first = start_page.max(1);
    let last = end_page.min(page_count as i64);
    if first > last {
        return None;
    }
    Some(first as u32..=last as u32)
}
