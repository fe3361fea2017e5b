//! Heading-like text from a chapter's pages.
//!
//! PDFs carry no heading markup, so prominence is inferred from font size:
//! a per-document histogram of words by size decides which of the largest
//! sizes fit in a word budget, and only spans at those sizes (or spans set
//! in bold or colour) are kept.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::config::BudgetPolicy;
use crate::error::Result;
use crate::model::{FontSize, FontSpan};
use crate::utils::extract_spans;

/// Words per font size over `spans`
pub fn font_histogram(spans: &[FontSpan]) -> BTreeMap<FontSize, usize> {
    let mut histogram = BTreeMap::new();
    for span in spans {
        *histogram.entry(span.size).or_insert(0) += span.word_count();
    }
    histogram
}

/// Largest sizes whose combined word count fits `budget`
pub fn select_sizes(
    histogram: &BTreeMap<FontSize, usize>,
    budget: usize,
    policy: BudgetPolicy,
) -> BTreeSet<FontSize> {
    let mut selected = BTreeSet::new();
    let mut total = 0usize;

    for (&size, &words) in histogram.iter().rev() {
        let next = total + words;
        match policy {
            BudgetPolicy::StopBeforeOverflow if next > budget => break,
            BudgetPolicy::AcceptOverflowingSize if total >= budget => break,
            _ => {}
        }
        selected.insert(size);
        total = next;
    }

    debug!(
        "Selected {} of {} font sizes ({} words, budget {})",
        selected.len(),
        histogram.len(),
        total,
        budget
    );
    selected
}

/// Newline-joined text of spans at a selected size or carrying a style marker
pub fn collect_headings(spans: &[FontSpan], selected: &BTreeSet<FontSize>) -> String {
    spans
        .iter()
        .filter(|span| selected.contains(&span.size) || span.is_styled())
        .map(|span| span.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Heading text for physical pages `start_page..=end_page`
pub fn extract_headings(
    bytes: &[u8],
    start_page: i64,
    end_page: i64,
    budget: usize,
    policy: BudgetPolicy,
) -> Result<String> {
    let spans = extract_spans(bytes, start_page, end_page)?;
    let histogram = font_histogram(&spans);
    let selected = select_sizes(&histogram, budget, policy);
    let text = collect_headings(&spans, &selected);

    info!(
        "Extracted {} heading lines from pages {}-{}",
        text.lines().count(),
        start_page,
        end_page
    );
    Ok(text)
}
