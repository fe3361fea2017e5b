use serde::{Deserialize, Serialize};
use std::fmt;

/// One table-of-contents entry as detected from the index pages
///
/// Page numbers are book pages, as printed in the TOC. Either bound may be
/// missing when the model could not determine it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub chapter_number: String,
    pub title: String,
    pub start_page: Option<i64>,
    pub end_page: Option<i64>,
}

impl ChapterRecord {
    pub fn new(
        chapter_number: impl Into<String>,
        title: impl Into<String>,
        start_page: Option<i64>,
        end_page: Option<i64>,
    ) -> Self {
        Self {
            chapter_number: chapter_number.into(),
            title: title.into(),
            start_page,
            end_page,
        }
    }

    /// Both page bounds, if known
    pub fn page_range(&self) -> Option<(i64, i64)> {
        Some((self.start_page?, self.end_page?))
    }

    pub fn has_page_range(&self) -> bool {
        self.page_range().is_some()
    }
}

impl fmt::Display for ChapterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let page = |p: Option<i64>| p.map_or_else(|| "?".to_string(), |p| p.to_string());
        write!(
            f,
            "{}: {} (Pg {} - {})",
            self.chapter_number,
            self.title,
            page(self.start_page),
            page(self.end_page)
        )
    }
}

/// Font size in hundredths of a point, usable as a map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontSize(u32);

impl FontSize {
    pub fn from_points(points: f32) -> Self {
        Self((points.abs() * 100.0).round() as u32)
    }

    pub fn points(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.points())
    }
}

/// A run of text sharing one font size and style
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpan {
    pub text: String,
    pub size: FontSize,
    pub bold: bool,
    pub colored: bool,
    /// Physical page, 1-based
    pub page: u32,
    /// Text object (BT..ET) index within the page
    pub block: usize,
    /// Line index within the block
    pub line: usize,
}

impl FontSpan {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn is_styled(&self) -> bool {
        self.bold || self.colored
    }
}
