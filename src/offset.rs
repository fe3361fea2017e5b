//! Book page numbers to physical page indices.
//!
//! A single calibration anchor, where the user says chapter one really
//! starts, fixes a constant shift applied to every stored page number. This
//! holds only when the front matter is numbered separately (or not at all)
//! and the body is numbered contiguously from chapter one onward; books
//! that restart numbering per part or insert unnumbered plates mid-body
//! will drift, and no correction is attempted for that.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::ChapterRecord;

/// Shift between printed page numbers and physical page indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOffset(i64);

impl PageOffset {
    /// `declared_first_page − stored_first_page`, plus a fixed extra shift
    pub fn calibrate(declared_first_page: i64, stored_first_page: Option<i64>, extra: i64) -> Result<Self> {
        let stored = stored_first_page.ok_or_else(|| {
            Error::Calibration("first stored chapter has no start page".to_string())
        })?;
        declared_first_page
            .checked_sub(stored)
            .and_then(|shift| shift.checked_add(extra))
            .map(Self)
            .ok_or_else(|| {
                Error::Calibration(format!(
                    "page offset out of range (declared {}, stored {}, extra {})",
                    declared_first_page, stored, extra
                ))
            })
    }

    /// Calibrate against the first record of a stored chapter list
    pub fn from_chapters(chapters: &[ChapterRecord], declared_first_page: i64, extra: i64) -> Result<Self> {
        let first = chapters
            .first()
            .ok_or_else(|| Error::Calibration("no chapters have been detected".to_string()))?;
        let offset = Self::calibrate(declared_first_page, first.start_page, extra)?;
        debug!(
            "Page offset {} (chapter {} printed at {:?}, declared at {})",
            offset.0, first.chapter_number, first.start_page, declared_first_page
        );
        Ok(offset)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn apply(self, start: i64, end: i64) -> Result<(i64, i64)> {
        match (start.checked_add(self.0), end.checked_add(self.0)) {
            (Some(s), Some(e)) => Ok((s, e)),
            _ => Err(Error::Calibration(format!(
                "pages {}-{} shifted by {} are out of range",
                start, end, self.0
            ))),
        }
    }

    pub fn inverse(self) -> Option<Self> {
        self.0.checked_neg().map(Self)
    }
}

/// Physical page range for a stored chapter range
pub fn resolve(
    stored_start: i64,
    stored_end: i64,
    first_chapter_declared_page: i64,
    first_chapter_stored_page: Option<i64>,
) -> Result<(i64, i64)> {
    let offset = PageOffset::calibrate(first_chapter_declared_page, first_chapter_stored_page, 0)?;
    offset.apply(stored_start, stored_end)
}

/// Physical pages for `chapter`, clamping an inverted range to its start page
pub fn resolve_chapter(chapter: &ChapterRecord, offset: PageOffset) -> Result<(i64, i64)> {
    let (start, end) = chapter.page_range().ok_or_else(|| {
        Error::Calibration(format!("chapter {} has no page range", chapter.chapter_number))
    })?;

    let end = if end < start {
        warn!(
            "Chapter {} ends before it starts ({} < {}); using a single page",
            chapter.chapter_number, end, start
        );
        start
    } else {
        end
    };

    offset.apply(start, end)
}
