//! One interactive session over a single loaded PDF.

use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::headings::extract_headings;
use crate::lesson::LessonPlanGenerator;
use crate::llm::LanguageModel;
use crate::model::ChapterRecord;
use crate::offset::{resolve_chapter, PageOffset};
use crate::store::ChapterStore;
use crate::toc::{extractor_for, TocPromptInterpreter};
use crate::utils::extract_text;

/// Ties the document, the model and the chapter store together
///
/// The document bytes are read once and never modified. Every detection
/// run replaces the stored chapter table wholesale.
pub struct Session<M, S> {
    model: M,
    store: S,
    config: AppConfig,
    document: Vec<u8>,
}

impl<M: LanguageModel, S: ChapterStore> Session<M, S> {
    pub fn new(model: M, store: S, config: AppConfig, document: Vec<u8>) -> Self {
        Self {
            model,
            store,
            config,
            document,
        }
    }

    pub fn open<P: AsRef<Path>>(model: M, store: S, config: AppConfig, pdf: P) -> Result<Self> {
        let path = pdf.as_ref();
        let document = fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded {:?} ({} bytes)", path, document.len());
        Ok(Self::new(model, store, config, document))
    }

    /// Detect chapters on index pages `start..=end` and store them
    ///
    /// Returns the records as stored. Nothing is written when the index
    /// pages hold no text, the model call fails, or no chapter is found.
    pub fn detect_chapters(&mut self, start: u32, end: u32) -> Result<Vec<ChapterRecord>> {
        let index_text = extract_text(&self.document, start as i64, end as i64)?;
        if index_text.trim().is_empty() {
            return Err(Error::NoIndexText { start, end });
        }

        let interpreter = TocPromptInterpreter::with_extractor(
            &self.model,
            extractor_for(self.config.extraction.json_extractor),
        );
        let records = interpreter.detect_chapters(&index_text)?;
        if records.is_empty() {
            warn!("No chapters detected on pages {}-{}", start, end);
            return Err(Error::NoChapters);
        }

        self.store.replace_all(&records)?;
        self.store.load_all()
    }

    /// Detect chapters from the first `default_index_pages` pages
    pub fn detect_chapters_default(&mut self) -> Result<Vec<ChapterRecord>> {
        let pages = self.config.extraction.default_index_pages;
        self.detect_chapters(1, pages)
    }

    pub fn chapters(&self) -> Result<Vec<ChapterRecord>> {
        self.store.load_all()
    }

    /// Stored chapter whose number or title matches `label`, ignoring case
    pub fn find_chapter(&self, label: &str) -> Result<ChapterRecord> {
        let wanted = label.trim();
        self.store
            .load_all()?
            .into_iter()
            .find(|c| c.chapter_number.eq_ignore_ascii_case(wanted) || c.title.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::ChapterNotFound(wanted.to_string()))
    }

    /// Heading text of `chapter`
    ///
    /// `first_chapter_page` is the physical page where the first stored
    /// chapter actually starts; it calibrates the book-to-physical offset.
    pub fn chapter_text(&self, chapter: &ChapterRecord, first_chapter_page: i64) -> Result<String> {
        let chapters = self.store.load_all()?;
        let offset = PageOffset::from_chapters(
            &chapters,
            first_chapter_page,
            self.config.extraction.extra_page_offset,
        )?;
        let (start, end) = resolve_chapter(chapter, offset)?;
        info!("Chapter {} spans physical pages {}-{}", chapter.chapter_number, start, end);

        extract_headings(
            &self.document,
            start,
            end,
            self.config.extraction.heading_word_budget,
            self.config.extraction.budget_policy,
        )
    }

    pub fn lesson_plan(
        &self,
        chapter: &ChapterRecord,
        first_chapter_page: i64,
        periods: u32,
        class_level: Option<&str>,
    ) -> Result<String> {
        let text = self.chapter_text(chapter, first_chapter_page)?;
        LessonPlanGenerator::new(&self.model, self.config.lesson.clone()).generate(&text, periods, class_level)
    }
}
