use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions URL
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
            max_retries: 3,
            initial_backoff_ms: 500,
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("llm.endpoint must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("llm.model must not be empty".into()));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(Error::Config("llm.api_key_env must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("llm.timeout_secs must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config("llm.temperature must be within [0,2]".into()));
        }
        Ok(())
    }
}

/// How the heading budget treats the size that crosses it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPolicy {
    /// Stop before a size would push the total over the budget
    #[default]
    StopBeforeOverflow,
    /// Accept the crossing size, then stop
    AcceptOverflowingSize,
}

/// Which strategy pulls the JSON array out of an LLM reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JsonExtractorKind {
    #[default]
    Greedy,
    ObjectArray,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub heading_word_budget: usize,
    pub budget_policy: BudgetPolicy,
    /// Constant added on top of the calibrated offset
    pub extra_page_offset: i64,
    /// Pages scanned for the index when no range is given
    pub default_index_pages: u32,
    pub json_extractor: JsonExtractorKind,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            heading_word_budget: 2000,
            budget_policy: BudgetPolicy::default(),
            extra_page_offset: 0,
            default_index_pages: 15,
            json_extractor: JsonExtractorKind::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.heading_word_budget == 0 {
            return Err(Error::Config("extraction.heading_word_budget must be > 0".into()));
        }
        if self.default_index_pages == 0 {
            return Err(Error::Config("extraction.default_index_pages must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonConfig {
    pub chunk_words: usize,
    /// Chain a subtopic pass per chunk before the final plan prompt
    pub extract_subtopics: bool,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            chunk_words: 2000,
            extract_subtopics: true,
        }
    }
}

impl LessonConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_words == 0 {
            return Err(Error::Config("lesson.chunk_words must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("chapters.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub lesson: LessonConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.llm.validate()?;
        self.extraction.validate()?;
        self.lesson.validate()
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model={} endpoint={} budget={} ({:?}) extra_offset={} db={}",
            self.llm.model,
            self.llm.endpoint,
            self.extraction.heading_word_budget,
            self.extraction.budget_policy,
            self.extraction.extra_page_offset,
            self.store.database_path.display()
        )
    }
}
