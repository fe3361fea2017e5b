// Library exports for the CLI and the diagnostics binary

pub mod config;
pub mod error;
pub mod headings;
pub mod lesson;
pub mod llm;
pub mod model;
pub mod offset;
pub mod pipeline;
pub mod store;
pub mod toc;
pub mod utils;

// Re-export commonly used types
pub use config::{AppConfig, BudgetPolicy, JsonExtractorKind};
pub use error::{Error, Result};
pub use headings::extract_headings;
pub use lesson::LessonPlanGenerator;
pub use llm::{ChatClient, LanguageModel, LazyChatClient};
pub use model::{ChapterRecord, FontSize, FontSpan};
pub use offset::{resolve, PageOffset};
pub use pipeline::Session;
pub use store::{ChapterStore, SqliteChapterStore};
pub use toc::TocPromptInterpreter;
