
mod extract;
mod interpreter;
mod prompt;

pub use extract::{extractor_for, GreedyBracketExtractor, JsonArrayExtractor, ObjectArrayExtractor};
pub use interpreter::{parse_chapter_reply, TocPromptInterpreter};
pub use prompt::{toc_prompt, EXAMPLE_CHAPTERS_JSON};
