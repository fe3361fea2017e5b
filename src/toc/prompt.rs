
/// Example array embedded in the prompt to anchor the output format
pub const EXAMPLE_CHAPTERS_JSON: &str = r#"[
    {"chapter_number": "1", "title": "Introduction", "start_page": 1, "end_page": 10},
    {"chapter_number": "2", "title": "Basics", "start_page": 11, "end_page": 20}
]"#;

/// Prompt asking the model for the chapter list hidden in `index_text`
pub fn toc_prompt(index_text: &str) -> String {
    format!(
        r#"Extract the structured Table of Contents from the given text.
Identify the chapter numbers, titles, and their respective start and end pages.
Consider both structured and unstructured layouts.
Return a JSON array of objects with exactly these fields:
- "chapter_number": (string)
- "title": (string)
- "start_page": (integer, or null if unknown)
- "end_page": (integer, or null if unknown)

Example JSON Output:
{EXAMPLE_CHAPTERS_JSON}

Text:
{index_text}
"#
    )
}
