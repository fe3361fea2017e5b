use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::extract::{GreedyBracketExtractor, JsonArrayExtractor};
use super::prompt::toc_prompt;
use crate::error::{Error, Result};
use crate::llm::LanguageModel;
use crate::model::ChapterRecord;

/// Turns index-page text into chapter records through one LLM call
pub struct TocPromptInterpreter<M> {
    model: M,
    extractor: Box<dyn JsonArrayExtractor>,
}

impl<M: LanguageModel> TocPromptInterpreter<M> {
    pub fn new(model: M) -> Self {
        Self::with_extractor(model, Box::new(GreedyBracketExtractor))
    }

    pub fn with_extractor(model: M, extractor: Box<dyn JsonArrayExtractor>) -> Self {
        Self { model, extractor }
    }

    /// Ask the model for the chapter list contained in `index_text`
    ///
    /// An empty list is a valid outcome here; callers decide whether that
    /// counts as a failed detection.
    pub fn detect_chapters(&self, index_text: &str) -> Result<Vec<ChapterRecord>> {
        let prompt = toc_prompt(index_text);
        debug!("TOC prompt: {} characters", prompt.len());

        let reply = self.model.complete(&prompt)?;
        let records = parse_chapter_reply(&reply, self.extractor.as_ref())?;

        info!("Model reported {} chapters", records.len());
        Ok(records)
    }
}

/// Pull a chapter list out of a free-text model reply
pub fn parse_chapter_reply(reply: &str, extractor: &dyn JsonArrayExtractor) -> Result<Vec<ChapterRecord>> {
    if reply.trim().is_empty() {
        return Err(Error::EmptyResponse);
    }

    let candidate = extractor.extract(reply).ok_or_else(|| Error::MalformedJson {
        reason: "no JSON array found".to_string(),
        raw: reply.to_string(),
    })?;

    let value: Value = serde_json::from_str(candidate).map_err(|e| Error::MalformedJson {
        reason: e.to_string(),
        raw: candidate.to_string(),
    })?;

    let Value::Array(items) = value else {
        return Err(Error::MalformedJson {
            reason: "top-level value is not an array".to_string(),
            raw: candidate.to_string(),
        });
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| coerce_record(i, item, candidate))
        .collect()
}

fn coerce_record(index: usize, item: &Value, raw: &str) -> Result<ChapterRecord> {
    let Value::Object(fields) = item else {
        return Err(Error::MalformedJson {
            reason: format!("element {} is not an object", index),
            raw: raw.to_string(),
        });
    };

    let record = ChapterRecord {
        chapter_number: label_field(fields, "chapter_number", index),
        title: label_field(fields, "title", index),
        start_page: page_field(fields, "start_page"),
        end_page: page_field(fields, "end_page"),
    };

    if !record.has_page_range() {
        debug!("Chapter {} has incomplete pages: {}", index, record);
    }

    Ok(record)
}

fn label_field(fields: &Map<String, Value>, key: &str, index: usize) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None => {
            warn!("Chapter {} is missing '{}'", index, key);
            String::new()
        }
        Some(other) => other.to_string(),
    }
}

/// A page number, or `None` when absent or not a whole number
fn page_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use crate::toc::extract::ObjectArrayExtractor;
    use crate::toc::prompt::EXAMPLE_CHAPTERS_JSON;

    fn parse(reply: &str) -> Result<Vec<ChapterRecord>> {
        parse_chapter_reply(reply, &GreedyBracketExtractor)
    }

    #[test]
    fn test_prose_wrapped_array() {
        let reply = format!("Here is the TOC:\n```json\n{}\n```\nLet me know!", EXAMPLE_CHAPTERS_JSON);
        let records = parse(&reply).unwrap();
        assert_eq!(
            records,
            vec![
                ChapterRecord::new("1", "Introduction", Some(1), Some(10)),
                ChapterRecord::new("2", "Basics", Some(11), Some(20)),
            ]
        );
    }

    #[test]
    fn test_empty_and_whitespace_replies() {
        assert!(matches!(parse(""), Err(Error::EmptyResponse)));
        assert!(matches!(parse("  \n\t "), Err(Error::EmptyResponse)));
    }

    #[test]
    fn test_no_array_is_malformed() {
        match parse("Sorry, I could not find a table of contents.") {
            Err(Error::MalformedJson { raw, .. }) => assert!(raw.starts_with("Sorry")),
            other => panic!("expected MalformedJson, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_array_is_malformed() {
        let reply = r#"[{"chapter_number": "1", "title": "Intro [draft]", "start_page": 1, "end_"#;
        match parse(reply) {
            Err(Error::MalformedJson { raw, .. }) => {
                assert_eq!(raw, r#"[{"chapter_number": "1", "title": "Intro [draft]"#)
            }
            other => panic!("expected MalformedJson, got {:?}", other),
        }
    }

    #[test]
    fn test_greedy_match_with_trailing_brackets_fails_parse() {
        let reply = format!("{}\nSee also [appendix]", EXAMPLE_CHAPTERS_JSON);
        assert!(matches!(parse(&reply), Err(Error::MalformedJson { .. })));
        let records = parse_chapter_reply(&reply, &ObjectArrayExtractor).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_missing_and_null_pages_stay_absent() {
        let reply = r#"[
            {"chapter_number": "I", "title": "Foreword", "start_page": null, "end_page": null},
            {"chapter_number": "Appendix A", "title": "Tables"}
        ]"#;
        let records = parse(reply).unwrap();
        assert_eq!(records[0], ChapterRecord::new("I", "Foreword", None, None));
        assert_eq!(records[1], ChapterRecord::new("Appendix A", "Tables", None, None));
    }

    #[test]
    fn test_loose_field_types_are_coerced() {
        let reply = r#"[{"chapter_number": 3, "title": " Motion ", "start_page": "41", "end_page": 58.0}]"#;
        let records = parse(reply).unwrap();
        assert_eq!(records[0], ChapterRecord::new("3", "Motion", Some(41), Some(58)));
    }

    #[test]
    fn test_unusable_pages_become_none() {
        let reply = r#"[{"chapter_number": "4", "title": "Light", "start_page": "xii", "end_page": 12.5}]"#;
        let records = parse(reply).unwrap();
        assert_eq!(records[0].start_page, None);
        assert_eq!(records[0].end_page, None);
    }

    #[test]
    fn test_non_object_element_is_malformed() {
        assert!(matches!(parse(r#"[1, 2, 3]"#), Err(Error::MalformedJson { .. })));
    }

    #[test]
    fn test_empty_array_is_not_an_error() {
        assert!(parse("No chapters: []").unwrap().is_empty());
    }

    #[test]
    fn test_detect_chapters_sends_index_text_once() {
        let model = ScriptedModel::replying(EXAMPLE_CHAPTERS_JSON);
        let interpreter = TocPromptInterpreter::new(&model);

        let index_text = "Chapter 1: Intro ... 1-10\nChapter 2: Basics ... 11-20";
        let records = interpreter.detect_chapters(index_text).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(model.prompt_count(), 1);
        assert!(model.prompts.borrow()[0].contains(index_text));
    }

    #[test]
    fn test_detect_chapters_propagates_transport_failure() {
        let model = ScriptedModel::new(vec![Err(Error::Transport("connection refused".into()))]);
        let interpreter = TocPromptInterpreter::new(&model);
        assert!(matches!(interpreter.detect_chapters("index"), Err(Error::Transport(_))));
        assert_eq!(model.prompt_count(), 1);
    }
}
