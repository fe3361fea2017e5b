use regex::Regex;
use std::sync::LazyLock;

use crate::config::JsonExtractorKind;

static GREEDY_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("greedy array pattern"));

static OBJECT_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("object array pattern"));

/// Locates the JSON array inside a free-text model reply
pub trait JsonArrayExtractor {
    /// The candidate array text, or `None` when nothing looks like one
    fn extract<'a>(&self, reply: &'a str) -> Option<&'a str>;
}

/// First `[` to last `]`, spanning newlines
///
/// Deliberately loose: prose containing brackets before or after the array
/// is swallowed into the match, and a truncated array matches up to the
/// last closing bracket it happens to contain. The JSON parse that follows
/// is what rejects those cases.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyBracketExtractor;

impl JsonArrayExtractor for GreedyBracketExtractor {
    fn extract<'a>(&self, reply: &'a str) -> Option<&'a str> {
        GREEDY_ARRAY.find(reply).map(|m| m.as_str())
    }
}

/// Shortest `[ { ... } ]` run
///
/// Stricter about the opening, but stops at the first `}]`, so arrays
/// holding nested arrays of objects are cut short.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectArrayExtractor;

impl JsonArrayExtractor for ObjectArrayExtractor {
    fn extract<'a>(&self, reply: &'a str) -> Option<&'a str> {
        OBJECT_ARRAY.find(reply).map(|m| m.as_str())
    }
}

pub fn extractor_for(kind: JsonExtractorKind) -> Box<dyn JsonArrayExtractor> {
    match kind {
        JsonExtractorKind::Greedy => Box::new(GreedyBracketExtractor),
        JsonExtractorKind::ObjectArray => Box::new(ObjectArrayExtractor),
    }
}
