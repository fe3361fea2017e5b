use regex::Regex;
use std::sync::LazyLock;

static BULLET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s*").expect("bullet pattern"));

/// Split text into chunks of at most `max_words` whitespace-delimited words
pub fn chunk_words(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || max_words == 0 {
        return Vec::new();
    }

    words
        .chunks(max_words)
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// Non-empty lines of an LLM list reply, bullet markers stripped
pub fn list_items(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| BULLET_PREFIX.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_words() {
        let text = "one two three four five";
        assert_eq!(chunk_words(text, 2), vec!["one two", "three four", "five"]);
        assert_eq!(chunk_words(text, 10), vec!["one two three four five"]);
        assert!(chunk_words("   \n ", 3).is_empty());
    }

    #[test]
    fn test_chunk_words_normalizes_whitespace() {
        let chunks = chunk_words("Cell\nStructure\n\n  Nucleus", 2);
        assert_eq!(chunks, vec!["Cell Structure", "Nucleus"]);
    }

    #[test]
    fn test_list_items() {
        let reply = "- Cell membrane\n* Nucleus\n\n1. Mitochondria\n2) Ribosomes\nPlain line\n";
        assert_eq!(
            list_items(reply),
            vec!["Cell membrane", "Nucleus", "Mitochondria", "Ribosomes", "Plain line"]
        );
    }
}
