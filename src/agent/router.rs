//! Keyword routing: decide whether a user message should go to a tool
//! before falling back to the model.
//!
//! Matching is case-insensitive but the extracted argument keeps the
//! user's original casing and spacing (trimmed at the ends).

/// Explicit calculator keywords. The expression is whatever follows the LAST
/// occurrence, so "please calculate 5 * 10" works. "calculate" wins over
/// "solve" when both appear.
const CALCULATOR_EXTRACT_KEYWORDS: [&str; 2] = ["calculate", "solve"];

/// Keywords that trigger a Wikipedia lookup. Longer phrases come first so
/// "wiki search rust" strips the whole phrase, not just "wiki". The query is
/// whatever follows the FIRST matching keyword.
const WIKIPEDIA_KEYWORDS: [&str; 5] = ["wiki search", "wiki", "search for", "who is", "what is"];

/// Expression to hand to the calculator, if the message asks for one.
/// An explicit keyword yields the (possibly empty) text after it; a message
/// that merely looks like math ("math", '+', '*', '/') is tried whole.
pub fn calculator_candidate(message: &str) -> Option<String> {
    for keyword in CALCULATOR_EXTRACT_KEYWORDS {
        if let Some(end) = last_keyword_end(message, keyword) {
            return Some(message[end..].trim().to_string());
        }
    }

    if first_keyword_end(message, "math").is_some() || message.contains(['+', '*', '/']) {
        return Some(message.trim().to_string());
    }

    None
}

/// Query to hand to the Wikipedia tool, if the message asks for one.
pub fn wikipedia_query(message: &str) -> Option<String> {
    for keyword in WIKIPEDIA_KEYWORDS {
        if let Some(end) = first_keyword_end(message, keyword) {
            return Some(message[end..].trim().to_string());
        }
    }
    None
}

/// Byte offset just past the last case-insensitive occurrence of `keyword`.
/// Keywords are ASCII, so an ASCII-level comparison is byte-offset safe even
/// when the surrounding message is not.
fn last_keyword_end(message: &str, keyword: &str) -> Option<usize> {
    let mut found = None;
    for (start, _) in message.char_indices() {
        if let Some(window) = message.get(start..start + keyword.len())
            && window.eq_ignore_ascii_case(keyword)
        {
            found = Some(start + keyword.len());
        }
    }
    found
}

fn first_keyword_end(message: &str, keyword: &str) -> Option<usize> {
    for (start, _) in message.char_indices() {
        if let Some(window) = message.get(start..start + keyword.len())
            && window.eq_ignore_ascii_case(keyword)
        {
            return Some(start + keyword.len());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{calculator_candidate, wikipedia_query};

    #[test]
    fn calculator_extracts_after_keyword() {
        assert_eq!(
            calculator_candidate("calculate 5 * 10"),
            Some("5 * 10".to_string())
        );
        assert_eq!(
            calculator_candidate("please solve 2 + 2 for me"),
            Some("2 + 2 for me".to_string())
        );
    }

    #[test]
    fn calculator_uses_last_keyword_occurrence() {
        assert_eq!(
            calculator_candidate("solve this: calculate 7 / 2"),
            Some("7 / 2".to_string())
        );
    }

    #[test]
    fn calculator_is_case_insensitive_but_keeps_argument_casing() {
        assert_eq!(
            calculator_candidate("CALCULATE (1 + 2) * 3"),
            Some("(1 + 2) * 3".to_string())
        );
    }

    #[test]
    fn calculator_keyword_with_nothing_after_yields_empty() {
        assert_eq!(calculator_candidate("calculate"), Some(String::new()));
        assert_eq!(calculator_candidate("tell me a joke"), None);
    }

    #[test]
    fn calculator_takes_whole_message_when_it_looks_like_math() {
        assert_eq!(
            calculator_candidate("2 + 2"),
            Some("2 + 2".to_string())
        );
        assert_eq!(
            calculator_candidate("10 / 4"),
            Some("10 / 4".to_string())
        );
        assert_eq!(
            calculator_candidate("I need help with math"),
            Some("I need help with math".to_string())
        );
        assert_eq!(calculator_candidate("2 - 2"), None);
    }

    #[test]
    fn calculator_prefers_calculate_over_solve() {
        assert_eq!(
            calculator_candidate("calculate 1 + 1 then solve 5"),
            Some("1 + 1 then solve 5".to_string())
        );
    }

    #[test]
    fn wikipedia_extracts_after_first_keyword() {
        assert_eq!(
            wikipedia_query("wiki search Rust programming"),
            Some("Rust programming".to_string())
        );
        assert_eq!(
            wikipedia_query("who is Ada Lovelace"),
            Some("Ada Lovelace".to_string())
        );
        assert_eq!(
            wikipedia_query("What is an octopus"),
            Some("an octopus".to_string())
        );
    }

    #[test]
    fn wikipedia_prefers_longer_phrase_over_bare_wiki() {
        // "wiki search" must strip the whole phrase, not leave "search".
        assert_eq!(wikipedia_query("wiki search lemurs"), Some("lemurs".to_string()));
        assert_eq!(wikipedia_query("wiki lemurs"), Some("lemurs".to_string()));
    }

    #[test]
    fn wikipedia_none_without_keywords() {
        assert_eq!(wikipedia_query("calculate 2 + 2"), None);
        assert_eq!(wikipedia_query("hello there"), None);
    }

    #[test]
    fn routing_survives_non_ascii_text() {
        assert_eq!(
            calculator_candidate("café ☕ calculate 1 + 1"),
            Some("1 + 1".to_string())
        );
        assert_eq!(
            wikipedia_query("¿what is naïveté?"),
            Some("naïveté?".to_string())
        );
    }
}
