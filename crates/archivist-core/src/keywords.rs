//! Extraction of the trailing keyword line from a generated answer.
//!
//! The answer generator is instructed to end with `Keywords: a, b, c`, but
//! the model is free to ignore that. Extraction degrades to an empty set
//! rather than failing the turn.

const KEYWORD_PREFIX: &str = "Keywords:";

/// Heuristic bound on an unprefixed trailing line still accepted as keywords.
const MAX_BARE_KEYWORD_LINE: usize = 80;

/// Extract topic keywords from the answer's trailing line.
///
/// Returns the empty set when the answer has no separate trailing line or
/// the trailing line does not look like a keyword line.
#[must_use]
pub fn extract_keywords(answer: &str) -> Vec<String> {
    if answer.lines().count() < 2 {
        return Vec::new();
    }
    let Some(last) = answer.lines().next_back() else {
        return Vec::new();
    };
    let last = last.trim();

    let line = match last.strip_prefix(KEYWORD_PREFIX) {
        Some(rest) => rest,
        None => {
            // Without the prefix, only accept a short comma-separated line;
            // anything else is answer prose.
            if last.len() > MAX_BARE_KEYWORD_LINE || !last.contains(',') {
                return Vec::new();
            }
            last
        }
    };

    line.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_line_is_parsed() {
        let answer = "The college opened in 1887. [1-1-1]\nKeywords: college, 1887, founding";
        assert_eq!(extract_keywords(answer), vec!["college", "1887", "founding"]);
    }

    #[test]
    fn bare_comma_line_is_parsed() {
        let answer = "Some answer text.\ncollege, founding, medicine";
        assert_eq!(
            extract_keywords(answer),
            vec!["college", "founding", "medicine"]
        );
    }

    #[test]
    fn single_line_answer_yields_empty() {
        assert!(extract_keywords("I don't know.").is_empty());
    }

    #[test]
    fn prose_trailing_line_yields_empty() {
        let answer = "First line.\nThis trailing line is ordinary prose without separators";
        assert!(extract_keywords(answer).is_empty());
    }

    #[test]
    fn long_trailing_line_yields_empty() {
        let long_line = format!("a, {}", "x".repeat(100));
        let answer = format!("First line.\n{long_line}");
        assert!(extract_keywords(&answer).is_empty());
    }

    #[test]
    fn empty_answer_yields_empty() {
        assert!(extract_keywords("").is_empty());
    }

    #[test]
    fn whitespace_around_keywords_is_trimmed() {
        let answer = "Answer.\nKeywords:  alpha ,beta , gamma ";
        assert_eq!(extract_keywords(answer), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn empty_entries_are_dropped() {
        let answer = "Answer.\nKeywords: alpha,, beta,";
        assert_eq!(extract_keywords(answer), vec!["alpha", "beta"]);
    }
}
