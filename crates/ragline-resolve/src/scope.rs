//! Document-scope marker parsing.
//!
//! A question may start with `[doc:<id>]` to restrict retrieval to one
//! document, e.g. `[doc:annual-report] What were the main risks?`.

const MARKER_OPEN: &str = "[doc:";

/// A question split into its optional document scope and the remaining text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedQuestion {
    pub scope: Option<String>,
    pub question: String,
}

/// Extract a leading `[doc:<id>]` marker.
///
/// - An unterminated marker, or an id containing `[`, is not a marker: the
///   question is returned unchanged with no scope.
/// - An empty id (`[doc:]`) is stripped and yields no scope.
/// - Surrounding whitespace is trimmed from both the id and the question.
pub fn parse_scope(raw: &str) -> ScopedQuestion {
    let trimmed = raw.trim();
    let unscoped = || ScopedQuestion {
        scope: None,
        question: trimmed.to_string(),
    };

    let Some(rest) = trimmed.strip_prefix(MARKER_OPEN) else {
        return unscoped();
    };
    let Some(close) = rest.find(']') else {
        return unscoped();
    };

    let id = &rest[..close];
    if id.contains('[') {
        return unscoped();
    }

    let id = id.trim();
    ScopedQuestion {
        scope: (!id.is_empty()).then(|| id.to_string()),
        question: rest[close + 1..].trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_question() {
        let parsed = parse_scope("  What is the revenue?  ");
        assert_eq!(parsed.scope, None);
        assert_eq!(parsed.question, "What is the revenue?");
    }

    #[test]
    fn test_scoped_question() {
        let parsed = parse_scope("[doc:report-2024] What is the revenue?");
        assert_eq!(parsed.scope.as_deref(), Some("report-2024"));
        assert_eq!(parsed.question, "What is the revenue?");
    }

    #[test]
    fn test_leading_whitespace_and_padded_id() {
        let parsed = parse_scope("   [doc: r1 ]why");
        assert_eq!(parsed.scope.as_deref(), Some("r1"));
        assert_eq!(parsed.question, "why");
    }

    #[test]
    fn test_unterminated_marker_is_not_a_scope() {
        let parsed = parse_scope("[doc:r1 what happened?");
        assert_eq!(parsed.scope, None);
        assert_eq!(parsed.question, "[doc:r1 what happened?");
    }

    #[test]
    fn test_nested_bracket_is_not_a_scope() {
        let parsed = parse_scope("[doc:[r1]] what?");
        assert_eq!(parsed.scope, None);
        assert_eq!(parsed.question, "[doc:[r1]] what?");
    }

    #[test]
    fn test_empty_id_is_stripped() {
        let parsed = parse_scope("[doc:] anything new?");
        assert_eq!(parsed.scope, None);
        assert_eq!(parsed.question, "anything new?");
    }

    #[test]
    fn test_marker_must_lead() {
        let parsed = parse_scope("about [doc:r1] this");
        assert_eq!(parsed.scope, None);
        assert_eq!(parsed.question, "about [doc:r1] this");
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        assert_eq!(parse_scope("[DOC:r1] q").scope, None);
    }

    #[test]
    fn test_only_first_closing_bracket_ends_marker() {
        let parsed = parse_scope("[doc:r1] see [note] here");
        assert_eq!(parsed.scope.as_deref(), Some("r1"));
        assert_eq!(parsed.question, "see [note] here");
    }
}
