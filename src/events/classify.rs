use crate::events::EventKind;
use serde_json::Value;

/// Map a raw record's external type tag to an internal event kind.
///
/// Pure, no failure mode: a missing, null, or non-string `type` field
/// classifies the same as an unrecognized tag, and the record carries no
/// kind. Absence of a mapping is a normal outcome, not an error.
pub fn classify(record: &Value) -> Option<EventKind> {
    record
        .get("type")
        .and_then(Value::as_str)
        .and_then(EventKind::from_tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognized_tags_map_to_documented_kinds() {
        let cases = [
            ("PullRequestEvent", EventKind::PullRequest),
            ("IssueCommentEvent", EventKind::Comment),
            ("CommitCommentEvent", EventKind::Comment),
            ("PushEvent", EventKind::Commit),
        ];
        for (tag, expected) in cases {
            assert_eq!(classify(&json!({"type": tag})), Some(expected), "{tag}");
        }
    }

    #[test]
    fn unrecognized_tags_yield_no_kind() {
        for tag in ["WatchEvent", "ForkEvent", "GollumEvent", ""] {
            assert_eq!(classify(&json!({"type": tag})), None, "{tag}");
        }
    }

    #[test]
    fn missing_or_non_string_type_yields_no_kind() {
        assert_eq!(classify(&json!({})), None);
        assert_eq!(classify(&json!({"type": null})), None);
        assert_eq!(classify(&json!({"type": 7})), None);
    }
}
