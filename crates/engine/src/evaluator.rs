//! Satisfaction evaluator: decides whether the goal has been answered.
//!
//! A pure function of the context: the same context always yields the same
//! verdict and feedback.

use fieldnote_core::context::Context;
use serde::Serialize;
use serde_json::Value;

/// A summary needs strictly more words than this to satisfy the goal.
pub const DEFAULT_MIN_SUMMARY_WORDS: usize = 30;

pub const SATISFIED_FEEDBACK: &str = "Goal satisfied: summary generated";
pub const INCOMPLETE_FEEDBACK: &str = "Goal not satisfied: summary missing or incomplete";

/// The evaluator's verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub satisfied: bool,
    pub feedback: String,
}

/// Evaluate with the default word threshold.
pub fn evaluate(context: &Context) -> Evaluation {
    evaluate_with(context, DEFAULT_MIN_SUMMARY_WORDS)
}

/// Satisfied iff `summary` is a string of more than `min_words` words.
///
/// Otherwise the feedback mentions a top-level `error` value when present.
pub fn evaluate_with(context: &Context, min_words: usize) -> Evaluation {
    let words = context
        .get_str("summary")
        .map(|s| s.split_whitespace().count())
        .unwrap_or(0);

    if words > min_words {
        return Evaluation {
            satisfied: true,
            feedback: SATISFIED_FEEDBACK.into(),
        };
    }

    let feedback = match context.get("error") {
        Some(Value::String(error)) => format!("Goal not satisfied due to error: {error}"),
        Some(error) => format!("Goal not satisfied due to error: {error}"),
        None => INCOMPLETE_FEEDBACK.into(),
    };

    Evaluation {
        satisfied: false,
        feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldnote_core::context::EntityKind;
    use serde_json::json;

    fn ctx_with(entries: &[(&str, Value)]) -> Context {
        let mut c = Context::new("goal", vec![], EntityKind::General, vec![]);
        for (k, v) in entries {
            c.insert(*k, v.clone());
        }
        c
    }

    #[test]
    fn thirty_one_words_is_satisfied() {
        let c = ctx_with(&[("summary", json!("word ".repeat(31)))]);
        let e = evaluate(&c);
        assert!(e.satisfied);
        assert_eq!(e.feedback, SATISFIED_FEEDBACK);
    }

    #[test]
    fn exactly_thirty_words_is_not() {
        let c = ctx_with(&[("summary", json!("word ".repeat(30)))]);
        assert!(!evaluate(&c).satisfied);
    }

    #[test]
    fn short_summary_is_incomplete() {
        let c = ctx_with(&[("summary", json!("short text"))]);
        let e = evaluate(&c);
        assert!(!e.satisfied);
        assert!(e.feedback.contains("missing or incomplete"));
    }

    #[test]
    fn missing_summary_is_incomplete() {
        let e = evaluate(&ctx_with(&[]));
        assert_eq!(e.feedback, INCOMPLETE_FEEDBACK);
    }

    #[test]
    fn non_string_summary_counts_as_missing() {
        let c = ctx_with(&[("summary", Value::from(vec!["a"; 40]))]);
        assert!(!evaluate(&c).satisfied);
    }

    #[test]
    fn error_key_is_reported() {
        let c = ctx_with(&[("error", json!("quota exceeded"))]);
        assert_eq!(evaluate(&c).feedback, "Goal not satisfied due to error: quota exceeded");

        let c = ctx_with(&[("error", json!({"code": 7}))]);
        assert_eq!(evaluate(&c).feedback, "Goal not satisfied due to error: {\"code\":7}");
    }

    #[test]
    fn custom_threshold() {
        let c = ctx_with(&[("summary", json!("one two three four"))]);
        assert!(evaluate_with(&c, 3).satisfied);
        assert!(!evaluate_with(&c, 4).satisfied);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let c = ctx_with(&[("summary", json!("short")), ("error", json!("x"))]);
        assert_eq!(evaluate(&c), evaluate(&c));
    }
}
