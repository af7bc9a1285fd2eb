//! Structural matching of nested shapes over `serde_json::Value`.
//!
//! A [`Pattern`] describes the expected shape of a value: a literal scalar, an
//! ordered sequence of sub-patterns, a record of named sub-patterns, or an arbitrary
//! predicate. [`Pattern::Any`] accepts every value. Matching runs in one of two [`Mode`]s:
//!
//! - **Loose**: records may carry extra fields, `null` record fields in the pattern are
//!   "don't care", an absent/`null` actual sequence counts as empty, and a non-sequence
//!   pattern tested against a sequence matches when any element matches.
//! - **Strict**: records and sequences must have exactly the pattern's size.
//!
//! Matching never fails: missing fields, out-of-range access and type mismatches are
//! all plain non-matches.
//!
//! # Sequence containment is greedy
//!
//! Sequence patterns test ordered-subsequence containment with a single forward cursor.
//! For each pattern element the cursor moves forward until an element satisfies it, and
//! stays on that element: the next pattern element may be satisfied by the same actual
//! element. Earlier choices are never revisited. `[2, 2]` therefore matches `[2, 3]`
//! (both pattern elements land on the first `2`), while `[3, 1]` does not match
//! `[1, 2, 3]`.

use crate::matcher::Matcher;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Strict,
    #[default]
    Loose,
}

#[derive(Clone)]
pub enum Pattern {
    Scalar(Value),
    Sequence(Vec<Pattern>),
    Record(Vec<(String, Pattern)>),
    Predicate(ValuePredicate),
    /// Accepts every value, including `null` and whole sequences.
    Any,
}

impl Pattern {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Pattern::Scalar(value.into())
    }

    pub fn sequence(items: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Sequence(items.into_iter().collect())
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Pattern)>) -> Self {
        Pattern::Record(fields.into_iter().map(|(k, p)| (k.into(), p)).collect())
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Pattern::Predicate(Arc::new(predicate))
    }

    /// A record field with no constraint. Skipped in loose mode.
    pub fn dont_care() -> Self {
        Pattern::Scalar(Value::Null)
    }

    /// Matches anything in either mode. Unlike a predicate it is never lifted over
    /// the elements of a sequence, so it also accepts `[]`.
    pub fn any() -> Self {
        Pattern::Any
    }

    pub fn is_dont_care(&self) -> bool {
        matches!(self, Pattern::Scalar(Value::Null))
    }

    pub fn matches(&self, actual: &Value, mode: Mode) -> bool {
        value_matches(self, actual, mode)
    }

    pub fn matches_loosely(&self, actual: &Value) -> bool {
        self.matches(actual, Mode::Loose)
    }

    pub fn matches_strictly(&self, actual: &Value) -> bool {
        self.matches(actual, Mode::Strict)
    }
}

impl From<Value> for Pattern {
    /// Arrays become sequences, objects become records, everything else is a scalar.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => {
                Pattern::Sequence(items.into_iter().map(Pattern::from).collect())
            }
            Value::Object(fields) => Pattern::Record(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Pattern::from(v)))
                    .collect(),
            ),
            scalar => Pattern::Scalar(scalar),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Scalar(v) => write!(f, "{v}"),
            Pattern::Sequence(items) => f.debug_list().entries(items).finish(),
            Pattern::Record(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (k, v)))
                .finish(),
            Pattern::Predicate(_) => f.write_str("<predicate>"),
            Pattern::Any => f.write_str("_"),
        }
    }
}

fn value_matches(pattern: &Pattern, actual: &Value, mode: Mode) -> bool {
    match pattern {
        Pattern::Any => true,
        Pattern::Sequence(items) => sequence_matches(items, actual, mode),
        _ if mode == Mode::Loose && actual.is_array() => {
            sequence_matches(std::slice::from_ref(pattern), actual, mode)
        }
        Pattern::Record(fields) => record_matches(fields, actual, mode),
        Pattern::Predicate(predicate) => predicate(actual),
        Pattern::Scalar(expected) => expected == actual,
    }
}

fn sequence_matches(patterns: &[Pattern], actual: &Value, mode: Mode) -> bool {
    let items: &[Value] = match actual {
        Value::Array(items) => items,
        Value::Null if mode == Mode::Loose => &[],
        _ => return false,
    };

    if patterns.len() > items.len() || (mode == Mode::Strict && patterns.len() != items.len()) {
        return false;
    }

    let mut cursor = 0;
    for pattern in patterns {
        loop {
            let Some(item) = items.get(cursor) else {
                return false;
            };
            if value_matches(pattern, item, mode) {
                break;
            }
            cursor += 1;
        }
    }
    true
}

fn record_matches(fields: &[(String, Pattern)], actual: &Value, mode: Mode) -> bool {
    let Value::Object(actual_fields) = actual else {
        return false;
    };

    if mode == Mode::Strict && fields.len() != actual_fields.len() {
        return false;
    }

    fields.iter().all(|(name, pattern)| {
        if mode == Mode::Loose && pattern.is_dont_care() {
            return true;
        }
        actual_fields
            .get(name)
            .is_some_and(|value| value_matches(pattern, value, mode))
    })
}

/// A [`Pattern`] bound to a [`Mode`], usable as a guard over values.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Pattern,
    mode: Mode,
}

impl PatternMatcher {
    pub fn new(pattern: impl Into<Pattern>, mode: Mode) -> Self {
        Self {
            pattern: pattern.into(),
            mode,
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl Matcher<Value> for PatternMatcher {
    fn matches(&self, item: &Value) -> bool {
        self.pattern.matches(item, self.mode)
    }

    fn describe(&self) -> String {
        format!("{:?} matches {:?}", self.mode, self.pattern).to_lowercase()
    }
}

pub fn matches_loosely(pattern: impl Into<Pattern>) -> PatternMatcher {
    PatternMatcher::new(pattern, Mode::Loose)
}

pub fn matches_strictly(pattern: impl Into<Pattern>) -> PatternMatcher {
    PatternMatcher::new(pattern, Mode::Strict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pat(value: Value) -> Pattern {
        Pattern::from(value)
    }

    #[test]
    fn test_record_loose_allows_extra_fields() {
        let pattern = pat(json!({"a": 1}));
        assert!(pattern.matches_loosely(&json!({"a": 1, "b": 2})));
        assert!(!pattern.matches_strictly(&json!({"a": 1, "b": 2})));
        assert!(pattern.matches_strictly(&json!({"a": 1})));
    }

    #[test]
    fn test_record_missing_field_is_non_match() {
        let pattern = pat(json!({"a": 1, "c": 3}));
        assert!(!pattern.matches_loosely(&json!({"a": 1, "b": 2})));
        assert!(!pattern.matches_loosely(&json!("not a record")));
    }

    #[test]
    fn test_record_dont_care_fields() {
        let pattern = pat(json!({"a": 1, "b": null}));
        assert!(pattern.matches_loosely(&json!({"a": 1})));
        assert!(pattern.matches_loosely(&json!({"a": 1, "b": "anything"})));
        assert!(!pattern.matches_strictly(&json!({"a": 1, "b": "anything"})));
        assert!(pattern.matches_strictly(&json!({"a": 1, "b": null})));
    }

    #[test]
    fn test_sequence_ordered_subsequence() {
        let pattern = pat(json!([1, 3]));
        assert!(pattern.matches_loosely(&json!([1, 2, 3, 4])));
        assert!(!pat(json!([3, 1])).matches_loosely(&json!([1, 2, 3])));
        assert!(!pattern.matches_strictly(&json!([1, 2, 3, 4])));
        assert!(pattern.matches_strictly(&json!([1, 3])));
    }

    #[test]
    fn test_sequence_absent_actual() {
        assert!(pat(json!([])).matches_loosely(&Value::Null));
        assert!(!pat(json!([1])).matches_loosely(&Value::Null));
        assert!(!pat(json!([1])).matches_strictly(&Value::Null));
    }

    #[test]
    fn test_sequence_longer_than_actual() {
        assert!(!pat(json!([1, 2, 3])).matches_loosely(&json!([1, 2])));
    }

    #[test]
    fn test_greedy_cursor_does_not_consume_matched_element() {
        // Both pattern elements are satisfied by the first actual element.
        assert!(pat(json!([2, 2])).matches_loosely(&json!([2, 3])));
        assert!(pat(json!([2, 2])).matches_loosely(&json!([2, 3, 2])));
    }

    #[test]
    fn test_loose_lifts_scalar_over_sequence() {
        assert!(pat(json!(3)).matches_loosely(&json!([1, 2, 3])));
        assert!(!pat(json!(3)).matches_strictly(&json!([1, 2, 3])));
        assert!(pat(json!({"id": 2})).matches_loosely(&json!([{"id": 1}, {"id": 2}])));
    }

    #[test]
    fn test_nested_shapes() {
        let pattern = Pattern::record([
            ("user", pat(json!({"name": "ada"}))),
            (
                "roles",
                Pattern::sequence([Pattern::predicate(|v| v.as_str() == Some("admin"))]),
            ),
        ]);
        let actual = json!({
            "user": {"name": "ada", "id": 7},
            "roles": ["reader", "admin"],
        });
        assert!(pattern.matches_loosely(&actual));
        assert!(!pattern.matches_strictly(&actual));
    }

    #[test]
    fn test_any_accepts_every_value() {
        for actual in [json!([]), Value::Null, json!([1, 2]), json!({"k": 1}), json!("s")] {
            assert!(Pattern::any().matches_loosely(&actual), "loose {actual}");
            assert!(Pattern::any().matches_strictly(&actual), "strict {actual}");
        }
        let notes = Pattern::record([("notes", Pattern::any())]);
        assert!(notes.matches_loosely(&json!({"notes": []})));
        assert!(notes.matches_strictly(&json!({"notes": []})));
        assert!(!notes.matches_loosely(&json!({})));
    }

    #[test]
    fn test_loose_predicate_sees_elements() {
        let two = Pattern::predicate(|v| v.as_i64() == Some(2));
        assert!(two.matches_loosely(&json!([1, 2])));
        assert!(!two.matches_strictly(&json!([1, 2])));
    }

    #[test]
    fn test_pattern_matcher_as_guard() {
        let guard = matches_strictly(json!({"op": "get"}));
        assert!(guard.matches(&json!({"op": "get"})));
        assert!(!guard.matches(&json!({"op": "get", "id": 1})));
        assert_eq!(guard.mode(), Mode::Strict);
    }
}
