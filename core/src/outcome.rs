use serde::{Deserialize, Serialize};

/// The explicit result of evaluating a branch of a flow.
///
/// `Outcome` represents "Control Flow as Data".
/// A branch that does not apply returns `Rejected` instead of raising anything,
/// and its parent moves on to the next sibling. Missing a branch is the common case
/// on a busy proxy, so `Rejected` carries nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome<T> {
    /// The branch applied and produced a value.
    Matched(T),

    /// The branch does not apply; try the next sibling.
    Rejected,
}

impl<T> Outcome<T> {
    pub fn matched(value: T) -> Self {
        Outcome::Matched(value)
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Outcome::Matched(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, op: F) -> Outcome<U> {
        match self {
            Outcome::Matched(t) => Outcome::Matched(op(t)),
            Outcome::Rejected => Outcome::Rejected,
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(t) => Outcome::Matched(t),
            None => Outcome::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_preserves_rejection() {
        let rejected: Outcome<i32> = Outcome::Rejected;
        assert_eq!(rejected.map(|v| v + 1), Outcome::Rejected);
        assert_eq!(Outcome::matched(1).map(|v| v + 1), Outcome::Matched(2));
    }

    #[test]
    fn test_from_option() {
        assert!(Outcome::from(Some("x")).is_matched());
        assert!(Outcome::<&str>::from(None).is_rejected());
    }
}
