//! Guards: predicates deciding whether a branch applies to a request.
//!
//! Any `Fn(&T) -> bool` closure is a guard. Named guards implement [`Matcher`]
//! directly so they can describe themselves in a schematic.

use std::fmt;
use std::sync::Arc;

pub trait Matcher<T: ?Sized>: Send + Sync + 'static {
    fn matches(&self, item: &T) -> bool;

    fn describe(&self) -> String {
        crate::type_name_of::<Self>()
    }
}

impl<T, F> Matcher<T> for F
where
    T: ?Sized,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn matches(&self, item: &T) -> bool {
        self(item)
    }

    fn describe(&self) -> String {
        "predicate".to_string()
    }
}

pub type SharedMatcher<T> = Arc<dyn Matcher<T>>;

/// Matches when every inner matcher matches. Short-circuits on the first miss.
pub struct AllOf<T: ?Sized> {
    matchers: Vec<SharedMatcher<T>>,
}

/// Matches when any inner matcher matches. Short-circuits on the first hit.
pub struct AnyOf<T: ?Sized> {
    matchers: Vec<SharedMatcher<T>>,
}

pub struct Not<M>(M);

pub fn all_of<T: ?Sized>(matchers: Vec<SharedMatcher<T>>) -> AllOf<T> {
    AllOf { matchers }
}

pub fn any_of<T: ?Sized>(matchers: Vec<SharedMatcher<T>>) -> AnyOf<T> {
    AnyOf { matchers }
}

pub fn not<M>(matcher: M) -> Not<M> {
    Not(matcher)
}

impl<T: ?Sized + 'static> Matcher<T> for AllOf<T> {
    fn matches(&self, item: &T) -> bool {
        self.matchers.iter().all(|m| m.matches(item))
    }

    fn describe(&self) -> String {
        join_descriptions("all of", &self.matchers)
    }
}

impl<T: ?Sized + 'static> Matcher<T> for AnyOf<T> {
    fn matches(&self, item: &T) -> bool {
        self.matchers.iter().any(|m| m.matches(item))
    }

    fn describe(&self) -> String {
        join_descriptions("any of", &self.matchers)
    }
}

impl<T: ?Sized, M: Matcher<T>> Matcher<T> for Not<M> {
    fn matches(&self, item: &T) -> bool {
        !self.0.matches(item)
    }

    fn describe(&self) -> String {
        format!("not {}", self.0.describe())
    }
}

fn join_descriptions<T: ?Sized + 'static>(prefix: &str, matchers: &[SharedMatcher<T>]) -> String {
    let parts: Vec<String> = matchers.iter().map(|m| m.describe()).collect();
    format!("{prefix} ({})", parts.join(", "))
}

impl<T: ?Sized> fmt::Debug for AllOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllOf")
            .field("len", &self.matchers.len())
            .finish()
    }
}

impl<T: ?Sized> fmt::Debug for AnyOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyOf")
            .field("len", &self.matchers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even() -> SharedMatcher<i32> {
        Arc::new(|v: &i32| v % 2 == 0)
    }

    fn positive() -> SharedMatcher<i32> {
        Arc::new(|v: &i32| *v > 0)
    }

    #[test]
    fn test_closure_is_a_matcher() {
        let m = |v: &i32| *v == 3;
        assert!(m.matches(&3));
        assert!(!Matcher::matches(&m, &4));
    }

    #[test]
    fn test_combinators() {
        let both = all_of(vec![even(), positive()]);
        assert!(both.matches(&4));
        assert!(!both.matches(&-4));

        let either = any_of(vec![even(), positive()]);
        assert!(either.matches(&-4));
        assert!(!either.matches(&-3));

        assert!(not(both).matches(&-4));
    }

    #[test]
    fn test_combinator_descriptions() {
        let both = all_of(vec![even(), positive()]);
        assert_eq!(both.describe(), "all of (predicate, predicate)");
        assert_eq!(not(any_of(vec![even()])).describe(), "not any of (predicate)");
    }
}
