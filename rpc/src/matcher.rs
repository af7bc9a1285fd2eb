//! Guards over RPC calls.

use crate::call::RpcCall;
use snare_core::{Matcher, Mode, Pattern};

/// Matches calls of one method whose arguments fit a structural pattern.
#[derive(Debug, Clone)]
pub struct CallMatcher {
    method: String,
    pattern: Pattern,
    mode: Mode,
}

impl CallMatcher {
    pub fn new(method: impl Into<String>, pattern: impl Into<Pattern>, mode: Mode) -> Self {
        Self {
            method: method.into(),
            pattern: pattern.into(),
            mode,
        }
    }
}

impl Matcher<RpcCall> for CallMatcher {
    fn matches(&self, call: &RpcCall) -> bool {
        call.method() == self.method && self.pattern.matches(&call.arguments_value(), self.mode)
    }

    fn describe(&self) -> String {
        let mode = match self.mode {
            Mode::Strict => "strictly",
            Mode::Loose => "loosely",
        };
        format!("{} {mode} matches {:?}", self.method, self.pattern)
    }
}

pub fn call_matches_loosely(
    method: impl Into<String>,
    pattern: impl Into<Pattern>,
) -> CallMatcher {
    CallMatcher::new(method, pattern, Mode::Loose)
}

pub fn call_matches_strictly(
    method: impl Into<String>,
    pattern: impl Into<Pattern>,
) -> CallMatcher {
    CallMatcher::new(method, pattern, Mode::Strict)
}
