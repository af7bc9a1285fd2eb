//! Request guards for HTTP flows.
//!
//! Each guard is a small named [`Matcher`] so that schematics show what a branch
//! tests for. Arbitrary closures over [`HttpRequest`] work as guards too.

use crate::HttpRequest;
use crate::request::RequestExt;
use http::Method;
use snare_core::Matcher;

#[derive(Debug, Clone)]
pub struct HasPath(String);

#[derive(Debug, Clone)]
pub struct PathStartsWith(String);

#[derive(Debug, Clone)]
pub struct HasMethod(Method);

/// Header presence, or header equality when a value is given.
#[derive(Debug, Clone)]
pub struct HasHeader {
    name: String,
    value: Option<String>,
}

/// Case-insensitive substring test on the `Content-Type` header.
#[derive(Debug, Clone)]
pub struct ContentTypeContains(String);

#[derive(Debug, Clone)]
pub struct BodyContains(String);

pub fn has_path(path: impl Into<String>) -> HasPath {
    HasPath(path.into())
}

pub fn path_starts_with(prefix: impl Into<String>) -> PathStartsWith {
    PathStartsWith(prefix.into())
}

pub fn has_method(method: Method) -> HasMethod {
    HasMethod(method)
}

pub fn has_header(name: impl Into<String>, value: Option<&str>) -> HasHeader {
    HasHeader {
        name: name.into(),
        value: value.map(str::to_string),
    }
}

pub fn content_type_contains(fragment: impl Into<String>) -> ContentTypeContains {
    ContentTypeContains(fragment.into().to_ascii_lowercase())
}

pub fn body_contains(fragment: impl Into<String>) -> BodyContains {
    BodyContains(fragment.into())
}

impl Matcher<HttpRequest> for HasPath {
    fn matches(&self, request: &HttpRequest) -> bool {
        request.path() == self.0
    }

    fn describe(&self) -> String {
        format!("path == {}", self.0)
    }
}

impl Matcher<HttpRequest> for PathStartsWith {
    fn matches(&self, request: &HttpRequest) -> bool {
        request.path().starts_with(&self.0)
    }

    fn describe(&self) -> String {
        format!("path starts with {}", self.0)
    }
}

impl Matcher<HttpRequest> for HasMethod {
    fn matches(&self, request: &HttpRequest) -> bool {
        request.method_is(&self.0)
    }

    fn describe(&self) -> String {
        format!("method == {}", self.0)
    }
}

impl Matcher<HttpRequest> for HasHeader {
    fn matches(&self, request: &HttpRequest) -> bool {
        match (request.header_str(&self.name), &self.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn describe(&self) -> String {
        match &self.value {
            Some(value) => format!("header {} == {value}", self.name),
            None => format!("has header {}", self.name),
        }
    }
}

impl Matcher<HttpRequest> for ContentTypeContains {
    fn matches(&self, request: &HttpRequest) -> bool {
        request
            .content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains(&self.0))
    }

    fn describe(&self) -> String {
        format!("content type contains {}", self.0)
    }
}

impl Matcher<HttpRequest> for BodyContains {
    fn matches(&self, request: &HttpRequest) -> bool {
        request.body_text().contains(self.0.as_str())
    }

    fn describe(&self) -> String {
        format!("body contains {:?}", self.0)
    }
}
