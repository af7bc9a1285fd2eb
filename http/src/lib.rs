//! HTTP flavour of Snare flows.
//!
//! Requests and responses are plain `http` types with a fully buffered [`Bytes`] body.
//! Everything here plugs into the protocol-agnostic engine of `snare-core`.

pub mod guard;
pub mod request;
pub mod response;
pub mod rewrite;

use bytes::Bytes;
use snare_core::Flow;

pub type HttpRequest = http::Request<Bytes>;
pub type HttpResponse = http::Response<Bytes>;
pub type HttpFlow = Flow<HttpRequest, HttpResponse>;

pub use guard::{
    body_contains, content_type_contains, has_header, has_method, has_path, path_starts_with,
};
pub use request::RequestExt;
pub use response::{html, json, not_found, status, text, xml};
pub use rewrite::{ForwardToTarget, SetResponseHeader};

pub mod prelude {
    pub use crate::guard::{
        body_contains, content_type_contains, has_header, has_method, has_path,
        path_starts_with,
    };
    pub use crate::request::RequestExt;
    pub use crate::response::{html, json, not_found, status, text, xml};
    pub use crate::rewrite::{ForwardToTarget, SetResponseHeader};
    pub use crate::{HttpFlow, HttpRequest, HttpResponse};

    pub use bytes::Bytes;
    pub use http::{Method, StatusCode};
}
