//! Request and response rewrites for HTTP flows.

use crate::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use http::header::{HOST, HeaderName, HeaderValue};
use http::uri::{PathAndQuery, Scheme, Uri};
use snare_core::{FlowContext, FlowError, FlowResult, Next, Outcome, Rewrite, Transform};

/// Points the request at the upstream named by the flow's parameters.
///
/// The URI authority and the `Host` header become `target_host:target_port`; scheme,
/// path and query are kept. Rejects when the flow has no parameters bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardToTarget;

impl ForwardToTarget {
    fn retarget(request: &HttpRequest, authority: &str) -> anyhow::Result<HttpRequest> {
        let original = request.uri();
        let uri = Uri::builder()
            .scheme(original.scheme().cloned().unwrap_or(Scheme::HTTP))
            .authority(authority)
            .path_and_query(
                original
                    .path_and_query()
                    .cloned()
                    .unwrap_or_else(|| PathAndQuery::from_static("/")),
            )
            .build()?;

        let mut forwarded = request.clone();
        *forwarded.uri_mut() = uri;
        forwarded
            .headers_mut()
            .insert(HOST, HeaderValue::from_str(authority)?);
        Ok(forwarded)
    }
}

#[async_trait]
impl Transform<HttpRequest, HttpResponse> for ForwardToTarget {
    type Request = HttpRequest;
    type Response = HttpResponse;

    async fn transform(
        &self,
        request: &HttpRequest,
        cx: &FlowContext,
        next: Next<'_, HttpRequest, HttpResponse>,
    ) -> FlowResult<HttpResponse> {
        let Some(parameters) = cx.parameters() else {
            tracing::debug!("no parameters bound, not forwarding");
            return Ok(Outcome::Rejected);
        };
        let authority = parameters.target_authority();
        let forwarded = Self::retarget(request, &authority).map_err(FlowError::Fault)?;
        tracing::trace!(target = %authority, uri = %forwarded.uri(), "retargeted request");

        next.run(&forwarded).await
    }

    fn label(&self) -> String {
        "forward to target".to_string()
    }
}

/// Inserts (or replaces) a header on every response passing back through.
#[derive(Debug, Clone)]
pub struct SetResponseHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetResponseHeader {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    pub fn try_from_strs(name: &str, value: &str) -> anyhow::Result<Self> {
        Ok(Self {
            name: HeaderName::from_bytes(name.as_bytes())?,
            value: HeaderValue::from_str(value)?,
        })
    }
}

impl Rewrite<HttpRequest, HttpResponse> for SetResponseHeader {
    fn rewrite_response(
        &self,
        _request: &HttpRequest,
        mut response: HttpResponse,
        _cx: &FlowContext,
    ) -> HttpResponse {
        response
            .headers_mut()
            .insert(self.name.clone(), self.value.clone());
        response
    }
}
