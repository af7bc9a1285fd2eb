use crate::call::{RpcCall, RpcResponse};
use crate::service::{EnvelopeCodec, ServiceClient};
use async_trait::async_trait;
use snare_core::{FlowContext, FlowError, FlowResult, Next, Outcome, Transform};
use snare_http::{HttpRequest, HttpResponse, RequestExt, xml};
use std::sync::Arc;

const SOAP_NAMESPACE: &str = "schemas.xmlsoap.org";

/// Turns HTTP requests carrying an RPC envelope into [`RpcCall`]s, and encodes the
/// replies of the inner flow back into HTTP.
pub struct RpcTransform<C, K> {
    client: Arc<C>,
    codec: Arc<K>,
}

impl<C, K> RpcTransform<C, K>
where
    C: ServiceClient,
    K: EnvelopeCodec,
{
    pub fn new(client: Arc<C>, codec: Arc<K>) -> Self {
        Self { client, codec }
    }

    /// `true` for SOAP content types, and for XML bodies using the SOAP envelope namespace.
    pub fn is_rpc(request: &HttpRequest) -> bool {
        let content_type = request.content_type().unwrap_or_default().to_ascii_lowercase();
        content_type.contains("soap")
            || (content_type.contains("xml") && request.body_text().contains(SOAP_NAMESPACE))
    }

    fn decode(&self, request: &HttpRequest) -> anyhow::Result<RpcCall> {
        let envelope = self.codec.decode(&request.body_text())?;
        let handle = self
            .client
            .lookup(&envelope.method, &envelope.argument_names())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "service has no method '{}' accepting ({})",
                    envelope.method,
                    envelope.argument_names().join(", ")
                )
            })?;
        let schema = self.client.reply_schema(&handle);
        Ok(RpcCall::new(handle, envelope.arguments).with_reply_schema(schema))
    }
}

#[async_trait]
impl<C, K> Transform<HttpRequest, HttpResponse> for RpcTransform<C, K>
where
    C: ServiceClient,
    K: EnvelopeCodec,
{
    type Request = RpcCall;
    type Response = RpcResponse;

    async fn transform(
        &self,
        request: &HttpRequest,
        _cx: &FlowContext,
        next: Next<'_, RpcCall, RpcResponse>,
    ) -> FlowResult<HttpResponse> {
        if !Self::is_rpc(request) {
            return Ok(Outcome::Rejected);
        }

        let call = self.decode(request).map_err(FlowError::Fault)?;
        tracing::debug!(
            method = %call.method(),
            overload = call.handle.overload,
            "decoded RPC call"
        );

        let handle = call.handle.clone();
        match next.run(&call).await? {
            Outcome::Rejected => Ok(Outcome::Rejected),
            Outcome::Matched(RpcResponse::Raw(response)) => Ok(Outcome::Matched(response)),
            Outcome::Matched(RpcResponse::Reply(reply)) => {
                let body = self
                    .codec
                    .encode_reply(&handle, &reply)
                    .map_err(FlowError::Fault)?;
                Ok(Outcome::Matched(xml(body)))
            }
        }
    }

    fn label(&self) -> String {
        "rpc".to_string()
    }
}
