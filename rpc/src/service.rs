//! Collaborators an RPC flow relies on, and the transport that reaches the real service.

use crate::call::{Envelope, MethodHandle, RpcCall, RpcResponse};
use crate::schema::ReplySchema;
use async_trait::async_trait;
use serde_json::Value;
use snare_core::Payload;
use snare_runtime::Transport;
use std::sync::Arc;

/// Destination tag of suspensions that invoke the real service.
pub const INVOKE: &str = "rpc.invoke";

/// Reads and writes the wire format of an RPC protocol.
pub trait EnvelopeCodec: Send + Sync + 'static {
    fn decode(&self, body: &str) -> anyhow::Result<Envelope>;
    fn encode_reply(&self, handle: &MethodHandle, reply: &Value) -> anyhow::Result<String>;
}

/// The service description plus a way to call the real service.
#[async_trait]
pub trait ServiceClient: Send + Sync + 'static {
    /// Resolves `method` to one concrete operation. Overloaded methods are told apart
    /// by the names of the arguments actually sent.
    fn lookup(&self, method: &str, argument_names: &[&str]) -> Option<MethodHandle>;

    async fn invoke(
        &self,
        handle: &MethodHandle,
        arguments: &[(String, Value)],
    ) -> anyhow::Result<Value>;

    fn reply_schema(&self, _handle: &MethodHandle) -> Option<ReplySchema> {
        None
    }
}

/// Services [`INVOKE`] suspensions by calling [`ServiceClient::invoke`].
pub struct ServiceTransport<C> {
    client: Arc<C>,
}

impl<C: ServiceClient> ServiceTransport<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: ServiceClient> Transport for ServiceTransport<C> {
    async fn dispatch(&self, destination: &str, payload: Payload) -> anyhow::Result<Payload> {
        let call = payload
            .downcast::<RpcCall>()
            .map_err(|_| anyhow::anyhow!("payload for '{destination}' is not an RPC call"))?;
        tracing::debug!(method = %call.method(), "invoking service");
        let reply = self.client.invoke(&call.handle, &call.arguments).await?;
        Ok(Box::new(RpcResponse::Reply(reply)))
    }
}
