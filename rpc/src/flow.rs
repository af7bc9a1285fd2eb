//! Builders for RPC sub-flows.
//!
//! ```rust,ignore
//! let quotes = root.rpc(client, codec, "/quotes");
//! quotes.respond_call("GetQuote", json!({"symbol": "ACME"}), json!({"price": 42}));
//! quotes.then_invoke();
//! ```

use crate::call::{RpcCall, RpcResponse};
use crate::matcher::{call_matches_loosely, call_matches_strictly};
use crate::schema::DefaultReplies;
use crate::service::{EnvelopeCodec, INVOKE, ServiceClient};
use crate::transform::RpcTransform;
use serde_json::Value;
use snare_core::{Flow, Pattern};
use snare_http::{HttpFlow, has_path};
use std::sync::Arc;

pub type RpcFlow = Flow<RpcCall, RpcResponse>;

pub trait RpcFlowExt {
    /// Appends an RPC branch answering requests to `path` and returns its inner flow.
    fn rpc<C, K>(&self, client: Arc<C>, codec: Arc<K>, path: &str) -> RpcFlow
    where
        C: ServiceClient,
        K: EnvelopeCodec;
}

impl RpcFlowExt for HttpFlow {
    fn rpc<C, K>(&self, client: Arc<C>, codec: Arc<K>, path: &str) -> RpcFlow
    where
        C: ServiceClient,
        K: EnvelopeCodec,
    {
        self.when(has_path(path))
            .transform(RpcTransform::new(client, codec))
    }
}

pub trait RpcCallFlowExt {
    /// Answers `reply` to calls of `method` whose arguments loosely match `pattern`.
    fn respond_call(&self, method: &str, pattern: impl Into<Pattern>, reply: Value) -> RpcFlow;

    fn respond_call_strict(
        &self,
        method: &str,
        pattern: impl Into<Pattern>,
        reply: Value,
    ) -> RpcFlow;

    /// Hands every call to the real service through an `rpc.invoke` suspension.
    fn then_invoke(&self) -> RpcFlow;

    /// Answers a placeholder built from the method's reply schema.
    fn then_default_reply(&self) -> RpcFlow;
}

impl RpcCallFlowExt for RpcFlow {
    fn respond_call(&self, method: &str, pattern: impl Into<Pattern>, reply: Value) -> RpcFlow {
        self.respond_when(call_matches_loosely(method, pattern), RpcResponse::Reply(reply))
    }

    fn respond_call_strict(
        &self,
        method: &str,
        pattern: impl Into<Pattern>,
        reply: Value,
    ) -> RpcFlow {
        self.respond_when(call_matches_strictly(method, pattern), RpcResponse::Reply(reply))
    }

    fn then_invoke(&self) -> RpcFlow {
        self.then_pass_through_to(INVOKE)
    }

    fn then_default_reply(&self) -> RpcFlow {
        let generator = DefaultReplies::new();
        self.then_try_respond(move |call: &RpcCall| {
            let schema = call
                .reply_schema
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("no reply schema for method '{}'", call.method()))?;
            Ok(RpcResponse::Reply(generator.generate(schema)))
        })
    }
}
