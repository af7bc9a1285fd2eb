//! RPC (SOAP-style) specialization of HTTP flows.
//!
//! An RPC branch decodes the request envelope through an [`EnvelopeCodec`], resolves
//! the method against a [`ServiceClient`], and evaluates an inner flow over
//! [`RpcCall`]s. Replies come back as structured values and are encoded into an
//! XML response, unless the inner flow produced a complete HTTP response itself.

pub mod call;
pub mod flow;
pub mod matcher;
pub mod schema;
pub mod service;
pub mod transform;

pub use call::{Envelope, MethodHandle, RpcCall, RpcResponse};
pub use flow::{RpcCallFlowExt, RpcFlow, RpcFlowExt};
pub use matcher::{CallMatcher, call_matches_loosely, call_matches_strictly};
pub use schema::{BasicKind, DefaultReplies, ReplySchema};
pub use service::{EnvelopeCodec, INVOKE, ServiceClient, ServiceTransport};
pub use transform::RpcTransform;

pub mod prelude {
    pub use crate::call::{Envelope, MethodHandle, RpcCall, RpcResponse};
    pub use crate::flow::{RpcCallFlowExt, RpcFlow, RpcFlowExt};
    pub use crate::matcher::{call_matches_loosely, call_matches_strictly};
    pub use crate::schema::{BasicKind, ReplySchema};
    pub use crate::service::{EnvelopeCodec, ServiceClient, ServiceTransport};
}
