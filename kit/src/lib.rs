//! Snare facade crate.
//!
//! Re-exports the flow engine, the runtime driver and the HTTP and RPC flavours with a
//! single entry point. Nothing here opens sockets: a host feeds requests to an
//! [`Engine`] and services suspensions through its [`Transport`].

pub use snare_core as core;
#[cfg(feature = "http")]
pub use snare_http as http;
#[cfg(feature = "rpc")]
pub use snare_rpc as rpc;
pub use snare_runtime as runtime;

pub use snare_core::{Binder, Flow, FlowError, Outcome, Parameters, Pattern, Schematic, Transform};
#[cfg(feature = "http")]
pub use snare_http::{HttpFlow, HttpRequest, HttpResponse};
pub use snare_runtime::{Engine, ProxyInstance, Settings, Transport};

pub mod prelude {
    pub use snare_core::prelude::*;
    #[cfg(feature = "http")]
    pub use snare_http::prelude::*;
    #[cfg(feature = "rpc")]
    pub use snare_rpc::prelude::*;
    pub use snare_runtime::prelude::*;
}
