//! Engine - drives flow evaluations over the suspension protocol
//!
//! A flow never talks to the network. When it needs an upstream it suspends with a
//! destination tag; the [`Engine`] hands the payload to its [`Transport`] and resumes
//! the evaluation with whatever comes back.

use crate::error::EngineError;
use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use snare_core::{Flow, Payload, Step};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Whatever performs the real I/O behind a suspension.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, destination: &str, payload: Payload) -> anyhow::Result<Payload>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn dispatch(&self, destination: &str, payload: Payload) -> anyhow::Result<Payload> {
        (**self).dispatch(destination, payload).await
    }
}

pub struct Engine<T> {
    transport: T,
}

impl<T: Transport> Engine<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Evaluates `request` against `flow` as a root, servicing every suspension in
    /// order until the evaluation completes.
    pub async fn run<I, O>(&self, flow: &Flow<I, O>, request: &I) -> Result<O, EngineError>
    where
        I: Send + Sync + 'static,
        O: Send + 'static,
    {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "exchange",
            snare.request_id = %request_id,
            snare.flow = %flow.label()
        );

        async move {
            let mut task = flow.start(request);
            loop {
                match task.step().await? {
                    Step::Complete(result) => {
                        match &result {
                            Ok(_) => {
                                tracing::debug!(
                                    suspensions = task.suspensions(),
                                    "exchange complete"
                                )
                            }
                            Err(e) => tracing::info!(error = %e, "exchange failed"),
                        }
                        return result.map_err(EngineError::from);
                    }
                    Step::Suspended(suspension) => {
                        let (destination, payload, token) = suspension.into_parts();
                        tracing::debug!(%destination, %token, "dispatching suspension");

                        let reply = self
                            .transport
                            .dispatch(&destination, payload)
                            .await
                            .map_err(|source| EngineError::Transport {
                                destination: destination.clone(),
                                source,
                            })?;
                        task.resume(token, reply)?;
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl<T> std::fmt::Debug for Engine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("transport", &std::any::type_name::<T>())
            .finish()
    }
}

type Handler = Arc<dyn Fn(Payload) -> anyhow::Result<Payload> + Send + Sync>;

/// In-memory transport answering each destination with a fixed closure.
///
/// Every dispatch is recorded, so tests can assert how often and where the flow
/// reached out.
#[derive(Default)]
pub struct ScriptedTransport {
    handlers: AHashMap<String, Handler>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers suspensions to `destination` carrying a `Q` with `handler(q)`.
    pub fn on<Q, S, F>(mut self, destination: &str, handler: F) -> Self
    where
        Q: 'static,
        S: Send + 'static,
        F: Fn(Q) -> anyhow::Result<S> + Send + Sync + 'static,
    {
        let route = destination.to_string();
        let handler: Handler = Arc::new(move |payload: Payload| {
            let request = payload.downcast::<Q>().map_err(|_| {
                anyhow::anyhow!(
                    "payload for '{route}' is not a {}",
                    std::any::type_name::<Q>()
                )
            })?;
            let reply: Payload = Box::new(handler(*request)?);
            Ok(reply)
        });
        self.handlers.insert(destination.to_string(), handler);
        self
    }

    /// Destinations dispatched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn dispatch(&self, destination: &str, payload: Payload) -> anyhow::Result<Payload> {
        self.calls.lock().push(destination.to_string());
        let handler = self
            .handlers
            .get(destination)
            .ok_or_else(|| anyhow::anyhow!("no route for destination '{destination}'"))?;
        handler(payload)
    }
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("routes", &self.handlers.keys().collect::<Vec<_>>())
            .field("calls", &self.call_count())
            .finish()
    }
}

/// Transport dispatching each destination tag to its own transport.
#[derive(Default)]
pub struct Router {
    routes: AHashMap<String, Arc<dyn Transport>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, destination: &str, transport: impl Transport + 'static) -> Self {
        self.routes
            .insert(destination.to_string(), Arc::new(transport));
        self
    }

    pub fn has_route(&self, destination: &str) -> bool {
        self.routes.contains_key(destination)
    }
}

#[async_trait]
impl Transport for Router {
    async fn dispatch(&self, destination: &str, payload: Payload) -> anyhow::Result<Payload> {
        match self.routes.get(destination) {
            Some(transport) => transport.dispatch(destination, payload).await,
            None => anyhow::bail!("no route for destination '{destination}'"),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snare_core::{FlowError, REMOTE};

    fn upstream() -> ScriptedTransport {
        ScriptedTransport::new().on(REMOTE, |request: String| Ok(format!("upstream:{request}")))
    }

    #[tokio::test]
    async fn test_pure_flow_never_dispatches() {
        let flow = Flow::<String, String>::new("root");
        flow.then_respond("local".to_string());
        let engine = Engine::new(upstream());

        let response = engine.run(&flow, &"x".to_string()).await.unwrap();
        assert_eq!(response, "local");
        assert_eq!(engine.transport().call_count(), 0);
    }

    #[tokio::test]
    async fn test_pass_through_dispatches_to_remote() {
        let flow = Flow::<String, String>::new("root");
        flow.when(|r: &String| r.starts_with("/mock"))
            .then_respond("mocked".to_string());
        flow.then_pass_through();
        let engine = Engine::new(upstream());

        assert_eq!(engine.run(&flow, &"/mock/a".to_string()).await.unwrap(), "mocked");
        assert_eq!(engine.run(&flow, &"/real".to_string()).await.unwrap(), "upstream:/real");
        assert_eq!(engine.transport().calls(), vec![REMOTE.to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_destination_is_transport_error() {
        let flow = Flow::<String, String>::new("root");
        flow.then_pass_through_to("billing");
        let engine = Engine::new(upstream());

        let err = engine.run(&flow, &"x".to_string()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Transport { ref destination, .. } if destination == "billing"
        ));
    }

    #[tokio::test]
    async fn test_wrong_reply_type_is_suspend_error() {
        let flow = Flow::<String, String>::new("root");
        flow.then_pass_through();
        let transport = ScriptedTransport::new().on(REMOTE, |_: String| Ok(42_u32));
        let engine = Engine::new(transport);

        let err = engine.run(&flow, &"x".to_string()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Flow(FlowError::Suspend(snare_core::SuspendError::PayloadType { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unhandled_request_surfaces() {
        let flow = Flow::<String, String>::new("root");
        flow.when(|r: &String| r == "only").then_respond("ok".to_string());
        let engine = Engine::new(Arc::new(upstream()));

        let err = engine.run(&flow, &"other".to_string()).await.unwrap_err();
        assert!(err.is_unhandled());
    }

    #[tokio::test]
    async fn test_router_splits_destinations() {
        let flow = Flow::<String, String>::new("root");
        flow.when(|r: &String| r.starts_with("audit"))
            .then_pass_through_to("audit");
        flow.then_pass_through();

        let audit = ScriptedTransport::new().on("audit", |r: String| Ok(r.len().to_string()));
        let router = Router::new()
            .route(REMOTE, upstream())
            .route("audit", audit);
        assert!(router.has_route("audit"));
        let engine = Engine::new(router);

        assert_eq!(engine.run(&flow, &"audit-log".to_string()).await.unwrap(), "9");
        assert_eq!(engine.run(&flow, &"/x".to_string()).await.unwrap(), "upstream:/x");
    }
}
