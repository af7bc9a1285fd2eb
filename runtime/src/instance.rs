//! ProxyInstance - one running proxy owning its private flow instance.

use crate::engine::{Engine, Transport};
use crate::error::EngineError;
use snare_core::{Binder, Flow, Owner, OwnerId, Parameters};
use std::sync::Arc;
use uuid::Uuid;

/// A proxy with its own identity and parameters.
///
/// All instances built from the same [`Binder`] share one template flow, but each
/// evaluates requests against its own deep clone. Dropping the instance releases
/// that clone.
pub struct ProxyInstance<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    id: OwnerId,
    parameters: Parameters,
    binder: Arc<Binder<I, O>>,
}

impl<I, O> ProxyInstance<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    pub fn new(binder: Arc<Binder<I, O>>, parameters: Parameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            parameters,
            binder,
        }
    }

    pub fn id(&self) -> OwnerId {
        self.id
    }

    /// This instance's private flow, created on first access.
    pub fn flow(&self) -> Flow<I, O> {
        self.binder.bind_owner(self)
    }

    /// Re-parameterizes this instance only. Other owners and the template are untouched.
    pub fn reconfigure(&mut self, parameters: Parameters) {
        tracing::info!(
            owner = %self.id,
            target = %parameters.target_authority(),
            "reconfiguring proxy instance"
        );
        self.parameters = parameters;
        if let Some(flow) = self.binder.get(self.id) {
            flow.set_parameters(self.parameters.clone());
        }
    }

    /// Handles one request end to end.
    pub async fn handle<T: Transport>(
        &self,
        engine: &Engine<T>,
        request: &I,
    ) -> Result<O, EngineError> {
        let flow = self.flow();
        engine.run(&flow, request).await
    }
}

impl<I, O> Owner for ProxyInstance<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    fn owner_id(&self) -> OwnerId {
        self.id
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

impl<I, O> Drop for ProxyInstance<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    fn drop(&mut self) {
        self.binder.release(self.id);
    }
}

impl<I, O> std::fmt::Debug for ProxyInstance<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyInstance")
            .field("id", &self.id)
            .field("parameters", &self.parameters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedTransport;
    use snare_core::{FlowContext, REMOTE};

    /// Answers with the target the instance forwards to.
    fn template() -> Flow<String, String> {
        let root = Flow::new("proxy");
        root.when(|r: &String| r == "whoami")
            .transform(snare_core::Rewriting(TargetEcho))
            .then_pass_through();
        root
    }

    struct TargetEcho;
    impl snare_core::Rewrite<String, String> for TargetEcho {
        fn rewrite_request(
            &self,
            _request: &String,
            cx: &FlowContext,
        ) -> snare_core::RequestRewrite<String> {
            match cx.parameters() {
                Some(p) => snare_core::RequestRewrite::Replace(p.target_authority()),
                None => snare_core::RequestRewrite::Reject,
            }
        }
    }

    #[tokio::test]
    async fn test_instances_forward_with_their_own_parameters() {
        let binder = Arc::new(Binder::new(template()));
        let a = ProxyInstance::new(binder.clone(), Parameters::new("alpha", 1));
        let b = ProxyInstance::new(binder.clone(), Parameters::new("beta", 2));
        let engine = Engine::new(ScriptedTransport::new().on(REMOTE, |target: String| Ok(target)));

        let request = "whoami".to_string();
        assert_eq!(a.handle(&engine, &request).await.unwrap(), "alpha:1");
        assert_eq!(b.handle(&engine, &request).await.unwrap(), "beta:2");
        assert_eq!(binder.len(), 2);
    }

    #[tokio::test]
    async fn test_reconfigure_only_affects_own_clone() {
        let binder = Arc::new(Binder::new(template()));
        let mut a = ProxyInstance::new(binder.clone(), Parameters::new("alpha", 1));
        let b = ProxyInstance::new(binder.clone(), Parameters::new("beta", 2));
        let _ = (a.flow(), b.flow());

        a.reconfigure(Parameters::new("gamma", 3));
        assert_eq!(a.flow().parameters().unwrap().target_host, "gamma");
        assert_eq!(b.flow().parameters().unwrap().target_host, "beta");

        let engine = Engine::new(ScriptedTransport::new().on(REMOTE, |target: String| Ok(target)));
        assert_eq!(a.handle(&engine, &"whoami".to_string()).await.unwrap(), "gamma:3");
    }

    #[test]
    fn test_drop_releases_clone() {
        let binder = Arc::new(Binder::new(template()));
        let instance = ProxyInstance::new(binder.clone(), Parameters::default());
        let id = instance.id();
        instance.flow();
        assert!(binder.is_bound(id));

        drop(instance);
        assert!(!binder.is_bound(id));
        assert!(binder.is_empty());
    }
}
