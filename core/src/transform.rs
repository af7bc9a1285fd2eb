use crate::context::FlowContext;
use crate::error::FlowResult;
use crate::flow::Flow;
use crate::outcome::Outcome;
use async_trait::async_trait;

/// The contract for a Transform Stage.
///
/// A transform wraps the evaluation of its inner flow. Given a request it may:
///
/// - return `Ok(Outcome::Rejected)` without touching `next` ("this rule does not apply"),
/// - call `next.run(..)` once and post-process the response,
/// - answer on its own without ever calling `next`.
///
/// `next` is consumed by [`Next::run`], so it cannot be invoked twice.
/// The inner flow may speak other types than the outer one (`Request`/`Response`).
#[async_trait]
pub trait Transform<I, O>: Send + Sync + 'static {
    type Request: Send + Sync + 'static;
    type Response: Send + 'static;

    async fn transform(
        &self,
        request: &I,
        cx: &FlowContext,
        next: Next<'_, Self::Request, Self::Response>,
    ) -> FlowResult<O>;

    /// Label used for the inner flow and in schematics.
    fn label(&self) -> String {
        crate::type_name_of::<Self>()
    }
}

/// The continuation handed to a [`Transform`]: evaluation of its inner flow.
pub struct Next<'a, I, O> {
    flow: &'a Flow<I, O>,
    cx: &'a FlowContext,
}

impl<'a, I, O> Next<'a, I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    pub(crate) fn new(flow: &'a Flow<I, O>, cx: &'a FlowContext) -> Self {
        Self { flow, cx }
    }

    /// Evaluates the inner flow. Consumes the continuation.
    pub async fn run(self, request: &I) -> FlowResult<O> {
        self.flow.evaluate(request, self.cx).await
    }

    pub fn label(&self) -> &str {
        self.flow.label()
    }
}

/// Forwards the request unchanged and returns the response unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

#[async_trait]
impl<I, O> Transform<I, O> for Identity
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    type Request = I;
    type Response = O;

    async fn transform(
        &self,
        request: &I,
        _cx: &FlowContext,
        next: Next<'_, I, O>,
    ) -> FlowResult<O> {
        next.run(request).await
    }

    fn label(&self) -> String {
        "identity".to_string()
    }
}

/// Decision of a request hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestRewrite<I> {
    Keep,
    Replace(I),
    Reject,
}

/// Transform written as a pair of hooks. Wrap it in [`Rewriting`] to use it as a stage.
pub trait Rewrite<I, O>: Send + Sync + 'static {
    fn rewrite_request(&self, _request: &I, _cx: &FlowContext) -> RequestRewrite<I> {
        RequestRewrite::Keep
    }

    /// Receives the request that was actually forwarded.
    fn rewrite_response(&self, _request: &I, response: O, _cx: &FlowContext) -> O {
        response
    }
}

/// Adapts a [`Rewrite`] into a [`Transform`].
#[derive(Debug, Clone, Default)]
pub struct Rewriting<R>(pub R);

#[async_trait]
impl<I, O, R> Transform<I, O> for Rewriting<R>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
    R: Rewrite<I, O>,
{
    type Request = I;
    type Response = O;

    async fn transform(
        &self,
        request: &I,
        cx: &FlowContext,
        next: Next<'_, I, O>,
    ) -> FlowResult<O> {
        let replaced;
        let forwarded = match self.0.rewrite_request(request, cx) {
            RequestRewrite::Keep => request,
            RequestRewrite::Replace(new_request) => {
                replaced = new_request;
                &replaced
            }
            RequestRewrite::Reject => return Ok(Outcome::Rejected),
        };

        let outcome = next.run(forwarded).await?;
        Ok(outcome.map(|response| self.0.rewrite_response(forwarded, response, cx)))
    }

    fn label(&self) -> String {
        crate::type_name_of::<R>()
    }
}
