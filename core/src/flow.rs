//! # Flow: the interception composition tree
//!
//! A `Flow` is a node holding an ordered list of branches. Evaluating a flow tries
//! its branches strictly in registration order and returns the first one that does
//! not reject. A flow whose branches all reject rejects to its parent; at the root
//! this becomes [`FlowError::Unhandled`].
//!
//! ## Builder shape
//!
//! `when`, `transform` and `then_delegate` return the *new child*, so chained calls
//! extend depth. Adding a sibling means calling a builder again on a retained parent:
//!
//! ```rust,ignore
//! let root = Flow::<Req, Res>::new("proxy");
//! root.when(|r: &Req| r.path == "/mock").then_respond(canned);
//! root.transform(AddAuth).then_pass_through();
//! ```
//!
//! `Flow` is a shared handle: cloning it does not copy the tree. Use
//! [`Flow::deep_clone`] (or a [`Binder`](crate::binder::Binder)) for an independent copy.

use crate::context::FlowContext;
use crate::error::{FlowError, FlowResult};
use crate::matcher::{Matcher, SharedMatcher};
use crate::outcome::Outcome;
use crate::params::Parameters;
use crate::schematic::{NodeKind, Schematic};
use crate::suspend::{REMOTE, Task};
use crate::transform::{Next, Transform};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::Instrument;

type Responder<I, O> = Arc<dyn Fn(&I) -> anyhow::Result<O> + Send + Sync>;

/// A sub-tree as seen by its parent: possibly guarded, possibly of other inner types.
#[async_trait]
trait Delegate<I, O>: Send + Sync {
    async fn call(&self, request: &I, cx: &FlowContext) -> FlowResult<O>;
    fn set_parameters(&self, parameters: Option<Arc<Parameters>>);
    fn deep_clone(&self) -> Arc<dyn Delegate<I, O>>;
    fn describe(&self, schematic: &mut Schematic, parent: &str, edge: String);
}

enum Branch<I, O> {
    Respond(Responder<I, O>),
    PassThrough {
        endpoint: Arc<str>,
        forward: fn(&I) -> I,
    },
    Delegate(Arc<dyn Delegate<I, O>>),
}

impl<I, O> Clone for Branch<I, O> {
    fn clone(&self) -> Self {
        match self {
            Branch::Respond(responder) => Branch::Respond(responder.clone()),
            Branch::PassThrough { endpoint, forward } => Branch::PassThrough {
                endpoint: endpoint.clone(),
                forward: *forward,
            },
            Branch::Delegate(delegate) => Branch::Delegate(delegate.clone()),
        }
    }
}

impl<I, O> Branch<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    async fn call(&self, request: &I, cx: &FlowContext) -> FlowResult<O> {
        match self {
            Branch::Respond(responder) => Ok(Outcome::Matched(responder(request)?)),
            Branch::PassThrough { endpoint, forward } => {
                let response = cx.suspend::<I, O>(endpoint, forward(request)).await?;
                Ok(Outcome::Matched(response))
            }
            Branch::Delegate(delegate) => delegate.call(request, cx).await,
        }
    }
}

struct FlowNode<I, O> {
    label: String,
    guard: Option<SharedMatcher<I>>,
    /// Replaced wholesale on every push so evaluation can hold a snapshot across awaits.
    branches: RwLock<Arc<[Branch<I, O>]>>,
    parameters: RwLock<Option<Arc<Parameters>>>,
}

/// Handle to a node of a flow tree.
pub struct Flow<I, O> {
    node: Arc<FlowNode<I, O>>,
}

impl<I, O> Clone for Flow<I, O> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<I, O> fmt::Debug for Flow<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("label", &self.node.label)
            .field("guarded", &self.node.guard.is_some())
            .field("branches", &self.node.branches.read().len())
            .finish()
    }
}

impl<I, O> Flow<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    /// Creates an empty root flow.
    pub fn new(label: impl Into<String>) -> Self {
        Self::from_parts(label.into(), None, Vec::new(), None)
    }

    fn from_parts(
        label: String,
        guard: Option<SharedMatcher<I>>,
        branches: Vec<Branch<I, O>>,
        parameters: Option<Arc<Parameters>>,
    ) -> Self {
        Self {
            node: Arc::new(FlowNode {
                label,
                guard,
                branches: RwLock::new(branches.into()),
                parameters: RwLock::new(parameters),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.node.label
    }

    pub fn is_guarded(&self) -> bool {
        self.node.guard.is_some()
    }

    /// Number of branches directly attached to this node.
    pub fn len(&self) -> usize {
        self.node.branches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when both handles point at the same node.
    pub fn same_node(&self, other: &Flow<I, O>) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub fn parameters(&self) -> Option<Arc<Parameters>> {
        self.node.parameters.read().clone()
    }

    /// Sets the parameters of this node and re-broadcasts them depth-first to every
    /// branch currently attached.
    pub fn set_parameters(&self, parameters: Parameters) {
        self.broadcast(Some(Arc::new(parameters)));
    }

    fn broadcast(&self, parameters: Option<Arc<Parameters>>) {
        *self.node.parameters.write() = parameters.clone();
        for branch in self.snapshot().iter() {
            if let Branch::Delegate(delegate) = branch {
                delegate.set_parameters(parameters.clone());
            }
        }
    }

    fn snapshot(&self) -> Arc<[Branch<I, O>]> {
        self.node.branches.read().clone()
    }

    fn push(&self, branch: Branch<I, O>) {
        let mut branches = self.node.branches.write();
        let mut extended = Vec::with_capacity(branches.len() + 1);
        extended.extend(branches.iter().cloned());
        extended.push(branch);
        *branches = extended.into();
    }

    /// Appends a guarded branch and returns it. The branch rejects, without side
    /// effects, whenever `matcher` does not match the request.
    pub fn when<M: Matcher<I>>(&self, matcher: M) -> Flow<I, O> {
        let label = format!("when {}", matcher.describe());
        let child = Flow::from_parts(label, Some(Arc::new(matcher)), Vec::new(), None);
        self.then_delegate(child)
    }

    /// Appends a branch wrapped by a transform stage and returns the inner flow.
    pub fn transform<T>(&self, transform: T) -> Flow<T::Request, T::Response>
    where
        T: Transform<I, O>,
    {
        let inner = Flow::new(transform.label());
        let stage = Transforming {
            transform: Arc::new(transform),
            inner: inner.clone(),
            _marker: PhantomData,
        };
        stage.set_parameters(self.parameters());
        self.push(Branch::Delegate(Arc::new(stage)));
        inner
    }

    /// Appends a terminal branch that always answers `value`. Returns this flow.
    pub fn then_respond(&self, value: O) -> Flow<I, O>
    where
        O: Clone + Sync,
    {
        self.then_try_respond(move |_| Ok(value.clone()))
    }

    /// Appends a terminal branch answering `responder(request)`. Returns this flow.
    pub fn then_respond_with<F>(&self, responder: F) -> Flow<I, O>
    where
        F: Fn(&I) -> O + Send + Sync + 'static,
    {
        self.then_try_respond(move |request| Ok(responder(request)))
    }

    /// Appends a terminal branch answering `responder()`, ignoring the request.
    pub fn then_respond_lazily<F>(&self, responder: F) -> Flow<I, O>
    where
        F: Fn() -> O + Send + Sync + 'static,
    {
        self.then_try_respond(move |_| Ok(responder()))
    }

    /// Like [`then_respond_with`](Self::then_respond_with) for responders that can fail.
    /// A failure is a fault of the whole evaluation, not a rejection.
    pub fn then_try_respond<F>(&self, responder: F) -> Flow<I, O>
    where
        F: Fn(&I) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        self.push(Branch::Respond(Arc::new(responder)));
        self.clone()
    }

    /// Appends a terminal branch handing the request to the driver's real upstream.
    pub fn then_pass_through(&self) -> Flow<I, O>
    where
        I: Clone,
    {
        self.then_pass_through_to(REMOTE)
    }

    /// Appends a terminal branch performing exactly one suspension tagged `endpoint`
    /// and answering whatever the driver resumes with.
    pub fn then_pass_through_to(&self, endpoint: &str) -> Flow<I, O>
    where
        I: Clone,
    {
        self.push(Branch::PassThrough {
            endpoint: Arc::from(endpoint),
            forward: I::clone,
        });
        self.clone()
    }

    /// Appends an existing sub-tree, hands it this node's parameters, and returns it.
    pub fn then_delegate(&self, child: Flow<I, O>) -> Flow<I, O> {
        child.broadcast(self.parameters());
        self.push(Branch::Delegate(Arc::new(child.clone())));
        child
    }

    /// Shortcut for `when(matcher).then_respond(value)`.
    pub fn respond_when<M: Matcher<I>>(&self, matcher: M, value: O) -> Flow<I, O>
    where
        O: Clone + Sync,
    {
        self.when(matcher).then_respond(value)
    }

    /// Evaluates this node: guard first, then branches in order.
    pub async fn evaluate(&self, request: &I, cx: &FlowContext) -> FlowResult<O> {
        if let Some(guard) = &self.node.guard {
            if !guard.matches(request) {
                tracing::trace!(flow = %self.node.label, "guard rejected request");
                return Ok(Outcome::Rejected);
            }
        }

        let cx = cx.with_parameters(self.parameters());
        let branches = self.snapshot();
        for (index, branch) in branches.iter().enumerate() {
            let issued = cx.suspender().issued();
            tracing::trace!(flow = %self.node.label, branch = index, "trying branch");

            match branch.call(request, &cx).await? {
                Outcome::Matched(response) => return Ok(Outcome::Matched(response)),
                Outcome::Rejected if cx.suspender().issued() != issued => {
                    tracing::warn!(
                        flow = %self.node.label,
                        branch = index,
                        "branch rejected after suspending"
                    );
                    return Err(FlowError::RejectedAfterSuspend {
                        node: self.node.label.clone(),
                        branch: index,
                    });
                }
                Outcome::Rejected => {
                    tracing::debug!(flow = %self.node.label, branch = index, "branch rejected");
                }
            }
        }
        Ok(Outcome::Rejected)
    }

    /// Evaluates this flow as a root: exhausting every branch is [`FlowError::Unhandled`].
    pub async fn handle(&self, request: &I, cx: &FlowContext) -> Result<O, FlowError> {
        let span = tracing::info_span!("flow", snare.flow = %self.node.label);
        async move {
            match self.evaluate(request, cx).await? {
                Outcome::Matched(response) => Ok(response),
                Outcome::Rejected => {
                    tracing::info!("request not handled by any branch");
                    Err(FlowError::Unhandled)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Starts a resumable evaluation of `request` against this flow.
    pub fn start<'a>(&'a self, request: &'a I) -> Task<'a, O> {
        Task::new(move |suspender| async move {
            let cx = FlowContext::new(suspender);
            self.handle(request, &cx).await
        })
    }

    /// Copies the tree structure: branch lists, guards and transforms. Responders,
    /// guard and transform objects are shared; no node is shared.
    pub fn deep_clone(&self) -> Flow<I, O> {
        let branches = self
            .snapshot()
            .iter()
            .map(|branch| match branch {
                Branch::Delegate(delegate) => Branch::Delegate(delegate.deep_clone()),
                other => other.clone(),
            })
            .collect();
        Flow::from_parts(
            self.node.label.clone(),
            self.node.guard.clone(),
            branches,
            self.parameters(),
        )
    }

    /// Exports the tree for inspection.
    pub fn schematic(&self) -> Schematic {
        let mut schematic = Schematic::new(self.label());
        let root = schematic.add_node(NodeKind::Root, self.label());
        self.describe_branches(&mut schematic, &root);
        schematic
    }

    fn describe_branches(&self, schematic: &mut Schematic, parent: &str) {
        let branches = self.snapshot();
        for (index, branch) in branches.iter().enumerate() {
            let edge = format!("branch {index}");
            match branch {
                Branch::Respond(_) => {
                    let id = schematic.add_node(NodeKind::Responder, "respond");
                    schematic.connect(parent, &id, Some(edge));
                }
                Branch::PassThrough { endpoint, .. } => {
                    let id = schematic
                        .add_node(NodeKind::PassThrough, format!("pass through to {endpoint}"));
                    schematic.connect(parent, &id, Some(edge));
                }
                Branch::Delegate(delegate) => delegate.describe(schematic, parent, edge),
            }
        }
    }
}

#[async_trait]
impl<I, O> Delegate<I, O> for Flow<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    async fn call(&self, request: &I, cx: &FlowContext) -> FlowResult<O> {
        self.evaluate(request, cx).await
    }

    fn set_parameters(&self, parameters: Option<Arc<Parameters>>) {
        self.broadcast(parameters);
    }

    fn deep_clone(&self) -> Arc<dyn Delegate<I, O>> {
        Arc::new(Flow::deep_clone(self))
    }

    fn describe(&self, schematic: &mut Schematic, parent: &str, edge: String) {
        let kind = if self.is_guarded() {
            NodeKind::Guard
        } else {
            NodeKind::Delegate
        };
        let id = schematic.add_node(kind, self.label());
        schematic.connect(parent, &id, Some(edge));
        self.describe_branches(schematic, &id);
    }
}

/// Transform stage wrapping an inner flow of possibly different types.
struct Transforming<T, I, O>
where
    T: Transform<I, O>,
{
    transform: Arc<T>,
    inner: Flow<T::Request, T::Response>,
    _marker: PhantomData<fn(&I) -> O>,
}

#[async_trait]
impl<T, I, O> Delegate<I, O> for Transforming<T, I, O>
where
    T: Transform<I, O>,
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    async fn call(&self, request: &I, cx: &FlowContext) -> FlowResult<O> {
        let cx = cx.with_parameters(self.inner.parameters());
        let next = Next::new(&self.inner, &cx);
        self.transform.transform(request, &cx, next).await
    }

    fn set_parameters(&self, parameters: Option<Arc<Parameters>>) {
        self.inner.broadcast(parameters);
    }

    fn deep_clone(&self) -> Arc<dyn Delegate<I, O>> {
        Arc::new(Transforming {
            transform: self.transform.clone(),
            inner: self.inner.deep_clone(),
            _marker: PhantomData,
        })
    }

    fn describe(&self, schematic: &mut Schematic, parent: &str, edge: String) {
        let id = schematic.add_node(NodeKind::Transform, self.transform.label());
        schematic.connect(parent, &id, Some(edge));
        self.inner.describe_branches(schematic, &id);
    }
}
