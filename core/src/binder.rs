//! Per-owner flow instances.
//!
//! A [`Binder`] keeps one template flow and hands every owner (typically one proxy
//! instance) its own deep clone, configured with that owner's parameters. The clone
//! for a given owner is created exactly once and reused afterwards.

use crate::flow::Flow;
use crate::params::Parameters;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::fmt;
use uuid::Uuid;

pub type OwnerId = Uuid;

/// Something that owns a bound flow instance.
pub trait Owner {
    fn owner_id(&self) -> OwnerId;
    fn parameters(&self) -> &Parameters;
}

pub struct Binder<I, O> {
    template: Flow<I, O>,
    clones: Mutex<AHashMap<OwnerId, Flow<I, O>>>,
}

impl<I, O> Binder<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    pub fn new(template: Flow<I, O>) -> Self {
        Self {
            template,
            clones: Mutex::new(AHashMap::new()),
        }
    }

    /// The shared template. Changes to it only affect owners bound afterwards.
    pub fn template(&self) -> &Flow<I, O> {
        &self.template
    }

    /// Returns the owner's instance, creating and configuring it on first access.
    ///
    /// Later calls return the existing instance untouched; `parameters` is only read
    /// on first access.
    pub fn bind(&self, owner: OwnerId, parameters: &Parameters) -> Flow<I, O> {
        let mut clones = self.clones.lock();
        clones
            .entry(owner)
            .or_insert_with(|| {
                let instance = self.template.deep_clone();
                instance.set_parameters(parameters.clone());
                tracing::debug!(%owner, flow = %instance.label(), "bound flow instance");
                instance
            })
            .clone()
    }

    pub fn bind_owner(&self, owner: &impl Owner) -> Flow<I, O> {
        self.bind(owner.owner_id(), owner.parameters())
    }

    pub fn get(&self, owner: OwnerId) -> Option<Flow<I, O>> {
        self.clones.lock().get(&owner).cloned()
    }

    pub fn is_bound(&self, owner: OwnerId) -> bool {
        self.clones.lock().contains_key(&owner)
    }

    pub fn len(&self) -> usize {
        self.clones.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn owners(&self) -> Vec<OwnerId> {
        self.clones.lock().keys().copied().collect()
    }

    /// Forgets the owner's instance. The next `bind` creates a fresh one.
    pub fn release(&self, owner: OwnerId) -> Option<Flow<I, O>> {
        let released = self.clones.lock().remove(&owner);
        if released.is_some() {
            tracing::debug!(%owner, "released flow instance");
        }
        released
    }
}

impl<I, O> fmt::Debug for Binder<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("template", &self.template)
            .field("bound", &self.clones.lock().len())
            .finish()
    }
}

impl<I, O> From<Flow<I, O>> for Binder<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    fn from(template: Flow<I, O>) -> Self {
        Binder::new(template)
    }
}
