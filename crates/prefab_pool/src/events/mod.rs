//! Instantiate notifications
//!
//! Fired synchronously, once per freshly cloned instance, across every pool
//! a manager owns. Subscribers get mutable access to the scene so they can run
//! first-time setup on the new instance. No ordering between subscribers is
//! guaranteed.

use crate::foundation::collections::{HandleMap, PrototypeId, SubscriptionId};
use crate::scene::Scene;

/// A new instance was cloned from a prototype
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstantiateEvent<I> {
    /// Prototype the instance was cloned from
    pub prototype: PrototypeId,
    /// The new instance
    pub instance: I,
}

/// Handler for [`InstantiateEvent`]s
///
/// Implemented for every `FnMut(&mut S, &InstantiateEvent<S::Instance>)`.
pub trait InstantiateHandler<S: Scene> {
    /// Handle a newly created instance
    fn on_instantiate(&mut self, scene: &mut S, event: &InstantiateEvent<S::Instance>);
}

impl<S, F> InstantiateHandler<S> for F
where
    S: Scene,
    F: FnMut(&mut S, &InstantiateEvent<S::Instance>),
{
    fn on_instantiate(&mut self, scene: &mut S, event: &InstantiateEvent<S::Instance>) {
        self(scene, event);
    }
}

/// Multicast list of instantiate handlers
pub struct InstantiateEvents<S: Scene> {
    handlers: HandleMap<SubscriptionId, Box<dyn InstantiateHandler<S>>>,
}

impl<S: Scene> Default for InstantiateEvents<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Scene> InstantiateEvents<S> {
    /// Create an empty handler list
    pub fn new() -> Self {
        Self {
            handlers: HandleMap::with_key(),
        }
    }

    /// Register a handler
    pub fn subscribe(&mut self, handler: impl InstantiateHandler<S> + 'static) -> SubscriptionId {
        self.handlers.insert(Box::new(handler))
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.handlers.remove(id).is_some()
    }

    /// Deliver an event to every handler
    pub fn emit(&mut self, scene: &mut S, event: &InstantiateEvent<S::Instance>) {
        for handler in self.handlers.values_mut() {
            handler.on_instantiate(scene, event);
        }
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
