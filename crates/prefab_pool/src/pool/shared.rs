//! Shared handle with the asynchronous surface
//!
//! [`SharedPoolManager`] wraps a [`PoolManager`] in `Rc<RefCell<..>>` so
//! several tasks on one thread can load and spawn by key at the same time.
//! Only key resolution suspends; the manager is never borrowed across an
//! `.await`, so synchronous calls through [`SharedPoolManager::borrow_mut`]
//! stay available while loads are pending.

use super::error::{PoolError, PoolResult};
use super::manager::{Lookup, PoolManager, Prefab};
use super::resolution::Ticket;
use crate::assets::{AssetResolver, ProgressCallback};
use crate::foundation::collections::PrototypeId;
use crate::scene::{Placement, Scene};
use futures::future::{AbortRegistration, Abortable};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Options for an asynchronous load or spawn
#[derive(Default)]
pub struct ResolveOptions {
    progress: Option<ProgressCallback>,
    abort: Option<AbortRegistration>,
}

impl ResolveOptions {
    /// Receive load progress in `[0, 1]` while the key resolves
    pub fn with_progress(mut self, callback: impl FnMut(f32) + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Cancel the call when the paired `AbortHandle` fires
    pub fn with_abort(mut self, registration: AbortRegistration) -> Self {
        self.abort = Some(registration);
        self
    }
}

impl fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("progress", &self.progress.is_some())
            .field("abort", &self.abort.is_some())
            .finish()
    }
}

/// Cloneable single-threaded handle to a [`PoolManager`]
pub struct SharedPoolManager<S: Scene, R> {
    inner: Rc<RefCell<PoolManager<S, R>>>,
}

impl<S: Scene, R> Clone for SharedPoolManager<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Scene, R> SharedPoolManager<S, R> {
    /// Wrap a manager
    pub fn new(manager: PoolManager<S, R>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(manager)),
        }
    }

    /// Borrow the manager. Do not hold the guard across an `.await`.
    pub fn borrow(&self) -> Ref<'_, PoolManager<S, R>> {
        self.inner.borrow()
    }

    /// Borrow the manager mutably. Do not hold the guard across an `.await`.
    pub fn borrow_mut(&self) -> RefMut<'_, PoolManager<S, R>> {
        self.inner.borrow_mut()
    }
}

impl<S, R> SharedPoolManager<S, R>
where
    S: Scene,
    S::Prototype: 'static,
    R: AssetResolver<S::Prototype>,
{
    /// Asynchronous [`PoolManager::load`]
    ///
    /// Concurrent calls for the same key share one resolver load. The pool is
    /// only touched once the key has resolved; a failed or cancelled call
    /// leaves neither a pool nor a cache entry behind.
    pub async fn load_async(
        &self,
        prefab: impl Into<Prefab>,
        count: usize,
        options: ResolveOptions,
    ) -> PoolResult<PrototypeId> {
        let id = self.resolve(prefab.into(), options).await?;
        self.inner.borrow_mut().load_resolved(id, count)?;
        Ok(id)
    }

    /// Asynchronous [`PoolManager::spawn`]
    pub async fn spawn_async(
        &self,
        prefab: impl Into<Prefab>,
        placement: Placement<S::Container>,
        options: ResolveOptions,
    ) -> PoolResult<S::Instance> {
        let id = self.resolve(prefab.into(), options).await?;
        self.inner.borrow_mut().spawn_resolved(id, &placement)
    }

    async fn resolve(&self, prefab: Prefab, options: ResolveOptions) -> PoolResult<PrototypeId> {
        let key = match prefab {
            Prefab::Prototype(id) if self.inner.borrow().prototype(id).is_some() => return Ok(id),
            Prefab::Prototype(id) => return Err(PoolError::UnknownPrototype(id)),
            Prefab::Key(key) => key,
        };

        let ResolveOptions { progress, abort } = options;
        let lookup = self.inner.borrow_mut().begin_resolution(&key, progress);
        let mut waiter = match lookup {
            Lookup::Cached(id) => return Ok(id),
            Lookup::Pending(ticket) => Waiter {
                manager: &self.inner,
                ticket,
                settled: false,
            },
        };

        let task = waiter.ticket.task.clone();
        let outcome = match abort {
            Some(registration) => match Abortable::new(task, registration).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    log::debug!("Resolution of {} aborted by caller", key);
                    return Err(PoolError::Cancelled { key });
                }
            },
            None => task.await,
        };

        let result = self.inner.borrow_mut().finish_resolution(&waiter.ticket, outcome);
        waiter.settled = true;
        result
    }
}

/// Leaves the flight if the waiting call is aborted or dropped
struct Waiter<'a, S: Scene, R> {
    manager: &'a RefCell<PoolManager<S, R>>,
    ticket: Ticket<S::Prototype>,
    settled: bool,
}

impl<S: Scene, R> Drop for Waiter<'_, S, R> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.ticket.depart();
        match self.manager.try_borrow_mut() {
            Ok(mut manager) => manager.leave_resolution(&self.ticket),
            Err(_) => log::debug!(
                "Left resolution of {} while the pool manager is borrowed; pruning on next access",
                self.ticket.key
            ),
        }
    }
}
