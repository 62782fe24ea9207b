//! Test doubles shared by the unit tests

use crate::assets::{AssetKey, AssetResolver, ProgressSink, ResolveError};
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::collections::HashMap;

struct Gate<P> {
    sender: oneshot::Sender<Result<P, ResolveError>>,
    progress: ProgressSink,
}

/// Resolver whose asynchronous loads stay pending until the test opens them
pub(crate) struct GatedResolver<P> {
    gates: HashMap<AssetKey, Gate<P>>,
    async_calls: usize,
    released: Vec<AssetKey>,
}

impl<P> GatedResolver<P> {
    pub(crate) fn new() -> Self {
        Self {
            gates: HashMap::new(),
            async_calls: 0,
            released: Vec::new(),
        }
    }

    /// Complete the pending load of `key`. False if nothing is waiting on it.
    pub(crate) fn open(&mut self, key: &str, prototype: P) -> bool {
        self.settle(key, Ok(prototype))
    }

    /// Fail the pending load of `key`
    pub(crate) fn fail(&mut self, key: &str, reason: &str) -> bool {
        let error = ResolveError::LoadFailed {
            key: AssetKey::from(key),
            reason: reason.to_string(),
        };
        self.settle(key, Err(error))
    }

    /// Report progress on the pending load of `key`
    pub(crate) fn report(&self, key: &str, fraction: f32) -> bool {
        match self.gates.get(&AssetKey::from(key)) {
            Some(gate) => {
                gate.progress.report(fraction);
                true
            }
            None => false,
        }
    }

    /// Whether a load of `key` is started and its future still alive
    pub(crate) fn is_waiting(&self, key: &str) -> bool {
        self.gates
            .get(&AssetKey::from(key))
            .is_some_and(|gate| !gate.sender.is_canceled())
    }

    pub(crate) fn async_calls(&self) -> usize {
        self.async_calls
    }

    pub(crate) fn released(&self) -> &[AssetKey] {
        &self.released
    }

    fn settle(&mut self, key: &str, outcome: Result<P, ResolveError>) -> bool {
        match self.gates.remove(&AssetKey::from(key)) {
            Some(gate) => gate.sender.send(outcome).is_ok(),
            None => false,
        }
    }
}

impl<P: 'static> AssetResolver<P> for GatedResolver<P> {
    fn resolve(&mut self, key: &AssetKey) -> Result<P, ResolveError> {
        Err(ResolveError::LoadFailed {
            key: key.clone(),
            reason: "gated resolver only loads asynchronously".to_string(),
        })
    }

    fn resolve_async(&mut self, key: &AssetKey, progress: ProgressSink) -> LocalBoxFuture<'static, Result<P, ResolveError>> {
        let (sender, receiver) = oneshot::channel();
        self.gates.insert(key.clone(), Gate { sender, progress });
        self.async_calls += 1;

        let key = key.clone();
        async move {
            receiver.await.unwrap_or_else(|_| {
                Err(ResolveError::LoadFailed {
                    key,
                    reason: "gate dropped".to_string(),
                })
            })
        }
        .boxed_local()
    }

    fn release(&mut self, key: &AssetKey) {
        self.released.push(key.clone());
    }
}
