//! Map-backed asset resolver

use super::{AssetKey, AssetResolver, ProgressSink, ResolveError};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::collections::{HashMap, HashSet};

/// Resolves keys from an in-memory table of prototypes
///
/// Tracks which keys are currently held (resolved and not yet released) so
/// callers can check that unloading gave the asset back.
#[derive(Debug, Clone)]
pub struct MapResolver<P> {
    entries: HashMap<AssetKey, P>,
    held: HashSet<AssetKey>,
    resolve_calls: usize,
    release_calls: usize,
}

impl<P> Default for MapResolver<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> MapResolver<P> {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            held: HashSet::new(),
            resolve_calls: 0,
            release_calls: 0,
        }
    }

    /// Register a prototype under `key`
    pub fn insert(&mut self, key: impl Into<AssetKey>, prototype: P) -> &mut Self {
        self.entries.insert(key.into(), prototype);
        self
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<AssetKey>, prototype: P) -> Self {
        self.insert(key, prototype);
        self
    }

    /// Whether `key` is resolved and not released
    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(&AssetKey::from(key))
    }

    /// Number of resolutions performed, sync and async
    pub fn resolve_count(&self) -> usize {
        self.resolve_calls
    }

    /// Number of releases performed
    pub fn release_count(&self) -> usize {
        self.release_calls
    }
}

impl<P: Clone> MapResolver<P> {
    fn lookup(&mut self, key: &AssetKey) -> Result<P, ResolveError> {
        self.resolve_calls += 1;
        let prototype = self
            .entries
            .get(key)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(key.clone()))?;
        self.held.insert(key.clone());
        Ok(prototype)
    }
}

impl<P: Clone> AssetResolver<P> for MapResolver<P> {
    fn resolve(&mut self, key: &AssetKey) -> Result<P, ResolveError> {
        self.lookup(key)
    }

    fn resolve_async(
        &mut self,
        key: &AssetKey,
        progress: ProgressSink,
    ) -> LocalBoxFuture<'static, Result<P, ResolveError>>
    where
        P: 'static,
    {
        progress.report(0.0);
        let result = self.lookup(key);
        async move {
            progress.report(1.0);
            result
        }
        .boxed_local()
    }

    fn release(&mut self, key: &AssetKey) {
        self.release_calls += 1;
        if !self.held.remove(key) {
            log::debug!("Release of {} which was not held", key);
        }
    }
}
