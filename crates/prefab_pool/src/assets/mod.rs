//! Asset resolution
//!
//! Symbolic keys are turned into prototypes by an [`AssetResolver`]. The pool
//! manager caches the result per key and releases it again on unload.

pub mod map_resolver;
pub mod progress;

pub use map_resolver::MapResolver;
pub use progress::{ProgressCallback, ProgressSink};

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable symbolic name of a prototype, e.g. `"prefabs/asteroid"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    /// Create a key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for AssetKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Asset resolution errors
///
/// `Clone` so a single failed load can be reported to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No asset is registered under the key
    #[error("Asset not found: {0}")]
    NotFound(AssetKey),

    /// The asset exists but could not be loaded
    #[error("Failed to load asset {key}: {reason}")]
    LoadFailed {
        /// Key being resolved
        key: AssetKey,
        /// Reason for the failure
        reason: String,
    },
}

/// Resolves symbolic keys into prototypes
pub trait AssetResolver<P> {
    /// Resolve `key` synchronously
    fn resolve(&mut self, key: &AssetKey) -> Result<P, ResolveError>;

    /// Resolve `key` asynchronously, reporting progress in `[0, 1]` to
    /// `progress`. Dropping the returned future cancels the load.
    ///
    /// The default runs [`resolve`](Self::resolve) and reports completion.
    fn resolve_async(
        &mut self,
        key: &AssetKey,
        progress: ProgressSink,
    ) -> LocalBoxFuture<'static, Result<P, ResolveError>>
    where
        P: 'static,
    {
        let result = self.resolve(key);
        async move {
            progress.report(1.0);
            result
        }
        .boxed_local()
    }

    /// Drop whatever the resolver holds for `key`
    fn release(&mut self, key: &AssetKey);
}
