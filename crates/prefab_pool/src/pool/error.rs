//! Pool error types

use crate::assets::{AssetKey, ResolveError};
use crate::foundation::collections::PrototypeId;
use thiserror::Error;

/// Errors surfaced by pools and the pool manager
///
/// Missing pools are not errors: `recycle_all`, `cleanup` and `unload` log and
/// do nothing so teardown code can call them unconditionally.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Recycled an instance the manager is not tracking as spawned
    #[error("Instance {instance} is not spawned by this pool manager (never spawned or already recycled)")]
    NotSpawned {
        /// Debug rendering of the instance handle
        instance: String,
    },

    /// Handed a pool an instance it did not create
    #[error("Instance {instance} does not belong to the pool of {prototype:?}")]
    ForeignInstance {
        /// Prototype of the pool
        prototype: PrototypeId,
        /// Debug rendering of the instance handle
        instance: String,
    },

    /// Prototype id is not registered
    #[error("Unknown prototype: {0:?}")]
    UnknownPrototype(PrototypeId),

    /// Key could not be resolved
    #[error("Resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Resolution was cancelled before it completed
    #[error("Resolution of {key} was cancelled")]
    Cancelled {
        /// Key being resolved
        key: AssetKey,
    },

    /// Synchronous load of a key whose asynchronous resolution is in flight
    #[error("Resolution of {key} is already in flight")]
    ResolutionPending {
        /// Key being resolved
        key: AssetKey,
    },
}

impl PoolError {
    pub(crate) fn not_spawned(instance: impl std::fmt::Debug) -> Self {
        Self::NotSpawned {
            instance: format!("{instance:?}"),
        }
    }
}

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;
