//! Prototype pooling
//!
//! [`Pool`] owns the idle/lent partition of instances for one prototype.
//! [`PoolManager`] owns every pool, the instance index used for recycling,
//! and the key cache used for asset-registry lookups. [`SharedPoolManager`]
//! adds asynchronous key resolution on top.
//!
//! ```text
//! caller ── load / spawn / recycle ──▶ PoolManager ──▶ Pool ──▶ Scene
//!                  │                        │
//!               AssetKey ──▶ AssetResolver ─┘ (cached per key)
//! ```

pub mod error;
pub mod instance_pool;
pub mod manager;
pub mod shared;

mod resolution;

pub use error::{PoolError, PoolResult};
pub use instance_pool::{Pool, PoolStats};
pub use manager::{Prefab, PoolManager};
pub use shared::{ResolveOptions, SharedPoolManager};
