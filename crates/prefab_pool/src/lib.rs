//! # Prefab Pool
//!
//! Instance pooling for prototype-based scenes. Cloning a prototype
//! ("prefab") into a live instance is expensive, so instances are created
//! once, lent out on spawn and parked again on recycle instead of being
//! destroyed.
//!
//! ## Features
//!
//! - **Per-prototype pools**: idle instances wait in a container of their own
//! - **Symbolic keys**: prototypes can be referenced by asset key and are
//!   resolved once, then cached until unloaded
//! - **Async loading**: concurrent loads of one key share a single resolver
//!   call, with progress reporting and cancellation
//! - **Instantiate events**: first-time setup hooks for every new instance
//!
//! ## Quick Start
//!
//! ```rust
//! use prefab_pool::prelude::*;
//!
//! fn main() -> Result<(), PoolError> {
//!     let resolver = MapResolver::new().with("prefabs/asteroid", "asteroid");
//!     let mut pools = PoolManager::new(MemoryScene::<&str>::new(), resolver);
//!
//!     pools.load("prefabs/asteroid", 8)?;
//!     let rock = pools.spawn("prefabs/asteroid", &Placement::at(Vec3::new(0.0, 5.0, 0.0)))?;
//!     assert_eq!(pools.lent_count("prefabs/asteroid"), 1);
//!
//!     pools.recycle(rock)?;
//!     pools.cleanup("prefabs/asteroid", 4);
//!     pools.unload("prefabs/asteroid");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod assets;
pub mod config;
pub mod events;
pub mod foundation;
pub mod pool;
pub mod scene;

#[cfg(test)]
mod test_support;

pub use pool::{PoolError, PoolManager, PoolResult, SharedPoolManager};

/// Common imports for pool users
pub mod prelude {
    pub use crate::{
        assets::{AssetKey, AssetResolver, MapResolver, ProgressSink, ResolveError},
        config::{Config, PoolConfig},
        events::InstantiateEvent,
        foundation::{
            collections::PrototypeId,
            math::{Pose, Quat, Vec3},
        },
        pool::{Pool, PoolError, PoolManager, PoolResult, PoolStats, Prefab, ResolveOptions, SharedPoolManager},
        scene::{MemoryScene, Placement, Scene},
    };
}
