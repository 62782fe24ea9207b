//! Pool Manager
//!
//! Owns one [`Pool`] per prototype and the indices around them:
//!
//! - prototype arena: `PrototypeId` → prototype value (identity lookup)
//! - pool index: `PrototypeId` → [`Pool`]
//! - instance index: instance → `PrototypeId`, so callers can recycle without
//!   remembering where an instance came from
//! - key cache: [`AssetKey`] → `PrototypeId`, filled on first use by the
//!   [`AssetResolver`] and emptied on unload
//!
//! Every operation accepts either a registered `PrototypeId` or a key through
//! [`Prefab`]. Operations on a prefab with no pool (`recycle_all`, `cleanup`,
//! `unload`) log and do nothing.

use super::error::{PoolError, PoolResult};
use super::instance_pool::{Pool, PoolStats};
use super::resolution::{Resolutions, Ticket};
use crate::assets::{AssetKey, AssetResolver, ProgressCallback, ResolveError};
use crate::config::PoolConfig;
use crate::events::{InstantiateEvent, InstantiateEvents, InstantiateHandler};
use crate::foundation::collections::{HandleMap, PrototypeId, SubscriptionId};
use crate::scene::{Placement, Scene};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

/// Reference to a prototype: a registered id or a symbolic key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Prefab {
    /// Prototype registered with [`PoolManager::register_prototype`] or
    /// returned by a load
    Prototype(PrototypeId),
    /// Key resolved through the asset resolver
    Key(AssetKey),
}

impl From<PrototypeId> for Prefab {
    fn from(id: PrototypeId) -> Self {
        Self::Prototype(id)
    }
}

impl From<AssetKey> for Prefab {
    fn from(key: AssetKey) -> Self {
        Self::Key(key)
    }
}

impl From<&AssetKey> for Prefab {
    fn from(key: &AssetKey) -> Self {
        Self::Key(key.clone())
    }
}

impl From<&str> for Prefab {
    fn from(key: &str) -> Self {
        Self::Key(AssetKey::from(key))
    }
}

impl From<String> for Prefab {
    fn from(key: String) -> Self {
        Self::Key(AssetKey::from(key))
    }
}

impl fmt::Display for Prefab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prototype(id) => write!(f, "{id:?}"),
            Self::Key(key) => write!(f, "\"{key}\""),
        }
    }
}

/// Outcome of starting an asynchronous key lookup
pub(crate) enum Lookup<P> {
    Cached(PrototypeId),
    Pending(Ticket<P>),
}

/// Owner of every pool, the instance index and the key cache
pub struct PoolManager<S: Scene, R> {
    scene: S,
    resolver: R,
    config: PoolConfig,
    prototypes: HandleMap<PrototypeId, S::Prototype>,
    pools: HashMap<PrototypeId, Pool<S>>,
    spawned: HashMap<S::Instance, PrototypeId>,
    keys: HashMap<AssetKey, PrototypeId>,
    resolutions: Resolutions<S::Prototype>,
    events: InstantiateEvents<S>,
}

impl<S: Scene, R> PoolManager<S, R> {
    /// Create a manager with the default configuration
    pub fn new(scene: S, resolver: R) -> Self {
        Self::with_config(scene, resolver, PoolConfig::default())
    }

    /// Create a manager with a custom configuration
    pub fn with_config(scene: S, resolver: R, config: PoolConfig) -> Self {
        log::info!("Creating PoolManager with config: {:?}", config);
        Self {
            scene,
            resolver,
            config,
            prototypes: HandleMap::with_key(),
            pools: HashMap::new(),
            spawned: HashMap::new(),
            keys: HashMap::new(),
            resolutions: Resolutions::default(),
            events: InstantiateEvents::new(),
        }
    }

    /// The scene collaborator
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the scene collaborator
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// The asset resolver
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Mutable access to the asset resolver
    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Active configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Register a prototype and return its identity
    pub fn register_prototype(&mut self, prototype: S::Prototype) -> PrototypeId {
        self.prototypes.insert(prototype)
    }

    /// Look up a registered prototype
    pub fn prototype(&self, id: PrototypeId) -> Option<&S::Prototype> {
        self.prototypes.get(id)
    }

    /// Prototype cached for `key`, if it has been resolved
    pub fn prototype_of_key(&self, key: &str) -> Option<PrototypeId> {
        self.keys.get(&AssetKey::from(key)).copied()
    }

    /// Subscribe to instantiate notifications from every pool
    pub fn subscribe_instantiate(&mut self, handler: impl InstantiateHandler<S> + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    /// Unsubscribe from instantiate notifications
    pub fn unsubscribe_instantiate(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Return a spawned instance to its pool
    ///
    /// Fails with [`PoolError::NotSpawned`] if the instance was never spawned
    /// by this manager or has already been recycled.
    pub fn recycle(&mut self, instance: S::Instance) -> PoolResult<()> {
        let Some(&id) = self.spawned.get(&instance) else {
            return Err(PoolError::not_spawned(instance));
        };
        let Some(pool) = self.pools.get_mut(&id) else {
            return Err(PoolError::not_spawned(instance));
        };
        pool.recycle(&mut self.scene, instance)?;
        self.spawned.remove(&instance);
        log::trace!("Recycled {:?} into pool {:?}", instance, id);
        Ok(())
    }

    /// Recycle every lent instance of a prefab. Returns how many were recycled.
    pub fn recycle_all(&mut self, prefab: impl Into<Prefab>) -> usize {
        let prefab = prefab.into();
        let Some(pool) = self.lookup(&prefab).and_then(|id| self.pools.get_mut(&id)) else {
            log::debug!("recycle_all({}) skipped: not loaded", prefab);
            return 0;
        };

        let recycled = pool.recycle_all(&mut self.scene);
        for instance in &recycled {
            self.spawned.remove(instance);
        }
        log::debug!("Recycled {} instances of {}", recycled.len(), prefab);
        recycled.len()
    }

    /// Destroy idle instances of a prefab beyond `retain`. Returns how many
    /// were destroyed.
    pub fn cleanup(&mut self, prefab: impl Into<Prefab>, retain: usize) -> usize {
        let prefab = prefab.into();
        let Some(pool) = self.lookup(&prefab).and_then(|id| self.pools.get_mut(&id)) else {
            log::debug!("cleanup({}) skipped: not loaded", prefab);
            return 0;
        };

        let destroyed = pool.cleanup(&mut self.scene, retain);
        log::debug!("Cleaned up {} idle instances of {} (retain {})", destroyed, prefab, retain);
        destroyed
    }

    /// Destroy the pool of a prefab together with every instance, lent ones
    /// included. Unloading by key also releases the key with the resolver.
    ///
    /// Returns whether a pool was unloaded.
    pub fn unload(&mut self, prefab: impl Into<Prefab>) -> bool
    where
        R: AssetResolver<S::Prototype>,
    {
        let prefab = prefab.into();
        let unloaded = self
            .lookup(&prefab)
            .is_some_and(|id| self.unload_pool(id));
        if !unloaded {
            log::debug!("unload({}) skipped: not loaded", prefab);
        }

        if let Prefab::Key(key) = &prefab {
            self.release_key(key);
        }
        unloaded
    }

    /// Unload every pool and release every cached key
    pub fn unload_all(&mut self)
    where
        R: AssetResolver<S::Prototype>,
    {
        let ids: Vec<_> = self.pools.keys().copied().collect();
        for id in ids {
            self.unload_pool(id);
        }
        let keys: Vec<_> = self.keys.keys().cloned().collect();
        for key in keys {
            self.release_key(&key);
        }
    }

    /// Unload a prototype's pool and remove it from the arena
    ///
    /// Keys that resolved to it are released.
    pub fn unregister_prototype(&mut self, id: PrototypeId) -> Option<S::Prototype>
    where
        R: AssetResolver<S::Prototype>,
    {
        self.unload_pool(id);
        let prototype = self.prototypes.remove(id);
        let keys: Vec<_> = self
            .keys
            .iter()
            .filter(|(_, &owner)| owner == id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            self.forget_key(&key);
        }
        prototype
    }

    /// Whether the prefab has a pool
    pub fn is_loaded(&self, prefab: impl Into<Prefab>) -> bool {
        self.pool(prefab).is_some()
    }

    /// Pool of a prefab, if loaded
    pub fn pool(&self, prefab: impl Into<Prefab>) -> Option<&Pool<S>> {
        self.lookup(&prefab.into()).and_then(|id| self.pools.get(&id))
    }

    /// Idle instance count of a prefab, 0 if not loaded
    pub fn idle_count(&self, prefab: impl Into<Prefab>) -> usize {
        self.pool(prefab).map_or(0, Pool::idle_count)
    }

    /// Lent instance count of a prefab, 0 if not loaded
    pub fn lent_count(&self, prefab: impl Into<Prefab>) -> usize {
        self.pool(prefab).map_or(0, Pool::lent_count)
    }

    /// Total instance count of a prefab, 0 if not loaded
    pub fn total_count(&self, prefab: impl Into<Prefab>) -> usize {
        self.pool(prefab).map_or(0, Pool::total_count)
    }

    /// Statistics of a prefab's pool
    pub fn pool_stats(&self, prefab: impl Into<Prefab>) -> Option<PoolStats> {
        self.pool(prefab).map(Pool::stats)
    }

    /// Number of loaded pools
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Number of instances currently lent out across all pools
    pub fn spawned_count(&self) -> usize {
        self.spawned.len()
    }

    /// Whether `instance` is lent out by this manager
    pub fn is_spawned(&self, instance: S::Instance) -> bool {
        self.spawned.contains_key(&instance)
    }

    /// Prototype a lent instance was spawned from
    pub fn owner_of(&self, instance: S::Instance) -> Option<PrototypeId> {
        self.spawned.get(&instance).copied()
    }

    /// Number of asynchronous resolutions in flight
    pub fn pending_resolutions(&self) -> usize {
        self.resolutions.pending_count()
    }

    fn lookup(&self, prefab: &Prefab) -> Option<PrototypeId> {
        match prefab {
            Prefab::Prototype(id) => Some(*id),
            Prefab::Key(key) => self.keys.get(key).copied(),
        }
    }

    fn unload_pool(&mut self, id: PrototypeId) -> bool {
        let Some(mut pool) = self.pools.remove(&id) else {
            return false;
        };

        let recycled = pool.recycle_all(&mut self.scene);
        for instance in &recycled {
            self.spawned.remove(instance);
        }
        let destroyed = pool.destroy(&mut self.scene);
        log::info!(
            "Unloaded pool {:?}: destroyed {} instances ({} were still lent out)",
            id,
            destroyed,
            recycled.len()
        );
        true
    }

    fn release_key(&mut self, key: &AssetKey)
    where
        R: AssetResolver<S::Prototype>,
    {
        if let Some(id) = self.forget_key(key) {
            self.unload_pool(id);
            self.prototypes.remove(id);
        }
    }

    /// Drop the cache entry of `key` and give it back to the resolver
    fn forget_key(&mut self, key: &AssetKey) -> Option<PrototypeId>
    where
        R: AssetResolver<S::Prototype>,
    {
        let id = self.keys.remove(key)?;
        self.resolver.release(key);
        log::debug!("Released {}", key);
        Some(id)
    }

    /// Leave an asynchronous resolution without taking its result
    pub(crate) fn leave_resolution(&mut self, ticket: &Ticket<S::Prototype>) {
        self.resolutions.leave(ticket);
    }

    fn register_resolved(&mut self, key: AssetKey, prototype: S::Prototype) -> PrototypeId {
        let id = self.prototypes.insert(prototype);
        log::debug!("Resolved {} to {:?}", key, id);
        self.keys.insert(key, id);
        id
    }

    /// Find or create the pool of `id` and top it up to `count` instances
    pub(crate) fn load_resolved(&mut self, id: PrototypeId, count: usize) -> PoolResult<usize> {
        let Self {
            scene,
            config,
            prototypes,
            pools,
            keys,
            events,
            ..
        } = self;
        let template = prototypes.get(id).ok_or(PoolError::UnknownPrototype(id))?;
        let pool = match pools.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let name = container_name(config, keys, id);
                log::info!("Loading pool {}", name);
                entry.insert(Pool::new(scene, id, &name))
            }
        };

        let created = pool.ensure_loaded(scene, template, count, &mut |scene: &mut S, instance: S::Instance| {
            events.emit(scene, &InstantiateEvent { prototype: id, instance });
        });
        log::debug!("Loaded {:?} to {} instances ({} created)", id, pool.total_count(), created);
        Ok(created)
    }

    /// Spawn from the pool of `id`, creating the pool if needed
    pub(crate) fn spawn_resolved(
        &mut self,
        id: PrototypeId,
        placement: &Placement<S::Container>,
    ) -> PoolResult<S::Instance> {
        if !self.prototypes.contains_key(id) {
            return Err(PoolError::UnknownPrototype(id));
        }
        if !self.pools.contains_key(&id) {
            if self.config.warn_on_auto_load {
                log::warn!(
                    "Spawning {:?} without loading it first; auto-loading {} instance(s). \
                     Call load() ahead of time to avoid the hitch.",
                    id,
                    self.config.auto_load_count
                );
            }
            self.load_resolved(id, self.config.auto_load_count)?;
        }

        let Self {
            scene,
            prototypes,
            pools,
            spawned,
            events,
            ..
        } = self;
        let template = prototypes.get(id).ok_or(PoolError::UnknownPrototype(id))?;
        let pool = pools.get_mut(&id).ok_or(PoolError::UnknownPrototype(id))?;

        let instance = pool.spawn(scene, template, placement, &mut |scene: &mut S, instance: S::Instance| {
            events.emit(scene, &InstantiateEvent { prototype: id, instance });
        });
        spawned.insert(instance, id);
        log::trace!("Spawned {:?} from {:?}", instance, id);
        Ok(instance)
    }
}

impl<S, R> PoolManager<S, R>
where
    S: Scene,
    S::Prototype: 'static,
    R: AssetResolver<S::Prototype>,
{
    /// Make sure the prefab's pool holds at least `count` instances
    ///
    /// Keys are resolved synchronously on first use. Returns the prototype id
    /// so later calls can skip the key lookup.
    pub fn load(&mut self, prefab: impl Into<Prefab>, count: usize) -> PoolResult<PrototypeId> {
        let id = self.resolve(&prefab.into())?;
        self.load_resolved(id, count)?;
        Ok(id)
    }

    /// Lend out an instance of the prefab
    ///
    /// Spawning a prefab that was never loaded works but logs a warning and
    /// creates the pool on the spot.
    pub fn spawn(
        &mut self,
        prefab: impl Into<Prefab>,
        placement: &Placement<S::Container>,
    ) -> PoolResult<S::Instance> {
        let id = self.resolve(&prefab.into())?;
        self.spawn_resolved(id, placement)
    }

    /// Load every key listed in the configuration's `preload` table
    pub fn preload(&mut self) -> PoolResult<()> {
        let entries = self.config.preload.clone();
        for entry in entries {
            self.load(entry.key.as_str(), entry.count)?;
        }
        Ok(())
    }

    fn resolve(&mut self, prefab: &Prefab) -> PoolResult<PrototypeId> {
        match prefab {
            Prefab::Prototype(id) if self.prototypes.contains_key(*id) => Ok(*id),
            Prefab::Prototype(id) => Err(PoolError::UnknownPrototype(*id)),
            Prefab::Key(key) => {
                if let Some(&id) = self.keys.get(key) {
                    return Ok(id);
                }
                self.resolutions.prune();
                if self.resolutions.is_pending(key) {
                    return Err(PoolError::ResolutionPending { key: key.clone() });
                }
                let prototype = self.resolver.resolve(key)?;
                Ok(self.register_resolved(key.clone(), prototype))
            }
        }
    }

    /// Start or join the asynchronous resolution of `key`
    pub(crate) fn begin_resolution(
        &mut self,
        key: &AssetKey,
        progress: Option<ProgressCallback>,
    ) -> Lookup<S::Prototype> {
        if let Some(&id) = self.keys.get(key) {
            return Lookup::Cached(id);
        }
        let resolver = &mut self.resolver;
        Lookup::Pending(
            self.resolutions
                .join(key, progress, |sink| resolver.resolve_async(key, sink)),
        )
    }

    /// Settle a ticket once its load has finished
    pub(crate) fn finish_resolution(
        &mut self,
        ticket: &Ticket<S::Prototype>,
        outcome: Result<(), ResolveError>,
    ) -> PoolResult<PrototypeId> {
        if let Some(&id) = self.keys.get(&ticket.key) {
            self.resolutions.leave(ticket);
            return Ok(id);
        }

        match outcome {
            Ok(()) => match self.resolutions.take(ticket) {
                Some(prototype) => Ok(self.register_resolved(ticket.key.clone(), prototype)),
                None => {
                    log::debug!("{} was released before this waiter resumed", ticket.key);
                    Err(PoolError::Cancelled {
                        key: ticket.key.clone(),
                    })
                }
            },
            Err(error) => {
                self.resolutions.retire(ticket);
                log::warn!("Failed to resolve {}: {}", ticket.key, error);
                Err(error.into())
            }
        }
    }
}

fn container_name(config: &PoolConfig, keys: &HashMap<AssetKey, PrototypeId>, id: PrototypeId) -> String {
    match keys.iter().find(|(_, &owner)| owner == id) {
        Some((key, _)) => format!("{}{}", config.container_prefix, key),
        None => format!("{}{:?}", config.container_prefix, id),
    }
}
