//! Single-prototype instance pool
//!
//! Each prototype gets its own pool. A pool owns one idle container in the
//! scene; inactive instances are parked there and live ones go wherever the
//! caller places them.
//!
//! # Lifecycle
//!
//! ```text
//!  ensure_loaded ──▶ idle ── spawn ──▶ lent
//!                    ▲ │                │
//!                    │ └── cleanup ──▶ destroyed
//!                    └──── recycle ─────┘
//! ```
//!
//! Every instance the pool created is in exactly one of idle or lent until
//! it is destroyed by [`Pool::cleanup`] or [`Pool::destroy`].

use super::error::{PoolError, PoolResult};
use crate::foundation::collections::PrototypeId;
use crate::scene::{Placement, Scene};
use std::collections::HashSet;

/// Statistics for pool usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances cloned from the prototype
    pub created: usize,
    /// Instances destroyed by cleanup or destroy
    pub destroyed: usize,
    /// Successful spawns
    pub spawned: usize,
    /// Instances moved from lent back to idle
    pub recycled: usize,
    /// Maximum number of instances lent out simultaneously
    pub peak_lent: usize,
}

/// Idle/lent partition of the instances of one prototype
pub struct Pool<S: Scene> {
    prototype: PrototypeId,
    container: S::Container,
    idle: Vec<S::Instance>,
    lent: HashSet<S::Instance>,
    stats: PoolStats,
}

impl<S: Scene> Pool<S> {
    /// Create an empty pool and its idle container
    pub fn new(scene: &mut S, prototype: PrototypeId, container_name: &str) -> Self {
        let container = scene.create_container(container_name);
        log::debug!("Created pool for {:?} in container {:?}", prototype, container);
        Self {
            prototype,
            container,
            idle: Vec::new(),
            lent: HashSet::new(),
            stats: PoolStats::default(),
        }
    }

    /// Make sure at least `count` instances exist in total, idle or lent
    ///
    /// New instances go to the idle container and are reported through
    /// `on_instantiate`. Returns how many were created.
    pub fn ensure_loaded(
        &mut self,
        scene: &mut S,
        template: &S::Prototype,
        count: usize,
        on_instantiate: &mut dyn FnMut(&mut S, S::Instance),
    ) -> usize {
        let missing = count.saturating_sub(self.total_count());
        for _ in 0..missing {
            let instance = self.instantiate(scene, template, on_instantiate);
            self.idle.push(instance);
        }
        missing
    }

    /// Lend out one instance, creating it if the idle set is empty
    pub fn spawn(
        &mut self,
        scene: &mut S,
        template: &S::Prototype,
        placement: &Placement<S::Container>,
        on_instantiate: &mut dyn FnMut(&mut S, S::Instance),
    ) -> S::Instance {
        let instance = match self.idle.pop() {
            Some(instance) => instance,
            None => self.instantiate(scene, template, on_instantiate),
        };

        scene.activate(instance, placement);
        self.lent.insert(instance);

        self.stats.spawned += 1;
        self.stats.peak_lent = self.stats.peak_lent.max(self.lent.len());
        instance
    }

    /// Return an instance to the idle container
    ///
    /// Recycling an instance that is already idle does nothing.
    pub fn recycle(&mut self, scene: &mut S, instance: S::Instance) -> PoolResult<()> {
        if self.lent.remove(&instance) {
            self.park(scene, instance);
            self.stats.recycled += 1;
            Ok(())
        } else if self.idle.contains(&instance) {
            log::debug!("Instance {:?} is already idle", instance);
            Ok(())
        } else {
            Err(PoolError::ForeignInstance {
                prototype: self.prototype,
                instance: format!("{instance:?}"),
            })
        }
    }

    /// Recycle every lent instance. Returns the instances that were recycled.
    pub fn recycle_all(&mut self, scene: &mut S) -> Vec<S::Instance> {
        let recycled: Vec<_> = self.lent.drain().collect();
        for &instance in &recycled {
            self.park(scene, instance);
        }
        self.stats.recycled += recycled.len();
        recycled
    }

    /// Destroy idle instances beyond `retain`. Lent instances are untouched.
    /// Returns how many were destroyed.
    pub fn cleanup(&mut self, scene: &mut S, retain: usize) -> usize {
        if self.idle.len() <= retain {
            return 0;
        }

        let excess = self.idle.split_off(retain);
        let destroyed = excess.len();
        for instance in excess {
            scene.destroy(instance);
        }
        self.stats.destroyed += destroyed;
        destroyed
    }

    /// Destroy every instance, idle or lent, and the idle container
    ///
    /// Returns how many instances were destroyed.
    pub fn destroy(mut self, scene: &mut S) -> usize {
        let mut destroyed = 0;
        for instance in self.idle.drain(..).chain(self.lent.drain()) {
            scene.destroy(instance);
            destroyed += 1;
        }
        scene.destroy_container(self.container);
        destroyed
    }

    fn instantiate(
        &mut self,
        scene: &mut S,
        template: &S::Prototype,
        on_instantiate: &mut dyn FnMut(&mut S, S::Instance),
    ) -> S::Instance {
        let instance = scene.instantiate(template, self.container);
        self.stats.created += 1;
        on_instantiate(scene, instance);
        instance
    }

    fn park(&mut self, scene: &mut S, instance: S::Instance) {
        scene.deactivate(instance, self.container);
        self.idle.push(instance);
    }

    /// Prototype this pool clones
    pub fn prototype(&self) -> PrototypeId {
        self.prototype
    }

    /// Container idle instances are parked in
    pub fn container(&self) -> S::Container {
        self.container
    }

    /// Number of idle instances
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Number of lent instances
    pub fn lent_count(&self) -> usize {
        self.lent.len()
    }

    /// Number of instances, idle and lent
    pub fn total_count(&self) -> usize {
        self.idle.len() + self.lent.len()
    }

    /// Whether `instance` is currently idle in this pool
    pub fn is_idle(&self, instance: S::Instance) -> bool {
        self.idle.contains(&instance)
    }

    /// Whether `instance` is currently lent out by this pool
    pub fn is_lent(&self, instance: S::Instance) -> bool {
        self.lent.contains(&instance)
    }

    /// Pool statistics
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::{NodeId, PrototypeId};
    use crate::foundation::math::Vec3;
    use crate::scene::MemoryScene;
    use slotmap::KeyData;

    type TestScene = MemoryScene<&'static str>;

    fn setup() -> (TestScene, Pool<TestScene>) {
        let mut scene = TestScene::new();
        let pool = Pool::new(&mut scene, PrototypeId::from(KeyData::from_ffi(1)), "[Pool] rock");
        (scene, pool)
    }

    fn ignore(_: &mut TestScene, _: NodeId) {}

    #[test]
    fn test_ensure_loaded_only_fills_the_gap() {
        let (mut scene, mut pool) = setup();
        let mut created = Vec::new();

        assert_eq!(pool.ensure_loaded(&mut scene, &"rock", 3, &mut |_, node| created.push(node)), 3);
        assert_eq!(pool.ensure_loaded(&mut scene, &"rock", 2, &mut |_, node| created.push(node)), 0);
        assert_eq!(pool.ensure_loaded(&mut scene, &"rock", 5, &mut |_, node| created.push(node)), 2);

        assert_eq!(created.len(), 5);
        assert_eq!(pool.idle_count(), 5);
        assert_eq!(scene.children_of(pool.container()), 5);
        assert_eq!(scene.active_count(), 0);
    }

    #[test]
    fn test_ensure_loaded_counts_lent_instances() {
        let (mut scene, mut pool) = setup();
        pool.ensure_loaded(&mut scene, &"rock", 2, &mut ignore);
        pool.spawn(&mut scene, &"rock", &Placement::default(), &mut ignore);
        pool.spawn(&mut scene, &"rock", &Placement::default(), &mut ignore);

        assert_eq!(pool.ensure_loaded(&mut scene, &"rock", 2, &mut ignore), 0);
        assert_eq!(pool.total_count(), 2);
    }

    #[test]
    fn test_spawn_reuses_idle_before_creating() {
        let (mut scene, mut pool) = setup();
        pool.ensure_loaded(&mut scene, &"rock", 1, &mut ignore);

        let mut created = 0;
        let first = pool.spawn(&mut scene, &"rock", &Placement::default(), &mut |_, _| created += 1);
        assert_eq!(created, 0);

        let second = pool.spawn(&mut scene, &"rock", &Placement::default(), &mut |_, _| created += 1);
        assert_eq!(created, 1);
        assert_ne!(first, second);
        assert_eq!(pool.lent_count(), 2);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_spawn_applies_placement_and_activates() {
        let (mut scene, mut pool) = setup();
        let world = scene.create_container("world");
        let placement = Placement::at(Vec3::new(0.0, 3.0, 0.0)).with_parent(world);

        let node = pool.spawn(&mut scene, &"rock", &placement, &mut ignore);

        let state = scene.node(node).unwrap();
        assert!(state.active);
        assert_eq!(state.parent, Some(world));
        assert_eq!(state.pose.position.y, 3.0);
        assert!(pool.is_lent(node));
    }

    #[test]
    fn test_recycle_parks_instance_and_ignores_idle() {
        let (mut scene, mut pool) = setup();
        let node = pool.spawn(&mut scene, &"rock", &Placement::at(Vec3::new(9.0, 0.0, 0.0)), &mut ignore);

        pool.recycle(&mut scene, node).unwrap();
        assert!(pool.is_idle(node));
        assert!(!scene.node(node).unwrap().active);
        assert_eq!(scene.node(node).unwrap().parent, Some(pool.container()));

        pool.recycle(&mut scene, node).unwrap();
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.stats().recycled, 1);
    }

    #[test]
    fn test_recycle_rejects_foreign_instance() {
        let (mut scene, mut pool) = setup();
        let elsewhere = scene.create_container("elsewhere");
        let stranger = crate::scene::Scene::instantiate(&mut scene, &"ufo", elsewhere);

        let result = pool.recycle(&mut scene, stranger);
        assert!(matches!(result, Err(PoolError::ForeignInstance { .. })));
        assert_eq!(pool.total_count(), 0);
    }

    #[test]
    fn test_recycle_all_leaves_idle_alone() {
        let (mut scene, mut pool) = setup();
        pool.ensure_loaded(&mut scene, &"rock", 4, &mut ignore);
        for _ in 0..3 {
            pool.spawn(&mut scene, &"rock", &Placement::default(), &mut ignore);
        }

        let recycled = pool.recycle_all(&mut scene);
        assert_eq!(recycled.len(), 3);
        assert_eq!(pool.idle_count(), 4);
        assert_eq!(pool.lent_count(), 0);
        assert_eq!(scene.active_count(), 0);
    }

    #[test]
    fn test_cleanup_trims_idle_only() {
        let (mut scene, mut pool) = setup();
        pool.ensure_loaded(&mut scene, &"rock", 6, &mut ignore);
        let lent = pool.spawn(&mut scene, &"rock", &Placement::default(), &mut ignore);

        assert_eq!(pool.cleanup(&mut scene, 2), 3);
        assert_eq!(pool.idle_count(), 2);
        assert_eq!(pool.lent_count(), 1);
        assert!(scene.contains(lent));

        assert_eq!(pool.cleanup(&mut scene, 10), 0);
        assert_eq!(pool.cleanup(&mut scene, 0), 2);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.stats().destroyed, 5);
    }

    #[test]
    fn test_destroy_removes_everything() {
        let (mut scene, mut pool) = setup();
        pool.ensure_loaded(&mut scene, &"rock", 3, &mut ignore);
        pool.spawn(&mut scene, &"rock", &Placement::default(), &mut ignore);

        assert_eq!(pool.destroy(&mut scene), 3);
        assert_eq!(scene.node_count(), 0);
        assert_eq!(scene.container_count(), 0);
    }

    #[test]
    fn test_stats_track_peak_lent() {
        let (mut scene, mut pool) = setup();
        let a = pool.spawn(&mut scene, &"rock", &Placement::default(), &mut ignore);
        let b = pool.spawn(&mut scene, &"rock", &Placement::default(), &mut ignore);
        pool.recycle(&mut scene, a).unwrap();
        pool.recycle(&mut scene, b).unwrap();
        pool.spawn(&mut scene, &"rock", &Placement::default(), &mut ignore);

        let stats = pool.stats();
        assert_eq!(stats.created, 2);
        assert_eq!(stats.spawned, 3);
        assert_eq!(stats.recycled, 2);
        assert_eq!(stats.peak_lent, 2);
    }
}
