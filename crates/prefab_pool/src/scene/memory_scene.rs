//! In-memory scene
//!
//! Minimal [`Scene`] backed by slot maps. Nodes hold a clone of their
//! prototype value plus placement and activity state. Used by the demo and
//! by tests; real engines implement [`Scene`] over their own object model.

use super::{Placement, Scene};
use crate::foundation::collections::{ContainerId, HandleMap, NodeId};
use crate::foundation::math::Pose;

/// A cloned prototype living in a [`MemoryScene`]
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode<T> {
    /// Value cloned from the prototype
    pub value: T,
    /// Current pose
    pub pose: Pose,
    /// Parent container, `None` for the scene root
    pub parent: Option<ContainerId>,
    /// Whether the node is live
    pub active: bool,
}

/// Slot map backed scene
#[derive(Debug)]
pub struct MemoryScene<T> {
    nodes: HandleMap<NodeId, SceneNode<T>>,
    containers: HandleMap<ContainerId, String>,
    instantiated: usize,
    destroyed: usize,
}

impl<T> Default for MemoryScene<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryScene<T> {
    /// Create an empty scene
    pub fn new() -> Self {
        Self {
            nodes: HandleMap::with_key(),
            containers: HandleMap::with_key(),
            instantiated: 0,
            destroyed: 0,
        }
    }

    /// Get a node
    pub fn node(&self, id: NodeId) -> Option<&SceneNode<T>> {
        self.nodes.get(id)
    }

    /// Get a mutable node
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode<T>> {
        self.nodes.get_mut(id)
    }

    /// Whether the node still exists
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live (not destroyed) nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of active nodes
    pub fn active_count(&self) -> usize {
        self.nodes.values().filter(|node| node.active).count()
    }

    /// Number of nodes parented to `container`
    pub fn children_of(&self, container: ContainerId) -> usize {
        self.nodes
            .values()
            .filter(|node| node.parent == Some(container))
            .count()
    }

    /// Name of a container
    pub fn container_name(&self, container: ContainerId) -> Option<&str> {
        self.containers.get(container).map(String::as_str)
    }

    /// Number of existing containers
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Total nodes ever instantiated
    pub fn instantiated_count(&self) -> usize {
        self.instantiated
    }

    /// Total nodes ever destroyed
    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }
}

impl<T: Clone> Scene for MemoryScene<T> {
    type Prototype = T;
    type Instance = NodeId;
    type Container = ContainerId;

    fn create_container(&mut self, name: &str) -> ContainerId {
        self.containers.insert(name.to_string())
    }

    fn destroy_container(&mut self, container: ContainerId) {
        let orphans = self.children_of(container);
        if orphans > 0 {
            log::warn!(
                "Destroying container {:?} with {} nodes still parented to it",
                container,
                orphans
            );
        }
        self.containers.remove(container);
    }

    fn instantiate(&mut self, prototype: &T, container: ContainerId) -> NodeId {
        self.instantiated += 1;
        self.nodes.insert(SceneNode {
            value: prototype.clone(),
            pose: Pose::identity(),
            parent: Some(container),
            active: false,
        })
    }

    fn destroy(&mut self, instance: NodeId) {
        if self.nodes.remove(instance).is_some() {
            self.destroyed += 1;
        } else {
            log::warn!("Destroy of unknown node {:?} ignored", instance);
        }
    }

    fn activate(&mut self, instance: NodeId, placement: &Placement<ContainerId>) {
        if let Some(node) = self.nodes.get_mut(instance) {
            node.pose = placement.pose;
            node.parent = placement.parent;
            node.active = true;
        }
    }

    fn deactivate(&mut self, instance: NodeId, container: ContainerId) {
        if let Some(node) = self.nodes.get_mut(instance) {
            node.active = false;
            node.pose = Pose::identity();
            node.parent = Some(container);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_instantiate_parks_inactive_clone() {
        let mut scene: MemoryScene<String> = MemoryScene::new();
        let container = scene.create_container("idle");
        let node = scene.instantiate(&"rock".to_string(), container);

        let state = scene.node(node).unwrap();
        assert_eq!(state.value, "rock");
        assert!(!state.active);
        assert_eq!(state.parent, Some(container));
        assert_eq!(scene.children_of(container), 1);
    }

    #[test]
    fn test_activate_then_deactivate_restores_parking() {
        let mut scene: MemoryScene<u32> = MemoryScene::new();
        let idle = scene.create_container("idle");
        let world = scene.create_container("world");
        let node = scene.instantiate(&1u32, idle);

        let placement = Placement::at(Vec3::new(4.0, 0.0, -2.0)).with_parent(world);
        scene.activate(node, &placement);
        assert!(scene.node(node).unwrap().active);
        assert_eq!(scene.node(node).unwrap().parent, Some(world));
        assert_eq!(scene.node(node).unwrap().pose.position.x, 4.0);

        scene.deactivate(node, idle);
        let state = scene.node(node).unwrap();
        assert!(!state.active);
        assert_eq!(state.parent, Some(idle));
        assert_eq!(state.pose, Pose::identity());
    }

    #[test]
    fn test_destroy_counts_only_existing_nodes() {
        let mut scene: MemoryScene<u8> = MemoryScene::new();
        let idle = scene.create_container("idle");
        let node = scene.instantiate(&0u8, idle);

        scene.destroy(node);
        scene.destroy(node);
        assert_eq!(scene.destroyed_count(), 1);
        assert_eq!(scene.node_count(), 0);

        scene.destroy_container(idle);
        assert_eq!(scene.container_count(), 0);
    }
}
