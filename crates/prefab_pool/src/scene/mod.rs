//! Scene collaborator interface
//!
//! The pool never touches engine objects directly. Everything it needs from
//! the host runtime (cloning a prototype, destroying an instance, parking it
//! in a container, placing it in the world) goes through [`Scene`].

pub mod memory_scene;

pub use memory_scene::{MemoryScene, SceneNode};

use crate::foundation::math::{Pose, Quat, Vec3};
use std::fmt::Debug;
use std::hash::Hash;

/// Host runtime that can clone prototypes into instances
///
/// Instances are handles: cheap to copy and compared by identity. Containers
/// are parent contexts; the pool parks inactive instances in a container of
/// its own, separate from wherever the caller places live ones.
pub trait Scene {
    /// Template object instances are cloned from
    type Prototype;

    /// Handle of a live instance
    type Instance: Copy + Eq + Hash + Debug;

    /// Handle of a parent context
    type Container: Copy + Debug;

    /// Create a named container for parking idle instances
    fn create_container(&mut self, name: &str) -> Self::Container;

    /// Destroy a container. Called after every instance parked in it is gone.
    fn destroy_container(&mut self, container: Self::Container);

    /// Clone `prototype` into a new, inactive instance parented to `container`
    fn instantiate(&mut self, prototype: &Self::Prototype, container: Self::Container) -> Self::Instance;

    /// Destroy an instance
    fn destroy(&mut self, instance: Self::Instance);

    /// Apply `placement` and make the instance live
    fn activate(&mut self, instance: Self::Instance, placement: &Placement<Self::Container>);

    /// Make the instance inactive and park it in `container`, dropping any
    /// caller-assigned placement
    fn deactivate(&mut self, instance: Self::Instance, container: Self::Container);
}

/// Where a spawned instance goes: pose plus optional parent context
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement<C> {
    /// Position and rotation
    pub pose: Pose,
    /// Parent context, `None` for the scene root
    pub parent: Option<C>,
}

impl<C> Default for Placement<C> {
    fn default() -> Self {
        Self {
            pose: Pose::identity(),
            parent: None,
        }
    }
}

impl<C> Placement<C> {
    /// Placement at `position` under the scene root
    pub fn at(position: Vec3) -> Self {
        Self {
            pose: Pose::from_position(position),
            parent: None,
        }
    }

    /// Set the rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.pose.rotation = rotation;
        self
    }

    /// Set the parent context
    pub fn with_parent(mut self, parent: C) -> Self {
        self.parent = Some(parent);
        self
    }
}
