//! Handle types and handle-based storage
//!
//! Every identity in the crate is a generational slot map key: prototypes are
//! compared by the handle they were registered under, never by value.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Identity of a prototype registered with a pool manager
    pub struct PrototypeId;

    /// Handle returned when subscribing to instantiate notifications
    pub struct SubscriptionId;

    /// Handle of a progress listener attached to a pending resolution
    pub struct ListenerId;

    /// Node handle inside a [`MemoryScene`](crate::scene::MemoryScene)
    pub struct NodeId;

    /// Container handle inside a [`MemoryScene`](crate::scene::MemoryScene)
    pub struct ContainerId;
}

/// Handle-based map using slot map for stable references
pub type HandleMap<K, T> = SlotMap<K, T>;
