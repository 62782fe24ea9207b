//! Progress fan-out for pending resolutions

use crate::foundation::collections::{HandleMap, ListenerId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Callback receiving load progress in `[0, 1]`
pub type ProgressCallback = Box<dyn FnMut(f32)>;

struct ProgressState {
    listeners: HandleMap<ListenerId, ProgressCallback>,
    last: f32,
}

/// Shared progress reporter handed to an [`AssetResolver`](super::AssetResolver)
///
/// One sink exists per in-flight load; every caller waiting on that load can
/// attach a listener. Listeners must not attach or detach listeners on the
/// same sink from inside the callback.
#[derive(Clone)]
pub struct ProgressSink {
    state: Rc<RefCell<ProgressState>>,
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ProgressSink")
            .field("listeners", &state.listeners.len())
            .field("last", &state.last)
            .finish()
    }
}

impl ProgressSink {
    /// Create a sink with no listeners
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ProgressState {
                listeners: HandleMap::with_key(),
                last: 0.0,
            })),
        }
    }

    /// Report progress. Values are clamped to `[0, 1]`; NaN is ignored.
    pub fn report(&self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let mut state = self.state.borrow_mut();
        state.last = fraction;
        for listener in state.listeners.values_mut() {
            listener(fraction);
        }
    }

    /// Last reported fraction
    pub fn last_reported(&self) -> f32 {
        self.state.borrow().last
    }

    /// Number of attached listeners
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Attach a listener
    pub fn listen(&self, listener: ProgressCallback) -> ListenerId {
        self.state.borrow_mut().listeners.insert(listener)
    }

    /// Detach a listener. Returns false if it was not attached.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        self.state.borrow_mut().listeners.remove(id).is_some()
    }
}
