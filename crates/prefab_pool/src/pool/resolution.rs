//! In-flight key resolutions
//!
//! At most one asynchronous load per key. Every caller that asks for a key
//! while its load is pending joins the same flight and gets a [`Ticket`]; the
//! load itself is a [`Shared`] future that each ticket holder awaits. The
//! resolved prototype is parked in a slot until the first waiter to wake up
//! takes it and registers it with the manager.
//!
//! Waiter counts live outside the manager so a ticket can leave its flight
//! even while the manager is borrowed. Flights nobody waits on any more are
//! pruned, dropping their load, on the next mutable access.

use crate::assets::{AssetKey, ProgressCallback, ProgressSink, ResolveError};
use crate::foundation::collections::ListenerId;
use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) type FlightTask = Shared<LocalBoxFuture<'static, Result<(), ResolveError>>>;

struct Flight<P> {
    generation: u64,
    task: FlightTask,
    slot: Rc<RefCell<Option<P>>>,
    progress: ProgressSink,
    waiters: Rc<Cell<usize>>,
}

impl<P> Flight<P> {
    fn is_abandoned(&self) -> bool {
        self.waiters.get() == 0
    }
}

/// One caller's membership in a flight
pub(crate) struct Ticket<P> {
    pub(crate) key: AssetKey,
    pub(crate) task: FlightTask,
    generation: u64,
    listener: Option<ListenerId>,
    progress: ProgressSink,
    waiters: Rc<Cell<usize>>,
    departed: Cell<bool>,
    slot: Rc<RefCell<Option<P>>>,
}

impl<P> Ticket<P> {
    /// Stop waiting on the flight. Only touches state shared with the flight,
    /// never the manager. Repeated calls do nothing.
    pub(crate) fn depart(&self) {
        if self.departed.replace(true) {
            return;
        }
        if let Some(listener) = self.listener {
            self.progress.unlisten(listener);
        }
        self.waiters.set(self.waiters.get().saturating_sub(1));
    }
}

pub(crate) struct Resolutions<P> {
    flights: HashMap<AssetKey, Flight<P>>,
    next_generation: u64,
}

impl<P> Default for Resolutions<P> {
    fn default() -> Self {
        Self {
            flights: HashMap::new(),
            next_generation: 0,
        }
    }
}

impl<P> Resolutions<P> {
    pub(crate) fn is_pending(&self, key: &AssetKey) -> bool {
        self.flights.get(key).is_some_and(|flight| !flight.is_abandoned())
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.flights.values().filter(|flight| !flight.is_abandoned()).count()
    }

    /// Leave a flight without taking its result. The last waiter to leave
    /// drops the load.
    pub(crate) fn leave(&mut self, ticket: &Ticket<P>) {
        ticket.depart();
        self.prune();
    }

    /// Drop every flight whose waiters have all departed
    pub(crate) fn prune(&mut self) {
        self.flights.retain(|key, flight| {
            if flight.is_abandoned() {
                log::debug!("Resolution of {} abandoned by every waiter", key);
                false
            } else {
                true
            }
        });
    }

    /// Take the resolved prototype and retire the flight
    ///
    /// Returns `None` if another waiter already took it.
    pub(crate) fn take(&mut self, ticket: &Ticket<P>) -> Option<P> {
        self.retire(ticket);
        ticket.slot.borrow_mut().take()
    }

    /// Retire a finished flight so the key can be resolved again
    pub(crate) fn retire(&mut self, ticket: &Ticket<P>) {
        let matches = self
            .flights
            .get(&ticket.key)
            .is_some_and(|flight| flight.generation == ticket.generation);
        if matches {
            self.flights.remove(&ticket.key);
        }
    }
}

impl<P: 'static> Resolutions<P> {
    /// Join the flight for `key`, starting it with `start` if none is pending
    pub(crate) fn join<F>(&mut self, key: &AssetKey, progress: Option<ProgressCallback>, start: F) -> Ticket<P>
    where
        F: FnOnce(ProgressSink) -> LocalBoxFuture<'static, Result<P, ResolveError>>,
    {
        self.prune();
        if let Some(flight) = self.flights.get(key) {
            flight.waiters.set(flight.waiters.get() + 1);
            log::debug!("Joined pending resolution of {} ({} waiters)", key, flight.waiters.get());
            return Ticket {
                key: key.clone(),
                task: flight.task.clone(),
                generation: flight.generation,
                listener: progress.map(|callback| flight.progress.listen(callback)),
                progress: flight.progress.clone(),
                waiters: Rc::clone(&flight.waiters),
                departed: Cell::new(false),
                slot: Rc::clone(&flight.slot),
            };
        }

        let sink = ProgressSink::new();
        let listener = progress.map(|callback| sink.listen(callback));
        let slot = Rc::new(RefCell::new(None));
        let waiters = Rc::new(Cell::new(1));

        let load = start(sink.clone());
        let parked = Rc::clone(&slot);
        let task = async move {
            let prototype = load.await?;
            *parked.borrow_mut() = Some(prototype);
            Ok(())
        }
        .boxed_local()
        .shared();

        let generation = self.next_generation;
        self.next_generation += 1;
        log::debug!("Resolving {} asynchronously", key);

        self.flights.insert(
            key.clone(),
            Flight {
                generation,
                task: task.clone(),
                slot: Rc::clone(&slot),
                progress: sink.clone(),
                waiters: Rc::clone(&waiters),
            },
        );

        Ticket {
            key: key.clone(),
            task,
            generation,
            listener,
            progress: sink,
            waiters,
            departed: Cell::new(false),
            slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::block_on;

    fn gated(receiver: oneshot::Receiver<u32>) -> LocalBoxFuture<'static, Result<u32, ResolveError>> {
        async move {
            receiver.await.map_err(|_| ResolveError::LoadFailed {
                key: AssetKey::new("k"),
                reason: "gate dropped".to_string(),
            })
        }
        .boxed_local()
    }

    #[test]
    fn test_second_join_shares_the_first_load() {
        let mut resolutions = Resolutions::default();
        let key = AssetKey::new("k");
        let (sender, receiver) = oneshot::channel();
        let mut starts = 0;

        let first = resolutions.join(&key, None, |_| {
            starts += 1;
            gated(receiver)
        });
        let second = resolutions.join(&key, None, |_| {
            starts += 1;
            futures::future::ready(Ok(0)).boxed_local()
        });

        assert_eq!(starts, 1);
        assert_eq!(resolutions.pending_count(), 1);

        sender.send(42).unwrap();
        assert_eq!(block_on(second.task.clone()), Ok(()));
        assert_eq!(block_on(first.task.clone()), Ok(()));

        assert_eq!(resolutions.take(&second), Some(42));
        assert_eq!(resolutions.take(&first), None);
        assert!(!resolutions.is_pending(&key));
    }

    #[test]
    fn test_last_waiter_leaving_drops_the_flight() {
        let mut resolutions = Resolutions::default();
        let key = AssetKey::new("k");
        let (sender, receiver) = oneshot::channel::<u32>();

        let first = resolutions.join(&key, None, |_| gated(receiver));
        let second = resolutions.join(&key, None, |_| unreachable!());

        resolutions.leave(&first);
        assert!(resolutions.is_pending(&key));

        resolutions.leave(&second);
        assert!(!resolutions.is_pending(&key));

        drop(first);
        drop(second);
        assert!(sender.is_canceled());
    }

    #[test]
    fn test_departed_ticket_is_pruned_later() {
        let mut resolutions = Resolutions::default();
        let key = AssetKey::new("k");
        let (sender, receiver) = oneshot::channel::<u32>();

        let ticket = resolutions.join(&key, None, |_| gated(receiver));
        ticket.depart();
        ticket.depart();
        drop(ticket);

        assert!(!resolutions.is_pending(&key));
        assert_eq!(resolutions.pending_count(), 0);
        assert!(!sender.is_canceled());

        resolutions.prune();
        assert!(sender.is_canceled());
    }

    #[test]
    fn test_stale_ticket_does_not_touch_new_flight() {
        let mut resolutions = Resolutions::default();
        let key = AssetKey::new("k");

        let old = resolutions.join(&key, None, |_| futures::future::ready(Ok(1u32)).boxed_local());
        resolutions.retire(&old);

        let fresh = resolutions.join(&key, None, |_| futures::future::ready(Ok(2u32)).boxed_local());
        resolutions.leave(&old);
        assert!(resolutions.is_pending(&key));

        resolutions.leave(&fresh);
        assert!(!resolutions.is_pending(&key));
    }
}
