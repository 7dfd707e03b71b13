//! Change notification.
//!
//! Stores publish a [`ChangeEvent`] after every successful write. Observers
//! registered with the store's [`Notifier`] are called synchronously once the
//! write has committed and before the write call returns to its caller. A
//! write whose caller stops waiting still publishes when it commits.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use rolegate_core::EntityKind;
use serde::{Deserialize, Serialize};

/// What happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Created,
    Updated,
    Deleted,
}

/// A single successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: EntityKind,
    /// Raw id of the entity. For subject events this is the subject id.
    pub id: u64,
    pub op: ChangeOp,
}

impl ChangeEvent {
    pub fn new(kind: EntityKind, id: u64, op: ChangeOp) -> Self {
        Self { kind, id, op }
    }

    pub fn created(kind: EntityKind, id: u64) -> Self {
        Self::new(kind, id, ChangeOp::Created)
    }

    pub fn updated(kind: EntityKind, id: u64) -> Self {
        Self::new(kind, id, ChangeOp::Updated)
    }

    pub fn deleted(kind: EntityKind, id: u64) -> Self {
        Self::new(kind, id, ChangeOp::Deleted)
    }
}

/// Receives change events from a store.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

/// Registry of change observers.
///
/// Observers are held weakly: dropping the last `Arc` to an observer
/// unsubscribes it.
#[derive(Default)]
pub struct Notifier {
    observers: RwLock<Vec<Weak<dyn ChangeObserver>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn subscribe<O>(&self, observer: &Arc<O>)
    where
        O: ChangeObserver + 'static,
    {
        let observer: Arc<dyn ChangeObserver> = observer.clone();
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&observer));
    }

    /// Deliver an event to every live observer, in subscription order.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::trace!(kind = %event.kind, id = event.id, op = ?event.op, "publishing change");

        // Upgrade under the lock, call outside it so observers may subscribe.
        let live: Vec<Arc<dyn ChangeObserver>> = {
            let mut observers = self
                .observers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            observers.retain(|o| o.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };

        for observer in live {
            observer.on_change(&event);
        }
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|o| o.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}
