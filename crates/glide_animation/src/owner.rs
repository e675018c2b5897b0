//! Lifecycle owners
//!
//! An [`Owner`] stands in for the host object an interpolation belongs to.
//! Tasks keep only a weak link to it: once the owner is dropped or
//! invalidated, every task bound to it is cancelled before its next update.

use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies an owner across schedulers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// A lifecycle context tasks can be bound to
///
/// # Example
///
/// ```ignore
/// let panel = Owner::new();
/// scheduler.start_with(LerpRequest::new(0.0, 1.0, 0.3).owner(&panel).on_update(fade))?;
///
/// // Panel closed: its fade stops without another callback
/// drop(panel);
/// ```
#[derive(Debug)]
pub struct Owner {
    id: OwnerId,
    alive: Rc<Cell<bool>>,
}

impl Owner {
    pub fn new() -> Self {
        Self {
            id: OwnerId(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed)),
            alive: Rc::new(Cell::new(true)),
        }
    }

    pub fn id(&self) -> OwnerId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Invalidate without dropping
    ///
    /// Tasks bound to this owner are cancelled on the next tick. To cancel
    /// them right away use `TaskScheduler::notify_owner_invalid`.
    pub fn invalidate(&self) {
        self.alive.set(false);
    }

    pub(crate) fn link(&self) -> OwnerLink {
        OwnerLink {
            id: self.id,
            alive: Rc::downgrade(&self.alive),
        }
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak reference from a task to its owner
#[derive(Clone, Debug)]
pub(crate) struct OwnerLink {
    id: OwnerId,
    alive: Weak<Cell<bool>>,
}

impl OwnerLink {
    pub(crate) fn id(&self) -> OwnerId {
        self.id
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.upgrade().is_some_and(|alive| alive.get())
    }
}
