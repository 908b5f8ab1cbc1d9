#![forbid(unsafe_code)]

//! Region relays: enter/leave hooks over sets of region names.
//!
//! # Design
//!
//! A relay maps whitespace-separated region-name sets to [`Hooks`]. It
//! subscribes once to a listener's [`CHANGE`] events under a fresh
//! [`OwnerId`]; on every transition each hook set is checked independently:
//!
//! - current in the set, previous not: the enter hook runs;
//! - previous in the set, current not: the leave hook runs, when present;
//! - both in or both out: nothing runs.
//!
//! A transition out of no region (`previous == None`) counts as "not in any
//! set", so the very first region entered always runs its enter hook. Names
//! that match no region in the listener's table are legal; they simply never
//! match a transition.
//!
//! [`Relay::destroy`] removes exactly the relay's own subscription, filtered
//! by event name, handler id, and owner; other subscribers on the listener
//! hub are untouched.
//!
//! # Usage
//!
//! ```ignore
//! use widthwise::{Hooks, RelayBuilder};
//!
//! let relay = RelayBuilder::new()
//!     .enter("mobile tablet", || compact_layout())
//!     .hook("desktop", Hooks::enter(|| full_layout()).with_leave(|| teardown()))
//!     .attach(&listener);
//! ```

use std::cell::Cell;
use std::rc::Rc;

use widthwise_hub::{HandlerId, OwnerId, WeakEventHub};

use crate::listener::{BreakpointListener, CHANGE, Transition};

/// Enter hook plus optional leave hook for one region set.
#[derive(Clone)]
pub struct Hooks {
    enter: Rc<dyn Fn()>,
    leave: Option<Rc<dyn Fn()>>,
}

impl Hooks {
    /// Hook set with an enter action only.
    pub fn enter(enter: impl Fn() + 'static) -> Self {
        Self {
            enter: Rc::new(enter),
            leave: None,
        }
    }

    /// Add a leave action.
    #[must_use]
    pub fn with_leave(mut self, leave: impl Fn() + 'static) -> Self {
        self.leave = Some(Rc::new(leave));
        self
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("has_leave", &self.leave.is_some())
            .finish_non_exhaustive()
    }
}

struct RelayEntry {
    names: Vec<Rc<str>>,
    hooks: Hooks,
}

impl RelayEntry {
    fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| &**n == name)
    }

    fn apply(&self, transition: &Transition) {
        let now = transition
            .current
            .as_deref()
            .is_some_and(|name| self.contains(name));
        let before = transition
            .previous
            .as_deref()
            .is_some_and(|name| self.contains(name));
        if now && !before {
            (self.hooks.enter)();
        } else if before && !now {
            if let Some(leave) = &self.hooks.leave {
                leave();
            }
        }
    }
}

/// Builder collecting hook sets before attaching to a listener.
#[derive(Default)]
pub struct RelayBuilder {
    entries: Vec<RelayEntry>,
}

impl RelayBuilder {
    /// Start with no hook sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add hooks for a whitespace-separated set of region names.
    ///
    /// Hook sets are checked in the order they were added.
    #[must_use]
    pub fn hook(mut self, regions: &str, hooks: Hooks) -> Self {
        self.entries.push(RelayEntry {
            names: regions.split_whitespace().map(Rc::from).collect(),
            hooks,
        });
        self
    }

    /// Shorthand for [`hook`](RelayBuilder::hook) with an enter action only.
    #[must_use]
    pub fn enter(self, regions: &str, enter: impl Fn() + 'static) -> Self {
        self.hook(regions, Hooks::enter(enter))
    }

    /// Subscribe the collected hook sets to the listener's change events.
    #[must_use]
    pub fn attach(self, listener: &BreakpointListener) -> Relay {
        let entries: Rc<[RelayEntry]> = self.entries.into();
        let owner = OwnerId::fresh();
        let hub = listener.hub();
        let dispatch_entries = Rc::clone(&entries);
        let handler = hub.on_owned(CHANGE, owner, move |_, transition: &Transition| {
            for entry in dispatch_entries.iter() {
                entry.apply(transition);
            }
        });
        Relay {
            hub: hub.downgrade(),
            owner,
            handler,
            entries,
            destroyed: Cell::new(false),
        }
    }
}

impl std::fmt::Debug for RelayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayBuilder")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Attached region relay.
///
/// Dropping a `Relay` without calling [`destroy`](Relay::destroy) leaves the
/// hooks subscribed for the listener's lifetime.
pub struct Relay {
    hub: WeakEventHub<Transition>,
    owner: OwnerId,
    handler: HandlerId,
    entries: Rc<[RelayEntry]>,
    destroyed: Cell<bool>,
}

impl Relay {
    /// Remove this relay's subscription. Idempotent; a relay whose listener
    /// is already destroyed detaches trivially.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        if let Some(hub) = self.hub.upgrade() {
            hub.off(Some(CHANGE), Some(self.handler), Some(self.owner));
        }
    }

    /// Whether the relay still holds a live subscription.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.destroyed.get() && self.hub.upgrade().is_some()
    }

    /// Number of hook sets.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("entries", &self.entries.len())
            .field("destroyed", &self.destroyed.get())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
