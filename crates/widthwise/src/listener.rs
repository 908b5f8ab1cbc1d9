#![forbid(unsafe_code)]

//! Breakpoint listener: debounced width watching with change events.
//!
//! # Design
//!
//! [`BreakpointListener`] owns a region table, a [`Host`], and an
//! [`EventHub`] carrying [`Transition`] payloads. At construction it probes
//! the host width once and records the matching region silently; nothing can
//! be subscribed yet, so no event is observable for the initial state.
//!
//! Afterwards the host resize signal pokes a trailing-edge [`Debounce`], and
//! the debounced recompute probes the width again. When the matched region
//! differs from the recorded one, the listener shifts current into previous,
//! records the new match, and fires [`CHANGE`] with both names. A recompute
//! that lands on the same region fires nothing and leaves previous untouched.
//!
//! The recompute path snapshots what it needs under a short borrow and
//! triggers the hub with no borrow held, so change handlers are free to call
//! back into the listener, including [`destroy`](BreakpointListener::destroy).
//!
//! # Usage
//!
//! ```ignore
//! use widthwise::{Breakpoints, BreakpointListener, SimHost, DEFAULT_DEBOUNCE};
//!
//! let breakpoints = Breakpoints::builder()
//!     .region("narrow", 100)
//!     .region("wide", 200)
//!     .build();
//!
//! let sim = SimHost::new(50);
//! let listener = BreakpointListener::new(breakpoints, sim.host());
//! listener.on_change(|t| println!("{:?} -> {:?}", t.previous, t.current));
//!
//! sim.resize_to(150);
//! sim.advance(DEFAULT_DEBOUNCE); // fires: Some("narrow") -> Some("wide")
//! ```
//!
//! # Invariants
//!
//! 1. A change event fires exactly when the matched region differs from the
//!    recorded current, carrying (new current, old current).
//! 2. `previous` always names the region that was current before the last
//!    fired change; unchanged recomputes do not disturb it.
//! 3. After `destroy`, no event ever fires again: the signal registration is
//!    detached, the pending debounce is cancelled, and recompute is inert.
//! 4. `destroy` is idempotent and safe to call from inside a change handler.
//!
//! # Failure Modes
//!
//! - Dropping every listener handle without calling `destroy` leaves an
//!   inert closure registered on the host signal; it upgrades nothing and
//!   never fires an event, but the host keeps the registration.
//! - A width probe that panics unwinds out of `recompute` with the listener
//!   state unchanged.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use widthwise_hub::{EventHub, HandlerId, Subscription};

use crate::breakpoints::{Breakpoints, Region};
use crate::debounce::Debounce;
use crate::host::{Host, SignalToken};

/// Event name fired on region change.
pub const CHANGE: &str = "change";

/// Debounce window applied to resize signals unless overridden.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Payload of a [`CHANGE`] event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Region matched after the change; `None` when the width is beyond
    /// every bound.
    pub current: Option<Rc<str>>,
    /// Region matched before the change.
    pub previous: Option<Rc<str>>,
}

/// Construction-time tunables.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Trailing-edge window between the last resize signal and the
    /// recompute. Default: [`DEFAULT_DEBOUNCE`].
    pub debounce: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

struct ListenerInner {
    breakpoints: Breakpoints,
    host: Host,
    hub: EventHub<Transition>,
    config: ListenerConfig,
    debounce: Option<Debounce>,
    token: Option<SignalToken>,
    current: Option<Rc<str>>,
    previous: Option<Rc<str>>,
    destroyed: bool,
}

/// Watches the host width and fires [`CHANGE`] events on region transitions.
///
/// Cloning a `BreakpointListener` creates a new handle to the **same**
/// listener state.
pub struct BreakpointListener {
    inner: Rc<RefCell<ListenerInner>>,
}

impl Clone for BreakpointListener {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for BreakpointListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("BreakpointListener")
            .field("current", &state.current)
            .field("previous", &state.previous)
            .field("destroyed", &state.destroyed)
            .finish_non_exhaustive()
    }
}

impl BreakpointListener {
    /// Create a listener with the default config and start watching.
    ///
    /// The initial region is computed from the host width immediately; no
    /// event fires for it.
    #[must_use]
    pub fn new(breakpoints: Breakpoints, host: Host) -> Self {
        Self::with_config(breakpoints, host, ListenerConfig::default())
    }

    /// Create a listener with explicit tunables and start watching.
    #[must_use]
    pub fn with_config(breakpoints: Breakpoints, host: Host, config: ListenerConfig) -> Self {
        let current = breakpoints
            .region_for(host.width())
            .map(Region::name_shared);
        let inner = Rc::new(RefCell::new(ListenerInner {
            breakpoints,
            host,
            hub: EventHub::new(),
            config,
            debounce: None,
            token: None,
            current,
            previous: None,
            destroyed: false,
        }));

        let scheduler = Rc::clone(inner.borrow().host.scheduler());
        let delay = inner.borrow().config.debounce;
        let weak = Rc::downgrade(&inner);
        let debounce = Debounce::new(scheduler, delay, move || {
            if let Some(inner) = weak.upgrade() {
                Self::recompute_on(&inner);
            }
        });
        inner.borrow_mut().debounce = Some(debounce);

        let weak = Rc::downgrade(&inner);
        let resize = Rc::clone(inner.borrow().host.resize());
        let token = resize.add_listener(Rc::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            let debounce = {
                let state = inner.borrow();
                if state.destroyed {
                    return;
                }
                state.debounce.clone()
            };
            if let Some(debounce) = debounce {
                debounce.poke();
            }
        }));
        inner.borrow_mut().token = Some(token);

        Self { inner }
    }

    /// Probe the width now and fire [`CHANGE`] if the region flipped,
    /// bypassing the debounce.
    pub fn recompute(&self) {
        Self::recompute_on(&self.inner);
    }

    fn recompute_on(inner: &Rc<RefCell<ListenerInner>>) {
        let fired = {
            let mut state = inner.borrow_mut();
            if state.destroyed {
                return;
            }
            let width = state.host.width();
            let next = state
                .breakpoints
                .region_for(width)
                .map(Region::name_shared);
            if next == state.current {
                tracing::trace!(
                    message = "listener.recompute",
                    region = next.as_deref().unwrap_or("-"),
                );
                None
            } else {
                state.previous = state.current.take();
                state.current = next.clone();
                Some((
                    state.hub.clone(),
                    Transition {
                        current: next,
                        previous: state.previous.clone(),
                    },
                ))
            }
        };
        if let Some((hub, transition)) = fired {
            tracing::debug!(
                message = "listener.change",
                from = transition.previous.as_deref().unwrap_or("-"),
                to = transition.current.as_deref().unwrap_or("-"),
            );
            hub.trigger(CHANGE, &transition);
        }
    }

    /// Region currently matched, if any.
    #[must_use]
    pub fn current(&self) -> Option<Rc<str>> {
        self.inner.borrow().current.clone()
    }

    /// Region matched before the last fired change.
    #[must_use]
    pub fn previous(&self) -> Option<Rc<str>> {
        self.inner.borrow().previous.clone()
    }

    /// Probe the region table for an arbitrary width without touching
    /// listener state.
    #[must_use]
    pub fn region_for(&self, width: u16) -> Option<Rc<str>> {
        self.inner
            .borrow()
            .breakpoints
            .region_for(width)
            .map(Region::name_shared)
    }

    /// The region table.
    #[must_use]
    pub fn breakpoints(&self) -> Breakpoints {
        self.inner.borrow().breakpoints.clone()
    }

    /// The event hub carrying [`CHANGE`] events.
    #[must_use]
    pub fn hub(&self) -> EventHub<Transition> {
        self.inner.borrow().hub.clone()
    }

    /// Subscribe to [`CHANGE`]; sugar over [`hub`](BreakpointListener::hub).
    pub fn on_change(&self, callback: impl Fn(&Transition) + 'static) -> HandlerId {
        self.hub().on(CHANGE, move |_, transition| callback(transition))
    }

    /// RAII variant of [`on_change`](BreakpointListener::on_change): the
    /// registration is removed when the guard drops.
    pub fn subscribe_change(&self, callback: impl Fn(&Transition) + 'static) -> Subscription {
        self.hub()
            .subscribe(CHANGE, move |_, transition| callback(transition))
    }

    /// The configured debounce window.
    #[must_use]
    pub fn debounce_delay(&self) -> Duration {
        self.inner.borrow().config.debounce
    }

    /// Whether [`destroy`](BreakpointListener::destroy) has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    /// Stop watching: detach from the resize signal, cancel any pending
    /// debounced recompute, clear the region state, and drop every hub
    /// subscription. Idempotent; later `recompute` calls do nothing.
    pub fn destroy(&self) {
        // Detach pieces under a short borrow, then call out with none held,
        // same as the recompute path.
        let (registration, debounce, hub) = {
            let mut state = self.inner.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.current = None;
            state.previous = None;
            let registration = state
                .token
                .take()
                .map(|token| (Rc::clone(state.host.resize()), token));
            (registration, state.debounce.take(), state.hub.clone())
        };
        if let Some((resize, token)) = registration {
            resize.remove_listener(token);
        }
        if let Some(debounce) = debounce {
            debounce.cancel();
        }
        hub.clear();
        tracing::debug!(message = "listener.destroy");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
