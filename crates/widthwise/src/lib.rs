#![forbid(unsafe_code)]

//! Debounced breakpoint tracking over an injected host environment.
//!
//! The crate watches a width reported by the host, maps it onto an ordered
//! list of named regions, and publishes a change event whenever the matched
//! region flips:
//!
//! - [`Breakpoints`]: ordered named regions with upper width bounds.
//! - [`BreakpointListener`]: owns the current/previous region pair, listens to
//!   the host resize signal through a trailing-edge [`Debounce`], and fires
//!   [`CHANGE`] events with a [`Transition`] payload on its hub.
//! - [`RelayBuilder`] / [`Relay`]: translate region transitions into
//!   enter/leave hooks for named region sets.
//! - [`Host`] and its traits ([`WidthSource`], [`ResizeSignal`],
//!   [`Scheduler`]): the injected environment, with [`SimHost`] as a
//!   deterministic in-memory implementation for tests.
//!
//! # Architecture
//!
//! All types are single-threaded handles over `Rc<RefCell<..>>` state. Event
//! fan-out goes through [`widthwise_hub::EventHub`], which guarantees
//! subscription-order dispatch and tolerates handlers unsubscribing mid-event.
//! Nothing here panics on unknown names, missing subscribers, or repeated
//! teardown; those are silent no-ops.

pub mod breakpoints;
pub mod debounce;
pub mod harness;
pub mod host;
pub mod listener;
pub mod relay;

pub use breakpoints::{Breakpoints, BreakpointsBuilder, BreakpointsError, Region};
pub use debounce::Debounce;
pub use harness::SimHost;
pub use host::{Host, ResizeSignal, Scheduler, SignalToken, TimerId, WidthSource};
pub use listener::{BreakpointListener, CHANGE, DEFAULT_DEBOUNCE, ListenerConfig, Transition};
pub use relay::{Hooks, Relay, RelayBuilder};

pub use widthwise_hub::{ANY_EVENT, EventHub, HandlerId, OwnerId, Subscription, WeakEventHub};
