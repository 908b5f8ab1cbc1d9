#![forbid(unsafe_code)]

//! The injected host environment: width probe, resize signal, timers.
//!
//! # Design
//!
//! [`BreakpointListener`](crate::listener::BreakpointListener) never touches a
//! real window or terminal directly. It is handed a [`Host`], a bundle of
//! three single-threaded capabilities:
//!
//! - [`WidthSource`]: synchronous width probe. Any `Fn() -> u16` qualifies.
//! - [`ResizeSignal`]: registrable "width may have changed" notification.
//!   Registration returns a [`SignalToken`] for later detachment.
//! - [`Scheduler`]: one-shot delayed tasks with cancellation by [`TimerId`].
//!
//! Production hosts wrap a real event source; tests use
//! [`SimHost`](crate::harness::SimHost), which implements all three traits
//! over a manual clock.
//!
//! # Invariants
//!
//! 1. Tokens and timer ids minted through `fresh()` are process-unique.
//! 2. `remove_listener` and `cancel` with an unknown or already-spent id are
//!    silent no-ops.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Synchronous width probe.
pub trait WidthSource {
    /// Current width, in whatever unit the host measures (columns, pixels).
    fn width(&self) -> u16;
}

impl<F: Fn() -> u16> WidthSource for F {
    fn width(&self) -> u16 {
        self()
    }
}

/// Identity of one resize-signal registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalToken(u64);

impl SignalToken {
    /// Mint a process-unique token. Signal implementations call this when
    /// registering a listener.
    #[must_use]
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Registrable notification that the host width may have changed.
///
/// The signal does not carry the new width; consumers probe their
/// [`WidthSource`] when they decide to react.
pub trait ResizeSignal {
    /// Register `listener` to be invoked on every resize notification.
    fn add_listener(&self, listener: Rc<dyn Fn()>) -> SignalToken;

    /// Detach a previously registered listener. Unknown tokens are ignored.
    fn remove_listener(&self, token: SignalToken);
}

/// Identity of one scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Mint a process-unique timer id. Scheduler implementations call this
    /// when accepting a task.
    #[must_use]
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// One-shot delayed task execution.
pub trait Scheduler {
    /// Run `task` once after `delay`. The returned id stays valid for
    /// [`cancel`](Scheduler::cancel) until the task runs.
    ///
    /// Implementations must not invoke `task` from inside `schedule_after`
    /// itself, even for a zero delay; callers store the returned id.
    fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId;

    /// Drop a pending task. Unknown or already-fired ids are ignored.
    fn cancel(&self, timer: TimerId);
}

/// The bundled host environment handed to a listener.
///
/// Cloning a `Host` clones the capability handles, not the environment.
#[derive(Clone)]
pub struct Host {
    width: Rc<dyn WidthSource>,
    resize: Rc<dyn ResizeSignal>,
    scheduler: Rc<dyn Scheduler>,
}

impl Host {
    /// Bundle the three capabilities.
    pub fn new(
        width: Rc<dyn WidthSource>,
        resize: Rc<dyn ResizeSignal>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            width,
            resize,
            scheduler,
        }
    }

    /// Probe the current width.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width.width()
    }

    /// The resize signal handle.
    #[must_use]
    pub fn resize(&self) -> &Rc<dyn ResizeSignal> {
        &self.resize
    }

    /// The scheduler handle.
    #[must_use]
    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.scheduler
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("width", &self.width.width())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
