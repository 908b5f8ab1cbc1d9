#![forbid(unsafe_code)]

//! Deterministic in-memory host for tests and examples.
//!
//! # Design
//!
//! [`SimHost`] implements all three host capabilities over plain state: a
//! width cell, a listener list for the resize signal, and a timer queue keyed
//! to a manual clock. Nothing runs until [`advance`](SimHost::advance) moves
//! the clock; due timers then fire in deadline order, ties broken by
//! scheduling order. A timer task may schedule further timers, and those fire
//! in the same `advance` call when they fall inside the advanced window.
//!
//! # Usage
//!
//! ```ignore
//! use widthwise::SimHost;
//!
//! let sim = SimHost::new(80);
//! let listener = BreakpointListener::new(breakpoints, sim.host());
//!
//! sim.resize_to(150);
//! sim.advance(DEFAULT_DEBOUNCE);
//! assert_eq!(listener.current().as_deref(), Some("wide"));
//! ```
//!
//! # Invariants
//!
//! 1. The clock never moves backwards; `advance` ends exactly `dt` later.
//! 2. Timers fire at their deadline in (deadline, scheduling order) order.
//! 3. Resize dispatch walks a snapshot of the listener list, so listeners
//!    may detach themselves or others mid-notification.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::host::{Host, ResizeSignal, Scheduler, SignalToken, TimerId, WidthSource};

struct SimTimer {
    id: TimerId,
    deadline: Duration,
    seq: u64,
    task: Box<dyn FnOnce()>,
}

struct SimState {
    width: Cell<u16>,
    now: Cell<Duration>,
    next_seq: Cell<u64>,
    listeners: RefCell<Vec<(SignalToken, Rc<dyn Fn()>)>>,
    timers: RefCell<Vec<SimTimer>>,
}

/// In-memory host with a manual clock.
///
/// Cloning yields another handle to the same simulated environment.
pub struct SimHost {
    state: Rc<SimState>,
}

impl Clone for SimHost {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl SimHost {
    /// Create a host reporting `width`, with the clock at zero.
    #[must_use]
    pub fn new(width: u16) -> Self {
        Self {
            state: Rc::new(SimState {
                width: Cell::new(width),
                now: Cell::new(Duration::ZERO),
                next_seq: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
                timers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Bundle this simulation as a [`Host`].
    #[must_use]
    pub fn host(&self) -> Host {
        Host::new(
            Rc::new(self.clone()),
            Rc::new(self.clone()),
            Rc::new(self.clone()),
        )
    }

    /// Change the reported width without signalling.
    pub fn set_width(&self, width: u16) {
        self.state.width.set(width);
    }

    /// Currently reported width.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.state.width.get()
    }

    /// Fire the resize signal at the current width.
    pub fn resize(&self) {
        let snapshot: Vec<Rc<dyn Fn()>> = {
            let listeners = self.state.listeners.borrow();
            listeners.iter().map(|(_, l)| Rc::clone(l)).collect()
        };
        for listener in snapshot {
            listener();
        }
    }

    /// Set the width and fire the resize signal.
    pub fn resize_to(&self, width: u16) {
        self.set_width(width);
        self.resize();
    }

    /// Move the clock forward by `dt`, firing every timer that falls due.
    pub fn advance(&self, dt: Duration) {
        let target = self.state.now.get() + dt;
        loop {
            let due = {
                let mut timers = self.state.timers.borrow_mut();
                let next = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.deadline <= target)
                    .min_by_key(|(_, t)| (t.deadline, t.seq))
                    .map(|(ix, _)| ix);
                next.map(|ix| timers.remove(ix))
            };
            let Some(timer) = due else { break };
            if timer.deadline > self.state.now.get() {
                self.state.now.set(timer.deadline);
            }
            (timer.task)();
        }
        self.state.now.set(target);
    }

    /// Clock position.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.state.now.get()
    }

    /// Number of attached resize listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.listeners.borrow().len()
    }

    /// Number of timers not yet fired or cancelled.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.state.timers.borrow().len()
    }
}

impl WidthSource for SimHost {
    fn width(&self) -> u16 {
        self.state.width.get()
    }
}

impl ResizeSignal for SimHost {
    fn add_listener(&self, listener: Rc<dyn Fn()>) -> SignalToken {
        let token = SignalToken::fresh();
        self.state.listeners.borrow_mut().push((token, listener));
        token
    }

    fn remove_listener(&self, token: SignalToken) {
        self.state.listeners.borrow_mut().retain(|(t, _)| *t != token);
    }
}

impl Scheduler for SimHost {
    fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
        let id = TimerId::fresh();
        let seq = self.state.next_seq.get();
        self.state.next_seq.set(seq + 1);
        self.state.timers.borrow_mut().push(SimTimer {
            id,
            deadline: self.state.now.get() + delay,
            seq,
            task,
        });
        id
    }

    fn cancel(&self, timer: TimerId) {
        self.state.timers.borrow_mut().retain(|t| t.id != timer);
    }
}

impl std::fmt::Debug for SimHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimHost")
            .field("width", &self.state.width.get())
            .field("now", &self.state.now.get())
            .field("listeners", &self.listener_count())
            .field("timers", &self.pending_timers())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn push_at(
        sim: &SimHost,
        log: &Rc<RefCell<Vec<(&'static str, Duration)>>>,
        tag: &'static str,
    ) -> Box<dyn FnOnce()> {
        let log = Rc::clone(log);
        let sim = sim.clone();
        Box::new(move || log.borrow_mut().push((tag, sim.now())))
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let sim = SimHost::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        sim.schedule_after(Duration::from_millis(30), push_at(&sim, &log, "late"));
        sim.schedule_after(Duration::from_millis(10), push_at(&sim, &log, "early"));

        sim.advance(Duration::from_millis(50));
        assert_eq!(
            *log.borrow(),
            vec![
                ("early", Duration::from_millis(10)),
                ("late", Duration::from_millis(30)),
            ]
        );
        assert_eq!(sim.now(), Duration::from_millis(50));
    }

    #[test]
    fn equal_deadlines_fire_in_scheduling_order() {
        let sim = SimHost::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        sim.schedule_after(Duration::from_millis(10), push_at(&sim, &log, "first"));
        sim.schedule_after(Duration::from_millis(10), push_at(&sim, &log, "second"));

        sim.advance(Duration::from_millis(10));
        let tags: Vec<&str> = log.borrow().iter().map(|(t, _)| *t).collect();
        assert_eq!(tags, vec!["first", "second"]);
    }

    #[test]
    fn advance_stops_short_of_future_timers() {
        let sim = SimHost::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        sim.schedule_after(Duration::from_millis(100), push_at(&sim, &log, "far"));
        sim.advance(Duration::from_millis(99));
        assert!(log.borrow().is_empty());
        assert_eq!(sim.pending_timers(), 1);

        sim.advance(Duration::from_millis(1));
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(sim.pending_timers(), 0);
    }

    #[test]
    fn cancel_removes_a_pending_timer() {
        let sim = SimHost::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let id = sim.schedule_after(Duration::from_millis(10), push_at(&sim, &log, "x"));
        sim.cancel(id);
        sim.advance(Duration::from_secs(1));
        assert!(log.borrow().is_empty());

        // Cancelling again, or cancelling a spent id, is a no-op.
        sim.cancel(id);
    }

    #[test]
    fn tasks_scheduled_during_advance_can_fire_in_the_same_call() {
        let sim = SimHost::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        {
            let sim2 = sim.clone();
            let log2 = Rc::clone(&log);
            sim.schedule_after(
                Duration::from_millis(10),
                Box::new(move || {
                    log2.borrow_mut().push(("outer", sim2.now()));
                    let log3 = Rc::clone(&log2);
                    let sim3 = sim2.clone();
                    sim2.schedule_after(
                        Duration::from_millis(5),
                        Box::new(move || log3.borrow_mut().push(("inner", sim3.now()))),
                    );
                }),
            );
        }

        sim.advance(Duration::from_millis(20));
        assert_eq!(
            *log.borrow(),
            vec![
                ("outer", Duration::from_millis(10)),
                ("inner", Duration::from_millis(15)),
            ]
        );
    }

    #[test]
    fn clock_is_monotonic_across_advances() {
        let sim = SimHost::new(0);
        sim.advance(Duration::from_millis(5));
        sim.advance(Duration::ZERO);
        sim.advance(Duration::from_millis(3));
        assert_eq!(sim.now(), Duration::from_millis(8));
    }

    #[test]
    fn resize_notifies_every_listener() {
        let sim = SimHost::new(0);
        let hits = Rc::new(Cell::new(0u32));

        for _ in 0..3 {
            let hits = Rc::clone(&hits);
            sim.add_listener(Rc::new(move || hits.set(hits.get() + 1)));
        }
        sim.resize();
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn remove_listener_detaches() {
        let sim = SimHost::new(0);
        let hits = Rc::new(Cell::new(0u32));

        let token = {
            let hits = Rc::clone(&hits);
            sim.add_listener(Rc::new(move || hits.set(hits.get() + 1)))
        };
        sim.resize();
        sim.remove_listener(token);
        sim.resize();
        assert_eq!(hits.get(), 1);
        assert_eq!(sim.listener_count(), 0);

        // Unknown token: no-op.
        sim.remove_listener(token);
    }

    #[test]
    fn listener_may_detach_itself_during_resize() {
        let sim = SimHost::new(0);
        let hits = Rc::new(Cell::new(0u32));
        let token_slot: Rc<Cell<Option<SignalToken>>> = Rc::new(Cell::new(None));

        let token = {
            let sim2 = sim.clone();
            let hits = Rc::clone(&hits);
            let slot = Rc::clone(&token_slot);
            sim.add_listener(Rc::new(move || {
                hits.set(hits.get() + 1);
                if let Some(token) = slot.get() {
                    sim2.remove_listener(token);
                }
            }))
        };
        token_slot.set(Some(token));

        sim.resize();
        sim.resize();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn resize_to_updates_width_before_notifying() {
        let sim = SimHost::new(10);
        let seen = Rc::new(Cell::new(0u16));
        {
            let sim2 = sim.clone();
            let seen = Rc::clone(&seen);
            sim.add_listener(Rc::new(move || seen.set(sim2.width())));
        }
        sim.resize_to(120);
        assert_eq!(seen.get(), 120);
    }

    #[test]
    fn debug_format() {
        let sim = SimHost::new(42);
        let dbg = format!("{sim:?}");
        assert!(dbg.contains("SimHost"));
        assert!(dbg.contains("42"));
    }
}
