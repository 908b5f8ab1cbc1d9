#![forbid(unsafe_code)]

//! Trailing-edge debounce over an injected [`Scheduler`].
//!
//! # Design
//!
//! [`Debounce`] wraps an action and a delay. Every [`poke`](Debounce::poke)
//! cancels the pending timer (if any) and schedules a fresh one, so the
//! action runs once, `delay` after the last poke of a burst. The pending slot
//! is cleared before the action runs, which lets the action itself poke again
//! and observe [`is_pending`](Debounce::is_pending) as `false`.
//!
//! # Invariants
//!
//! 1. At most one timer is pending at any time.
//! 2. A burst of pokes closer together than `delay` produces exactly one
//!    action run.
//! 3. After [`cancel`](Debounce::cancel) the action does not run until the
//!    next poke.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::host::{Scheduler, TimerId};

/// Trailing-edge debounced action.
///
/// Cloning shares the pending state: a poke through one handle is visible to
/// all clones.
#[derive(Clone)]
pub struct Debounce {
    scheduler: Rc<dyn Scheduler>,
    delay: Duration,
    action: Rc<dyn Fn()>,
    pending: Rc<Cell<Option<TimerId>>>,
}

impl Debounce {
    /// Wrap `action` so it runs `delay` after the last poke of a burst.
    pub fn new(scheduler: Rc<dyn Scheduler>, delay: Duration, action: impl Fn() + 'static) -> Self {
        Self {
            scheduler,
            delay,
            action: Rc::new(action),
            pending: Rc::new(Cell::new(None)),
        }
    }

    /// Restart the delay window. The action runs `delay` from now unless
    /// poked again first.
    pub fn poke(&self) {
        if let Some(timer) = self.pending.take() {
            self.scheduler.cancel(timer);
        }
        let pending = Rc::clone(&self.pending);
        let action = Rc::clone(&self.action);
        let timer = self.scheduler.schedule_after(
            self.delay,
            Box::new(move || {
                pending.set(None);
                action();
            }),
        );
        self.pending.set(Some(timer));
    }

    /// Drop the pending run, if any.
    pub fn cancel(&self) {
        if let Some(timer) = self.pending.take() {
            self.scheduler.cancel(timer);
        }
    }

    /// Run the action immediately if a run is pending, consuming it.
    /// Does nothing when idle.
    pub fn flush(&self) {
        if let Some(timer) = self.pending.take() {
            self.scheduler.cancel(timer);
            (self.action)();
        }
    }

    /// Whether a run is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    /// The configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl std::fmt::Debug for Debounce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounce")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::SimHost;

    const DELAY: Duration = Duration::from_millis(50);

    fn counting(sim: &SimHost) -> (Debounce, Rc<Cell<u32>>) {
        let hits = Rc::new(Cell::new(0u32));
        let hits_in = Rc::clone(&hits);
        let debounce = Debounce::new(
            Rc::new(sim.clone()),
            DELAY,
            move || hits_in.set(hits_in.get() + 1),
        );
        (debounce, hits)
    }

    #[test]
    fn fires_after_delay() {
        let sim = SimHost::new(0);
        let (debounce, hits) = counting(&sim);

        debounce.poke();
        assert!(debounce.is_pending());

        sim.advance(Duration::from_millis(49));
        assert_eq!(hits.get(), 0);

        sim.advance(Duration::from_millis(1));
        assert_eq!(hits.get(), 1);
        assert!(!debounce.is_pending());
    }

    #[test]
    fn poke_restarts_the_window() {
        let sim = SimHost::new(0);
        let (debounce, hits) = counting(&sim);

        debounce.poke();
        sim.advance(Duration::from_millis(30));
        debounce.poke();

        // 50ms from the first poke: nothing, the window was restarted.
        sim.advance(Duration::from_millis(20));
        assert_eq!(hits.get(), 0);

        sim.advance(Duration::from_millis(30));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn burst_coalesces_to_one_run() {
        let sim = SimHost::new(0);
        let (debounce, hits) = counting(&sim);

        for _ in 0..10 {
            debounce.poke();
            sim.advance(Duration::from_millis(1));
        }
        sim.advance(DELAY);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn cancel_drops_the_pending_run() {
        let sim = SimHost::new(0);
        let (debounce, hits) = counting(&sim);

        debounce.poke();
        debounce.cancel();
        assert!(!debounce.is_pending());
        assert_eq!(sim.pending_timers(), 0);

        sim.advance(Duration::from_secs(1));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn cancel_when_idle_is_noop() {
        let sim = SimHost::new(0);
        let (debounce, hits) = counting(&sim);
        debounce.cancel();
        sim.advance(Duration::from_secs(1));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn flush_runs_now_and_consumes() {
        let sim = SimHost::new(0);
        let (debounce, hits) = counting(&sim);

        debounce.poke();
        debounce.flush();
        assert_eq!(hits.get(), 1);
        assert!(!debounce.is_pending());
        assert_eq!(sim.pending_timers(), 0);

        // The consumed run does not fire again.
        sim.advance(Duration::from_secs(1));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn flush_when_idle_is_noop() {
        let sim = SimHost::new(0);
        let (debounce, hits) = counting(&sim);
        debounce.flush();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn action_may_poke_again() {
        let sim = SimHost::new(0);
        let hits = Rc::new(Cell::new(0u32));
        let slot: Rc<Cell<Option<Debounce>>> = Rc::new(Cell::new(None));

        let debounce = {
            let hits = Rc::clone(&hits);
            let slot = Rc::clone(&slot);
            Debounce::new(Rc::new(sim.clone()), DELAY, move || {
                hits.set(hits.get() + 1);
                // Re-arm once from inside the action.
                if hits.get() == 1 {
                    if let Some(debounce) = slot.take() {
                        assert!(!debounce.is_pending());
                        debounce.poke();
                    }
                }
            })
        };
        slot.set(Some(debounce.clone()));

        debounce.poke();
        sim.advance(DELAY);
        assert_eq!(hits.get(), 1);
        assert!(debounce.is_pending());

        sim.advance(DELAY);
        assert_eq!(hits.get(), 2);
        assert!(!debounce.is_pending());
    }

    #[test]
    fn zero_delay_fires_on_next_advance() {
        let sim = SimHost::new(0);
        let hits = Rc::new(Cell::new(0u32));
        let debounce = {
            let hits = Rc::clone(&hits);
            Debounce::new(Rc::new(sim.clone()), Duration::ZERO, move || {
                hits.set(hits.get() + 1);
            })
        };

        debounce.poke();
        assert_eq!(hits.get(), 0);
        sim.advance(Duration::ZERO);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn clones_share_pending_state() {
        let sim = SimHost::new(0);
        let (debounce, hits) = counting(&sim);
        let other = debounce.clone();

        debounce.poke();
        assert!(other.is_pending());
        other.cancel();
        assert!(!debounce.is_pending());

        sim.advance(Duration::from_secs(1));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn debug_format() {
        let sim = SimHost::new(0);
        let (debounce, _hits) = counting(&sim);
        let dbg = format!("{debounce:?}");
        assert!(dbg.contains("Debounce"));
        assert!(dbg.contains("50ms"));
    }
}
