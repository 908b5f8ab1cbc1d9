#![forbid(unsafe_code)]

//! The event hub: named channels, ordered handlers, mutation-safe dispatch.
//!
//! # Design
//!
//! [`EventHub<P>`] is a cloneable handle over shared single-threaded state
//! (`Rc<RefCell<..>>`). Each event name owns an ordered list of handler
//! entries; [`trigger`](EventHub::trigger) dispatches to a snapshot of that
//! list so a handler may subscribe or unsubscribe anything, itself included,
//! without invalidating the traversal. Removal tombstones the entry, which the
//! in-flight snapshot observes, so an entry removed mid-dispatch before its
//! turn is skipped rather than invoked or crashed on.
//!
//! Handlers are `Fn(&str, &P)`: every handler receives the event name along
//! with the payload. Ordinary subscribers are free to ignore the name; it is
//! how subscribers on the reserved [`ANY_EVENT`] channel learn which event
//! fired.
//!
//! # Invariants
//!
//! 1. Dispatch order equals subscription order within a channel.
//! 2. An entry removed during dispatch is never invoked after its removal,
//!    and entries before/after it that remain live are delivered normally.
//! 3. A handler subscribed during dispatch is first invoked on the next
//!    `trigger`, never the current one.
//! 4. `trigger` and `off` on unknown names or an empty hub are no-ops.
//! 5. Filtered removal rebuilds a channel by extracting the list and
//!    re-inserting only the survivors, preserving their relative order.
//!
//! # Failure Modes
//!
//! - A handler that panics unwinds out of `trigger`; no hub borrow is held
//!   across handler invocation, so the hub itself stays usable.
//! - Re-entrant `trigger` from inside a handler is permitted and dispatches
//!   against its own snapshot.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

/// Reserved channel name receiving every triggered event.
///
/// Subscribers on this channel are invoked after the event's own subscribers,
/// with the originating event name as the first callback argument.
pub const ANY_EVENT: &str = "all";

/// Identity of a single `on`/`once` registration.
///
/// One id covers every event name named in the registering call, so removing
/// by id detaches the whole registration at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Opaque owner tag for bulk removal of related registrations.
///
/// Stands in for "subscriber identity": a consumer mints one id, registers its
/// handlers under it, and tears them all down with a single owner-filtered
/// [`off`](EventHub::off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Mint a process-unique owner id.
    #[must_use]
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

type Callback<P> = Rc<dyn Fn(&str, &P)>;

/// One (event name, registration) pair.
///
/// The callback `Rc` is shared across every name of the registration; the
/// liveness flag is per entry so a single name can be detached while the
/// others stay subscribed.
struct HandlerEntry<P> {
    id: HandlerId,
    owner: Option<OwnerId>,
    live: Cell<bool>,
    once: bool,
    call: Callback<P>,
}

struct HubInner<P> {
    channels: AHashMap<String, Vec<Rc<HandlerEntry<P>>>>,
    next_id: u64,
}

/// Named-event publish/subscribe hub.
///
/// Cloning an `EventHub` creates a new handle to the **same** channel state.
pub struct EventHub<P> {
    inner: Rc<RefCell<HubInner<P>>>,
}

impl<P> Clone for EventHub<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P> std::fmt::Debug for EventHub<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        let live: usize = inner
            .channels
            .values()
            .flatten()
            .filter(|e| e.live.get())
            .count();
        f.debug_struct("EventHub")
            .field("channels", &inner.channels.len())
            .field("handlers", &live)
            .finish()
    }
}

impl<P: 'static> Default for EventHub<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> EventHub<P> {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(HubInner {
                channels: AHashMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Subscribe `callback` to one or more space-separated event names.
    ///
    /// Subscription order is dispatch order. The same callback may be
    /// registered repeatedly (each registration fires). A whitespace-only
    /// `events` string subscribes nothing; the returned id then matches no
    /// entry and removing by it is a no-op.
    pub fn on(&self, events: &str, callback: impl Fn(&str, &P) + 'static) -> HandlerId {
        self.register(events, None, false, Rc::new(callback))
    }

    /// Subscribe under an [`OwnerId`] so the registration can later be removed
    /// together with everything else the owner registered.
    pub fn on_owned(
        &self,
        events: &str,
        owner: OwnerId,
        callback: impl Fn(&str, &P) + 'static,
    ) -> HandlerId {
        self.register(events, Some(owner), false, Rc::new(callback))
    }

    /// Subscribe for a single delivery per event name.
    ///
    /// The entry is deactivated before its callback runs, so a re-entrant
    /// trigger from inside the callback cannot fire it twice.
    pub fn once(&self, events: &str, callback: impl Fn(&str, &P) + 'static) -> HandlerId {
        self.register(events, None, true, Rc::new(callback))
    }

    /// Subscribe with an RAII guard that unsubscribes on drop.
    pub fn subscribe(&self, events: &str, callback: impl Fn(&str, &P) + 'static) -> Subscription {
        let id = self.on(events, callback);
        let weak = self.downgrade();
        Subscription {
            id,
            cancel: Some(Box::new(move || {
                if let Some(hub) = weak.upgrade() {
                    hub.off(None, Some(id), None);
                }
            })),
        }
    }

    fn register(
        &self,
        events: &str,
        owner: Option<OwnerId>,
        once: bool,
        call: Callback<P>,
    ) -> HandlerId {
        let mut inner = self.inner.borrow_mut();
        let id = HandlerId(inner.next_id);
        inner.next_id += 1;
        for name in events.split_whitespace() {
            let entry = Rc::new(HandlerEntry {
                id,
                owner,
                live: Cell::new(true),
                once,
                call: Rc::clone(&call),
            });
            inner
                .channels
                .entry(name.to_string())
                .or_default()
                .push(entry);
        }
        id
    }

    /// Remove matching registrations.
    ///
    /// Which entries match depends on which arguments are given:
    ///
    /// - all `None`: every registration on every channel is removed;
    /// - `events` alone: those channels are deleted wholesale;
    /// - `handler` and/or `owner` (with or without `events`): each targeted
    ///   channel is taken out of the map, matching entries are tombstoned,
    ///   and only the survivors are re-inserted, preserving their order.
    ///
    /// Removal is visible to an in-flight dispatch: tombstoned entries that
    /// have not yet had their turn are skipped. Unknown names and filters
    /// matching nothing are silent no-ops.
    pub fn off(&self, events: Option<&str>, handler: Option<HandlerId>, owner: Option<OwnerId>) {
        let mut inner = self.inner.borrow_mut();
        match (events, handler, owner) {
            (None, None, None) => {
                for (_, entries) in inner.channels.drain() {
                    for entry in entries {
                        entry.live.set(false);
                    }
                }
            }
            (Some(names), None, None) => {
                for name in names.split_whitespace() {
                    if let Some(entries) = inner.channels.remove(name) {
                        for entry in entries {
                            entry.live.set(false);
                        }
                    }
                }
            }
            _ => {
                let targets: Vec<String> = match events {
                    Some(names) => names.split_whitespace().map(str::to_string).collect(),
                    None => inner.channels.keys().cloned().collect(),
                };
                for name in targets {
                    let Some(entries) = inner.channels.remove(&name) else {
                        continue;
                    };
                    let mut kept = Vec::with_capacity(entries.len());
                    for entry in entries {
                        let id_match = handler.is_none_or(|h| entry.id == h);
                        let owner_match = owner.is_none_or(|o| entry.owner == Some(o));
                        if id_match && owner_match {
                            entry.live.set(false);
                        } else {
                            kept.push(entry);
                        }
                    }
                    if !kept.is_empty() {
                        inner.channels.insert(name, kept);
                    }
                }
            }
        }
    }

    /// Remove every registration. Equivalent to `off(None, None, None)`.
    pub fn clear(&self) {
        self.off(None, None, None);
    }

    /// Invoke, in subscription order, every live handler for `event`, then
    /// every live handler on the [`ANY_EVENT`] channel.
    ///
    /// Triggering `ANY_EVENT` itself dispatches the catch-all channel exactly
    /// once. Triggering a name with no subscribers is a no-op.
    pub fn trigger(&self, event: &str, payload: &P) {
        self.dispatch(event, event, payload);
        if event != ANY_EVENT {
            self.dispatch(ANY_EVENT, event, payload);
        }
    }

    fn dispatch(&self, channel: &str, event: &str, payload: &P) {
        let snapshot = {
            let inner = self.inner.borrow();
            inner.channels.get(channel).cloned()
        };
        let Some(snapshot) = snapshot else {
            return;
        };
        #[cfg(feature = "tracing")]
        Self::log_dispatch(channel, event, snapshot.len());

        let mut spent_once = false;
        for entry in &snapshot {
            if !entry.live.get() {
                continue;
            }
            if entry.once {
                entry.live.set(false);
                spent_once = true;
            }
            (entry.call)(event, payload);
        }

        // Filtered `off` rebuilds the channel itself, so spent once-entries
        // are the only tombstones that can remain in the live map.
        if spent_once {
            let mut inner = self.inner.borrow_mut();
            if let Some(entries) = inner.channels.get_mut(channel) {
                entries.retain(|e| e.live.get());
                if entries.is_empty() {
                    inner.channels.remove(channel);
                }
            }
        }
    }

    /// Number of live registrations on `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .channels
            .get(event)
            .map_or(0, |entries| {
                entries.iter().filter(|e| e.live.get()).count()
            })
    }

    /// Whether `event` has at least one live registration.
    #[must_use]
    pub fn has_handlers(&self, event: &str) -> bool {
        self.handler_count(event) > 0
    }

    /// Whether the hub has no live registrations at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self
            .inner
            .borrow()
            .channels
            .values()
            .flatten()
            .any(|e| e.live.get())
    }

    /// Downgrade to a non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakEventHub<P> {
        WeakEventHub {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[cfg(feature = "tracing")]
    fn log_dispatch(channel: &str, event: &str, handlers: usize) {
        tracing::trace!(message = "hub.dispatch", channel, event, handlers);
    }
}

/// Non-owning handle to an [`EventHub`].
///
/// Lets long-lived consumers reference a hub without keeping its channel
/// state alive; `upgrade` returns `None` once every owning handle is gone.
pub struct WeakEventHub<P> {
    inner: Weak<RefCell<HubInner<P>>>,
}

impl<P> Clone for WeakEventHub<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<P> std::fmt::Debug for WeakEventHub<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakEventHub")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<P> WeakEventHub<P> {
    /// Recover an owning handle if the hub is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<EventHub<P>> {
        self.inner.upgrade().map(|inner| EventHub { inner })
    }
}

/// RAII guard for a single registration; unsubscribes on drop.
pub struct Subscription {
    id: HandlerId,
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Identity of the guarded registration.
    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Keep the registration alive for the rest of the hub's lifetime,
    /// consuming the guard without unsubscribing.
    pub fn forget(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
