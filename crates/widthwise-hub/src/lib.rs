#![forbid(unsafe_code)]

//! Named-event publish/subscribe with ordered, mutation-safe dispatch.
//!
//! The central type is [`EventHub`]: a single-threaded hub that maps event
//! names to ordered handler lists and tolerates structural mutation (a handler
//! unsubscribing itself or others) from inside a running dispatch.

pub mod hub;

pub use hub::{ANY_EVENT, EventHub, HandlerId, OwnerId, Subscription, WeakEventHub};
