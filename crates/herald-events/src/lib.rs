//! Live-update core for the Herald platform.
//!
//! Turns raw data-store mutations into lifecycle events and fans them out to
//! live subscribers.
//!
//! # Pieces
//!
//! | Item | Role |
//! |------|------|
//! | [`derive_post`], [`derive_comment`] | Map a `(before, after)` pair to at most one event |
//! | [`Bus`] | Topic-keyed publish/subscribe registry |
//! | [`Subscription`] | One subscriber's ordered, cancellable queue |
//! | [`open_subscription`] | Admission check run before a channel is allocated |
//!
//! # Usage
//!
//! ```rust,ignore
//! use herald_events::{derive_post, Bus};
//! use herald_types::Topic;
//!
//! let bus = Bus::new();
//! let mut sub = bus.subscribe(Topic::Posts);
//!
//! if let Some(event) = derive_post(change) {
//!     bus.publish(event);
//! }
//! let next = sub.recv().await;
//! ```

mod bus;
mod deriver;
mod gate;

pub use bus::{Bus, Subscription};
pub use deriver::{derive_comment, derive_post, derive_scoped, derive_visible};
pub use gate::{open_subscription, GateError, ParentLookup};

#[cfg(test)]
mod tests;
