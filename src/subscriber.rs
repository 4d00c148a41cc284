//! Subscriber trait and implementations
//!
//! A subscriber is the consuming end of a channel. It receives each published
//! item synchronously, on the publisher's thread, and must return promptly.

use std::cell::RefCell;

use tracing::warn;

// ============================================================================
// Subscriber Trait
// ============================================================================

/// Subscriber trait: the consumer of items pushed through a channel.
///
/// `on_item` takes `&self` so a channel can reach its subscribers through
/// non-owning `Weak` references. Implementers that keep state use interior
/// mutability (`Cell`, `RefCell`).
///
/// Channels identify a subscriber by the address of the value itself, which
/// is why `remove_subscriber` takes the subscriber (`&*rc`), not its `Rc`.
pub trait Subscriber<Item> {
  /// Receive the next item. Must not block or suspend.
  fn on_item(&self, item: Item);
}

// ============================================================================
// FnSubscriber - Closure adapter
// ============================================================================

/// Adapter turning an `FnMut(Item)` closure into a [`Subscriber`].
///
/// Used by [`Channel::subscribe`](crate::channel::Channel::subscribe), where the
/// channel owns the closure for as long as the returned subscription is
/// registered.
pub struct FnSubscriber<F>(RefCell<F>);

impl<F> FnSubscriber<F> {
  pub fn new(f: F) -> Self { Self(RefCell::new(f)) }
}

impl<F, Item> Subscriber<Item> for FnSubscriber<F>
where
  F: FnMut(Item),
{
  fn on_item(&self, item: Item) {
    match self.0.try_borrow_mut() {
      Ok(mut f) => (&mut *f)(item),
      Err(_) => warn!("closure subscriber re-entered from its own callback; item dropped"),
    }
  }
}
