//! Subscription handles.
//!
//! A [`Subscription`] is the scoped proof that a subscriber is registered with a
//! channel. Releasing it (explicitly or by dropping it) removes the
//! registration if the channel still exists, and does nothing otherwise.

use std::{
  fmt::{Debug, Formatter},
  rc::Weak,
};

use smallvec::SmallVec;
use tracing::trace;

/// Common interface of everything that can be cancelled.
pub trait SubscriptionLike {
  /// Release the registration. Calling it more than once is a no-op.
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;
}

/// The side of a channel a subscription talks back to.
///
/// Type-erased over the item type so a `Subscription` can be stored without
/// generics.
pub(crate) trait Registry {
  /// Remove the entry registered under `key`. Returns whether one was removed.
  fn unregister(&self, key: usize) -> bool;

  fn is_registered(&self, key: usize) -> bool;
}

/// State of a subscription.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SubscriptionState {
  /// Entered on construction: the entry was appended to the channel.
  Registered,
  /// Released by `unsubscribe` or drop. Terminal.
  Released,
}

/// Identifies one registration within its channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriptionId(pub(crate) usize);

/// Handle for an active registration.
///
/// Holds a `Weak` reference to the channel, so it never keeps the channel
/// alive and never touches it once it is gone.
///
/// Not `Clone`: exactly one handle owns a registration. Moving the handle moves
/// that ownership.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
  registry: Weak<dyn Registry>,
  key: usize,
  state: SubscriptionState,
}

impl Subscription {
  pub(crate) fn new(registry: Weak<dyn Registry>, key: usize) -> Self {
    Self { registry, key, state: SubscriptionState::Registered }
  }

  #[inline]
  pub fn id(&self) -> SubscriptionId { SubscriptionId(self.key) }

  #[inline]
  pub fn state(&self) -> SubscriptionState { self.state }

  /// Returns `true` while the channel exists and still holds this entry.
  ///
  /// An entry can vanish without the handle being released when the channel
  /// is dropped or when it prunes a subscriber that was dropped first.
  pub fn is_live(&self) -> bool {
    self.state == SubscriptionState::Registered
      && self
        .registry
        .upgrade()
        .is_some_and(|registry| registry.is_registered(self.key))
  }

  /// Still registered, but the channel it was registered with is gone.
  pub(crate) fn is_orphaned(&self) -> bool {
    self.state == SubscriptionState::Registered && self.registry.strong_count() == 0
  }
}

impl SubscriptionLike for Subscription {
  fn unsubscribe(&mut self) {
    if self.state == SubscriptionState::Released {
      return;
    }
    self.state = SubscriptionState::Released;
    match self.registry.upgrade() {
      Some(registry) => {
        registry.unregister(self.key);
      }
      None => trace!(key = self.key, "channel already dropped; release is a no-op"),
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.state == SubscriptionState::Released }
}

impl Drop for Subscription {
  fn drop(&mut self) { self.unsubscribe(); }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("key", &self.key)
      .field("state", &self.state)
      .finish()
  }
}

impl<T: SubscriptionLike> SubscriptionLike for Option<T> {
  fn unsubscribe(&mut self) {
    if let Some(inner) = self {
      inner.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.as_ref().is_none_or(SubscriptionLike::is_closed) }
}

// ============================================================================
// SubscriptionSet
// ============================================================================

/// Owns several subscriptions and releases them together.
///
/// Typical use is a subscriber registered with more than one channel that
/// embeds a single set as its teardown member.
#[derive(Default)]
#[must_use = "dropping a SubscriptionSet immediately unsubscribes all members"]
pub struct SubscriptionSet {
  closed: bool,
  teardown: SmallVec<[Subscription; 2]>,
}

impl SubscriptionSet {
  pub fn new() -> Self { Self::default() }

  /// Take ownership of `subscription`.
  ///
  /// Adding to a closed set releases the subscription right away.
  pub fn add(&mut self, mut subscription: Subscription) {
    if self.closed {
      subscription.unsubscribe();
    } else {
      self.teardown.retain(|s| !s.is_closed());
      self.teardown.push(subscription);
    }
  }

  /// Number of members, released or not.
  #[inline]
  pub fn len(&self) -> usize { self.teardown.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.teardown.is_empty() }
}

impl SubscriptionLike for SubscriptionSet {
  fn unsubscribe(&mut self) {
    if !self.closed {
      self.closed = true;
      for s in &mut self.teardown {
        s.unsubscribe();
      }
    }
  }

  #[inline(always)]
  fn is_closed(&self) -> bool { self.closed }
}

impl Drop for SubscriptionSet {
  fn drop(&mut self) { self.unsubscribe(); }
}

impl Debug for SubscriptionSet {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SubscriptionSet")
      .field("closed", &self.closed)
      .field("teardown_count", &self.teardown.len())
      .finish()
  }
}
