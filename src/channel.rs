//! The broker between one publisher and any number of subscribers.
//!
//! A [`Channel`] owns the registration list. Subscribers are referenced
//! weakly, and each registration is represented by a [`Subscription`] that
//! references the channel weakly. Neither side keeps the other alive, so the
//! publisher and its subscribers can be dropped in any order.
//!
//! # Example
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use subchannel::prelude::*;
//!
//! struct Display {
//!   frames: RefCell<Vec<u32>>,
//! }
//!
//! impl Subscriber<u32> for Display {
//!   fn on_item(&self, frame: u32) { self.frames.borrow_mut().push(frame); }
//! }
//!
//! let camera = Channel::<u32>::new();
//! let display = Rc::new(Display { frames: RefCell::new(vec![]) });
//! let subscription = camera.add_subscriber(display.clone());
//!
//! camera.publish(1).unwrap();
//! drop(subscription);
//! camera.publish(2).unwrap();
//!
//! assert_eq!(*display.frames.borrow(), vec![1]);
//! ```
//!
//! # Delivery rules
//!
//! - Items reach subscribers in registration order, once per `publish`.
//! - A subscription released during a fan-out (by any callback) stops the
//!   delivery to that subscriber immediately, including the in-progress item
//!   if its turn has not come yet.
//! - A subscriber added during a fan-out only receives later items.
//! - Calling `publish` on a channel from inside its own fan-out is rejected
//!   with [`ChannelError::Reentrant`].
//!
//! # Duplicate registrations
//!
//! `add_subscriber` accepts the same subscriber more than once and creates
//! one entry per call. `remove_subscriber` removes the *first* matching entry
//! in registration order. Use `try_add_subscriber` to refuse duplicates.

mod channel_core;
mod config;
mod lazy;
mod registrations;

use std::{
  fmt::{Debug, Formatter},
  rc::Rc,
};

use channel_core::ChannelCore;
pub use config::{ChannelBuilder, ChannelConfig};
pub use lazy::LazyChannel;
use registrations::Target;
use tracing::warn;

use crate::{
  error::ChannelError,
  publisher::Publisher,
  subscriber::{FnSubscriber, Subscriber},
  subscription::{Subscription, SubscriptionLike},
};

/// Publisher-side handle to a channel.
///
/// Cloning the handle shares the same channel. The channel is dropped with the
/// last handle; outstanding subscriptions then release as no-ops.
pub struct Channel<Item> {
  core: Rc<ChannelCore<Item>>,
}

impl<Item: 'static> Channel<Item> {
  pub fn new() -> Self { Self::with_config(ChannelConfig::default()) }

  pub fn builder() -> ChannelBuilder<Item> { ChannelBuilder::new() }

  pub fn with_config(config: ChannelConfig) -> Self {
    Self { core: Rc::new(ChannelCore::new(config)) }
  }

  /// Register a subscriber owned elsewhere.
  ///
  /// The channel keeps only a `Weak` reference. If the subscriber is dropped
  /// while still registered, it is skipped and pruned on the next publish.
  pub fn add_subscriber(&self, subscriber: Rc<dyn Subscriber<Item>>) -> Subscription {
    self.core.register(Target::Observed(Rc::downgrade(&subscriber)))
  }

  /// Like [`add_subscriber`](Self::add_subscriber), but refuses a subscriber
  /// that is already registered with this channel.
  pub fn try_add_subscriber(
    &self,
    subscriber: Rc<dyn Subscriber<Item>>,
  ) -> Result<Subscription, ChannelError> {
    self.core.try_register(Target::Observed(Rc::downgrade(&subscriber)))
  }

  /// Register a closure. The channel owns it until the subscription is
  /// released.
  pub fn subscribe<F>(&self, f: F) -> Subscription
  where
    F: FnMut(Item) + 'static,
  {
    self.core.register(Target::Owned(Rc::new(FnSubscriber::new(f))))
  }

  /// Remove the first registration of `subscriber`. Returns `false` when it
  /// was not registered.
  ///
  /// The subscription handle of the removed entry stays valid and releases
  /// as a no-op.
  pub fn remove_subscriber(&self, subscriber: &dyn Subscriber<Item>) -> bool {
    self.core.remove_by_addr(subscriber as *const _ as *const ())
  }

  #[inline]
  pub fn name(&self) -> &str { self.core.name() }

  /// Get the number of current subscribers.
  #[inline]
  pub fn subscriber_count(&self) -> usize { self.core.subscriber_count() }

  /// Check if there are no subscribers.
  #[inline]
  pub fn is_empty(&self) -> bool { self.core.is_empty() }

  /// Check whether both handles share one channel.
  #[inline]
  pub fn same_channel(&self, other: &Self) -> bool { Rc::ptr_eq(&self.core, &other.core) }

  /// Stop receiving from the upstream publisher set by
  /// [`connect`](Self::connect). No-op when not connected.
  pub fn disconnect(&self) {
    let mut previous = self.core.set_upstream(None);
    previous.unsubscribe();
  }

  /// `true` while connected to an upstream publisher that still exists.
  pub fn is_connected(&self) -> bool { self.core.upstream_live() == Some(true) }
}

impl<Item: Clone + 'static> Channel<Item> {
  /// Deliver `item` to every subscriber, in registration order.
  ///
  /// Returns how many subscribers received it. With no subscribers this
  /// returns `Ok(0)` without allocating.
  pub fn publish(&self, item: Item) -> Result<usize, ChannelError> { self.core.publish(item) }

  /// Receive items from `upstream` and forward them to this channel's
  /// subscribers.
  ///
  /// The upstream side only holds a weak reference to this channel. A
  /// previous upstream link is released.
  pub fn connect(&self, upstream: &dyn Publisher<Item>) {
    let me: Rc<dyn Subscriber<Item>> = self.core.clone();
    let link = upstream.add_subscriber(me);
    let mut previous = self.core.set_upstream(Some(link));
    previous.unsubscribe();
  }
}

impl<Item: 'static> Default for Channel<Item> {
  fn default() -> Self { Self::new() }
}

impl<Item> Clone for Channel<Item> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item> Debug for Channel<Item> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Channel")
      .field("name", &self.core.name())
      .field("subscribers", &self.core.subscriber_count())
      .finish()
  }
}

impl<Item: 'static> Publisher<Item> for Channel<Item> {
  fn add_subscriber(&self, subscriber: Rc<dyn Subscriber<Item>>) -> Subscription {
    Channel::add_subscriber(self, subscriber)
  }

  fn remove_subscriber(&self, subscriber: &dyn Subscriber<Item>) -> bool {
    Channel::remove_subscriber(self, subscriber)
  }
}

impl<Item: Clone + 'static> Subscriber<Item> for Channel<Item> {
  fn on_item(&self, item: Item) {
    if let Err(err) = self.publish(item) {
      warn!(channel = %self.name(), label = err.as_label(), %err, "item dropped");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::{Cell, RefCell};

  use super::*;

  #[derive(Default)]
  struct Recorder {
    items: RefCell<Vec<i32>>,
  }

  impl Subscriber<i32> for Recorder {
    fn on_item(&self, item: i32) { self.items.borrow_mut().push(item); }
  }

  #[test]
  fn smoke() {
    let ch = Channel::<i32>::new();
    let rec = Rc::new(Recorder::default());
    let _sub = ch.add_subscriber(rec.clone());
    assert_eq!(ch.publish(2), Ok(1));
    assert_eq!(ch.subscriber_count(), 1);
    assert_eq!(*rec.items.borrow(), vec![2]);
  }

  #[test]
  fn closure_subscription() {
    let seen = Rc::new(Cell::new(0));
    let ch = Channel::<i32>::new();
    let c_seen = seen.clone();
    let sub = ch.subscribe(move |v: i32| c_seen.set(c_seen.get() + v));

    ch.publish(3).unwrap();
    ch.publish(4).unwrap();
    drop(sub);
    ch.publish(100).unwrap();

    assert_eq!(seen.get(), 7);
    assert!(ch.is_empty());
  }

  #[test]
  fn duplicates_allowed_and_removed_first_match() {
    let ch = Channel::<i32>::new();
    let rec = Rc::new(Recorder::default());
    let first = ch.add_subscriber(rec.clone());
    let second = ch.add_subscriber(rec.clone());

    assert_eq!(ch.publish(1), Ok(2));
    assert!(ch.remove_subscriber(&*rec));
    assert!(!first.is_live());
    assert!(second.is_live());
    assert_eq!(ch.publish(2), Ok(1));
    assert!(ch.remove_subscriber(&*rec));
    assert!(!ch.remove_subscriber(&*rec));
    assert_eq!(*rec.items.borrow(), vec![1, 1, 2]);
  }

  #[test]
  fn try_add_rejects_duplicates() {
    let ch: Channel<i32> = Channel::builder().name("dedupe").build();
    let rec = Rc::new(Recorder::default());
    let _sub = ch.try_add_subscriber(rec.clone()).unwrap();
    let err = ch.try_add_subscriber(rec.clone()).unwrap_err();
    assert_eq!(err, ChannelError::AlreadySubscribed { channel: "dedupe".into() });
    assert_eq!(ch.subscriber_count(), 1);
  }

  #[test]
  fn clones_share_the_channel() {
    let a = Channel::<i32>::new();
    let b = a.clone();
    assert!(a.same_channel(&b));
    assert!(!a.same_channel(&Channel::new()));
    let _sub = b.subscribe(|_| {});
    assert_eq!(a.subscriber_count(), 1);
  }

  #[test]
  fn debug_output() {
    let ch: Channel<i32> = Channel::builder().name("cam").build();
    let _sub = ch.subscribe(|_| {});
    assert_eq!(format!("{ch:?}"), r#"Channel { name: "cam", subscribers: 1 }"#);
  }

  #[test]
  fn connect_forwards_and_disconnect_stops() {
    let upstream = Channel::<i32>::new();
    let downstream = Channel::<i32>::new();
    let rec = Rc::new(Recorder::default());
    let _sub = downstream.add_subscriber(rec.clone());

    downstream.connect(&upstream);
    assert!(downstream.is_connected());
    assert_eq!(upstream.publish(1), Ok(1));

    downstream.disconnect();
    assert!(!downstream.is_connected());
    assert!(upstream.is_empty());
    assert_eq!(upstream.publish(2), Ok(0));
    assert_eq!(*rec.items.borrow(), vec![1]);
  }

  #[test]
  fn reconnect_releases_previous_upstream() {
    let first = Channel::<i32>::new();
    let second = Channel::<i32>::new();
    let downstream = Channel::<i32>::new();
    downstream.connect(&first);
    downstream.connect(&second);
    assert!(first.is_empty());
    assert_eq!(second.subscriber_count(), 1);
  }

  #[test]
  fn dropped_downstream_is_pruned_from_upstream() {
    let upstream = Channel::<i32>::new();
    {
      let downstream = Channel::<i32>::new();
      downstream.connect(&upstream);
      assert_eq!(upstream.subscriber_count(), 1);
    }
    // Dropping the downstream channel released its upstream link.
    assert!(upstream.is_empty());
  }
}
