//! Publisher trait
//!
//! The registration side of a broker. Anything a subscriber can attach to
//! implements it, which lets a [`Channel`](crate::channel::Channel) connect to
//! any upstream source without knowing its concrete type.

use std::rc::Rc;

use crate::{subscriber::Subscriber, subscription::Subscription};

/// Registration capability of a broker.
pub trait Publisher<Item> {
  /// Register `subscriber` and return the handle that owns the registration.
  ///
  /// The publisher must not keep `subscriber` alive; it may only hold it
  /// weakly.
  fn add_subscriber(&self, subscriber: Rc<dyn Subscriber<Item>>) -> Subscription;

  /// Remove a registration of `subscriber`. Removing a subscriber that is not
  /// registered is a no-op and returns `false`.
  fn remove_subscriber(&self, subscriber: &dyn Subscriber<Item>) -> bool;
}
