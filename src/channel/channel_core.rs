use std::{
  borrow::Cow,
  cell::{Cell, RefCell},
  rc::{Rc, Weak},
};

use tracing::{debug, trace, warn};

use super::{
  config::ChannelConfig,
  registrations::{Registrations, Target},
};
use crate::{
  error::ChannelError,
  subscriber::Subscriber,
  subscription::{Registry, Subscription},
};

/// Shared state behind a [`Channel`](super::Channel).
///
/// Lives in one `Rc` allocation owned by the publisher-side handles.
/// Subscriptions and upstream publishers only hold `Weak` references to it.
///
/// # Borrow discipline
///
/// `registrations` is only ever borrowed for the duration of a single list
/// operation. No borrow is held while a subscriber runs or while a removed
/// entry is dropped, so callbacks are free to subscribe, unsubscribe or drop
/// other subscriptions of this channel.
pub(crate) struct ChannelCore<Item> {
  name: Cow<'static, str>,
  registrations: RefCell<Registrations<Item>>,
  publishing: Cell<bool>,
  upstream: RefCell<Option<Subscription>>,
}

/// Clears the in-progress flag even if a subscriber panics.
struct FanOutGuard<'a>(&'a Cell<bool>);

impl<'a> FanOutGuard<'a> {
  fn enter(flag: &'a Cell<bool>) -> Self {
    flag.set(true);
    Self(flag)
  }
}

impl Drop for FanOutGuard<'_> {
  fn drop(&mut self) { self.0.set(false); }
}

impl<Item> ChannelCore<Item> {
  pub(crate) fn new(config: ChannelConfig) -> Self {
    Self {
      name: config.name,
      registrations: RefCell::new(Registrations::with_capacity(config.capacity)),
      publishing: Cell::new(false),
      upstream: RefCell::new(None),
    }
  }

  #[inline]
  pub(crate) fn name(&self) -> &str { &self.name }

  #[inline]
  pub(crate) fn subscriber_count(&self) -> usize { self.registrations.borrow().len() }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool { self.registrations.borrow().is_empty() }

  pub(crate) fn is_registered_addr(&self, addr: *const ()) -> bool {
    self.registrations.borrow().contains_addr(addr)
  }

  /// Remove the first entry, in registration order, for the subscriber at
  /// `addr`.
  pub(crate) fn remove_by_addr(&self, addr: *const ()) -> bool {
    let removed = self.registrations.borrow_mut().remove_first_match(addr);
    match removed {
      Some((key, _target)) => {
        debug!(
          channel = %self.name,
          key,
          subscribers = self.subscriber_count(),
          "subscriber removed"
        );
        true
      }
      None => false,
    }
  }

  /// Replace the upstream link. The previous link, if any, is released after
  /// the borrow ends.
  pub(crate) fn set_upstream(&self, upstream: Option<Subscription>) -> Option<Subscription> {
    self.upstream.replace(upstream)
  }

  pub(crate) fn upstream_live(&self) -> Option<bool> {
    self.upstream.try_borrow().ok()?.as_ref().map(Subscription::is_live)
  }

  /// `true` only when connected and the upstream broker itself no longer
  /// exists. A link removed from a live upstream does not count.
  fn upstream_dropped(&self) -> bool {
    self
      .upstream
      .try_borrow()
      .is_ok_and(|upstream| upstream.as_ref().is_some_and(Subscription::is_orphaned))
  }

  fn reentrant(&self) -> ChannelError { ChannelError::Reentrant { channel: self.name.to_string() } }
}

impl<Item: 'static> ChannelCore<Item> {
  /// Append `target` and hand back the subscription that owns the entry.
  pub(crate) fn register(self: &Rc<Self>, target: Target<Item>) -> Subscription {
    let key = self.registrations.borrow_mut().add(target);
    debug!(
      channel = %self.name,
      key,
      subscribers = self.subscriber_count(),
      "subscriber registered"
    );
    let registry: Weak<dyn Registry> = Rc::downgrade(self) as Weak<dyn Registry>;
    Subscription::new(registry, key)
  }

  pub(crate) fn try_register(
    self: &Rc<Self>,
    target: Target<Item>,
  ) -> Result<Subscription, ChannelError> {
    if self.is_registered_addr(target.addr()) {
      return Err(ChannelError::AlreadySubscribed { channel: self.name.to_string() });
    }
    Ok(self.register(target))
  }
}

impl<Item: Clone> ChannelCore<Item> {
  /// Deliver `item` to every registered subscriber in registration order.
  ///
  /// Returns the number of subscribers reached. Entries released while the
  /// fan-out is running are skipped; entries added while it is running only
  /// see later items.
  pub(crate) fn publish(&self, item: Item) -> Result<usize, ChannelError> {
    if self.publishing.get() {
      return Err(self.reentrant());
    }
    if self.registrations.borrow().is_empty() {
      return Ok(0);
    }
    let _guard = FanOutGuard::enter(&self.publishing);

    let (snapshot, removals) = {
      let registrations = self.registrations.borrow();
      (registrations.snapshot(), registrations.removals())
    };
    let last = snapshot.len().saturating_sub(1);
    let mut item = Some(item);
    let mut delivered = 0;

    for (idx, (key, target)) in snapshot.into_iter().enumerate() {
      // Only rescan the list once something has been removed during this pass.
      let released = {
        let registrations = self.registrations.borrow();
        registrations.removals() != removals && !registrations.contains(key)
      };
      if released {
        continue;
      }
      let Some(subscriber) = target.upgrade() else {
        warn!(
          channel = %self.name,
          key,
          "subscriber dropped without releasing its subscription; pruned"
        );
        let _stale = self.registrations.borrow_mut().remove(key);
        continue;
      };
      // The last entry takes the item by move, everyone before it gets a clone.
      let value = if idx == last { item.take() } else { item.clone() };
      if let Some(value) = value {
        subscriber.on_item(value);
        delivered += 1;
      }
    }

    trace!(channel = %self.name, delivered, "item published");
    Ok(delivered)
  }
}

impl<Item> Registry for ChannelCore<Item> {
  fn unregister(&self, key: usize) -> bool {
    let removed = self.registrations.borrow_mut().remove(key);
    let Some(_target) = removed else {
      return false;
    };
    debug!(
      channel = %self.name,
      key,
      subscribers = self.subscriber_count(),
      "subscription released"
    );
    if self.upstream_dropped() {
      warn!(
        channel = %self.name,
        key,
        "subscription released on a channel whose upstream publisher is gone"
      );
    }
    true
  }

  #[inline]
  fn is_registered(&self, key: usize) -> bool { self.registrations.borrow().contains(key) }
}

impl<Item: Clone> Subscriber<Item> for ChannelCore<Item> {
  fn on_item(&self, item: Item) {
    if let Err(err) = self.publish(item) {
      warn!(channel = %self.name, label = err.as_label(), %err, "forwarded item dropped");
    }
  }
}
