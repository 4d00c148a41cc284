use std::rc::Rc;

use once_cell::unsync::OnceCell;
use tracing::warn;

use super::{Channel, ChannelConfig};
use crate::{
  error::ChannelError,
  publisher::Publisher,
  subscriber::Subscriber,
  subscription::Subscription,
};

/// A channel whose shared state is allocated on first registration.
///
/// Meant to be embedded in a publisher (camera, socket reader, ...) that
/// usually has nobody listening: until someone subscribes, `publish` is a
/// check of an empty cell.
pub struct LazyChannel<Item> {
  config: ChannelConfig,
  cell: OnceCell<Channel<Item>>,
}

impl<Item: 'static> LazyChannel<Item> {
  pub fn new() -> Self { Self::with_config(ChannelConfig::default()) }

  pub fn with_config(config: ChannelConfig) -> Self { Self { config, cell: OnceCell::new() } }

  /// The channel, allocating it if needed.
  pub fn channel(&self) -> &Channel<Item> {
    self
      .cell
      .get_or_init(|| Channel::with_config(self.config.clone()))
  }

  /// The channel, if it has been allocated.
  #[inline]
  pub fn get(&self) -> Option<&Channel<Item>> { self.cell.get() }

  #[inline]
  pub fn is_allocated(&self) -> bool { self.cell.get().is_some() }

  #[inline]
  pub fn name(&self) -> &str { &self.config.name }

  pub fn subscriber_count(&self) -> usize { self.get().map_or(0, Channel::subscriber_count) }

  pub fn add_subscriber(&self, subscriber: Rc<dyn Subscriber<Item>>) -> Subscription {
    self.channel().add_subscriber(subscriber)
  }

  pub fn subscribe<F>(&self, f: F) -> Subscription
  where
    F: FnMut(Item) + 'static,
  {
    self.channel().subscribe(f)
  }

  pub fn remove_subscriber(&self, subscriber: &dyn Subscriber<Item>) -> bool {
    self
      .get()
      .is_some_and(|ch| ch.remove_subscriber(subscriber))
  }
}

impl<Item: Clone + 'static> LazyChannel<Item> {
  /// Publish through the channel. Before the first registration this returns
  /// `Ok(0)` and allocates nothing.
  pub fn publish(&self, item: Item) -> Result<usize, ChannelError> {
    match self.get() {
      Some(ch) => ch.publish(item),
      None => Ok(0),
    }
  }
}

impl<Item: 'static> Default for LazyChannel<Item> {
  fn default() -> Self { Self::new() }
}

impl<Item: 'static> Publisher<Item> for LazyChannel<Item> {
  fn add_subscriber(&self, subscriber: Rc<dyn Subscriber<Item>>) -> Subscription {
    LazyChannel::add_subscriber(self, subscriber)
  }

  fn remove_subscriber(&self, subscriber: &dyn Subscriber<Item>) -> bool {
    LazyChannel::remove_subscriber(self, subscriber)
  }
}

impl<Item: Clone + 'static> Subscriber<Item> for LazyChannel<Item> {
  fn on_item(&self, item: Item) {
    if let Err(err) = self.publish(item) {
      warn!(channel = %self.name(), label = err.as_label(), %err, "item dropped");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;

  #[test]
  fn publish_before_subscribe_does_not_allocate() {
    let lazy = LazyChannel::<String>::new();
    assert_eq!(lazy.publish("frame".to_owned()), Ok(0));
    assert!(!lazy.is_allocated());
    assert_eq!(lazy.subscriber_count(), 0);

    struct Nobody;
    impl Subscriber<String> for Nobody {
      fn on_item(&self, _: String) {}
    }
    assert!(!lazy.remove_subscriber(&Nobody));
    assert!(!lazy.is_allocated());
  }

  #[test]
  fn first_subscription_allocates() {
    let lazy = LazyChannel::<u8>::new();
    let count = Rc::new(Cell::new(0));
    let c_count = count.clone();
    let _sub = lazy.subscribe(move |_| c_count.set(c_count.get() + 1));

    assert!(lazy.is_allocated());
    assert_eq!(lazy.publish(1), Ok(1));
    assert_eq!(count.get(), 1);
  }

  #[test]
  fn subscription_outlives_lazy_channel() {
    let lazy = LazyChannel::<u8>::new();
    let mut sub = lazy.subscribe(|_| {});
    drop(lazy);
    assert!(!sub.is_live());
    crate::subscription::SubscriptionLike::unsubscribe(&mut sub);
  }

  #[test]
  fn downstream_of_a_regular_channel() {
    let source = Channel::<u8>::new();
    let lazy = Rc::new(LazyChannel::<u8>::new());
    let seen = Rc::new(Cell::new(0u8));
    let c_seen = seen.clone();
    let _sub = lazy.subscribe(move |v| c_seen.set(v));
    let _link = source.add_subscriber(lazy.clone());

    assert_eq!(source.publish(9), Ok(1));
    assert_eq!(seen.get(), 9);
  }
}
