use std::{borrow::Cow, marker::PhantomData};

use super::{Channel, LazyChannel};

/// Settings applied when a channel's shared state is allocated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
  /// Shown in log records and error messages.
  pub name: Cow<'static, str>,
  /// Registration slots reserved up front.
  pub capacity: usize,
}

impl Default for ChannelConfig {
  fn default() -> Self { Self { name: Cow::Borrowed("channel"), capacity: 0 } }
}

/// Builder for [`Channel`] and [`LazyChannel`].
///
/// ```
/// use subchannel::prelude::*;
///
/// let camera: Channel<Vec<u8>> = Channel::builder().name("camera").capacity(4).build();
/// assert_eq!(camera.name(), "camera");
/// ```
pub struct ChannelBuilder<Item> {
  config: ChannelConfig,
  _item: PhantomData<fn() -> Item>,
}

impl<Item> Default for ChannelBuilder<Item> {
  fn default() -> Self { Self { config: ChannelConfig::default(), _item: PhantomData } }
}

impl<Item> ChannelBuilder<Item> {
  pub fn new() -> Self { Self::default() }

  pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
    self.config.name = name.into();
    self
  }

  pub fn capacity(mut self, capacity: usize) -> Self {
    self.config.capacity = capacity;
    self
  }

  #[inline]
  pub fn config(&self) -> &ChannelConfig { &self.config }
}

impl<Item: 'static> ChannelBuilder<Item> {
  pub fn build(self) -> Channel<Item> { Channel::with_config(self.config) }

  /// Build a holder that allocates the channel on first registration.
  pub fn build_lazy(self) -> LazyChannel<Item> { LazyChannel::with_config(self.config) }
}
