pub use crate::{
  channel::{Channel, ChannelBuilder, ChannelConfig, LazyChannel},
  error::ChannelError,
  publisher::Publisher,
  subscriber::{FnSubscriber, Subscriber},
  subscription::{Subscription, SubscriptionId, SubscriptionLike, SubscriptionSet, SubscriptionState},
};
