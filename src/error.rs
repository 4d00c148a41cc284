//! Errors reported by channel operations.
//!
//! Lifetime hazards (dropped brokers, dropped subscribers, double release) are
//! made unreachable by construction and never surface here. The variants below
//! only cover calls that would break the delivery contract if they went ahead.

use thiserror::Error;

/// Errors produced by [`Channel`](crate::channel::Channel) operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
  /// `publish` was called on a channel from inside that channel's own
  /// fan-out. Nothing is delivered.
  #[error("channel `{channel}` is already delivering an item; nested publish rejected")]
  Reentrant {
    /// Name of the channel that rejected the call.
    channel: String,
  },

  /// The subscriber already holds a registration with this channel.
  #[error("subscriber is already registered with channel `{channel}`")]
  AlreadySubscribed {
    /// Name of the channel that rejected the call.
    channel: String,
  },
}

impl ChannelError {
  /// Returns a short stable label (snake_case) for use in logs.
  ///
  /// ```
  /// use subchannel::ChannelError;
  ///
  /// let err = ChannelError::Reentrant { channel: "camera".into() };
  /// assert_eq!(err.as_label(), "channel_reentrant");
  /// ```
  pub fn as_label(&self) -> &'static str {
    match self {
      ChannelError::Reentrant { .. } => "channel_reentrant",
      ChannelError::AlreadySubscribed { .. } => "channel_already_subscribed",
    }
  }
}
