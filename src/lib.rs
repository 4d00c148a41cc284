//! # subchannel: lifetime-safe publish/subscribe
//!
//! A [`Channel`] sits between a publisher and its subscribers so that neither
//! side references the other directly. Either side can be dropped first:
//!
//! - subscribers are held through `Weak` references and are skipped once gone;
//! - every registration is owned by a [`Subscription`] that references the
//!   channel through a `Weak` reference and releases as a no-op once the
//!   channel is gone.
//!
//! Everything runs synchronously on the caller's thread. Types are `!Send`.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::{cell::Cell, rc::Rc};
//!
//! use subchannel::prelude::*;
//!
//! let sensor = Channel::<f32>::new();
//! let last = Rc::new(Cell::new(0.0));
//!
//! let c_last = last.clone();
//! let subscription = sensor.subscribe(move |v| c_last.set(v));
//!
//! sensor.publish(21.5).unwrap();
//! assert_eq!(last.get(), 21.5);
//!
//! drop(sensor);
//! drop(subscription); // the channel is gone: nothing to do
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Subscriber`] | Receives pushed items |
//! | [`Publisher`] | Registers and removes subscribers |
//! | [`Channel`] | The broker; implements both |
//! | [`Subscription`] | Scoped registration, released on drop |
//!
//! [`Channel`]: channel::Channel
//! [`Subscriber`]: subscriber::Subscriber
//! [`Publisher`]: publisher::Publisher
//! [`Subscription`]: subscription::Subscription

pub mod channel;
pub mod error;
pub mod prelude;
pub mod publisher;
pub mod subscriber;
pub mod subscription;

pub use prelude::*;
