//! A camera publishes frames to a display and a recorder. The display goes
//! away halfway through, then the camera itself is dropped while the recorder
//! still holds its subscription.
//!
//! Run with `RUST_LOG=subchannel=debug` to watch registrations come and go.

use std::{cell::Cell, rc::Rc};

use subchannel::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

type Frame = Rc<[u8]>;

struct Camera {
  frames: LazyChannel<Frame>,
  next_id: Cell<u8>,
}

impl Camera {
  fn new() -> Self {
    Self {
      frames: Channel::builder().name("camera").capacity(2).build_lazy(),
      next_id: Cell::new(0),
    }
  }

  fn capture(&self) -> usize {
    let id = self.next_id.get();
    self.next_id.set(id.wrapping_add(1));
    let frame: Frame = vec![id; 1 << 20].into();
    self.frames.publish(frame).unwrap_or(0)
  }
}

struct Display {
  shown: Cell<usize>,
}

impl Subscriber<Frame> for Display {
  fn on_item(&self, frame: Frame) {
    self.shown.set(self.shown.get() + 1);
    info!(first_byte = frame[0], "display: frame shown");
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let camera = Camera::new();
  info!(delivered = camera.capture(), "nobody listening yet");

  let display = Rc::new(Display { shown: Cell::new(0) });
  let display_sub = camera.frames.add_subscriber(display.clone());

  let recorded = Rc::new(Cell::new(0usize));
  let c_recorded = recorded.clone();
  let recorder_sub = camera.frames.subscribe(move |frame: Frame| {
    c_recorded.set(c_recorded.get() + frame.len());
  });

  info!(delivered = camera.capture(), "two listeners");
  drop(display_sub);
  info!(delivered = camera.capture(), "display unsubscribed");

  drop(camera);
  drop(recorder_sub);
  let shown = display.shown.get();
  info!(shown = shown, recorded_bytes = recorded.get(), "done");
}
