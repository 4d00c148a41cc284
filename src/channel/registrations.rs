use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::subscriber::Subscriber;

/// What a registration entry points at.
///
/// `Observed` subscribers are owned elsewhere and only referenced weakly;
/// `Owned` ones (closures handed to `Channel::subscribe`) live inside the
/// entry until it is removed.
pub(crate) enum Target<Item> {
  Observed(Weak<dyn Subscriber<Item>>),
  Owned(Rc<dyn Subscriber<Item>>),
}

impl<Item> Clone for Target<Item> {
  fn clone(&self) -> Self {
    match self {
      Target::Observed(weak) => Target::Observed(weak.clone()),
      Target::Owned(rc) => Target::Owned(rc.clone()),
    }
  }
}

impl<Item> Target<Item> {
  /// `None` when an observed subscriber has already been dropped.
  #[inline]
  pub(crate) fn upgrade(&self) -> Option<Rc<dyn Subscriber<Item>>> {
    match self {
      Target::Observed(weak) => weak.upgrade(),
      Target::Owned(rc) => Some(rc.clone()),
    }
  }

  /// Address of the subscriber value, used as its identity.
  #[inline]
  pub(crate) fn addr(&self) -> *const () {
    match self {
      Target::Observed(weak) => Weak::as_ptr(weak) as *const (),
      Target::Owned(rc) => Rc::as_ptr(rc) as *const (),
    }
  }
}

/// Snapshot of the registration list taken at the start of a fan-out.
pub(crate) type Snapshot<Item> = SmallVec<[(usize, Target<Item>); 4]>;

/// Registration list with key-based removal.
///
/// Entries stay in insertion order, which is the delivery order. Keys are
/// never reused within one list, so a stale key can not remove a later entry.
pub(crate) struct Registrations<Item> {
  next_key: usize,
  /// Bumped on every successful removal.
  removals: usize,
  entries: SmallVec<[(usize, Target<Item>); 4]>,
}

impl<Item> Default for Registrations<Item> {
  fn default() -> Self { Self::with_capacity(0) }
}

impl<Item> Registrations<Item> {
  pub(crate) fn with_capacity(capacity: usize) -> Self {
    Self { next_key: 0, removals: 0, entries: SmallVec::with_capacity(capacity) }
  }

  /// Append an entry and return its key.
  #[inline]
  pub(crate) fn add(&mut self, target: Target<Item>) -> usize {
    let key = self.next_key;
    self.next_key += 1;
    self.entries.push((key, target));
    key
  }

  /// Remove the entry registered under `key`.
  pub(crate) fn remove(&mut self, key: usize) -> Option<Target<Item>> {
    let pos = self.entries.iter().position(|(k, _)| *k == key)?;
    self.removals += 1;
    Some(self.entries.remove(pos).1)
  }

  /// Remove the first entry, in registration order, whose subscriber lives at
  /// `addr`.
  pub(crate) fn remove_first_match(&mut self, addr: *const ()) -> Option<(usize, Target<Item>)> {
    let pos = self.entries.iter().position(|(_, t)| t.addr() == addr)?;
    self.removals += 1;
    Some(self.entries.remove(pos))
  }

  /// Removal generation. Unchanged means no entry has left the list since
  /// the value was read.
  #[inline]
  pub(crate) fn removals(&self) -> usize { self.removals }

  #[inline]
  pub(crate) fn contains(&self, key: usize) -> bool { self.entries.iter().any(|(k, _)| *k == key) }

  #[inline]
  pub(crate) fn contains_addr(&self, addr: *const ()) -> bool {
    self.entries.iter().any(|(_, t)| t.addr() == addr)
  }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.entries.len() }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Copy out the current entries so delivery can run without holding a
  /// borrow of the list.
  pub(crate) fn snapshot(&self) -> Snapshot<Item> { self.entries.iter().cloned().collect() }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;

  struct Count(Cell<usize>);

  impl Subscriber<u8> for Count {
    fn on_item(&self, _: u8) { self.0.set(self.0.get() + 1); }
  }

  fn observed(rc: &Rc<Count>) -> Target<u8> {
    let rc: Rc<dyn Subscriber<u8>> = rc.clone();
    Target::Observed(Rc::downgrade(&rc))
  }

  #[test]
  fn keys_are_not_reused() {
    let a = Rc::new(Count(Cell::new(0)));
    let mut list = Registrations::default();
    let k0 = list.add(observed(&a));
    assert!(list.remove(k0).is_some());
    let k1 = list.add(observed(&a));
    assert_ne!(k0, k1);
    assert!(list.remove(k0).is_none());
    assert!(list.contains(k1));
  }

  #[test]
  fn first_match_removal_keeps_later_duplicates() {
    let a = Rc::new(Count(Cell::new(0)));
    let b = Rc::new(Count(Cell::new(0)));
    let mut list = Registrations::default();
    let first = list.add(observed(&a));
    let _b = list.add(observed(&b));
    let second = list.add(observed(&a));

    let addr = Rc::as_ptr(&a) as *const ();
    let (removed, _) = list.remove_first_match(addr).expect("a is registered");
    assert_eq!(removed, first);
    assert!(list.contains(second));
    assert!(list.contains_addr(addr));
    assert_eq!(list.len(), 2);
  }

  #[test]
  fn removal_generation_tracks_successful_removals() {
    let a = Rc::new(Count(Cell::new(0)));
    let mut list = Registrations::default();
    let key = list.add(observed(&a));
    let _other = list.add(observed(&a));
    assert_eq!(list.removals(), 0);

    assert!(list.remove(key + 100).is_none());
    assert_eq!(list.removals(), 0);
    assert!(list.remove(key).is_some());
    assert_eq!(list.removals(), 1);
    assert!(list.remove_first_match(Rc::as_ptr(&a) as *const ()).is_some());
    assert_eq!(list.removals(), 2);
  }

  #[test]
  fn observed_target_does_not_keep_subscriber_alive() {
    let a = Rc::new(Count(Cell::new(0)));
    let target = observed(&a);
    assert!(target.upgrade().is_some());
    drop(a);
    assert!(target.upgrade().is_none());
  }

  #[test]
  fn snapshot_is_independent_of_later_mutation() {
    let a = Rc::new(Count(Cell::new(0)));
    let mut list = Registrations::with_capacity(8);
    let key = list.add(observed(&a));
    let snapshot = list.snapshot();
    list.remove(key);
    assert!(list.is_empty());
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].0, key);
  }
}
