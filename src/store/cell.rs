//! Observable, locally persisted values.
//!
//! A [`PersistedCell`] holds one value, mirrors every write into the state
//! store, and notifies subscribers synchronously on each write. On
//! construction the cell seeds itself from the store, so whatever was
//! persisted in an earlier run is visible immediately.
//!
//! A cell can carry an activation callback: it runs when the subscriber
//! count goes from zero to one and returns a teardown that runs when the
//! count drops back to zero. Cells use this to attach themselves to other
//! cells only while someone is actually watching.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::storage::{read_json, write_json, StateStore};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Cleanup returned by an activation callback, run when the last
/// subscriber detaches.
pub type Teardown = Box<dyn FnOnce() + Send>;

type StartFn<T> = Box<dyn Fn(Setter<T>) -> Teardown + Send + Sync>;

struct CellState<T> {
  value: T,
  listeners: Vec<(u64, Listener<T>)>,
  /// True while at least one subscriber is attached and `start` has run.
  active: bool,
  /// True only while the activation callback itself is running.
  starting: bool,
  teardown: Option<Teardown>,
}

struct CellInner<T> {
  key: &'static str,
  store: Arc<dyn StateStore>,
  start: Option<StartFn<T>>,
  state: Mutex<CellState<T>>,
  next_id: AtomicU64,
}

impl<T> CellInner<T>
where
  T: Clone + Serialize + Send + Sync + 'static,
{
  fn lock_state(&self) -> MutexGuard<'_, CellState<T>> {
    match self.state.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }

  fn get(&self) -> T {
    self.lock_state().value.clone()
  }

  fn set(&self, value: T) {
    let (value, listeners) = {
      let mut state = self.lock_state();
      state.value = value;
      // During activation the triggering subscriber is notified once,
      // after the callback returns.
      let listeners: Vec<Listener<T>> = if state.starting {
        Vec::new()
      } else {
        state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
      };
      (state.value.clone(), listeners)
    };

    // Persist before notifying, so listeners observe a written-through value.
    write_json(self.store.as_ref(), self.key, &value);
    for listener in &listeners {
      listener(&value);
    }
  }

  fn remove_listener(&self, id: u64) {
    let teardown = {
      let mut state = self.lock_state();
      state.listeners.retain(|(lid, _)| *lid != id);
      if state.active && state.listeners.is_empty() {
        state.active = false;
        state.teardown.take()
      } else {
        None
      }
    };

    if let Some(teardown) = teardown {
      teardown();
    }
  }
}

/// An observable value mirrored into the state store under a fixed key.
///
/// Cloning the handle is cheap; clones observe and mutate the same value.
pub struct PersistedCell<T> {
  inner: Arc<CellInner<T>>,
}

impl<T> Clone for PersistedCell<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T> PersistedCell<T>
where
  T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
  /// Cell seeded from the store, or from `default` when the store has no
  /// readable value under `key`.
  pub fn new(store: Arc<dyn StateStore>, key: &'static str, default: T) -> Self {
    Self::build(store, key, default, None)
  }

  /// Like [`PersistedCell::new`], with an activation callback.
  ///
  /// `start` runs when the subscriber count goes from zero to one and may
  /// set the cell through the given [`Setter`], immediately or later from
  /// a task. Its teardown runs when the count drops back to zero.
  pub fn with_activation(
    store: Arc<dyn StateStore>,
    key: &'static str,
    default: T,
    start: impl Fn(Setter<T>) -> Teardown + Send + Sync + 'static,
  ) -> Self {
    Self::build(store, key, default, Some(Box::new(start)))
  }

  fn build(
    store: Arc<dyn StateStore>,
    key: &'static str,
    default: T,
    start: Option<StartFn<T>>,
  ) -> Self {
    let value = read_json(store.as_ref(), key).unwrap_or(default);
    Self {
      inner: Arc::new(CellInner {
        key,
        store,
        start,
        state: Mutex::new(CellState {
          value,
          listeners: Vec::new(),
          active: false,
          starting: false,
          teardown: None,
        }),
        next_id: AtomicU64::new(0),
      }),
    }
  }

  /// Current value.
  pub fn get(&self) -> T {
    self.inner.get()
  }

  /// Replace the value, persist it, and notify every subscriber.
  ///
  /// Subscribers are notified on every call, including writes of an equal
  /// value.
  pub fn set(&self, value: T) {
    self.inner.set(value);
  }

  /// Replace the value with `f` applied to the current one.
  pub fn update(&self, f: impl FnOnce(T) -> T) {
    let next = f(self.inner.get());
    self.inner.set(next);
  }

  /// Attach `listener`, invoking it immediately with the current value.
  ///
  /// The first subscriber triggers the activation callback before the
  /// immediate invocation, so a value set during activation is the one
  /// the listener first observes. Dropping the returned handle detaches
  /// the listener.
  pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
    let listener: Listener<T> = Arc::new(listener);

    let run_start = {
      let mut state = self.inner.lock_state();
      state.listeners.push((id, Arc::clone(&listener)));
      let first = self.inner.start.is_some() && !state.active;
      if first {
        state.active = true;
        state.starting = true;
      }
      first
    };

    if run_start {
      if let Some(start) = &self.inner.start {
        let teardown = start(Setter {
          inner: Arc::downgrade(&self.inner),
        });
        let mut state = self.inner.lock_state();
        state.starting = false;
        if state.listeners.is_empty() {
          // Everyone detached while the callback ran
          state.active = false;
          drop(state);
          teardown();
        } else {
          state.teardown = Some(teardown);
        }
      }
    }

    let current = self.inner.get();
    listener(&current);

    let inner = Arc::downgrade(&self.inner);
    Subscription {
      cancel: Some(Box::new(move || {
        if let Some(inner) = inner.upgrade() {
          inner.remove_listener(id);
        }
      })),
    }
  }
}

/// Write handle handed to activation callbacks.
///
/// Holds no strong reference to the cell, so wiring stored inside the cell
/// cannot keep it alive. Setting through a dropped cell is a no-op.
pub struct Setter<T> {
  inner: Weak<CellInner<T>>,
}

impl<T> Clone for Setter<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Weak::clone(&self.inner),
    }
  }
}

impl<T> Setter<T>
where
  T: Clone + Serialize + Send + Sync + 'static,
{
  /// Replace the cell's value, with the same semantics as
  /// [`PersistedCell::set`].
  pub fn set(&self, value: T) {
    if let Some(inner) = self.inner.upgrade() {
      inner.set(value);
    }
  }
}

/// Handle for an attached listener. Dropping it detaches the listener; the
/// last detach runs the cell's teardown.
pub struct Subscription {
  cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
  /// Detach explicitly. Equivalent to dropping the handle.
  #[allow(dead_code)]
  pub fn unsubscribe(mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}
