// checkout_saga/src/core/context.rs
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable state threaded through every handler of a saga run.
///
/// Cloning is cheap and yields another handle to the same state.
///
/// IMPORTANT: guards returned by `read`/`write` are blocking and MUST NOT
/// be held across `.await` suspension points.
#[derive(Debug)]
pub struct SagaContext<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> SagaContext<T> {
  pub fn new(data: T) -> Self {
    SagaContext(Arc::new(RwLock::new(data)))
  }

  /// Acquires a read lock. Drop it before the next `.await`.
  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  /// Acquires a write lock. Drop it before the next `.await`.
  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Reads one value out of the state and releases the lock immediately.
  pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
    f(&self.0.read())
  }

  /// Mutates the state under a short-lived write lock.
  pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
    f(&mut self.0.write())
  }
}

impl<T: Send + Sync + 'static> Clone for SagaContext<T> {
  fn clone(&self) -> Self {
    SagaContext(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for SagaContext<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
