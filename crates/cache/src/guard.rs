//! Reentrant guard around the cache state
//!
//! A thread holding the guard may enter it again, which lets guarded
//! operations call each other (shrinking the size limit runs an eviction
//! pass, an eviction pass may flush the index). State access goes through
//! [`GuardedRegion::with`], whose borrow must never span a call into another
//! guarded operation.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;

pub struct ConcurrencyGuard<T> {
    inner: ReentrantMutex<RefCell<T>>,
}

/// Proof that the current thread holds the guard
pub struct GuardedRegion<'a, T> {
    guard: ReentrantMutexGuard<'a, RefCell<T>>,
}

impl<T> ConcurrencyGuard<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    /// Acquire the guard, or re-enter it if this thread already holds it
    pub fn enter(&self) -> GuardedRegion<'_, T> {
        GuardedRegion {
            guard: self.inner.lock(),
        }
    }

    /// Enter and run `f` on the state
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.enter().with(f)
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl<T> GuardedRegion<'_, T> {
    /// Mutable access for the duration of `f`
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.guard.borrow_mut())
    }
}
