//! State shared between interrupt handlers and foreground code.

use core::cell::RefCell;

use critical_section::Mutex;

/// A value only touched inside a critical section.
///
/// The step interrupt and the foreground both go through [`Shared::lock`]; holding
/// the lock is equivalent to the step interrupt being masked.
pub struct Shared<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> Shared<T> {
    /// Wrap a value.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with exclusive access.
    ///
    /// # Panics
    ///
    /// Panics if called re-entrantly from inside `f`.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}
