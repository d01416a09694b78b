//! Exclusive, transferable ownership of a per-client slot.

use std::sync::{Condvar, Mutex, TryLockError};

/// A slot whose contents can be claimed by exactly one worker at a time.
///
/// Workers either block for the value with [`Locker::take`] or bow out
/// immediately with [`Locker::try_take`]. The claimed value moves out of
/// the slot entirely, so no other worker can observe it until
/// [`Locker::put_back`] restores it.
///
/// # Example
///
/// ```
/// use rampart::server::locker::Locker;
///
/// let locker = Locker::new(1);
/// let value = locker.try_take().unwrap();
/// assert!(locker.try_take().is_none());
/// locker.put_back(value + 1);
/// assert_eq!(locker.try_take(), Some(2));
/// ```
pub struct Locker<T> {
    slot: Mutex<Option<T>>,
    restored: Condvar,
}

impl<T> Locker<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Some(value)),
            restored: Condvar::new(),
        }
    }

    /// Claims the value, blocking until it is in the slot.
    ///
    /// Blocks forever if the value was [`Locker::reset`] away and nobody
    /// restores one.
    pub fn take(&self) -> T {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(value) = slot.take() {
                return value;
            }
            slot = self.restored.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Claims the value only if it is immediately available.
    ///
    /// Returns `None` when another worker holds the lock or has the value
    /// out of the slot.
    pub fn try_take(&self) -> Option<T> {
        match self.slot.try_lock() {
            Ok(mut slot) => slot.take(),
            Err(TryLockError::Poisoned(e)) => e.into_inner().take(),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Restores a previously taken value and wakes one blocked claimant.
    pub fn put_back(&self, value: T) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
        self.restored.notify_one();
    }

    /// Drops whatever the slot currently holds.
    pub fn reset(&self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
