// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transfer completion signal.
//!
//! A manual-reset binary flag shared between the caller and the device
//! subsystem. "Available" means the transfer header may be reused; the
//! device sets it when a long transfer finishes.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct Inner {
    available: Mutex<bool>,
    changed: Condvar,
}

/// Cloneable handle to one completion flag.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    inner: Arc<Inner>,
}

impl CompletionSignal {
    /// Create a signal in the available state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                available: Mutex::new(true),
                changed: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        // the flag is a plain bool, a poisoned lock still holds a valid value
        self.inner
            .available
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark the transfer buffer as free and wake any waiter.
    pub fn set(&self) {
        *self.lock() = true;
        self.inner.changed.notify_all();
    }

    /// Mark the transfer buffer as owned by the device.
    pub fn reset(&self) {
        *self.lock() = false;
    }

    pub fn is_available(&self) -> bool {
        *self.lock()
    }

    /// Block until the signal is available or `timeout` elapses.
    ///
    /// Returns `false` on timeout. Does not consume the signal.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .inner
            .changed
            .wait_timeout_while(guard, timeout, |available| !*available)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}
