//! Microphone ownership arbitration.
//!
//! # Invariants
//! - At most one lease per arbiter is live at any time.
//! - Dropping a lease releases the microphone.

use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, MutexGuard};

static PROCESS_ARBITER: Lazy<Arc<MicrophoneArbiter>> =
    Lazy::new(|| Arc::new(MicrophoneArbiter::default()));

/// Grants exclusive microphone ownership to one session at a time.
#[derive(Debug, Default)]
pub struct MicrophoneArbiter {
    owner: Mutex<Option<u64>>,
}

impl MicrophoneArbiter {
    /// The arbiter shared by every session in this process.
    pub fn process_wide() -> Arc<Self> {
        Arc::clone(&PROCESS_ARBITER)
    }

    /// Tries to take the microphone for `owner`.
    ///
    /// Returns the current holder on contention.
    pub fn try_acquire(self: &Arc<Self>, owner: u64) -> Result<MicrophoneLease, u64> {
        let mut slot = self.lock();
        match *slot {
            Some(holder) => Err(holder),
            None => {
                *slot = Some(owner);
                Ok(MicrophoneLease {
                    arbiter: Arc::clone(self),
                    owner,
                })
            }
        }
    }

    /// Current holder, if any.
    pub fn holder(&self) -> Option<u64> {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Option<u64>> {
        // The guarded value is a plain id, so a poisoned lock is still usable.
        self.owner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive microphone ownership; released on drop.
#[derive(Debug)]
pub struct MicrophoneLease {
    arbiter: Arc<MicrophoneArbiter>,
    owner: u64,
}

impl MicrophoneLease {
    pub fn owner(&self) -> u64 {
        self.owner
    }
}

impl Drop for MicrophoneLease {
    fn drop(&mut self) {
        let mut slot = self.arbiter.lock();
        if *slot == Some(self.owner) {
            *slot = None;
        }
    }
}
