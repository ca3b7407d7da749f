// Licensed under the Apache-2.0 license

use crate::FlashError;
use core::sync::atomic::{AtomicBool, Ordering};

/// Claim flag a driver embeds to give out at most one session at a time.
#[derive(Debug, Default)]
pub struct SessionLock {
    held: AtomicBool,
}

impl SessionLock {
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    pub fn acquire(&self) -> Result<(), FlashError> {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| FlashError::AlreadyOpen)
    }

    pub fn release(&self) -> Result<(), FlashError> {
        self.held
            .compare_exchange(true, false, Ordering::Release, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| FlashError::FreeFailure)
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }
}
