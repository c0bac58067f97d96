//! Cooperative cancellation for long scans.
//!
//! Scans poll the token once per source file. A cancelled scan returns
//! whatever it had accumulated; callers treat that output as advisory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, pollable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that reports cancellation from the start.
    pub fn cancelled() -> Self {
        let token = Self::new();
        token.cancel();
        token
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
