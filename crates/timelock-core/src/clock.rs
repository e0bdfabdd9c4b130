//! Ledger time sources.
//!
//! The registry reads the current timestamp from a `Clock` once per call.
//! `SystemClock` follows wall time; `ManualClock` only moves when told to,
//! which is how tests simulate time passing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::Timestamp;

/// A source of ledger timestamps.
pub trait Clock: Send + Sync {
    /// The current timestamp.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Timestamp::from_secs(secs)
    }
}

/// A clock that only moves forward when advanced explicitly.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    secs: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock starting at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(start.as_secs())),
        }
    }

    /// Move forward by `secs` seconds.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let prev = self
            .secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                Some(s.saturating_add(secs))
            })
            .unwrap_or_else(|s| s);
        Timestamp::from_secs(prev.saturating_add(secs))
    }

    /// Jump to `target`. Ledger time never goes backwards, so earlier
    /// targets leave the clock where it is.
    pub fn increase_to(&self, target: Timestamp) -> Timestamp {
        let prev = self.secs.fetch_max(target.as_secs(), Ordering::SeqCst);
        Timestamp::from_secs(prev.max(target.as_secs()))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.secs.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
