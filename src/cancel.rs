//! Cooperative cancellation for long computations.
//!
//! Sky rendering, night scans and multi-day event series poll a [`CancelToken`]
//! between samples. The token trips either when [`CancelToken::cancel`] is called
//! (from any clone) or when its optional deadline passes; the computation then
//! returns [`SkyPlanError::Cancelled`] and its partial result is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::skyplan_errors::SkyPlanError;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that never trips on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that trips `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Request cancellation; visible to every clone.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Err(Cancelled)` once the token has tripped.
    pub fn check(&self) -> Result<(), SkyPlanError> {
        if self.is_cancelled() {
            log::info!("computation cancelled");
            Err(SkyPlanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod cancel_test {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker = token.clone();
        assert!(worker.check().is_ok());

        token.cancel();
        assert_eq!(worker.check(), Err(SkyPlanError::Cancelled));
    }

    #[test]
    fn test_deadline() {
        let expired = CancelToken::with_timeout(Duration::ZERO);
        assert!(expired.is_cancelled());

        let generous = CancelToken::with_timeout(Duration::from_secs(3600));
        assert!(!generous.is_cancelled());
    }
}
