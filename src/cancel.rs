//! Cooperative cancellation polled between detection levels and training rounds.
use std::sync::atomic::{AtomicBool, Ordering};

pub trait CancelCheck: Sync {
    fn is_cancelled(&self) -> bool;
}

/// Check that never fires.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverCancel;

impl CancelCheck for NeverCancel {
    #[inline]
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl CancelCheck for AtomicBool {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F> CancelCheck for F
where
    F: Fn() -> bool + Sync,
{
    #[inline]
    fn is_cancelled(&self) -> bool {
        self()
    }
}
