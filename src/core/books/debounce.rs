//! Quiet-period debouncer driven by the caller's clock.
//!
//! The debouncer owns no timer. Callers push values with the current
//! [`Instant`] and poll it from their tick; a value comes out once it has
//! stood unchanged for the full interval.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    due_at: Instant,
}

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    interval: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    /// Replace any pending value and restart the quiet period from `now`.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            due_at: now + self.interval,
        });
    }

    /// Take the pending value if its quiet period has fully elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some(ref p) if p.due_at <= now => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    /// Drop the pending value. Returns whether anything was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending emission, if any.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due_at)
    }
}
