/*!
 * `Timer`: a single-shot countdown used to bound how long changes may sit
 * in a destination's queue before being flushed.
 */

use std::time::{Duration, Instant};

/// Tracks a deadline `limit` in the future. `start` arms it, `reset`
/// re-arms it from now, `remaining` reports how long is left.
#[derive(Debug)]
pub struct Timer {
    limit: Duration,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            deadline: None,
        }
    }

    /// Arm the timer if it isn't already running.
    pub fn start(&mut self) {
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.limit);
        }
    }

    /// Disarm the timer.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Re-arm the timer from now, whether or not it was already running.
    pub fn reset(&mut self) {
        self.deadline = Some(Instant::now() + self.limit);
    }

    /// Time left until expiry. Zero once the deadline has passed.
    ///
    /// # Panics
    /// Panics if the timer is not running; callers must check
    /// `is_running()` first.
    pub fn remaining(&self) -> Duration {
        let deadline = self.deadline.expect("Timer::remaining called while stopped");
        deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}
