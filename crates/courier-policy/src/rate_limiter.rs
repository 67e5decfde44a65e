//! Per-sender sliding-window rate limiting.

use courier_core::Sender;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tracks a sliding window of recent message timestamps per sender.
///
/// The simplest correct implementation of "K messages per sliding window":
/// a per-sender ring of timestamps, pruned to the window on every call.
pub struct RateLimiter {
    window: Duration,
    max_messages: u32,
    history: Mutex<HashMap<Sender, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Build a limiter allowing at most `max_messages` per `window`.
    #[must_use]
    pub fn new(window: Duration, max_messages: u32) -> Self {
        Self {
            window,
            max_messages,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Record one message from `sender` at `now`, returning `true` if this
    /// message exceeds the window's budget (i.e. should be rate-limited).
    pub fn record_and_check(&self, sender: &Sender, now: Instant) -> bool {
        let mut history = self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = history.entry(sender.clone()).or_default();
        while let Some(&oldest) = entry.front() {
            if now.saturating_duration_since(oldest) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        let exceeded = entry.len() as u32 >= self.max_messages;
        entry.push_back(now);
        exceeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(Duration::from_millis(10), 1);
        let sender = Sender::normalize("+15551234567");
        let t0 = Instant::now();
        assert!(!limiter.record_and_check(&sender, t0));
        assert!(limiter.record_and_check(&sender, t0));
        let t1 = t0 + Duration::from_millis(20);
        assert!(!limiter.record_and_check(&sender, t1));
    }

    #[test]
    fn distinct_senders_have_independent_budgets() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let a = Sender::normalize("+15551234567");
        let b = Sender::normalize("+19998887777");
        let now = Instant::now();
        assert!(!limiter.record_and_check(&a, now));
        assert!(!limiter.record_and_check(&b, now));
    }
}
