//! The shared suppression cache: every egress writer and the
//! ingress self-echo check read and mutate the same map, so it is guarded by
//! a single mutex rather than one per channel.

use courier_core::{Channel, Sender};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

type FingerprintKey = (Channel, Sender, u64);

/// Tracks `(channel, recipient, content_hash)` fingerprints within a sliding
/// suppression window.
pub struct FingerprintCache {
    seen: Mutex<HashMap<FingerprintKey, Instant>>,
    window: Duration,
}

impl FingerprintCache {
    /// Build a cache with the given suppression window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            window,
        }
    }

    fn hash_text(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }

    fn is_live(&self, at: Instant, seen_at: Instant) -> bool {
        at.duration_since(seen_at) < self.window
    }

    /// Check whether `text` was already sent to `recipient` on `channel`
    /// within the live window; if not, record it as sent now. Returns `true`
    /// if the send should be suppressed as a duplicate.
    pub fn check_and_record(&self, channel: Channel, recipient: &Sender, text: &str) -> bool {
        let key = (channel, recipient.clone(), Self::hash_text(text));
        let now = Instant::now();
        let mut seen = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        seen.retain(|_, seen_at| now.duration_since(*seen_at) < self.window);
        match seen.get(&key) {
            Some(seen_at) if self.is_live(now, *seen_at) => true,
            _ => {
                seen.insert(key, now);
                false
            }
        }
    }

    /// Peek whether `text` matches something recently sent to `recipient` on
    /// `channel`, without recording anything. Used by readers to recognize
    /// their own just-sent reply echoing back through a pull-based source.
    #[must_use]
    pub fn is_recent_echo(&self, channel: Channel, recipient: &Sender, text: &str) -> bool {
        let key = (channel, recipient.clone(), Self::hash_text(text));
        let now = Instant::now();
        let seen = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        matches!(seen.get(&key), Some(seen_at) if self.is_live(now, *seen_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Sender {
        Sender::normalize("+15551234567")
    }

    #[test]
    fn first_send_is_never_suppressed() {
        let cache = FingerprintCache::new(Duration::from_secs(90));
        assert!(!cache.check_and_record(Channel::Mail, &sender(), "hello"));
    }

    #[test]
    fn repeat_send_within_window_is_suppressed() {
        let cache = FingerprintCache::new(Duration::from_secs(90));
        assert!(!cache.check_and_record(Channel::Mail, &sender(), "hello"));
        assert!(cache.check_and_record(Channel::Mail, &sender(), "hello"));
    }

    #[test]
    fn different_text_is_not_suppressed() {
        let cache = FingerprintCache::new(Duration::from_secs(90));
        assert!(!cache.check_and_record(Channel::Mail, &sender(), "hello"));
        assert!(!cache.check_and_record(Channel::Mail, &sender(), "goodbye"));
    }

    #[test]
    fn expired_fingerprint_is_not_suppressed() {
        let cache = FingerprintCache::new(Duration::from_millis(10));
        assert!(!cache.check_and_record(Channel::Mail, &sender(), "hello"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(!cache.check_and_record(Channel::Mail, &sender(), "hello"));
    }

    #[test]
    fn echo_check_does_not_itself_record() {
        let cache = FingerprintCache::new(Duration::from_secs(90));
        assert!(!cache.is_recent_echo(Channel::Chat, &sender(), "hi"));
        assert!(!cache.is_recent_echo(Channel::Chat, &sender(), "hi"));
    }

    #[test]
    fn echo_check_sees_a_prior_send() {
        let cache = FingerprintCache::new(Duration::from_secs(90));
        assert!(!cache.check_and_record(Channel::Chat, &sender(), "hi"));
        assert!(cache.is_recent_echo(Channel::Chat, &sender(), "hi"));
    }
}
