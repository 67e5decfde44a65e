//! The concurrency-safe process registry the killswitch needs:
//! one [`CancellationToken`] per in-flight run, looked up and fired from any
//! thread without a run having to expose its child process handle.

use courier_core::RunId;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Tracks a [`CancellationToken`] for every run currently executing a
/// connector turn.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tokens: DashMap<RunId, CancellationToken>,
}

impl CancellationRegistry {
    /// Build an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    /// Register a fresh token for `run_id`, replacing any prior one.
    pub fn register(&self, run_id: RunId) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.insert(run_id, token.clone());
        token
    }

    /// Remove `run_id`'s token once its turn has finished, successfully or not.
    pub fn unregister(&self, run_id: RunId) {
        self.tokens.remove(&run_id);
    }

    /// Fire the token for `run_id`, if it is currently registered. Returns
    /// `true` if a running turn was found and signalled.
    pub fn cancel(&self, run_id: RunId) -> bool {
        match self.tokens.get(&run_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Fire every registered token (the daemon-wide killswitch).
    pub fn cancel_all(&self) {
        for entry in &self.tokens {
            entry.value().cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_unknown_run_returns_false() {
        let registry = CancellationRegistry::new();
        assert!(!registry.cancel(RunId::new()));
    }

    #[test]
    fn cancel_registered_run_fires_its_token() {
        let registry = CancellationRegistry::new();
        let run_id = RunId::new();
        let token = registry.register(run_id);
        assert!(registry.cancel(run_id));
        assert!(token.is_cancelled());
    }

    #[test]
    fn unregister_removes_the_token() {
        let registry = CancellationRegistry::new();
        let run_id = RunId::new();
        registry.register(run_id);
        registry.unregister(run_id);
        assert!(!registry.cancel(run_id));
    }

    #[test]
    fn cancel_all_fires_every_registered_token() {
        let registry = CancellationRegistry::new();
        let a = registry.register(RunId::new());
        let b = registry.register(RunId::new());
        registry.cancel_all();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }
}
