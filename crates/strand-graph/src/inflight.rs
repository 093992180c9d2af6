use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Default)]
struct Inner {
    active: DashMap<String, (u64, CancellationToken)>,
    generation: AtomicU64,
}

/// At most one in-flight reply per owner node
///
/// Starting a new reply for an owner cancels the one already running.
/// Cancelling one owner never touches another.
#[derive(Clone, Default)]
pub struct InflightRegistry {
    inner: Arc<Inner>,
}

/// Registration of one reply; deregisters itself on drop
pub struct InflightGuard {
    inner: Arc<Inner>,
    owner_id: String,
    generation: u64,
    token: CancellationToken,
}

impl InflightGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let generation = self.generation;
        self.inner
            .active
            .remove_if(&self.owner_id, |_, (current, _)| *current == generation);
    }
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, owner_id: &str) -> InflightGuard {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        if let Some((_, previous)) = self
            .inner
            .active
            .insert(owner_id.to_string(), (generation, token.clone()))
        {
            debug!(owner = %owner_id, "superseding in-flight reply");
            previous.cancel();
        }

        InflightGuard {
            inner: Arc::clone(&self.inner),
            owner_id: owner_id.to_string(),
            generation,
            token,
        }
    }

    /// Cancel the owner's reply, if one is running
    pub fn cancel(&self, owner_id: &str) -> bool {
        match self.inner.active.remove(owner_id) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn has_active(&self, owner_id: &str) -> bool {
        self.inner.active.contains_key(owner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_supersedes_previous() {
        let registry = InflightRegistry::new();
        let first = registry.begin("a");
        let second = registry.begin("a");

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        // Dropping the stale guard must not deregister the newer reply
        drop(first);
        assert!(registry.has_active("a"));
        drop(second);
        assert!(!registry.has_active("a"));
    }

    #[test]
    fn test_cancel_is_per_owner() {
        let registry = InflightRegistry::new();
        let a = registry.begin("a");
        let b = registry.begin("b");

        assert!(registry.cancel("a"));
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(!registry.cancel("a"));
        assert!(registry.has_active("b"));
    }
}
