//! Pre-save hooks run by a store's write path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::StoreError;
use resync_shared::Record;

/// A side effect the store runs before every save.
///
/// Hooks belong to the store, not to the pipeline: they observe every write
/// regardless of who issued it, and a failing hook aborts that write.
#[async_trait]
pub trait SaveHook: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Run before `record` is written.
    async fn before_save(&self, record: &Record) -> Result<(), StoreError>;
}

/// The ordered set of hooks attached to a store.
#[derive(Clone, Default)]
pub struct SaveHooks {
    hooks: Vec<Arc<dyn SaveHook>>,
}

impl SaveHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook. Hooks run in registration order.
    pub fn register(&mut self, hook: Arc<dyn SaveHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook, stopping at the first failure.
    pub async fn run(&self, record: &Record) -> Result<(), StoreError> {
        for hook in &self.hooks {
            hook.before_save(record).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SaveHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|hook| hook.name()))
            .finish()
    }
}

/// Hook counting every save that reaches the write path.
#[derive(Debug, Default)]
pub struct SaveCounter {
    count: AtomicUsize,
}

impl SaveCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl SaveHook for SaveCounter {
    fn name(&self) -> &str {
        "save_counter"
    }

    async fn before_save(&self, _record: &Record) -> Result<(), StoreError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingHook;

    #[async_trait]
    impl SaveHook for RejectingHook {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn before_save(&self, _record: &Record) -> Result<(), StoreError> {
            Err(StoreError::hook("rejecting", "read-only"))
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_order_and_stop_on_failure() {
        let before = Arc::new(SaveCounter::new());
        let after = Arc::new(SaveCounter::new());

        let mut hooks = SaveHooks::new();
        hooks.register(before.clone());
        hooks.register(Arc::new(RejectingHook));
        hooks.register(after.clone());

        let result = hooks.run(&Record::empty()).await;

        assert!(matches!(result, Err(StoreError::HookError { .. })));
        assert_eq!(before.count(), 1);
        assert_eq!(after.count(), 0);
        assert_eq!(hooks.len(), 3);
    }

    #[tokio::test]
    async fn test_save_counter_reset() {
        let counter = SaveCounter::new();
        counter.before_save(&Record::empty()).await.unwrap();
        counter.before_save(&Record::empty()).await.unwrap();
        assert_eq!(counter.count(), 2);

        counter.reset();
        assert_eq!(counter.count(), 0);
    }
}
