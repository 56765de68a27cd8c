//! The store contract.
//!
//! Matches the collaborator surface the application consumes: one-shot
//! reads, full and partial writes, removal, push-key generation, and live
//! subscriptions.  Implementations provide last-write-wins semantics per
//! path and no transactions across paths; callers must never assume that
//! two calls land atomically.

use async_trait::async_trait;

use crate::error::Result;

/// JSON value stored in the tree.
pub type Value = serde_json::Value;

/// Callback invoked with the value at a subscribed path (`None` = absent).
pub type ChangeCallback = Box<dyn Fn(Option<Value>) + Send + Sync + 'static>;

/// A path-addressed reactive key-value tree.
#[async_trait]
pub trait Store: Send + Sync {
    /// One-shot read of the value at `path`; `None` when absent.
    async fn read(&self, path: &str) -> Result<Option<Value>>;

    /// Overwrite the value at `path`.  Writing `null` removes the subtree.
    async fn write(&self, path: &str, value: Value) -> Result<()>;

    /// Merge `partial`'s top-level fields into the value at `path`.
    /// A `null` field removes that key.
    async fn patch(&self, path: &str, partial: Value) -> Result<()>;

    /// Remove the subtree at `path`.  Removing an absent path is a no-op.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Insert `value` under a freshly generated child key of
    /// `collection_path` and return the key.  Generated keys are unique and
    /// sort lexicographically in generation order.
    async fn push_child(&self, collection_path: &str, value: Value) -> Result<String>;

    /// Subscribe to changes at `path`.
    ///
    /// The callback fires once with the current value and again after every
    /// change affecting the path (including changes to ancestors and
    /// descendants).  The listener stays registered until the returned
    /// [`Subscription`] is cancelled or dropped.
    fn subscribe(&self, path: &str, on_change: ChangeCallback) -> Subscription;
}

/// Owned handle to a live store listener.
///
/// The subscriber owns the listener's lifecycle: dropping the handle (or
/// calling [`Subscription::cancel`]) unregisters it.  Long-lived watchers
/// must keep the handle alive for as long as they want deliveries,
/// otherwise the listener leaks silently on the remote end.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap an unsubscribe closure.
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Explicitly unregister the listener.
    pub fn cancel(mut self) {
        if let Some(f) = self.cancel.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.cancel.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
