//! A small cooperative cancellation primitive.
//!
//! Mirrors the orchestrator's worker-channel shutdown pattern: a shared flag
//! plus a `Notify` so waiters can `await` the transition instead of polling.
//! One handle per turn fans out to Chat, tool executions, and hook
//! subprocesses (§5); each holder calls [`CancellationHandle::child`] to get
//! a leaf that observes the same cancellation without being able to trigger
//! it independently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation signal. Cancelling is idempotent: firing it twice
/// has the same effect as firing it once.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    inner: Arc<Inner>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner { cancelled: AtomicBool::new(false), notify: Notify::new() }) }
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has fired. Resolves immediately if it
    /// already has.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// A leaf derived from this handle for a single in-flight task. Shares
    /// the same underlying signal; exists so callers can reason about "this
    /// task's cancellation" without implying it can cancel siblings.
    pub fn child(&self) -> Self {
        self.clone()
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let handle = CancellationHandle::new();
        assert!(!handle.is_cancelled());
        let waiter = handle.clone();
        let task = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(500), task).await.unwrap().unwrap();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let handle = CancellationHandle::new();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_if_already_cancelled() {
        let handle = CancellationHandle::new();
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(50), handle.cancelled()).await.unwrap();
    }
}
