//! Execution scope bound to an action delegate.
//!
//! A [`ComponentScope`] spawns onto a tokio runtime and remembers every task
//! it started so they can all be aborted when the owner is cleared.
//!
//! # Thread Safety
//!
//! Scopes are cheap to clone; clones share the same task set.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::{CheckoutError, Result};

struct ScopeInner {
    handle: Handle,
    jobs: Mutex<Vec<AbortHandle>>,
    cancelled: AtomicBool,
}

#[derive(Clone)]
pub struct ComponentScope {
    inner: Arc<ScopeInner>,
}

impl std::fmt::Debug for ComponentScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentScope")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl ComponentScope {
    pub fn new(handle: Handle) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                handle,
                jobs: Mutex::new(Vec::new()),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// Scope on the runtime of the calling task.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| CheckoutError::checkout(format!("No async runtime available: {}", e)))?;
        Ok(Self::new(handle))
    }

    /// Spawn a task owned by this scope.
    ///
    /// Spawning on a cancelled scope returns an already-cancelled job.
    pub fn spawn<F>(&self, future: F) -> Job
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = self.inner.handle.spawn(future);
        let abort = task.abort_handle();

        if self.is_cancelled() {
            abort.abort();
            return Job { abort };
        }

        let mut jobs = self.inner.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.retain(|job| !job.is_finished());
        jobs.push(abort.clone());
        Job { abort }
    }

    /// Abort every task spawned through this scope.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let jobs = std::mem::take(&mut *self.inner.jobs.lock().unwrap_or_else(|e| e.into_inner()));
        for job in jobs {
            job.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Number of tasks still running.
    pub fn active_jobs(&self) -> usize {
        let mut jobs = self.inner.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.retain(|job| !job.is_finished());
        jobs.len()
    }
}

/// Handle to a single task spawned in a [`ComponentScope`].
#[derive(Debug)]
pub struct Job {
    abort: AbortHandle,
}

impl Job {
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_aborts_running_jobs() {
        let scope = ComponentScope::current().unwrap();
        let job = scope.spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        assert_eq!(scope.active_jobs(), 1);

        scope.cancel();
        tokio::task::yield_now().await;

        assert!(job.is_finished());
        assert!(scope.is_cancelled());
        assert_eq!(scope.active_jobs(), 0);
    }

    #[tokio::test]
    async fn test_spawn_after_cancel_is_inert() {
        let scope = ComponentScope::current().unwrap();
        scope.cancel();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let job = scope.spawn(async move {
            let _ = tx.send(());
        });
        tokio::task::yield_now().await;

        assert!(job.is_finished());
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_current_without_runtime_fails() {
        assert!(ComponentScope::current().is_err());
    }
}
