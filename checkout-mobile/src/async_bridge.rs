//! Tokio runtime owned by a mobile component.
//!
//! Host threads (iOS main thread, GCD queues, Android executors) are not
//! Tokio threads. Every call coming over FFI enters this runtime before
//! touching the action delegate, so tasks spawned for polling, timers and
//! event delivery keep running after the call returns.

use tokio::runtime::{EnterGuard, Handle, Runtime};

use crate::CheckoutMobileError;

const DEFAULT_WORKER_THREADS: usize = 2;

pub struct AsyncRuntime {
    runtime: Runtime,
}

impl AsyncRuntime {
    /// Runtime with a small worker pool; action handling is I/O bound.
    pub fn new() -> Result<Self, CheckoutMobileError> {
        Self::with_threads(DEFAULT_WORKER_THREADS)
    }

    pub fn with_threads(num_threads: usize) -> Result<Self, CheckoutMobileError> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(num_threads.max(1))
            .thread_name("checkout-action")
            .enable_all()
            .build()
            .map(|runtime| Self { runtime })
            .map_err(|e| CheckoutMobileError::Internal {
                msg: format!("Failed to create runtime: {}", e),
            })
    }

    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Make this runtime current for the calling host thread until the
    /// guard is dropped.
    pub fn enter(&self) -> EnterGuard<'_> {
        self.runtime.enter()
    }

    /// Run a future to completion on the calling thread.
    ///
    /// Must not be called from inside a Tokio runtime; it panics there.
    pub fn block_on<F, T>(&self, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        self.runtime.block_on(future)
    }
}
