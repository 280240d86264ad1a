//! Stream primitives shared by handlers and the action delegate.
//!
//! Two overflow policies are used:
//!
//! - [`BufferedChannel`]: unbounded, multi-producer / single-consumer queue for
//!   discrete events (details, exceptions, permission requests). Sending never
//!   blocks and never drops.
//! - [`StateFlow`]: latest-value cell for state (view type, output data,
//!   timer). Slow observers only see the most recent value.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};

struct ChannelInner<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: Mutex<mpsc::UnboundedReceiver<T>>,
}

/// Unbounded event queue. Clones share the same queue.
pub struct BufferedChannel<T> {
    inner: Arc<ChannelInner<T>>,
}

impl<T> Clone for BufferedChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send> Default for BufferedChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> BufferedChannel<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(ChannelInner {
                tx,
                rx: Mutex::new(rx),
            }),
        }
    }

    /// Enqueue an event without blocking.
    pub fn send(&self, value: T) {
        // The receiver lives as long as the sender, so this cannot fail.
        let _ = self.inner.tx.send(value);
    }

    /// Wait for the next event.
    pub async fn recv(&self) -> Option<T> {
        self.inner.rx.lock().await.recv().await
    }

    /// Take the next event if one is queued and no consumer is waiting.
    pub fn try_recv(&self) -> Option<T> {
        self.inner.rx.try_lock().ok()?.try_recv().ok()
    }

    /// Take every queued event.
    pub fn drain(&self) -> Vec<T> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Latest-value state holder.
pub struct StateFlow<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for StateFlow<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Clone + Send + Sync> StateFlow<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn value(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Publish a value; observers are notified even if it equals the previous one.
    pub fn emit(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Modify the value in place; observers are notified when `f` returns true.
    pub fn modify<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        self.tx.send_if_modified(f)
    }
}

impl<T: Clone + PartialEq + Send + Sync> StateFlow<T> {
    /// Publish a value only when it differs from the current one.
    pub fn set(&self, value: T) {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
