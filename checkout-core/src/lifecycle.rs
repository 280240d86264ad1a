//! Host UI lifecycle signal.
//!
//! The host drives a [`LifecycleOwner`] as its screen moves between states.
//! Observers use it to stop delivering events once the screen is destroyed
//! and to refresh payment status when the screen is resumed.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Destroyed,
    Created,
    Started,
    Paused,
    Resumed,
}

#[derive(Clone)]
pub struct LifecycleOwner {
    state: Arc<watch::Sender<LifecycleState>>,
}

impl Default for LifecycleOwner {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleOwner {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleState::Created);
        Self { state: Arc::new(tx) }
    }

    pub fn current_state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Move to `state`; repeated moves to the same state are ignored.
    pub fn move_to(&self, state: LifecycleState) {
        self.state.send_if_modified(|current| {
            if *current == state || *current == LifecycleState::Destroyed {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn is_destroyed(&self) -> bool {
        self.current_state() == LifecycleState::Destroyed
    }
}
