//! Lifecycle-bound delivery of delegate events to a host callback.

use std::future::Future;
use std::sync::{Arc, Mutex};

use checkout_core::lifecycle::{LifecycleOwner, LifecycleState};
use checkout_core::permission::PermissionRequestData;
use checkout_core::{
    ActionComponentData, BufferedChannel, CheckoutError, ComponentScope, Job,
};

/// Event delivered to the host.
#[derive(Debug, Clone)]
pub enum ActionComponentEvent {
    ActionDetails(ActionComponentData),
    Error(CheckoutError),
    PermissionRequest(PermissionRequestData),
}

pub type ActionCallback = Arc<dyn Fn(ActionComponentEvent) + Send + Sync>;

/// Streams an observer drains.
pub struct ObservedStreams {
    pub details: Option<BufferedChannel<ActionComponentData>>,
    pub exceptions: BufferedChannel<CheckoutError>,
    pub permissions: Option<BufferedChannel<PermissionRequestData>>,
}

/// Holds the tasks of the current observer. Adding observers replaces the
/// previous ones.
#[derive(Default)]
pub struct ActionObserverRepository {
    jobs: Mutex<Vec<Job>>,
}

impl ActionObserverRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver every event of `streams` to `callback` until `lifecycle` is
    /// destroyed, and call `on_resume` each time it enters `Resumed`.
    pub fn add_observers<R>(
        &self,
        streams: ObservedStreams,
        lifecycle: &LifecycleOwner,
        scope: &ComponentScope,
        callback: ActionCallback,
        on_resume: R,
    ) where
        R: Fn() + Send + Sync + 'static,
    {
        self.remove_observers();

        let mut events_lifecycle = lifecycle.subscribe();
        let events = scope.spawn(async move {
            if *events_lifecycle.borrow_and_update() == LifecycleState::Destroyed {
                return;
            }
            loop {
                tokio::select! {
                    Some(details) = next(&streams.details) => {
                        callback(ActionComponentEvent::ActionDetails(details));
                    }
                    Some(error) = streams.exceptions.recv() => {
                        callback(ActionComponentEvent::Error(error));
                    }
                    Some(request) = next(&streams.permissions) => {
                        callback(ActionComponentEvent::PermissionRequest(request));
                    }
                    changed = events_lifecycle.changed() => {
                        if changed.is_err()
                            || *events_lifecycle.borrow_and_update() == LifecycleState::Destroyed
                        {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("Lifecycle destroyed, stopping event delivery");
                            break;
                        }
                    }
                }
            }
        });

        let mut resume_lifecycle = lifecycle.subscribe();
        let resume = scope.spawn(async move {
            let mut state = *resume_lifecycle.borrow_and_update();
            loop {
                match state {
                    LifecycleState::Resumed => on_resume(),
                    LifecycleState::Destroyed => break,
                    _ => {}
                }
                if resume_lifecycle.changed().await.is_err() {
                    break;
                }
                state = *resume_lifecycle.borrow_and_update();
            }
        });

        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend([events, resume]);
    }

    pub fn remove_observers(&self) {
        let jobs = std::mem::take(&mut *self.jobs.lock().unwrap_or_else(|e| e.into_inner()));
        for job in jobs {
            job.cancel();
        }
    }

    pub fn is_observing(&self) -> bool {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|job| !job.is_finished())
    }
}

fn next<T: Send>(channel: &Option<BufferedChannel<T>>) -> impl Future<Output = Option<T>> + '_ {
    async move {
        match channel {
            Some(channel) => channel.recv().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    fn streams() -> (
        ObservedStreams,
        BufferedChannel<ActionComponentData>,
        BufferedChannel<CheckoutError>,
    ) {
        let details = BufferedChannel::new();
        let exceptions = BufferedChannel::new();
        (
            ObservedStreams {
                details: Some(details.clone()),
                exceptions: exceptions.clone(),
                permissions: None,
            },
            details,
            exceptions,
        )
    }

    #[tokio::test]
    async fn test_events_reach_callback_until_destroyed() {
        let scope = ComponentScope::current().unwrap();
        let lifecycle = LifecycleOwner::new();
        let repository = ActionObserverRepository::new();
        let (observed, details, exceptions) = streams();
        let (tx, mut rx) = mpsc::unbounded_channel();

        repository.add_observers(
            observed,
            &lifecycle,
            &scope,
            Arc::new(move |event| {
                let _ = tx.send(event);
            }),
            || {},
        );

        details.send(ActionComponentData::new(json!({"payload": "p"}), None));
        assert!(matches!(
            rx.recv().await,
            Some(ActionComponentEvent::ActionDetails(_))
        ));
        exceptions.send(CheckoutError::component("boom"));
        assert!(matches!(rx.recv().await, Some(ActionComponentEvent::Error(_))));

        lifecycle.move_to(LifecycleState::Destroyed);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        exceptions.send(CheckoutError::component("late"));
        tokio::task::yield_now().await;

        assert!(rx.try_recv().is_err());
        assert_eq!(exceptions.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_on_resume_runs_on_every_resume() {
        let scope = ComponentScope::current().unwrap();
        let lifecycle = LifecycleOwner::new();
        let repository = ActionObserverRepository::new();
        let resumes = Arc::new(AtomicUsize::new(0));
        let counter = resumes.clone();
        let (observed, _, _) = streams();

        repository.add_observers(observed, &lifecycle, &scope, Arc::new(|_| {}), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..2 {
            lifecycle.move_to(LifecycleState::Resumed);
            tokio::task::yield_now().await;
            lifecycle.move_to(LifecycleState::Paused);
            tokio::task::yield_now().await;
        }

        assert_eq!(resumes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remove_observers_stops_delivery() {
        let scope = ComponentScope::current().unwrap();
        let lifecycle = LifecycleOwner::new();
        let repository = ActionObserverRepository::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (observed, _, exceptions) = streams();

        repository.add_observers(
            observed,
            &lifecycle,
            &scope,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            || {},
        );
        tokio::task::yield_now().await;
        assert!(repository.is_observing());

        repository.remove_observers();
        tokio::task::yield_now().await;
        exceptions.send(CheckoutError::component("ignored"));
        tokio::task::yield_now().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!repository.is_observing());
    }
}
