//! Countdown shown next to a QR code while polling runs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use checkout_core::{ComponentScope, Job};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Remaining time and progress (100 at start, 0 when expired).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerData {
    pub millis_until_finished: u64,
    pub progress_percentage: u8,
}

impl TimerData {
    pub fn new(remaining: Duration, total: Duration) -> Self {
        let total_millis = total.as_millis().max(1);
        let remaining_millis = remaining.as_millis().min(total_millis);
        Self {
            millis_until_finished: u64::try_from(remaining_millis).unwrap_or(u64::MAX),
            progress_percentage: (100 * remaining_millis / total_millis) as u8,
        }
    }
}

/// Restartable countdown ticking on a fixed interval. Clones control the
/// same countdown.
#[derive(Clone, Default)]
pub struct CountDownTimer {
    job: Arc<Mutex<Option<Job>>>,
}

impl CountDownTimer {
    pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down `total`, calling `on_tick` immediately, every
    /// `tick`, and once more at zero. Replaces a running countdown.
    pub fn start<F>(&self, scope: &ComponentScope, total: Duration, tick: Duration, on_tick: F)
    where
        F: Fn(TimerData) + Send + 'static,
    {
        let tick = tick.max(Duration::from_millis(1));
        let job = scope.spawn(async move {
            let deadline = Instant::now() + total;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                on_tick(TimerData::new(remaining, total));
                if remaining.is_zero() {
                    break;
                }
                tokio::time::sleep(tick.min(remaining)).await;
            }
        });

        if let Some(previous) = self
            .job
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(job)
        {
            previous.cancel();
        }
    }

    pub fn cancel(&self) {
        if let Some(job) = self.job.lock().unwrap_or_else(|e| e.into_inner()).take() {
            job.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.job
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|job| !job.is_finished())
    }
}
