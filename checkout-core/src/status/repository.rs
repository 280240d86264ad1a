use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, BoxStream};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use super::{StatusResponse, StatusService};
use crate::{CheckoutError, Result};

/// Stream of per-tick polling results.
pub type StatusStream = BoxStream<'static, Result<StatusResponse>>;

/// Polls the status endpoint for a payment-data token.
pub trait StatusRepository: Send + Sync {
    /// Start a new polling sequence.
    ///
    /// The first check happens as soon as the stream is polled. Each further
    /// check waits for the configured interval. The stream ends after a
    /// terminal response or once `max_polling_duration` has elapsed. Failed
    /// checks are yielded and polling continues.
    fn poll(&self, payment_data: &str, max_polling_duration: Duration) -> StatusStream;

    /// Request one immediate out-of-band check. The result is delivered
    /// through the stream returned by the latest [`poll`](Self::poll) call.
    fn refresh_status(&self, payment_data: &str);
}

/// [`StatusRepository`] backed by any [`StatusService`].
pub struct DefaultStatusRepository {
    service: Arc<dyn StatusService>,
    interval: Duration,
    refresh_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    latest_response: Arc<Mutex<Option<StatusResponse>>>,
}

impl DefaultStatusRepository {
    pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(service: Arc<dyn StatusService>) -> Self {
        Self::with_interval(service, Self::DEFAULT_POLLING_INTERVAL)
    }

    pub fn with_interval(service: Arc<dyn StatusService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            refresh_tx: Mutex::new(None),
            latest_response: Arc::new(Mutex::new(None)),
        }
    }

    /// Most recent successful response seen by any polling sequence.
    pub fn latest_response(&self) -> Option<StatusResponse> {
        self.latest_response
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

struct PollState {
    service: Arc<dyn StatusService>,
    payment_data: String,
    interval: Duration,
    max_duration: Duration,
    deadline: Option<Instant>,
    started: bool,
    finished: bool,
    refresh_rx: mpsc::UnboundedReceiver<String>,
    latest_response: Arc<Mutex<Option<StatusResponse>>>,
}

impl PollState {
    async fn check(&mut self, payment_data: &str) -> Result<StatusResponse> {
        let result = self.service.check_status(payment_data).await;
        match &result {
            Ok(response) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(result_code = %response.result_code, "status check");
                if response.is_terminal() {
                    self.finished = true;
                }
                *self
                    .latest_response
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(response.clone());
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %_err, "status check failed, polling continues");
            }
        }
        result
    }

    async fn next(mut self) -> Option<(Result<StatusResponse>, Self)> {
        if self.finished {
            return None;
        }
        let deadline = *self
            .deadline
            .get_or_insert_with(|| Instant::now() + self.max_duration);

        if !self.started {
            self.started = true;
            let token = self.payment_data.clone();
            let result = self.check(&token).await;
            return Some((result, self));
        }

        loop {
            let now = Instant::now();
            if now >= deadline {
                #[cfg(feature = "tracing")]
                tracing::debug!("max polling duration reached");
                return None;
            }
            let wake = (now + self.interval).min(deadline);

            tokio::select! {
                biased;
                Some(token) = self.refresh_rx.recv() => {
                    let result = self.check(&token).await;
                    return Some((result, self));
                }
                _ = sleep_until(wake) => {}
            }

            if Instant::now() < deadline {
                let token = self.payment_data.clone();
                let result = self.check(&token).await;
                return Some((result, self));
            }
        }
    }
}

impl StatusRepository for DefaultStatusRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, payment_data)))]
    fn poll(&self, payment_data: &str, max_polling_duration: Duration) -> StatusStream {
        if payment_data.is_empty() {
            let error = CheckoutError::invalid_input("paymentData", "must not be empty");
            return Box::pin(stream::once(async move { Err(error) }));
        }

        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        *self.refresh_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(refresh_tx);

        let state = PollState {
            service: self.service.clone(),
            payment_data: payment_data.to_owned(),
            interval: self.interval,
            max_duration: max_polling_duration,
            deadline: None,
            started: false,
            finished: false,
            refresh_rx,
            latest_response: self.latest_response.clone(),
        };
        Box::pin(stream::unfold(state, PollState::next))
    }

    fn refresh_status(&self, payment_data: &str) {
        let guard = self.refresh_tx.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(tx) if tx.send(payment_data.to_owned()).is_ok() => {}
            _ => {
                #[cfg(feature = "tracing")]
                tracing::debug!("refresh requested without an active polling sequence");
            }
        }
    }
}
