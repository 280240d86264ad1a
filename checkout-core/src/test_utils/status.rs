use std::sync::Mutex;
use std::time::Duration;

use futures::stream;
use tokio::sync::mpsc;

use crate::status::{StatusRepository, StatusResponse, StatusStream};
use crate::Result;

type Feed = mpsc::UnboundedReceiver<Result<StatusResponse>>;

/// Status repository fed by the test.
///
/// Results pushed with [`push`](Self::push) are yielded, in order, by the
/// stream returned from the first [`poll`](StatusRepository::poll) call.
/// Later polls get a stream that never yields.
pub struct TestStatusRepository {
    feed_tx: mpsc::UnboundedSender<Result<StatusResponse>>,
    feed_rx: Mutex<Option<Feed>>,
    polls: Mutex<Vec<(String, Duration)>>,
    refreshes: Mutex<Vec<String>>,
}

impl Default for TestStatusRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStatusRepository {
    pub fn new() -> Self {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        Self {
            feed_tx,
            feed_rx: Mutex::new(Some(feed_rx)),
            polls: Mutex::new(Vec::new()),
            refreshes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_results(results: Vec<Result<StatusResponse>>) -> Self {
        let repository = Self::new();
        for result in results {
            repository.push(result);
        }
        repository
    }

    pub fn push(&self, result: Result<StatusResponse>) {
        let _ = self.feed_tx.send(result);
    }

    /// Every `(payment_data, max_duration)` passed to `poll`.
    pub fn poll_calls(&self) -> Vec<(String, Duration)> {
        self.polls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn refresh_calls(&self) -> Vec<String> {
        self.refreshes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl StatusRepository for TestStatusRepository {
    fn poll(&self, payment_data: &str, max_polling_duration: Duration) -> StatusStream {
        self.polls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((payment_data.to_owned(), max_polling_duration));

        match self.feed_rx.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(feed) => Box::pin(stream::unfold(feed, |mut feed| async move {
                feed.recv().await.map(|result| (result, feed))
            })),
            None => Box::pin(stream::pending()),
        }
    }

    fn refresh_status(&self, payment_data: &str) {
        self.refreshes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(payment_data.to_owned());
    }
}
