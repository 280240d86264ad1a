//! Status polling protocol.
//!
//! A [`StatusRepository`] turns a payment-data token into a lazy stream of
//! [`StatusResponse`] results. The stream ticks at a fixed interval, stops
//! when a terminal result arrives or the maximum duration elapses, and keeps
//! going after transport failures.
//!
//! # Classification
//!
//! Whether a response ends polling is a pure function of its result code:
//! anything outside [`NON_TERMINAL_RESULT_CODES`] is terminal. A terminal
//! response is only successful when it also carries a non-empty payload.

mod http;
mod repository;

pub use http::HttpStatusService;
pub use repository::{DefaultStatusRepository, StatusRepository, StatusStream};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Result codes that keep the polling loop running.
pub const NON_TERMINAL_RESULT_CODES: &[&str] = &["pending"];

/// Backend answer to a status check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    #[serde(default)]
    pub result_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// What a status response means for the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Keep polling.
    Pending,
    /// Terminal with a payload to submit as details.
    Completed(String),
    /// Terminal without a payload; carries the result code.
    NotCompleted(String),
}

impl StatusResponse {
    pub fn new(result_code: impl Into<String>, payload: Option<String>) -> Self {
        Self {
            response_type: None,
            result_code: result_code.into(),
            payload,
        }
    }

    pub fn pending() -> Self {
        Self::new("pending", None)
    }

    /// True when this response ends polling.
    pub fn is_terminal(&self) -> bool {
        !NON_TERMINAL_RESULT_CODES.contains(&self.result_code.as_str())
    }

    /// True when terminal and a non-empty payload is present.
    pub fn is_final(&self) -> bool {
        self.is_terminal() && self.payload.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn outcome(&self) -> StatusOutcome {
        if !self.is_terminal() {
            return StatusOutcome::Pending;
        }
        match self.payload.as_deref() {
            Some(payload) if !payload.is_empty() => StatusOutcome::Completed(payload.to_owned()),
            _ => StatusOutcome::NotCompleted(self.result_code.clone()),
        }
    }
}

/// Remote "check status" operation keyed by payment data.
#[async_trait]
pub trait StatusService: Send + Sync {
    async fn check_status(&self, payment_data: &str) -> Result<StatusResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pending_is_not_terminal() {
        let response = StatusResponse::pending();
        assert!(!response.is_terminal());
        assert!(!response.is_final());
        assert_eq!(response.outcome(), StatusOutcome::Pending);
    }

    #[test]
    fn test_terminal_with_payload_completes() {
        let response = StatusResponse::new("finished", Some("X".into()));
        assert!(response.is_final());
        assert_eq!(response.outcome(), StatusOutcome::Completed("X".into()));
    }

    #[test]
    fn test_terminal_without_payload_is_not_completed() {
        let response = StatusResponse::new("finished", Some(String::new()));
        assert!(response.is_terminal());
        assert!(!response.is_final());
        assert_eq!(
            response.outcome(),
            StatusOutcome::NotCompleted("finished".into())
        );
    }

    #[test]
    fn test_deserialize_backend_response() {
        let response: StatusResponse =
            serde_json::from_str(r#"{"type":"complete","resultCode":"authorised","payload":"p"}"#)
                .unwrap();
        assert_eq!(response.response_type.as_deref(), Some("complete"));
        assert!(response.is_final());
    }

    proptest! {
        #[test]
        fn prop_final_iff_terminal_code_and_payload(
            code in prop_oneof![
                Just("pending".to_string()),
                Just("finished".to_string()),
                Just("authorised".to_string()),
                Just("refused".to_string()),
                "[a-z]{0,10}",
            ],
            payload in proptest::option::of("[A-Za-z0-9]{0,8}"),
        ) {
            let response = StatusResponse::new(code.clone(), payload.clone());
            let has_payload = payload.as_deref().is_some_and(|p| !p.is_empty());
            let expected = code != "pending" && has_payload;
            prop_assert_eq!(response.is_final(), expected);

            if code != "pending" && !has_payload {
                prop_assert_eq!(response.outcome(), StatusOutcome::NotCompleted(code));
            }
        }
    }
}
