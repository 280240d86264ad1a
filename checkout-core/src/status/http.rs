//! HTTP implementation of the status check.
//!
//! # Feature Flags
//!
//! Real requests require the `http-client` feature. Without it every check
//! returns an `Unimplemented` error.
//!
//! ```toml
//! [dependencies]
//! checkout-core = { version = "0.1", features = ["http-client"] }
//! ```

use async_trait::async_trait;
use serde::Serialize;
#[cfg(feature = "http-client")]
use std::time::Duration;
use url::Url;

use super::{StatusResponse, StatusService};
use crate::config::CheckoutConfiguration;
#[cfg(feature = "http-client")]
use crate::errors::ErrorResponseBody;
use crate::{CheckoutError, Result};

const STATUS_PATH: &str = "services/PaymentInitiation/v1/status";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest<'a> {
    payment_data: &'a str,
}

/// Calls `services/PaymentInitiation/v1/status` on the checkout backend.
pub struct HttpStatusService {
    status_url: Url,
    #[cfg(feature = "http-client")]
    client: reqwest::Client,
}

impl HttpStatusService {
    /// Create a service for the configured environment and client key.
    #[cfg(feature = "http-client")]
    pub fn new(configuration: &CheckoutConfiguration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(configuration.request_timeout_secs))
            .build()
            .map_err(|e| CheckoutError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            status_url: Self::build_status_url(configuration)?,
            client,
        })
    }

    /// Create a service for the configured environment (stub when feature disabled).
    #[cfg(not(feature = "http-client"))]
    pub fn new(configuration: &CheckoutConfiguration) -> Result<Self> {
        Ok(Self {
            status_url: Self::build_status_url(configuration)?,
        })
    }

    pub fn status_url(&self) -> &Url {
        &self.status_url
    }

    fn build_status_url(configuration: &CheckoutConfiguration) -> Result<Url> {
        let mut url = configuration.environment.checkout_base_url()?.join(STATUS_PATH)?;
        url.query_pairs_mut()
            .append_pair("token", &configuration.client_key);
        Ok(url)
    }

    #[cfg(feature = "http-client")]
    async fn post_status(&self, payment_data: &str) -> Result<StatusResponse> {
        let response = self
            .client
            .post(self.status_url.clone())
            .json(&StatusRequest { payment_data })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let error_body = serde_json::from_str::<ErrorResponseBody>(&error_text).ok();
            return Err(CheckoutError::Http {
                code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                error_body,
            });
        }

        response.json::<StatusResponse>().await.map_err(|e| {
            CheckoutError::Serialization(format!("Failed to parse status response: {}", e))
        })
    }

    #[cfg(not(feature = "http-client"))]
    async fn post_status(&self, payment_data: &str) -> Result<StatusResponse> {
        let _ = StatusRequest { payment_data };
        Err(CheckoutError::Unimplemented(
            "HTTP status service - enable the 'http-client' feature",
        ))
    }
}

#[cfg(feature = "http-client")]
fn map_reqwest_error(e: reqwest::Error) -> CheckoutError {
    if e.is_timeout() {
        CheckoutError::Transport(format!("Status request timed out: {}", e))
    } else {
        CheckoutError::Transport(format!("Status request failed: {}", e))
    }
}

#[async_trait]
impl StatusService for HttpStatusService {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, payment_data)))]
    async fn check_status(&self, payment_data: &str) -> Result<StatusResponse> {
        self.post_status(payment_data).await
    }
}
