//! Configuration snapshot consumed by action handlers.
//!
//! The snapshot is immutable once handed to the dispatcher. Per payment-method
//! polling overrides live here as a read-only map instead of global state.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{CheckoutError, Result};

const TEST_BASE_URL: &str = "https://checkoutshopper-test.adyen.com/checkoutshopper/";
const LIVE_BASE_URL: &str = "https://checkoutshopper-live.adyen.com/checkoutshopper/";

/// Backend environment selection.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Test environment.
    #[default]
    Test,
    /// Live environment.
    Live,
    /// Self-hosted or proxied backend.
    Custom(String),
}

impl Environment {
    /// Base URL of the checkout backend, always ending with `/`.
    pub fn checkout_base_url(&self) -> Result<Url> {
        let raw = match self {
            Self::Test => TEST_BASE_URL,
            Self::Live => LIVE_BASE_URL,
            Self::Custom(url) => url.as_str(),
        };
        let mut url = Url::parse(raw)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// Polling cadence and limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfiguration {
    /// Delay between two regular status checks.
    #[serde(default = "default_interval_millis")]
    pub interval_millis: u64,

    /// Upper bound for a polling sequence when no override applies.
    #[serde(default = "default_max_duration_millis")]
    pub default_max_duration_millis: u64,

    /// Per payment-method-type maximum durations.
    #[serde(default)]
    pub max_duration_overrides_millis: HashMap<String, u64>,
}

fn default_interval_millis() -> u64 {
    1_000
}

fn default_max_duration_millis() -> u64 {
    15 * 60 * 1_000
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for PollingConfiguration {
    fn default() -> Self {
        Self {
            interval_millis: default_interval_millis(),
            default_max_duration_millis: default_max_duration_millis(),
            max_duration_overrides_millis: HashMap::new(),
        }
    }
}

impl PollingConfiguration {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }

    pub fn default_max_duration(&self) -> Duration {
        Duration::from_millis(self.default_max_duration_millis)
    }

    /// Configured override for a payment method, if any.
    pub fn max_duration_override(&self, payment_method_type: Option<&str>) -> Option<Duration> {
        payment_method_type
            .and_then(|pm| self.max_duration_overrides_millis.get(pm))
            .map(|millis| Duration::from_millis(*millis))
    }

    /// Override for the payment method, or `fallback`.
    pub fn max_duration_for(
        &self,
        payment_method_type: Option<&str>,
        fallback: Duration,
    ) -> Duration {
        self.max_duration_override(payment_method_type)
            .unwrap_or(fallback)
    }
}

/// How much analytics data the SDK may send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsLevel {
    #[default]
    All,
    None,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsConfiguration {
    #[serde(default)]
    pub level: AnalyticsLevel,
}

/// Immutable configuration snapshot shared by every handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutConfiguration {
    #[serde(default)]
    pub environment: Environment,

    /// Client key used to authenticate client-side calls.
    pub client_key: String,

    #[serde(default)]
    pub shopper_locale: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub polling: PollingConfiguration,

    #[serde(default)]
    pub analytics: AnalyticsConfiguration,
}

impl CheckoutConfiguration {
    /// Create a configuration with default polling and analytics settings.
    pub fn new(environment: Environment, client_key: impl Into<String>) -> Self {
        Self {
            environment,
            client_key: client_key.into(),
            shopper_locale: None,
            request_timeout_secs: default_request_timeout(),
            polling: PollingConfiguration::default(),
            analytics: AnalyticsConfiguration::default(),
        }
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_key.trim().is_empty() {
            return Err(CheckoutError::invalid_input("clientKey", "must not be empty"));
        }
        if self.polling.interval_millis == 0 {
            return Err(CheckoutError::invalid_input(
                "polling.intervalMillis",
                "must be positive",
            ));
        }
        if self.polling.default_max_duration_millis == 0
            || self.polling.max_duration_overrides_millis.values().any(|v| *v == 0)
        {
            return Err(CheckoutError::invalid_input(
                "polling",
                "max durations must be positive",
            ));
        }
        self.environment.checkout_base_url()?;
        Ok(())
    }

    pub fn with_shopper_locale(mut self, locale: impl Into<String>) -> Self {
        self.shopper_locale = Some(locale.into());
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling.interval_millis = interval.as_millis() as u64;
        self
    }

    pub fn with_default_max_polling_duration(mut self, duration: Duration) -> Self {
        self.polling.default_max_duration_millis = duration.as_millis() as u64;
        self
    }

    pub fn with_max_polling_duration(
        mut self,
        payment_method_type: impl Into<String>,
        duration: Duration,
    ) -> Self {
        self.polling
            .max_duration_overrides_millis
            .insert(payment_method_type.into(), duration.as_millis() as u64);
        self
    }

    pub fn with_analytics_level(mut self, level: AnalyticsLevel) -> Self {
        self.analytics.level = level;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config = CheckoutConfiguration::from_json(r#"{"clientKey":"test_KEY"}"#).unwrap();

        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.polling.interval(), Duration::from_secs(1));
        assert_eq!(
            config.polling.default_max_duration(),
            Duration::from_secs(15 * 60)
        );
    }

    #[test]
    fn test_custom_environment_gets_trailing_slash() {
        let env = Environment::Custom("https://checkout.example.com/api".into());
        assert_eq!(
            env.checkout_base_url().unwrap().as_str(),
            "https://checkout.example.com/api/"
        );
    }

    #[test]
    fn test_polling_override_lookup() {
        let config = CheckoutConfiguration::new(Environment::Test, "key")
            .with_max_polling_duration("pix", Duration::from_secs(60));

        let fallback = Duration::from_secs(900);
        assert_eq!(
            config.polling.max_duration_for(Some("pix"), fallback),
            Duration::from_secs(60)
        );
        assert_eq!(config.polling.max_duration_for(Some("upi_qr"), fallback), fallback);
        assert_eq!(config.polling.max_duration_for(None, fallback), fallback);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(CheckoutConfiguration::from_json(r#"{"clientKey":" "}"#).is_err());

        let config = CheckoutConfiguration::new(Environment::Test, "key")
            .with_max_polling_duration("pix", Duration::ZERO);
        assert!(config.validate().is_err());

        let config = CheckoutConfiguration::new(Environment::Custom("not a url".into()), "key");
        assert!(config.validate().is_err());
    }
}
