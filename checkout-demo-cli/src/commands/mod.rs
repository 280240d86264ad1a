//! CLI command implementations

pub mod handle_action;
pub mod parse_redirect;
pub mod status;

use anyhow::{Context, Result};
use checkout_core::{CheckoutConfiguration, Environment};

/// Backend selection shared by the commands that talk to the backend.
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// `test`, `live`, or a base URL.
    pub environment: String,
    pub client_key: String,
    pub request_timeout_secs: u64,
}

impl BackendOptions {
    pub fn configuration(&self) -> Result<CheckoutConfiguration> {
        let configuration = CheckoutConfiguration::new(
            parse_environment(&self.environment)?,
            self.client_key.clone(),
        )
        .with_request_timeout(self.request_timeout_secs);
        configuration
            .validate()
            .context("Invalid checkout configuration")?;
        Ok(configuration)
    }
}

pub fn parse_environment(value: &str) -> Result<Environment> {
    match value.to_ascii_lowercase().as_str() {
        "test" => Ok(Environment::Test),
        "live" => Ok(Environment::Live),
        _ => {
            url::Url::parse(value)
                .with_context(|| format!("Unknown environment '{}'", value))?;
            Ok(Environment::Custom(value.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment() {
        assert_eq!(parse_environment("TEST").unwrap(), Environment::Test);
        assert_eq!(parse_environment("live").unwrap(), Environment::Live);
        assert_eq!(
            parse_environment("http://localhost:8080/checkout/").unwrap(),
            Environment::Custom("http://localhost:8080/checkout/".into())
        );
        assert!(parse_environment("staging").is_err());
    }

    #[test]
    fn test_empty_client_key_is_rejected() {
        let options = BackendOptions {
            environment: "test".into(),
            client_key: String::new(),
            request_timeout_secs: 10,
        };
        assert!(options.configuration().is_err());
    }
}
