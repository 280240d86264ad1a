//! Analytics notification seam.

use serde::{Deserialize, Serialize};

use crate::config::{AnalyticsLevel, CheckoutConfiguration};

/// Sent once when an action component starts its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSetup {
    pub component: String,
    pub shopper_locale: Option<String>,
    pub level: AnalyticsLevel,
}

impl AnalyticsSetup {
    pub fn new(component: impl Into<String>, configuration: &CheckoutConfiguration) -> Self {
        Self {
            component: component.into(),
            shopper_locale: configuration.shopper_locale.clone(),
            level: configuration.analytics.level,
        }
    }
}

pub trait AnalyticsSender: Send + Sync {
    fn setup_analytics(&self, setup: AnalyticsSetup);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAnalyticsSender;

impl AnalyticsSender for NoOpAnalyticsSender {
    fn setup_analytics(&self, _setup: AnalyticsSetup) {}
}
