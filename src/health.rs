use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::subscriber::SubscriberState;

// ============================================================================
// Health Reporting
// ============================================================================

/// Health status of a component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

/// Health information for a component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    #[serde(flatten)]
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    pub details: Option<String>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// The subscriber is healthy while attached to its topics.
    pub fn from_subscriber(state: SubscriberState) -> Self {
        let status = match state {
            s if s.is_running() => HealthStatus::Healthy,
            SubscriberState::Starting => {
                HealthStatus::Degraded("subscriber is starting".to_string())
            }
            _ => HealthStatus::Unhealthy("subscriber is not consuming".to_string()),
        };

        Self::new("subscriber", status).with_details(format!("state: {state}"))
    }
}
