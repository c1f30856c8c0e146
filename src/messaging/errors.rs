use std::fmt;

// ============================================================================
// Messaging Errors
// ============================================================================
//
// Fatal at startup:     ConnectionError, SubscriberError::Subscription
// Per unit of work:     CodecError, PublishError::{Enqueue, Delivery, ...}
// Reported by broker:   BrokerError (Transient or AllBrokersDown)
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Failed to encode customer: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("Failed to decode customer: {0}")]
    Decoding(#[source] serde_json::Error),
}

/// The broker client handle could not be constructed.
#[derive(Debug, thiserror::Error)]
#[error("Failed to connect to broker at {brokers}: {reason}")]
pub struct ConnectionError {
    pub brokers: String,
    pub reason: String,
}

impl ConnectionError {
    pub fn new(brokers: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            brokers: brokers.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Encoding(#[from] CodecError),

    #[error("Failed to enqueue message for topic {topic}: {reason}")]
    Enqueue { topic: String, reason: String },

    #[error("Delivery to topic {topic} failed: {reason}")]
    Delivery { topic: String, reason: String },

    #[error("Delivery report for topic {topic} was dropped before completion")]
    ReportDropped { topic: String },
}

impl PublishError {
    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            PublishError::Connection(_) => "connection",
            PublishError::Encoding(_) => "encoding",
            PublishError::Enqueue { .. } => "enqueue",
            PublishError::Delivery { .. } => "delivery",
            PublishError::ReportDropped { .. } => "report_dropped",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Failed to subscribe to topics {topics:?}: {reason}")]
    Subscription { topics: Vec<String>, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerErrorKind {
    /// The client is expected to recover on its own (leader election,
    /// a single broker transport failure, ...).
    Transient,
    /// No broker is reachable; the subscriber cannot make progress.
    AllBrokersDown,
}

impl BrokerErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerErrorKind::Transient => "transient",
            BrokerErrorKind::AllBrokersDown => "all_brokers_down",
        }
    }
}

/// An error event reported by the broker client outside of any single
/// publish or record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {reason}")]
pub struct BrokerError {
    pub kind: BrokerErrorKind,
    pub code: String,
    pub reason: String,
}

impl BrokerError {
    pub fn transient(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::Transient,
            code: code.into(),
            reason: reason.into(),
        }
    }

    pub fn all_brokers_down(reason: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::AllBrokersDown,
            code: "AllBrokersDown".to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == BrokerErrorKind::AllBrokersDown
    }
}
