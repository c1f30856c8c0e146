use std::fmt;

use tokio::sync::watch;

/// Lifecycle of the subscriber loop.
///
/// `Starting -> Subscribed -> Polling <-> Dispatching -> Stopping -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Starting,
    Subscribed,
    Polling,
    Dispatching,
    Stopping,
    Closed,
}

impl SubscriberState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberState::Starting => "starting",
            SubscriberState::Subscribed => "subscribed",
            SubscriberState::Polling => "polling",
            SubscriberState::Dispatching => "dispatching",
            SubscriberState::Stopping => "stopping",
            SubscriberState::Closed => "closed",
        }
    }

    pub fn as_gauge(&self) -> i64 {
        match self {
            SubscriberState::Starting => 0,
            SubscriberState::Subscribed => 1,
            SubscriberState::Polling => 2,
            SubscriberState::Dispatching => 3,
            SubscriberState::Stopping => 4,
            SubscriberState::Closed => 5,
        }
    }

    /// True while the loop is attached to its topics and making progress.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            SubscriberState::Subscribed | SubscriberState::Polling | SubscriberState::Dispatching
        )
    }
}

impl fmt::Display for SubscriberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel the loop publishes its state on; the receiver side feeds /health.
pub fn state_channel() -> (watch::Sender<SubscriberState>, watch::Receiver<SubscriberState>) {
    watch::channel(SubscriberState::Starting)
}

/// Why the loop left the polling phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown coordinator asked the loop to stop.
    ShutdownRequested,
    /// The broker client reported that no broker is reachable.
    AllBrokersDown,
}

impl StopReason {
    pub fn is_clean(&self) -> bool {
        matches!(self, StopReason::ShutdownRequested)
    }
}
