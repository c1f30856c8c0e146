use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use super::errors::{ConnectionError, PublishError, SubscriberError};
use super::types::{BrokerEvent, DeliveryResult, OutboundMessage};

// ============================================================================
// Broker Seams
// ============================================================================
//
// The publisher and the subscriber loop only talk to these traits. Kafka
// adapters live in kafka_producer / kafka_consumer; tests use the in-memory
// broker.
//
// ============================================================================

/// Resolves once with one message's delivery report. `None` means the broker
/// client dropped the report without delivering it.
pub type PendingDelivery = Pin<Box<dyn Future<Output = Option<DeliveryResult>> + Send>>;

/// A producer connection handle.
///
/// Creating and closing a handle may block on the broker client; callers on
/// an async runtime move both onto the blocking pool.
pub trait LogProducer: Send + Sync + 'static {
    /// Hand one message to the broker client.
    ///
    /// The returned future belongs to this message alone.
    fn enqueue(&self, message: OutboundMessage) -> Result<PendingDelivery, PublishError>;

    /// Flush outstanding work and release the handle.
    fn close(self)
    where
        Self: Sized;
}

/// A shared producer is only torn down by its last owner.
impl<P: LogProducer> LogProducer for Arc<P> {
    fn enqueue(&self, message: OutboundMessage) -> Result<PendingDelivery, PublishError> {
        self.as_ref().enqueue(message)
    }

    fn close(self) {
        if let Ok(producer) = Arc::try_unwrap(self) {
            producer.close();
        }
    }
}

pub trait ProducerFactory: Send + Sync + 'static {
    type Producer: LogProducer;

    fn create(&self) -> Result<Self::Producer, ConnectionError>;
}

/// A consumer connection handle, owned by exactly one subscriber loop.
pub trait LogConsumer: Send + 'static {
    fn subscribe(&mut self, topics: &[String]) -> Result<(), SubscriberError>;

    /// Wait at most `timeout` for the next event. `None` means nothing was
    /// available.
    fn poll(&mut self, timeout: Duration) -> Option<BrokerEvent>;

    fn close(self)
    where
        Self: Sized;
}

pub trait ConsumerFactory: Send + 'static {
    type Consumer: LogConsumer;

    fn create(&self) -> Result<Self::Consumer, ConnectionError>;
}
