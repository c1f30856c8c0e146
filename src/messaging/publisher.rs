use std::panic;
use std::sync::Arc;
use std::time::Instant;

use tokio::task;
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::models::Customer;

use super::broker::{LogProducer, ProducerFactory};
use super::codec;
use super::errors::{ConnectionError, PublishError};
use super::types::{DeliveryResult, MessageHeader, OutboundMessage, PartitionSelector};

// ============================================================================
// Publisher
// ============================================================================
//
// One publish = one producer handle, one message, one delivery report:
//
//   create handle -> encode -> enqueue -> await own report -> close handle
//
// The report arrives on a future created for this call only, so concurrent
// publishes cannot receive each other's partition/offset. Creating and
// closing the handle run on the blocking pool so a slow connect or flush
// never stalls other tasks on the same worker. No retries happen here;
// callers decide what to do with a PublishError.
//
// ============================================================================

pub const MESSAGE_ID_HEADER: &str = "message-id";

pub struct Publisher<F: ProducerFactory> {
    factory: Arc<F>,
    topic: String,
    partition: PartitionSelector,
    headers: Vec<MessageHeader>,
    metrics: Arc<Metrics>,
}

impl<F: ProducerFactory> Publisher<F> {
    pub fn new(
        factory: F,
        topic: impl Into<String>,
        headers: Vec<MessageHeader>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            factory: Arc::new(factory),
            topic: topic.into(),
            partition: PartitionSelector::Any,
            headers,
            metrics,
        }
    }

    pub fn with_partition(mut self, partition: PartitionSelector) -> Self {
        self.partition = partition;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish one customer and wait for the broker to confirm it.
    pub async fn publish(&self, customer: &Customer) -> Result<DeliveryResult, PublishError> {
        let started = Instant::now();

        let result = match self.connect().await {
            Ok(producer) => {
                let result = self.send_and_confirm(&producer, customer).await;
                if let Err(e) = task::spawn_blocking(move || producer.close()).await {
                    tracing::warn!(error = %e, topic = %self.topic, "Producer close task failed");
                }
                result
            }
            Err(e) => Err(PublishError::Connection(e)),
        };

        let failure = result.as_ref().err().map(PublishError::reason);
        self.metrics
            .record_publish(&self.topic, started.elapsed().as_secs_f64(), failure);

        match &result {
            Ok(delivery) => tracing::info!(
                topic = %delivery.topic,
                partition = delivery.partition,
                offset = delivery.offset,
                customer_id = %customer.id,
                "Delivered message"
            ),
            Err(e) => tracing::error!(
                error = %e,
                topic = %self.topic,
                customer_id = %customer.id,
                "Failed to publish customer"
            ),
        }

        result
    }

    async fn connect(&self) -> Result<F::Producer, ConnectionError> {
        let factory = Arc::clone(&self.factory);
        match task::spawn_blocking(move || factory.create()).await {
            Ok(created) => created,
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(e) => Err(ConnectionError::new("producer", e)),
        }
    }

    async fn send_and_confirm(
        &self,
        producer: &F::Producer,
        customer: &Customer,
    ) -> Result<DeliveryResult, PublishError> {
        let payload = codec::encode(customer)?;

        let message = OutboundMessage::new(&self.topic, payload)
            .with_partition(self.partition)
            .with_headers(self.headers.iter().cloned())
            .with_header(MessageHeader::new(MESSAGE_ID_HEADER, Uuid::new_v4().to_string()));

        let pending = producer.enqueue(message)?;

        let delivery = pending.await.ok_or_else(|| PublishError::ReportDropped {
            topic: self.topic.clone(),
        })?;

        match delivery.error {
            Some(reason) => Err(PublishError::Delivery {
                topic: delivery.topic,
                reason,
            }),
            None => Ok(delivery),
        }
    }
}
