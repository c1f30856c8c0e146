use std::sync::Arc;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};

use crate::config::{BrokerConfig, ProducerConfig};

use super::broker::{LogProducer, PendingDelivery, ProducerFactory};
use super::errors::{ConnectionError, PublishError};
use super::types::{DeliveryResult, OutboundMessage, PartitionSelector};

// ============================================================================
// Kafka Producer
// ============================================================================
//
// Built on rdkafka's FutureProducer: every send gets its own DeliveryFuture,
// so concurrent publishers never see each other's reports. Connecting spawns
// librdkafka's polling thread and closing flushes and joins it; both block.
//
// ============================================================================

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaProducer {
    inner: FutureProducer,
}

impl KafkaProducer {
    pub fn connect(
        broker: &BrokerConfig,
        producer: &ProducerConfig,
    ) -> Result<Self, ConnectionError> {
        let inner: FutureProducer = producer_client_config(broker, producer)
            .create()
            .map_err(|e| ConnectionError::new(&broker.bootstrap_servers, e))?;

        tracing::debug!(
            brokers = %broker.bootstrap_servers,
            "Created Kafka producer"
        );

        Ok(Self { inner })
    }
}

impl LogProducer for KafkaProducer {
    fn enqueue(&self, message: OutboundMessage) -> Result<PendingDelivery, PublishError> {
        let headers = message
            .headers
            .iter()
            .fold(OwnedHeaders::new(), |headers, header| {
                headers.insert(Header {
                    key: header.key.as_str(),
                    value: Some(header.value.as_slice()),
                })
            });

        let mut record = FutureRecord::<(), [u8]>::to(&message.topic)
            .payload(message.payload.as_slice())
            .headers(headers);

        if let PartitionSelector::Specific(partition) = message.partition {
            record = record.partition(partition);
        }

        let delivery = self
            .inner
            .send_result(record)
            .map_err(|(e, _record)| PublishError::Enqueue {
                topic: message.topic.clone(),
                reason: e.to_string(),
            })?;

        let topic = message.topic;
        Ok(Box::pin(async move {
            match delivery.await {
                Ok(Ok(delivered)) => Some(DeliveryResult::delivered(
                    topic,
                    delivered.partition,
                    delivered.offset,
                )),
                Ok(Err((error, message))) => Some(DeliveryResult::failed(
                    message.topic(),
                    message.partition(),
                    error.to_string(),
                )),
                Err(_canceled) => None,
            }
        }))
    }

    fn close(self) {
        if let Err(e) = self.inner.flush(FLUSH_TIMEOUT) {
            tracing::warn!(error = %e, "Producer flush did not complete before close");
        }
        tracing::debug!("Closed Kafka producer");
    }
}

/// Hands out producer handles: a fresh connection per publish, or clones of
/// one shared producer when reuse is enabled.
pub struct KafkaProducerFactory {
    broker: BrokerConfig,
    producer: ProducerConfig,
    shared: Option<Arc<KafkaProducer>>,
}

impl KafkaProducerFactory {
    pub fn new(broker: BrokerConfig, producer: ProducerConfig) -> Result<Self, ConnectionError> {
        let shared = if producer.reuse_producer {
            Some(Arc::new(KafkaProducer::connect(&broker, &producer)?))
        } else {
            None
        };

        Ok(Self {
            broker,
            producer,
            shared,
        })
    }
}

impl ProducerFactory for KafkaProducerFactory {
    type Producer = Arc<KafkaProducer>;

    fn create(&self) -> Result<Self::Producer, ConnectionError> {
        match &self.shared {
            Some(shared) => Ok(Arc::clone(shared)),
            None => KafkaProducer::connect(&self.broker, &self.producer).map(Arc::new),
        }
    }
}

fn producer_client_config(broker: &BrokerConfig, producer: &ProducerConfig) -> ClientConfig {
    let mut config = ClientConfig::new();
    config.set("bootstrap.servers", &broker.bootstrap_servers);
    config.set("broker.address.family", broker.address_family.as_kafka_value());
    config.set("message.timeout.ms", producer.delivery_timeout_ms.to_string());
    config
}
