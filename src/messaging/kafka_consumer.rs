use std::time::Duration;

use rdkafka::client::ClientContext;
use rdkafka::config::{ClientConfig, RDKafkaLogLevel};
use rdkafka::consumer::{BaseConsumer, Consumer, ConsumerContext};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage, Headers, Message};
use tokio::sync::mpsc;

use crate::config::{BrokerConfig, ConsumerConfig};

use super::broker::{ConsumerFactory, LogConsumer};
use super::errors::{BrokerError, ConnectionError, SubscriberError};
use super::types::{BrokerEvent, ConsumedRecord, MessageHeader};

// ============================================================================
// Kafka Consumer
// ============================================================================
//
// librdkafka reports client-level errors (all brokers down, transport
// failures, ...) through the context's error callback while `poll` runs,
// not through the poll result. The context forwards them into a queue that
// `poll` drains, so the subscriber loop sees a single stream of
// BrokerEvents.
//
// ============================================================================

pub struct ErrorForwardingContext {
    errors: mpsc::UnboundedSender<BrokerError>,
}

impl ClientContext for ErrorForwardingContext {
    fn error(&self, error: KafkaError, reason: &str) {
        // The receiver only disappears together with the consumer.
        let _ = self.errors.send(classify(&error, reason));
    }
}

impl ConsumerContext for ErrorForwardingContext {}

pub struct KafkaConsumer {
    inner: BaseConsumer<ErrorForwardingContext>,
    errors: mpsc::UnboundedReceiver<BrokerError>,
}

impl LogConsumer for KafkaConsumer {
    fn subscribe(&mut self, topics: &[String]) -> Result<(), SubscriberError> {
        let topic_refs: Vec<&str> = topics.iter().map(|s| s.as_str()).collect();
        self.inner
            .subscribe(&topic_refs)
            .map_err(|e| SubscriberError::Subscription {
                topics: topics.to_vec(),
                reason: e.to_string(),
            })
    }

    fn poll(&mut self, timeout: Duration) -> Option<BrokerEvent> {
        if let Ok(error) = self.errors.try_recv() {
            return Some(BrokerEvent::Error(error));
        }

        match self.inner.poll(timeout) {
            Some(Ok(message)) => Some(BrokerEvent::Record(to_record(&message))),
            Some(Err(e)) => Some(poll_error_event(e)),
            None => self.errors.try_recv().ok().map(BrokerEvent::Error),
        }
    }

    fn close(self) {
        self.inner.unsubscribe();
        // Dropping the handle leaves the group and destroys the client.
        drop(self.inner);
        tracing::debug!("Closed Kafka consumer");
    }
}

pub struct KafkaConsumerFactory {
    broker: BrokerConfig,
    consumer: ConsumerConfig,
}

impl KafkaConsumerFactory {
    pub fn new(broker: BrokerConfig, consumer: ConsumerConfig) -> Self {
        Self { broker, consumer }
    }
}

impl ConsumerFactory for KafkaConsumerFactory {
    type Consumer = KafkaConsumer;

    fn create(&self) -> Result<Self::Consumer, ConnectionError> {
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let inner: BaseConsumer<ErrorForwardingContext> =
            consumer_client_config(&self.broker, &self.consumer)
                .create_with_context(ErrorForwardingContext { errors: errors_tx })
                .map_err(|e| ConnectionError::new(&self.broker.bootstrap_servers, e))?;

        tracing::info!(
            brokers = %self.broker.bootstrap_servers,
            group_id = %self.consumer.group_id,
            "Created Kafka consumer"
        );

        Ok(KafkaConsumer {
            inner,
            errors: errors_rx,
        })
    }
}

fn consumer_client_config(broker: &BrokerConfig, consumer: &ConsumerConfig) -> ClientConfig {
    let mut config = ClientConfig::new();
    config.set("bootstrap.servers", &broker.bootstrap_servers);
    // Dual-stack resolvers may list IPv6 addresses first.
    config.set("broker.address.family", broker.address_family.as_kafka_value());
    config.set("group.id", &consumer.group_id);
    config.set("session.timeout.ms", consumer.session_timeout_ms.to_string());
    config.set("auto.offset.reset", consumer.offset_reset.as_kafka_value());
    config.set_log_level(RDKafkaLogLevel::Warning);
    config
}

/// Map a librdkafka error onto the subscriber's two error classes.
fn classify(error: &KafkaError, reason: &str) -> BrokerError {
    match error.rdkafka_error_code() {
        Some(RDKafkaErrorCode::AllBrokersDown) => BrokerError::all_brokers_down(reason),
        Some(code) => BrokerError::transient(format!("{code:?}"), format!("{error}: {reason}")),
        None => BrokerError::transient("Unknown", format!("{error}: {reason}")),
    }
}

/// Errors returned in place of a message. Reaching the end of a partition is
/// informational.
fn poll_error_event(error: KafkaError) -> BrokerEvent {
    match error {
        KafkaError::PartitionEOF(partition) => {
            BrokerEvent::Other(format!("reached end of partition {partition}"))
        }
        e => BrokerEvent::Error(classify(&e, "consumer poll failed")),
    }
}

fn to_record(message: &BorrowedMessage<'_>) -> ConsumedRecord {
    let headers = message
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|header| MessageHeader::new(header.key, header.value.unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();

    ConsumedRecord {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        headers,
    }
}
