// ============================================================================
// Messaging Module
// ============================================================================
//
// Everything between a Customer and the Kafka log:
// - codec           - Customer <-> payload bytes
// - types / errors  - messages, delivery results, broker events, error taxonomy
// - broker          - producer/consumer traits the pipeline is written against
// - kafka_*         - rdkafka-backed implementations of those traits
// - publisher       - publish one customer and wait for its delivery report
//
// ============================================================================

mod broker;
pub mod codec;
mod errors;
mod kafka_consumer;
mod kafka_producer;
mod publisher;
mod types;

#[cfg(test)]
pub(crate) mod memory;

pub use broker::{ConsumerFactory, LogConsumer, ProducerFactory};
pub use errors::{BrokerError, PublishError, SubscriberError};
pub use kafka_consumer::KafkaConsumerFactory;
pub use kafka_producer::KafkaProducerFactory;
pub use publisher::{Publisher, MESSAGE_ID_HEADER};
pub use types::{BrokerEvent, ConsumedRecord, MessageHeader, PartitionSelector};

#[cfg(test)]
pub use errors::ConnectionError;
