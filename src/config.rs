use std::time::Duration;

use clap::{Args, Parser, ValueEnum};

use crate::messaging::{MessageHeader, PartitionSelector};

// ============================================================================
// Configuration
// ============================================================================
//
// Every setting can come from a flag or an environment variable. The parsed
// structs are handed to the Kafka factories, the publisher and the
// subscriber loop; nothing reads process-wide constants.
//
// ============================================================================

#[derive(Parser, Debug, Clone)]
#[command(
    name = "customer-pipeline",
    about = "Publishes customers to a Kafka topic and consumes them back"
)]
pub struct Config {
    /// Address the HTTP ingestion endpoint binds to.
    #[arg(long, env = "HTTP_ADDR", default_value = "localhost:8080")]
    pub http_addr: String,

    #[command(flatten)]
    pub broker: BrokerConfig,

    #[command(flatten)]
    pub consumer: ConsumerConfig,

    #[command(flatten)]
    pub producer: ProducerConfig,
}

#[derive(Args, Debug, Clone)]
pub struct BrokerConfig {
    /// Kafka bootstrap servers (comma-separated).
    #[arg(long = "brokers", env = "BROKER_ADDRESS", default_value = "localhost:9092")]
    pub bootstrap_servers: String,

    /// Topic customers are published to.
    #[arg(long, env = "TOPIC", default_value = "demo")]
    pub topic: String,

    /// IP family used when resolving broker addresses.
    #[arg(long, env = "BROKER_ADDRESS_FAMILY", value_enum, default_value_t = AddressFamily::V4)]
    pub address_family: AddressFamily,
}

#[derive(Args, Debug, Clone)]
pub struct ConsumerConfig {
    #[arg(long, env = "GROUP_ID", default_value = "demo-group")]
    pub group_id: String,

    #[arg(long, env = "SESSION_TIMEOUT_MS", default_value_t = 6000)]
    pub session_timeout_ms: u64,

    /// Where to start when the group has no committed offset.
    #[arg(long, env = "OFFSET_RESET", value_enum, default_value_t = OffsetReset::Earliest)]
    pub offset_reset: OffsetReset,

    /// Upper bound on a single poll, and so on shutdown latency.
    #[arg(long, env = "POLL_TIMEOUT_MS", default_value_t = 100)]
    pub poll_timeout_ms: u64,

    /// Topics to subscribe to. Defaults to the publish topic.
    #[arg(long, env = "SUBSCRIBE_TOPICS", value_delimiter = ',')]
    pub subscribe_topics: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ProducerConfig {
    /// librdkafka `message.timeout.ms`; bounds the wait for a delivery report.
    #[arg(long, env = "DELIVERY_TIMEOUT_MS", default_value_t = 5000)]
    pub delivery_timeout_ms: u64,

    /// Pin every message to this partition. Unset lets the partitioner choose.
    #[arg(long, env = "PARTITION")]
    pub partition: Option<i32>,

    /// Share one producer across requests instead of connecting per publish.
    #[arg(long, env = "REUSE_PRODUCER")]
    pub reuse_producer: bool,

    /// Header attached to every published message, as `key=value`.
    #[arg(long = "header", value_parser = parse_header)]
    pub headers: Vec<MessageHeader>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AddressFamily {
    V4,
    V6,
    Any,
}

impl AddressFamily {
    pub fn as_kafka_value(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "v4",
            AddressFamily::V6 => "v6",
            AddressFamily::Any => "any",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OffsetReset {
    Earliest,
    Latest,
}

impl OffsetReset {
    pub fn as_kafka_value(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

impl ConsumerConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl ProducerConfig {
    pub fn partition_selector(&self) -> PartitionSelector {
        self.partition.map_or(PartitionSelector::Any, PartitionSelector::Specific)
    }
}

impl Config {
    /// Topics the subscriber loop registers for.
    pub fn subscription_topics(&self) -> Vec<String> {
        if self.consumer.subscribe_topics.is_empty() {
            vec![self.broker.topic.clone()]
        } else {
            self.consumer.subscribe_topics.clone()
        }
    }
}

fn parse_header(raw: &str) -> Result<MessageHeader, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok(MessageHeader::new(key.trim(), value)),
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}
