use super::errors::BrokerError;

// ============================================================================
// Message Types
// ============================================================================

/// Where the producer should place a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionSelector {
    Specific(i32),
    /// Let the broker client assign the partition.
    #[default]
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub key: String,
    pub value: Vec<u8>,
}

impl MessageHeader {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A single message handed to a producer. Headers keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub partition: PartitionSelector,
    pub payload: Vec<u8>,
    pub headers: Vec<MessageHeader>,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition: PartitionSelector::Any,
            payload,
            headers: Vec::new(),
        }
    }

    pub fn with_partition(mut self, partition: PartitionSelector) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_header(mut self, header: MessageHeader) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = MessageHeader>) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Outcome of one produced message, reported exactly once by the broker
/// client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn delivered(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            error: None,
        }
    }

    pub fn failed(topic: impl Into<String>, partition: i32, error: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset: -1,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
    pub headers: Vec<MessageHeader>,
}

impl ConsumedRecord {
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|h| h.key == key)
            .map(|h| h.value.as_slice())
    }
}

/// Everything a consumer poll can yield.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    Record(ConsumedRecord),
    Error(BrokerError),
    /// Events the subscriber does not act on (partition EOF, ...).
    Other(String),
}
