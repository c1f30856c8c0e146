use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

use super::broker::{ConsumerFactory, LogConsumer, LogProducer, PendingDelivery, ProducerFactory};
use super::errors::{BrokerError, ConnectionError, PublishError, SubscriberError};
use super::types::{
    BrokerEvent, ConsumedRecord, DeliveryResult, MessageHeader, OutboundMessage, PartitionSelector,
};

// ============================================================================
// In-Memory Broker (tests only)
// ============================================================================
//
// Single-partition topics held in memory, with knobs for the failure modes
// the publisher and subscriber loop must survive: refused connections,
// rejected deliveries, delayed or dropped reports, slow producer handles,
// subscription failures and injected broker events.
//
// ============================================================================

const BROKERS: &str = "memory:9092";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub payload: Vec<u8>,
    pub headers: Vec<MessageHeader>,
}

#[derive(Default)]
struct State {
    topics: HashMap<String, Vec<StoredMessage>>,
    refuse_connections: bool,
    fail_subscriptions: bool,
    rejected_deliveries: VecDeque<String>,
    report_delays: VecDeque<Duration>,
    dropped_reports: usize,
    handle_latency: Option<Duration>,
    pending_events: VecDeque<BrokerEvent>,
    open_producers: usize,
    open_consumers: usize,
    closed_consumers: usize,
}

#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<State>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn producer_factory(&self) -> MemoryProducerFactory {
        MemoryProducerFactory { broker: self.clone() }
    }

    pub fn consumer_factory(&self) -> MemoryConsumerFactory {
        MemoryConsumerFactory { broker: self.clone() }
    }

    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    pub fn fail_subscriptions(&self) {
        self.state().fail_subscriptions = true;
    }

    /// The next delivery report carries `reason` and the message is not
    /// committed to the log.
    pub fn reject_next_delivery(&self, reason: impl Into<String>) {
        self.state().rejected_deliveries.push_back(reason.into());
    }

    /// Hold back the next delivery report. Requires a tokio runtime.
    pub fn delay_next_report(&self, delay: Duration) {
        self.state().report_delays.push_back(delay);
    }

    /// Drop the next delivery report without sending it.
    pub fn drop_next_report(&self) {
        self.state().dropped_reports += 1;
    }

    /// Make producer create and close block the calling thread, the way a
    /// real client does while it spawns or joins its polling thread.
    pub fn slow_producer_handles(&self, latency: Duration) {
        self.state().handle_latency = Some(latency);
    }

    /// Queue an event the next consumer poll returns ahead of any record.
    pub fn inject_event(&self, event: BrokerEvent) {
        self.state().pending_events.push_back(event);
    }

    pub fn inject_error(&self, error: BrokerError) {
        self.inject_event(BrokerEvent::Error(error));
    }

    fn handle_latency(&self) {
        let latency = self.state().handle_latency;
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }
    }

    pub fn append_raw(&self, topic: &str, payload: impl Into<Vec<u8>>) {
        self.state()
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(StoredMessage {
                payload: payload.into(),
                headers: Vec::new(),
            });
    }

    pub fn messages(&self, topic: &str) -> Vec<StoredMessage> {
        self.state().topics.get(topic).cloned().unwrap_or_default()
    }

    pub fn open_producers(&self) -> usize {
        self.state().open_producers
    }

    pub fn open_consumers(&self) -> usize {
        self.state().open_consumers
    }

    pub fn closed_consumers(&self) -> usize {
        self.state().closed_consumers
    }
}

// ----------------------------------------------------------------------------
// Producer
// ----------------------------------------------------------------------------

pub struct MemoryProducer {
    broker: InMemoryBroker,
}

impl LogProducer for MemoryProducer {
    fn enqueue(&self, message: OutboundMessage) -> Result<PendingDelivery, PublishError> {
        if let PartitionSelector::Specific(partition) = message.partition {
            if partition != 0 {
                return Err(PublishError::Enqueue {
                    topic: message.topic,
                    reason: format!("unknown partition {partition}"),
                });
            }
        }

        let (reply, receiver) = oneshot::channel();

        let (report, delay) = {
            let mut state = self.broker.state();
            if state.dropped_reports > 0 {
                state.dropped_reports -= 1;
                drop(reply);
                return Ok(Box::pin(async move { receiver.await.ok() }));
            }
            let delay = state.report_delays.pop_front();
            let report = match state.rejected_deliveries.pop_front() {
                Some(reason) => DeliveryResult::failed(&message.topic, 0, reason),
                None => {
                    let log = state.topics.entry(message.topic.clone()).or_default();
                    log.push(StoredMessage {
                        payload: message.payload,
                        headers: message.headers,
                    });
                    DeliveryResult::delivered(&message.topic, 0, (log.len() - 1) as i64)
                }
            };
            (report, delay)
        };

        match delay {
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = reply.send(report);
                });
            }
            None => {
                let _ = reply.send(report);
            }
        }

        Ok(Box::pin(async move { receiver.await.ok() }))
    }

    fn close(self) {
        self.broker.handle_latency();
        self.broker.state().open_producers -= 1;
    }
}

pub struct MemoryProducerFactory {
    broker: InMemoryBroker,
}

impl ProducerFactory for MemoryProducerFactory {
    type Producer = MemoryProducer;

    fn create(&self) -> Result<Self::Producer, ConnectionError> {
        self.broker.handle_latency();

        let mut state = self.broker.state();
        if state.refuse_connections {
            return Err(ConnectionError::new(BROKERS, "connection refused"));
        }
        state.open_producers += 1;

        Ok(MemoryProducer {
            broker: self.broker.clone(),
        })
    }
}

// ----------------------------------------------------------------------------
// Consumer
// ----------------------------------------------------------------------------

/// Always starts from the earliest offset of every subscribed topic.
pub struct MemoryConsumer {
    broker: InMemoryBroker,
    topics: Vec<String>,
    cursors: HashMap<String, usize>,
}

impl LogConsumer for MemoryConsumer {
    fn subscribe(&mut self, topics: &[String]) -> Result<(), SubscriberError> {
        if self.broker.state().fail_subscriptions {
            return Err(SubscriberError::Subscription {
                topics: topics.to_vec(),
                reason: "unknown topic or partition".to_string(),
            });
        }
        self.topics = topics.to_vec();
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Option<BrokerEvent> {
        {
            let mut state = self.broker.state();
            if let Some(event) = state.pending_events.pop_front() {
                return Some(event);
            }

            for topic in &self.topics {
                let cursor = self.cursors.entry(topic.clone()).or_insert(0);
                if let Some(stored) = state.topics.get(topic).and_then(|log| log.get(*cursor)) {
                    let record = ConsumedRecord {
                        topic: topic.clone(),
                        partition: 0,
                        offset: *cursor as i64,
                        payload: stored.payload.clone(),
                        headers: stored.headers.clone(),
                    };
                    *cursor += 1;
                    return Some(BrokerEvent::Record(record));
                }
            }
        }

        std::thread::sleep(timeout);
        None
    }

    fn close(self) {
        let mut state = self.broker.state();
        state.open_consumers -= 1;
        state.closed_consumers += 1;
    }
}

pub struct MemoryConsumerFactory {
    broker: InMemoryBroker,
}

impl ConsumerFactory for MemoryConsumerFactory {
    type Consumer = MemoryConsumer;

    fn create(&self) -> Result<Self::Consumer, ConnectionError> {
        let mut state = self.broker.state();
        if state.refuse_connections {
            return Err(ConnectionError::new(BROKERS, "connection refused"));
        }
        state.open_consumers += 1;

        Ok(MemoryConsumer {
            broker: self.broker.clone(),
            topics: Vec::new(),
            cursors: HashMap::new(),
        })
    }
}
