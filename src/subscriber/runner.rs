use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::messaging::{
    codec, BrokerError, BrokerEvent, ConsumedRecord, ConsumerFactory, LogConsumer, SubscriberError,
};
use crate::metrics::Metrics;

use super::handler::RecordHandler;
use super::state::{StopReason, SubscriberState};

// ============================================================================
// Subscriber Loop
// ============================================================================
//
// Runs on the blocking pool and owns its consumer handle exclusively.
//
// - Connection and subscription failures are fatal and returned as errors.
// - A record that fails to decode, or whose handler fails or panics, is
//   logged and skipped.
// - Broker errors are informational except AllBrokersDown, which stops the
//   loop.
// - The cancellation token is checked once per poll, so a stop request is
//   seen within one poll timeout.
// - The consumer is closed on every path out of the poll phase.
//
// ============================================================================

pub struct SubscriberLoop<F: ConsumerFactory, H: RecordHandler> {
    factory: F,
    handler: H,
    topics: Vec<String>,
    poll_timeout: Duration,
    metrics: Arc<Metrics>,
    state: watch::Sender<SubscriberState>,
}

impl<F: ConsumerFactory, H: RecordHandler> SubscriberLoop<F, H> {
    pub fn new(
        factory: F,
        handler: H,
        topics: Vec<String>,
        poll_timeout: Duration,
        metrics: Arc<Metrics>,
        state: watch::Sender<SubscriberState>,
    ) -> Self {
        Self {
            factory,
            handler,
            topics,
            poll_timeout,
            metrics,
            state,
        }
    }

    /// Start the loop on the blocking pool. The returned handle resolves once
    /// the consumer has been closed.
    pub fn spawn(
        self,
        token: CancellationToken,
    ) -> JoinHandle<Result<StopReason, SubscriberError>> {
        tokio::task::spawn_blocking(move || self.run(token))
    }

    pub fn run(mut self, token: CancellationToken) -> Result<StopReason, SubscriberError> {
        self.transition(SubscriberState::Starting);

        let mut consumer = match self.factory.create() {
            Ok(consumer) => consumer,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create consumer");
                self.transition(SubscriberState::Closed);
                return Err(e.into());
            }
        };

        if let Err(e) = consumer.subscribe(&self.topics) {
            tracing::error!(error = %e, "Failed to subscribe");
            self.close(consumer);
            return Err(e);
        }

        self.transition(SubscriberState::Subscribed);
        tracing::info!(
            topics = ?self.topics,
            poll_timeout_ms = self.poll_timeout.as_millis() as u64,
            "Subscribed to topics"
        );

        let reason = self.poll_until_stopped(&mut consumer, &token);

        self.close(consumer);
        Ok(reason)
    }

    fn poll_until_stopped(
        &mut self,
        consumer: &mut F::Consumer,
        token: &CancellationToken,
    ) -> StopReason {
        loop {
            if token.is_cancelled() {
                tracing::info!("Stop requested, leaving poll loop");
                return StopReason::ShutdownRequested;
            }

            self.transition(SubscriberState::Polling);

            let event = match consumer.poll(self.poll_timeout) {
                Some(event) => event,
                None => continue,
            };

            match event {
                BrokerEvent::Record(record) => {
                    self.transition(SubscriberState::Dispatching);
                    self.dispatch(record);
                }
                BrokerEvent::Error(error) => {
                    if self.on_broker_error(&error) {
                        return StopReason::AllBrokersDown;
                    }
                }
                BrokerEvent::Other(description) => {
                    tracing::debug!(event = %description, "Ignored broker event");
                }
            }
        }
    }

    /// Returns true when the error means the loop cannot make progress.
    fn on_broker_error(&self, error: &BrokerError) -> bool {
        self.metrics.record_broker_error(error.kind.as_str());

        if error.is_fatal() {
            tracing::error!(
                code = %error.code,
                reason = %error.reason,
                "All brokers are down, stopping subscriber"
            );
            return true;
        }

        tracing::warn!(
            code = %error.code,
            reason = %error.reason,
            "Broker error, client will attempt to recover"
        );
        false
    }

    fn dispatch(&mut self, record: ConsumedRecord) {
        let customer = match codec::decode(&record.payload) {
            Ok(customer) => customer,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    "Skipping record that could not be decoded"
                );
                self.metrics.record_consume_failure(&record.topic, "decode");
                return;
            }
        };

        let handler = &mut self.handler;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&record, customer)));

        match outcome {
            Ok(Ok(())) => self.metrics.record_consumed(&record.topic),
            Ok(Err(e)) => {
                tracing::error!(
                    error = %e,
                    topic = %record.topic,
                    offset = record.offset,
                    "Handler failed"
                );
                self.metrics.record_consume_failure(&record.topic, "handler");
            }
            Err(_) => {
                tracing::error!(
                    topic = %record.topic,
                    offset = record.offset,
                    "Handler panicked"
                );
                self.metrics.record_consume_failure(&record.topic, "handler_panic");
            }
        }
    }

    fn close(&self, consumer: F::Consumer) {
        self.transition(SubscriberState::Stopping);
        tracing::info!("Closing consumer");
        consumer.close();
        self.transition(SubscriberState::Closed);
    }

    fn transition(&self, next: SubscriberState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });

        if changed {
            self.metrics.update_subscriber_state(next);
            tracing::trace!(state = %next, "Subscriber state changed");
        }
    }
}
