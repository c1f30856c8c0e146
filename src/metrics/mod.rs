// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

use crate::subscriber::SubscriberState;

// Re-export for public API
pub use server::metrics_handler;

// ============================================================================
// Metrics Module - Prometheus metrics for the customer pipeline
// ============================================================================
//
// Covers both halves of the pipeline:
// - Publisher: delivered messages, failures by reason, publish latency
// - Subscriber: dispatched records, skipped records, broker errors, state
//
// Scraped via GET /metrics on the ingestion server.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Publisher Metrics
    pub messages_published: IntCounterVec,
    pub publish_failures: IntCounterVec,
    pub publish_duration: HistogramVec,

    // Subscriber Metrics
    pub records_consumed: IntCounterVec,
    pub records_failed: IntCounterVec,
    pub broker_errors: IntCounterVec,
    pub subscriber_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Publisher Metrics
        let messages_published = IntCounterVec::new(
            Opts::new("messages_published_total", "Messages confirmed by the broker"),
            &["topic"],
        )?;
        registry.register(Box::new(messages_published.clone()))?;

        let publish_failures = IntCounterVec::new(
            Opts::new("publish_failures_total", "Publish attempts that did not reach the log"),
            &["topic", "reason"],
        )?;
        registry.register(Box::new(publish_failures.clone()))?;

        let publish_duration = HistogramVec::new(
            HistogramOpts::new(
                "publish_duration_seconds",
                "Time from publish call to delivery report",
            )
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["topic"],
        )?;
        registry.register(Box::new(publish_duration.clone()))?;

        // Subscriber Metrics
        let records_consumed = IntCounterVec::new(
            Opts::new("records_consumed_total", "Records dispatched to the handler successfully"),
            &["topic"],
        )?;
        registry.register(Box::new(records_consumed.clone()))?;

        let records_failed = IntCounterVec::new(
            Opts::new("records_failed_total", "Records skipped by the subscriber loop"),
            &["topic", "reason"],
        )?;
        registry.register(Box::new(records_failed.clone()))?;

        let broker_errors = IntCounterVec::new(
            Opts::new("broker_errors_total", "Error events reported by the broker client"),
            &["kind"],
        )?;
        registry.register(Box::new(broker_errors.clone()))?;

        let subscriber_state = IntGauge::new(
            "subscriber_state",
            "Subscriber loop state (0=Starting, 1=Subscribed, 2=Polling, 3=Dispatching, \
             4=Stopping, 5=Closed)",
        )?;
        registry.register(Box::new(subscriber_state.clone()))?;

        Ok(Self {
            registry,
            messages_published,
            publish_failures,
            publish_duration,
            records_consumed,
            records_failed,
            broker_errors,
            subscriber_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_publish(&self, topic: &str, duration_secs: f64, failure: Option<&str>) {
        match failure {
            None => self.messages_published.with_label_values(&[topic]).inc(),
            Some(reason) => self.publish_failures.with_label_values(&[topic, reason]).inc(),
        }
        self.publish_duration.with_label_values(&[topic]).observe(duration_secs);
    }

    pub fn record_consumed(&self, topic: &str) {
        self.records_consumed.with_label_values(&[topic]).inc();
    }

    pub fn record_consume_failure(&self, topic: &str, reason: &str) {
        self.records_failed.with_label_values(&[topic, reason]).inc();
    }

    pub fn record_broker_error(&self, kind: &str) {
        self.broker_errors.with_label_values(&[kind]).inc();
    }

    pub fn update_subscriber_state(&self, state: SubscriberState) {
        self.subscriber_state.set(state.as_gauge());
    }
}
