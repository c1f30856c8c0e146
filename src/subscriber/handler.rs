use crate::messaging::{ConsumedRecord, MESSAGE_ID_HEADER};
use crate::models::Customer;

/// Reacts to one decoded record. Runs on the subscriber loop's thread, one
/// record at a time, so a slow handler slows the whole loop.
pub trait RecordHandler: Send + 'static {
    fn handle(&mut self, record: &ConsumedRecord, customer: Customer) -> anyhow::Result<()>;
}

/// Logs every received customer.
#[derive(Debug, Default)]
pub struct LoggingHandler;

impl RecordHandler for LoggingHandler {
    fn handle(&mut self, record: &ConsumedRecord, customer: Customer) -> anyhow::Result<()> {
        let message_id = record
            .header(MESSAGE_ID_HEADER)
            .map(String::from_utf8_lossy)
            .unwrap_or_default();

        tracing::info!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            message_id = %message_id,
            customer_id = %customer.id,
            email = %customer.email,
            "Message received"
        );
        Ok(())
    }
}
