// ============================================================================
// Subscriber Module
// ============================================================================
//
// Background consumer of the customer topic:
// - state   - lifecycle states, stop reasons, state channel
// - handler - what to do with each decoded customer
// - runner  - the poll/dispatch loop itself
//
// ============================================================================

mod handler;
mod runner;
mod state;

pub use handler::LoggingHandler;
pub use runner::SubscriberLoop;
pub use state::{state_channel, StopReason, SubscriberState};
