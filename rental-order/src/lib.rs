pub mod cancellation;
pub mod error;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod probe;

#[cfg(test)]
mod testing;

pub use cancellation::CancellationHandler;
pub use error::{BookingError, ErrorKind, LastError};
pub use history::BookingHistory;
pub use models::{AvailabilitySnapshot, BookingDraft, BookingSnapshot, BookingState};
pub use orchestrator::{BookingOrchestrator, OrchestratorConfig};
pub use probe::{AvailabilityProbe, ProbeOutcome};
