pub mod coordinator;
pub mod outcome;
pub mod retry;

pub use coordinator::IngestionCoordinator;
pub use outcome::{BatchReport, DocumentState, Outcome, OutcomeStatus, ReasonCode};
pub use retry::RetryPolicy;
