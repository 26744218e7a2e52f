pub mod normalizer;
pub mod processing;
pub mod scheduler;

pub use processing::{ProcessingOutcome, ProcessingService};
pub use scheduler::Scheduler;
