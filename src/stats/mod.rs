pub mod aggregator;

pub use aggregator::{Aggregator, TeamRecord, Upset};
