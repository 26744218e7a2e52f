pub mod glicko;
pub mod probabilities;

pub use glicko::{CalculationType, Rating, RatingTriple};
pub use probabilities::{ProbResult, Probabilities};
