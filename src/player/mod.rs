pub mod roster;
pub mod state;

pub use roster::Roster;
pub use state::{GameRatings, PeakRating, Player, RatedGame};
