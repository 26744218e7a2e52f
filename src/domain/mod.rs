pub mod faction;
pub mod game;
pub mod game_mode;
pub mod game_type;
pub mod known_players;
pub mod maps;

pub use faction::{Faction, Setup, FACTION_COUNT};
pub use game::{Game, Participant};
pub use game_mode::GameMode;
pub use game_type::GameType;
pub use known_players::UserId;
