/// How a game entered the ladder. Quick match games come from the matchmaker
/// and carry fps/duration telemetry; show matches and world-series games are
/// submitted manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GameType {
    Quickmatch,
    Showmatch,
    WorldSeries,
}

impl GameType {
    pub fn name(self) -> &'static str {
        match self {
            GameType::Quickmatch => "Quickmatch",
            GameType::Showmatch => "Showmatch",
            GameType::WorldSeries => "World Series",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            GameType::Quickmatch => "qm",
            GameType::Showmatch => "sm",
            GameType::WorldSeries => "ws",
        }
    }

    pub fn from_short_name(name: &str) -> Option<GameType> {
        match name {
            "qm" => Some(GameType::Quickmatch),
            "sm" => Some(GameType::Showmatch),
            "ws" => Some(GameType::WorldSeries),
            _ => None,
        }
    }
}
