use crate::rating::glicko;

/// The supported ladders. A supported game mode carries a few specific
/// tunables; unknown ladders still work with the generic settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GameMode {
    Blitz,
    YurisRevenge,
    RedAlert2,
    RedAlert,
    RedAlert2NewMaps,
    Blitz2v2,
}

pub const ALL_GAME_MODES: [GameMode; 6] = [
    GameMode::Blitz,
    GameMode::YurisRevenge,
    GameMode::RedAlert2,
    GameMode::RedAlert,
    GameMode::RedAlert2NewMaps,
    GameMode::Blitz2v2,
];

impl GameMode {
    pub fn name(self) -> &'static str {
        match self {
            GameMode::Blitz => "RA2 Blitz",
            GameMode::YurisRevenge => "Yuris Revenge",
            GameMode::RedAlert2 => "Red Alert 2",
            GameMode::RedAlert => "Red Alert",
            GameMode::RedAlert2NewMaps => "Red Alert 2 New Maps",
            GameMode::Blitz2v2 => "Blitz 2v2",
        }
    }

    /// Matches column `abbreviation` of the upstream `ladders` table.
    pub fn short_name(self) -> &'static str {
        match self {
            GameMode::Blitz => "blitz",
            GameMode::YurisRevenge => "yr",
            GameMode::RedAlert2 => "ra2",
            GameMode::RedAlert => "ra",
            GameMode::RedAlert2NewMaps => "ra2-new-maps",
            GameMode::Blitz2v2 => "blitz-2v2",
        }
    }

    pub fn from_abbreviation(abbreviation: &str) -> Option<GameMode> {
        ALL_GAME_MODES
            .into_iter()
            .find(|mode| mode.short_name() == abbreviation || mode.name() == abbreviation)
    }

    pub fn player_count(self) -> usize {
        match self {
            GameMode::Blitz2v2 => 4,
            _ => 2,
        }
    }

    pub fn decay_factor(self) -> f64 {
        match self {
            GameMode::YurisRevenge => 2.5,
            _ => 3.5,
        }
    }

    /// Deviation ceiling for a faction that has been active at some point.
    pub fn max_deviation_after_active(self) -> f64 {
        match self {
            GameMode::YurisRevenge => 150.0,
            _ => 175.0,
        }
    }

    /// Deviation below which a faction goes active. The further the rating is
    /// from the baseline, the more games it takes.
    pub fn deviation_threshold_active(self, current_elo: f64) -> f64 {
        f64::min(
            75.0,
            65.0 + (glicko::INITIAL_RATING - current_elo).abs().sqrt(),
        )
    }

    /// Deviation above which an active faction goes inactive.
    pub fn deviation_threshold_inactive(self, current_elo: f64) -> f64 {
        let distance = (glicko::INITIAL_RATING - current_elo).abs();
        match self {
            GameMode::YurisRevenge => 85.0 + distance.ln(),
            _ => 85.0 + distance.sqrt(),
        }
    }

    /// Games needed since the first activation before peaks are recorded.
    pub fn min_games_for_peak(self) -> u32 {
        match self {
            GameMode::Blitz2v2 => 80,
            _ => 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations_round_trip() {
        for mode in ALL_GAME_MODES {
            assert_eq!(GameMode::from_abbreviation(mode.short_name()), Some(mode));
        }
        assert_eq!(GameMode::from_abbreviation("ra3"), None);
    }

    #[test]
    fn activity_threshold_is_capped() {
        let mode = GameMode::Blitz;
        assert_eq!(mode.deviation_threshold_active(1500.0), 65.0);
        // 100 points away from the baseline adds 10 to the threshold.
        assert!((mode.deviation_threshold_active(1600.0) - 75.0).abs() < 1e-9);
        // The cap kicks in further out.
        assert_eq!(mode.deviation_threshold_active(2000.0), 75.0);
    }

    #[test]
    fn yuri_mode_uses_log_inactivity_curve() {
        let yr = GameMode::YurisRevenge.deviation_threshold_inactive(1900.0);
        let blitz = GameMode::Blitz.deviation_threshold_inactive(1900.0);
        assert!(yr < blitz);
    }
}
