use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::domain::game_mode::GameMode;
use crate::identity::DuplicatePolicy;

/// Everything the batch run needs to know up front. Construction fails on
/// unknown ladders; nothing is validated lazily.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub game_mode: GameMode,
    /// Ladder abbreviation, e.g. "blitz".
    pub ladder: String,
    /// Games whose (shifted) day is on or after this date are ignored.
    pub end_date: NaiveDate,
    /// Hour offset applied when bucketing game end times into days.
    pub time_shift_hours: i64,
    pub duplicate_policy: DuplicatePolicy,
    /// Optional JSON file with manually submitted tournament games.
    pub tournament_file: Option<PathBuf>,
    /// Compute everything but skip the final database write.
    pub dry_run: bool,
}

impl EngineSettings {
    pub fn for_ladder(abbreviation: &str, end_date: NaiveDate) -> Result<EngineSettings> {
        let Some(game_mode) = GameMode::from_abbreviation(abbreviation) else {
            bail!("'{abbreviation}' is no known abbreviation for a ladder");
        };

        if abbreviation == "ra2-new-maps" {
            log::info!(
                "Ladder 'ra2-new-maps' is usually integrated in the ra2 ladder, but computing elo for it separately will work."
            );
        }

        Ok(EngineSettings {
            game_mode,
            ladder: abbreviation.to_string(),
            end_date,
            time_shift_hours: 0,
            duplicate_policy: DuplicatePolicy::UseHints,
            tournament_file: None,
            dry_run: false,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> DatabaseSettings {
        DatabaseSettings {
            path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "elogen.db".to_string()),
        }
    }
}

pub fn parse_duplicate_policy(value: &str) -> Result<DuplicatePolicy> {
    match value {
        "hints" => Ok(DuplicatePolicy::UseHints),
        "primary" => Ok(DuplicatePolicy::UsePrimaryMapping),
        "ignore" => Ok(DuplicatePolicy::Ignore),
        other => bail!("unknown duplicate policy '{other}' (use hints, primary or ignore)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn known_ladders_resolve() {
        let settings = EngineSettings::for_ladder("blitz", end_date()).unwrap();
        assert_eq!(settings.game_mode, GameMode::Blitz);
        assert_eq!(settings.ladder, "blitz");
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::UseHints);
    }

    #[test]
    fn unknown_ladders_are_a_configuration_error() {
        assert!(EngineSettings::for_ladder("tiberian-sun", end_date()).is_err());
    }

    #[test]
    fn duplicate_policies_parse() {
        assert_eq!(parse_duplicate_policy("hints").unwrap(), DuplicatePolicy::UseHints);
        assert_eq!(parse_duplicate_policy("ignore").unwrap(), DuplicatePolicy::Ignore);
        assert!(parse_duplicate_policy("maybe").is_err());
    }
}
