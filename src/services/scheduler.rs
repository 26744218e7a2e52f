//! The day-boundary batch loop: walks the chronologically ordered games,
//! closes a rating period whenever the (shifted) calendar day changes, and
//! feeds every game to the players and the aggregator.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::domain::game::Game;
use crate::domain::game_mode::GameMode;
use crate::player::Roster;
use crate::stats::Aggregator;

pub struct Scheduler {
    game_mode: GameMode,
    end_date: NaiveDate,
    time_shift_hours: i64,
}

impl Scheduler {
    pub fn new(game_mode: GameMode, end_date: NaiveDate, time_shift_hours: i64) -> Scheduler {
        Scheduler {
            game_mode,
            end_date,
            time_shift_hours,
        }
    }

    /// The rating-period day of a game: its end time, shifted by the
    /// configured hour offset.
    fn game_date(&self, game: &Game) -> Option<NaiveDate> {
        let end = DateTime::<Utc>::from_timestamp(game.end_timestamp(), 0)?;
        Some((end + Duration::hours(self.time_shift_hours)).date_naive())
    }

    /// Drive the batch. `games` must be ordered by end time; participant
    /// ratings are stamped into each game as it is processed.
    pub fn run(
        &self,
        games: &mut [Game],
        roster: &mut Roster,
        aggregator: &mut Aggregator,
    ) -> Result<()> {
        let mut previous_date: Option<NaiveDate> = None;

        for game in games.iter_mut() {
            let game_date = match self.game_date(game) {
                Some(date) => date,
                None => {
                    log::error!("Game {} has an unrepresentable timestamp.", game.id);
                    continue;
                }
            };

            if game_date >= self.end_date {
                break;
            }

            // Stamp the pre-game ratings for downstream statistics.
            for index in 0..game.player_count() {
                let user_id = game.user_id(index);
                let faction = game.faction(index);
                match roster.get(user_id) {
                    Ok(player) => {
                        let elo = player.elo(faction);
                        let deviation = player.deviation(faction);
                        game.set_rating_and_deviation(index, elo, deviation);
                    }
                    Err(error) => {
                        log::error!("Game {}: {error}", game.id);
                    }
                }
            }

            // Date switch: close the previous rating period. If the ladder
            // was silent for more than three days, catch up on the missed
            // decay; short gaps are more likely technical outages than
            // players losing interest.
            if let Some(previous) = previous_date {
                if game_date != previous {
                    log::info!("Apply update for {previous}.");
                    roster.update();
                    roster.apply(previous, true, self.game_mode);

                    let day_difference = (game_date - previous).num_days();
                    if day_difference > 3 {
                        log::info!(
                            "{} days since last game. Applying decay for {} days.",
                            day_difference,
                            day_difference - 3
                        );
                        roster.decay(day_difference - 3, self.game_mode);
                    }
                }
            }

            match roster.game_ratings(game) {
                Ok(ratings) => {
                    for index in 0..game.player_count() {
                        let user_id = game.user_id(index);
                        let processed = roster
                            .get_mut(user_id)
                            .and_then(|player| player.process_game(game, index, &ratings));
                        if let Err(error) = processed {
                            log::error!("Skipping seat {index} of game {}: {error}", game.id);
                        }
                    }

                    aggregator.process_game(game, roster);
                }
                Err(error) => {
                    log::error!("Skipping game {}: {error}", game.id);
                }
            }

            previous_date = Some(game_date);
        }

        // Close the last day.
        if roster.has_pending_games() {
            if let Some(previous) = previous_date {
                log::info!("Apply update for {previous}.");
                roster.update();
                roster.apply(previous, true, self.game_mode);
            }
        }

        roster.finalize();

        Ok(())
    }
}
