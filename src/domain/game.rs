use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::faction::{Faction, Setup};
use crate::domain::game_type::GameType;
use crate::domain::known_players::{self, UserId};
use crate::domain::maps;

/// One seat in a game. `elo`/`deviation` are stamped by the scheduler with
/// the player's rating at the time the game is processed, so downstream
/// statistics see the pre-game values.
#[derive(Debug, Clone)]
pub struct Participant {
    pub user_id: UserId,
    pub player_name: String,
    pub faction: Faction,
    pub has_won: bool,
    pub points: i32,
    pub elo: f64,
    pub deviation: f64,
}

/// A single ladder game. Requires an id, a map and a timestamp; fps and
/// duration are optional (0 = unknown). Manually added tournament games use
/// synthetic ids starting at 10^8.
#[derive(Debug, Clone)]
pub struct Game {
    pub id: u32,
    pub game_type: GameType,
    pub ladder: String,
    pub map_name: String,
    pub map_index: Option<usize>,
    /// Seconds since the epoch, UTC.
    pub timestamp: i64,
    /// Duration in seconds, 0 if unknown.
    pub duration: u32,
    /// Average frames per second, 0 if unknown.
    pub fps: u32,
    pub is_draw: bool,
    pub participants: Vec<Participant>,
}

impl Game {
    pub fn new(id: u32, map_name: &str, timestamp: i64, fps: u32, duration: u32) -> Game {
        Game {
            id,
            game_type: GameType::Quickmatch,
            ladder: String::new(),
            map_name: map_name.to_string(),
            map_index: maps::resolve(map_name),
            timestamp,
            duration,
            fps,
            is_draw: false,
            participants: Vec::new(),
        }
    }

    pub fn add_participant(
        &mut self,
        user_id: UserId,
        player_name: &str,
        faction: Faction,
        has_won: bool,
        points: i32,
    ) {
        self.participants.push(Participant {
            user_id,
            player_name: player_name.to_string(),
            faction,
            has_won,
            points,
            elo: 0.0,
            deviation: 0.0,
        });
    }

    pub fn player_count(&self) -> usize {
        self.participants.len()
    }

    pub fn user_id(&self, index: usize) -> UserId {
        self.participants[index].user_id
    }

    pub fn faction(&self, index: usize) -> Faction {
        self.participants[index].faction
    }

    pub fn has_won(&self, index: usize) -> bool {
        self.participants[index].has_won
    }

    /// The calendar date of the game start, UTC.
    pub fn date(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0)
            .map(|t| t.date_naive())
            .unwrap_or_default()
    }

    /// End-of-game timestamp; the chronological sort key.
    pub fn end_timestamp(&self) -> i64 {
        self.timestamp + i64::from(self.duration)
    }

    /// If winners and losers do not line up, re-derive the result from the
    /// reported points. Games that still do not line up are caught by the
    /// validity check later on.
    pub fn determine_winner(&mut self) {
        let net: i32 = self
            .participants
            .iter()
            .map(|p| if p.has_won { 1 } else { -1 })
            .sum();

        if net == 0 {
            return;
        }

        let mut retry_net = 0;
        for participant in &mut self.participants {
            participant.has_won = participant.points > 0;
            retry_net += if participant.has_won { 1 } else { -1 };
            log::info!(
                "  Trying to determine winner. Player '{}' got {} points.",
                participant.player_name,
                participant.points
            );
        }

        if retry_net != 0 {
            log::warn!(
                "Unable to determine winners in game {}. This game will probably be invalid.",
                self.id
            );
        }
    }

    /// Winning and losing players need to be equal in number for the result
    /// to make sense.
    pub fn has_valid_result(&self) -> bool {
        if self.is_draw {
            return true;
        }

        let net: i32 = self
            .participants
            .iter()
            .map(|p| if p.has_won { 1 } else { -1 })
            .sum();
        net == 0
    }

    pub fn is_valid(&self) -> bool {
        match self.participants.len() {
            4 => {
                if self.participants.iter().any(|p| p.user_id == 0) {
                    log::info!(
                        "Unable to resolve all players of game {}. This game is invalid.",
                        self.id
                    );
                    return false;
                }
                if !self.has_valid_result() {
                    log::warn!("Winning and losing players of game {} do not line up.", self.id);
                    return false;
                }
                if self.is_draw {
                    log::warn!("There is no draw in 2v2 games. Game {} is invalid.", self.id);
                    return false;
                }
                let mut ids: Vec<UserId> = self.participants.iter().map(|p| p.user_id).collect();
                ids.sort_unstable();
                ids.dedup();
                if ids.len() != 4 {
                    log::info!("Participants of game {} are duplicates. This game is invalid.", self.id);
                    return false;
                }
                self.id != 0 && self.timestamp != 0
            }
            2 => {
                if self.participants[0].user_id == self.participants[1].user_id {
                    log::info!("Game {} is between duplicates. This game is invalid.", self.id);
                    return false;
                }

                self.id != 0
                    && self.timestamp != 0
                    && self.participants[0].user_id != 0
                    && self.participants[1].user_id != 0
                    && (self.is_draw
                        || self.participants[0].has_won != self.participants[1].has_won)
            }
            _ => false,
        }
    }

    pub fn is_bot_game(&self) -> bool {
        self.participants
            .iter()
            .any(|p| p.user_id == known_players::BLITZ_BOT)
    }

    /// The winner of a 1v1 game; `None` for draws or unresolved results.
    pub fn winner_index(&self) -> Option<usize> {
        if self.participants.len() != 2 || self.is_draw {
            return None;
        }
        if self.participants[0].has_won {
            Some(0)
        } else if self.participants[1].has_won {
            Some(1)
        } else {
            log::warn!("Unable to determine winner in game {}.", self.id);
            None
        }
    }

    pub fn participant_index(&self, user_id: UserId) -> Option<usize> {
        self.participants.iter().position(|p| p.user_id == user_id)
    }

    pub fn setup(&self) -> Option<Setup> {
        if self.participants.len() != 2 {
            return None;
        }
        Setup::from_factions(self.participants[0].faction, self.participants[1].faction)
    }

    /// The team mate of the given seat in a 2v2 game.
    pub fn mate_index(&self, index: usize) -> Option<usize> {
        if self.participants.len() != 4 {
            return None;
        }
        (0..4).find(|&i| i != index && self.participants[i].has_won == self.participants[index].has_won)
    }

    /// Both opposing seats in a 2v2 game.
    pub fn opponent_indices(&self, index: usize) -> Option<(usize, usize)> {
        if self.participants.len() != 4 {
            return None;
        }
        let mut opponents = (0..4).filter(|&i| self.participants[i].has_won != self.participants[index].has_won);
        match (opponents.next(), opponents.next()) {
            (Some(first), Some(second)) => Some((first, second)),
            _ => {
                log::error!(
                    "Opponents not found in game {}. This does not seem to be a valid 2v2 game.",
                    self.id
                );
                None
            }
        }
    }

    /// Did the lower rated player win? Uses the stamped ratings.
    pub fn is_underdog_win(&self) -> bool {
        if self.participants.len() != 2 || self.is_draw {
            return false;
        }
        let [a, b] = [&self.participants[0], &self.participants[1]];
        (a.has_won && a.elo < b.elo) || (b.has_won && b.elo < a.elo)
    }

    /// Signed rating gap between losing and winning side, with the winners'
    /// deviation counted against them. Positive values indicate an upset.
    pub fn difference_for_greatest_defeat(&self) -> f64 {
        if self.is_draw {
            return 0.0;
        }

        let mut winner_elo = 0.0;
        let mut loser_elo = 0.0;
        for participant in &self.participants {
            if participant.has_won {
                winner_elo += participant.elo + participant.deviation;
            } else {
                loser_elo += participant.elo - participant.deviation;
            }
        }
        loser_elo - winner_elo
    }

    pub fn set_rating_and_deviation(&mut self, index: usize, elo: f64, deviation: f64) {
        if let Some(participant) = self.participants.get_mut(index) {
            participant.elo = elo;
            participant.deviation = deviation;
        } else {
            log::error!("Player index {index} is out of bounds.");
        }
    }

    /// Faction pairing as a string, winning faction in uppercase ("Sva").
    pub fn faction_result(&self) -> String {
        if self.participants.len() != 2 {
            log::error!("Faction result is only viable for a 1v1 game.");
            return String::new();
        }

        let mut first = self.participants[0].faction.letter().to_string();
        let mut second = self.participants[1].faction.letter().to_string();

        if self.participants[0].has_won {
            first = first.to_uppercase();
        } else if self.participants[1].has_won {
            second = second.to_uppercase();
        }

        format!("{first}v{second}")
    }

    pub fn winners(&self) -> Vec<&Participant> {
        self.participants.iter().filter(|p| p.has_won).collect()
    }

    pub fn losers(&self) -> Vec<&Participant> {
        self.participants.iter().filter(|p| !p.has_won).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_on_one(winner: UserId, loser: UserId) -> Game {
        let mut game = Game::new(77, "Alamo", 1_700_000_000, 60, 300);
        game.add_participant(winner, "w", Faction::Soviet, true, 120);
        game.add_participant(loser, "l", Faction::Allied, false, -30);
        game
    }

    #[test]
    fn a_regular_game_is_valid() {
        assert!(one_on_one(1, 2).is_valid());
    }

    #[test]
    fn duplicate_or_zero_ids_invalidate() {
        assert!(!one_on_one(1, 1).is_valid());
        assert!(!one_on_one(0, 2).is_valid());
    }

    #[test]
    fn two_winners_invalidate_unless_draw() {
        let mut game = one_on_one(1, 2);
        game.participants[1].has_won = true;
        assert!(!game.is_valid());
        game.participants[1].has_won = false;
        game.participants[0].has_won = false;
        game.is_draw = true;
        assert!(game.is_valid());
    }

    #[test]
    fn draws_are_not_allowed_in_2v2() {
        let mut game = Game::new(5, "Texas", 1_700_000_000, 60, 500);
        game.add_participant(1, "a", Faction::Soviet, true, 10);
        game.add_participant(2, "b", Faction::Soviet, true, 10);
        game.add_participant(3, "c", Faction::Allied, false, -10);
        game.add_participant(4, "d", Faction::Allied, false, -10);
        assert!(game.is_valid());
        game.is_draw = true;
        assert!(!game.is_valid());
    }

    #[test]
    fn winner_is_rederived_from_points() {
        let mut game = one_on_one(1, 2);
        game.participants[0].has_won = false;
        game.determine_winner();
        assert!(game.participants[0].has_won);
        assert!(!game.participants[1].has_won);
        assert!(game.has_valid_result());
    }

    #[test]
    fn mate_and_opponents_are_found_by_result() {
        let mut game = Game::new(6, "Texas", 1_700_000_000, 60, 500);
        game.add_participant(1, "a", Faction::Soviet, true, 10);
        game.add_participant(2, "b", Faction::Allied, false, -10);
        game.add_participant(3, "c", Faction::Soviet, true, 10);
        game.add_participant(4, "d", Faction::Allied, false, -10);
        assert_eq!(game.mate_index(0), Some(2));
        assert_eq!(game.mate_index(1), Some(3));
        assert_eq!(game.opponent_indices(0), Some((1, 3)));
    }

    #[test]
    fn upset_difference_counts_deviations_against_the_gap() {
        let mut game = one_on_one(1, 2);
        game.set_rating_and_deviation(0, 1200.0, 50.0);
        game.set_rating_and_deviation(1, 1900.0, 50.0);
        assert_eq!(game.difference_for_greatest_defeat(), 600.0);
        assert!(game.is_underdog_win());
    }

    #[test]
    fn faction_result_uppercases_the_winner() {
        let game = one_on_one(1, 2);
        assert_eq!(game.faction_result(), "Sva");
    }
}
