//! The collection of all (primary) players in a batch run.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::domain::faction::Faction;
use crate::domain::game::Game;
use crate::domain::game_mode::GameMode;
use crate::domain::known_players::{self, UserId};
use crate::player::state::{GameRatings, Player};

#[derive(Debug, Default)]
pub struct Roster {
    players: BTreeMap<UserId, Player>,
}

impl Roster {
    pub fn new() -> Roster {
        Roster::default()
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.players.contains_key(&user_id)
    }

    pub fn add(&mut self, player: Player) {
        if self.players.contains_key(&player.user_id()) {
            log::error!("User id {} already exists.", player.user_id());
        }
        self.players.insert(player.user_id(), player);
    }

    pub fn get(&self, user_id: UserId) -> Result<&Player> {
        self.players
            .get(&user_id)
            .ok_or_else(|| anyhow!("no player for user id {user_id}"))
    }

    pub fn get_mut(&mut self, user_id: UserId) -> Result<&mut Player> {
        self.players
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("no player for user id {user_id}"))
    }

    pub fn user_id_from_alias(&self, alias: &str) -> Option<UserId> {
        self.players
            .values()
            .find(|player| player.has_alias() && player.alias() == alias)
            .map(|player| player.user_id())
    }

    pub fn is_test_account(&self, user_id: UserId) -> bool {
        known_players::is_test_account(user_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Capture every seat's current rating and activity before the game
    /// mutates anyone. Handed into `Player::process_game` as the opponent
    /// lookup.
    pub fn game_ratings(&self, game: &Game) -> Result<GameRatings> {
        let mut triples = Vec::with_capacity(game.player_count());
        let mut was_active = Vec::with_capacity(game.player_count());

        for participant in &game.participants {
            let player = self.get(participant.user_id)?;
            triples.push(player.rating(participant.faction).to_array());
            was_active.push(player.was_ever_active());
        }

        Ok(GameRatings { triples, was_active })
    }

    /// Run the pending rating updates for everyone who has games.
    pub fn update(&mut self) {
        for player in self.players.values_mut() {
            if player.game_count() == 0 && player.pending_game_count() == 0 {
                continue;
            }
            player.update();
        }
    }

    pub fn apply(&mut self, date: NaiveDate, decay: bool, game_mode: GameMode) {
        for player in self.players.values_mut() {
            player.apply(date, decay, game_mode);
        }
    }

    /// Idle-day catch-up: one decay step per day for every faction of every
    /// player.
    pub fn decay(&mut self, days: i64, game_mode: GameMode) {
        for _ in 0..days {
            for player in self.players.values_mut() {
                player.decay_all(game_mode);
            }
        }
    }

    pub fn has_pending_games(&self) -> bool {
        self.players
            .values()
            .any(|player| player.pending_game_count() > 0)
    }

    pub fn finalize(&mut self) {
        for player in self.players.values_mut() {
            player.finalize();
        }
    }

    pub fn active_player_count(&self) -> u32 {
        self.players
            .values()
            .filter(|player| player.is_any_active())
            .count() as u32
    }

    /// Rank the currently active players, best first. 2v2 ladders rank by
    /// the Combined elo, everything else by the best active faction.
    pub fn active_ranks(&self, game_mode: GameMode) -> BTreeMap<UserId, u32> {
        let mut active: Vec<&Player> = self
            .players
            .values()
            .filter(|player| player.is_any_active())
            .collect();

        let sort_key = |player: &Player| -> f64 {
            if game_mode == GameMode::Blitz2v2 {
                player.elo(Faction::Combined)
            } else {
                player.max_rating(false)
            }
        };

        active.sort_by(|a, b| {
            sort_key(b)
                .partial_cmp(&sort_key(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.user_id().cmp(&b.user_id()))
        });

        active
            .iter()
            .enumerate()
            .map(|(i, player)| (player.user_id(), i as u32 + 1))
            .collect()
    }

    /// Rank everyone who ever recorded a peak, best peak first.
    pub fn alltime_ranks(&self, game_mode: GameMode) -> BTreeMap<UserId, u32> {
        let peak_of = |player: &Player| {
            if game_mode == GameMode::Blitz2v2 {
                player.peak_rating(Faction::Combined)
            } else {
                player.peak()
            }
        };

        let mut peaked: Vec<&Player> = self
            .players
            .values()
            .filter(|player| peak_of(player).is_set())
            .collect();

        peaked.sort_by(|a, b| {
            peak_of(b)
                .adjusted_elo
                .partial_cmp(&peak_of(a).adjusted_elo)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.user_id().cmp(&b.user_id()))
        });

        peaked
            .iter()
            .enumerate()
            .map(|(i, player)| (player.user_id(), i as u32 + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::glicko::Rating;

    fn roster_with(ids: &[UserId]) -> Roster {
        let mut roster = Roster::new();
        for &id in ids {
            roster.add(Player::new(id, &format!("acc{id}"), GameMode::RedAlert2));
        }
        roster
    }

    #[test]
    fn lookups_fail_for_unknown_players() {
        let roster = roster_with(&[1]);
        assert!(roster.get(1).is_ok());
        assert!(roster.get(2).is_err());
    }

    #[test]
    fn game_ratings_capture_the_right_factions() {
        let mut roster = roster_with(&[1, 2]);
        roster.get_mut(2).unwrap().set_alias("Them");

        let mut game = Game::new(1, "Alamo", 1_714_521_600, 60, 100);
        game.add_participant(1, "a", Faction::Soviet, true, 5);
        game.add_participant(2, "b", Faction::Allied, false, -5);

        let ratings = roster.game_ratings(&game).unwrap();
        assert_eq!(ratings.triples.len(), 2);
        assert_eq!(ratings.triples[0], Rating::default().to_array());
    }

    #[test]
    fn active_ranks_order_by_rating() {
        let mut roster = roster_with(&[1, 2, 3]);

        for (id, elo) in [(1u32, 1600.0), (2u32, 1800.0)] {
            let player = roster.get_mut(id).unwrap();
            player.force_rating(Faction::Soviet, Rating::from_elo(elo, 50.0, 0.06));
            player.apply(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), false, GameMode::RedAlert2);
        }

        let ranks = roster.active_ranks(GameMode::RedAlert2);
        assert_eq!(ranks.get(&2), Some(&1));
        assert_eq!(ranks.get(&1), Some(&2));
        assert_eq!(ranks.get(&3), None);
    }
}
