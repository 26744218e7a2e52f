//! Per-player rating state: one Glicko-2 rating per faction plus the
//! bookkeeping derived from it (activity, peaks, head-to-head records).

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};

use crate::domain::faction::{Faction, Setup, ALL_FACTIONS, FACTION_COUNT};
use crate::domain::game::Game;
use crate::domain::game_mode::GameMode;
use crate::domain::game_type::GameType;
use crate::domain::known_players::{self, UserId};
use crate::rating::glicko::{
    self, CalculationType, Rating, RatingTriple, INITIAL_VOLATILITY, SCALE_FACTOR,
    TEAM_SHARE_EXPONENT,
};
use crate::rating::probabilities::Probabilities;

/// Highest value of `elo - deviation` reached while active. `adjusted_elo`
/// of -1 marks a peak that was never set.
#[derive(Debug, Clone, Copy)]
pub struct PeakRating {
    pub date: Option<NaiveDate>,
    pub adjusted_elo: f64,
    pub deviation: f64,
    pub faction: Faction,
}

impl PeakRating {
    fn unset(faction: Faction) -> PeakRating {
        PeakRating {
            date: None,
            adjusted_elo: -1.0,
            deviation: -1.0,
            faction,
        }
    }

    pub fn is_set(&self) -> bool {
        self.adjusted_elo > 0.0
    }
}

/// Entry of the highest-rated-victories / lowest-rated-defeats lists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatedGame {
    pub game_id: u32,
    pub rating_difference: f64,
}

const TOP_LIST_CAPACITY: usize = 20;

fn insert_top_rated(list: &mut Vec<RatedGame>, entry: RatedGame) {
    list.push(entry);
    list.sort_by(|a, b| {
        b.rating_difference
            .partial_cmp(&a.rating_difference)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.game_id.cmp(&b.game_id))
    });
    list.truncate(TOP_LIST_CAPACITY);
}

/// Ratings and activity flags of every seat in a game, captured from the
/// roster before any seat is mutated. This is the lookup capability handed
/// into `Player::process_game`; players hold no reference back to the
/// roster.
#[derive(Debug, Clone)]
pub struct GameRatings {
    pub triples: Vec<RatingTriple>,
    pub was_active: Vec<bool>,
}

impl GameRatings {
    fn elo(&self, index: usize) -> f64 {
        self.triples[index][glicko::MU] * SCALE_FACTOR + glicko::INITIAL_RATING
    }

    fn elo_deviation(&self, index: usize) -> f64 {
        self.triples[index][glicko::PHI] * SCALE_FACTOR
    }
}

/// A single (primary) ladder account and everything the batch accumulates
/// for it.
#[derive(Debug, Clone)]
pub struct Player {
    user_id: UserId,
    account: String,
    alias: Option<String>,

    wins: u32,
    losses: u32,
    draws: u32,

    /// Quick match names actually used, with usage counts. Feeds the alias
    /// fallback for players the community never named.
    used_qm_names: BTreeMap<String, u32>,

    /// Player names per ladder.
    names: BTreeMap<String, Vec<String>>,

    ratings: [Rating; FACTION_COUNT],
    game_count: [u32; FACTION_COUNT],
    peak_ratings: [PeakRating; FACTION_COUNT],

    first_game: Option<NaiveDate>,
    last_game: Option<NaiveDate>,

    pending_games: [Vec<RatingTriple>; FACTION_COUNT],
    pending_results: [Vec<f64>; FACTION_COUNT],

    /// Set per faction when the current rating period saw at least one
    /// game; decides between apply and decay.
    updated: [bool; FACTION_COUNT],

    /// Alternating dates on which the player went active (even indices)
    /// and inactive (odd indices). Odd length means currently active.
    status_list: Vec<NaiveDate>,
    faction_status: [Vec<NaiveDate>; FACTION_COUNT],

    /// Per-day `(elo, deviation)` snapshot per faction, keyed
    /// `y*10000 + m*100 + d`. Inactive factions store (-1, 0).
    elo_by_date: BTreeMap<u32, [(f64, f64); FACTION_COUNT]>,

    highest_rated_victories: Vec<RatedGame>,
    lowest_rated_defeats: Vec<RatedGame>,

    /// Expected-vs-actual record against each opponent.
    vs_players: BTreeMap<UserId, Probabilities>,

    /// Expected-vs-actual record per (faction setup, map).
    map_stats: BTreeMap<(Setup, usize), Probabilities>,

    /// Elo captured when the player went active for the first time.
    initial_rating: Option<f64>,
    games_to_become_active: u32,
}

impl Player {
    pub fn new(user_id: UserId, account: &str, game_mode: GameMode) -> Player {
        if user_id == 0 {
            log::warn!("Player with user id 0 is not supposed to exist.");
        }

        let (elo, deviation) = known_players::initial_rating_and_deviation(user_id, game_mode);
        let rating = Rating::from_elo(elo, deviation, INITIAL_VOLATILITY);

        Player {
            user_id,
            account: account.to_string(),
            alias: None,
            wins: 0,
            losses: 0,
            draws: 0,
            used_qm_names: BTreeMap::new(),
            names: BTreeMap::new(),
            ratings: std::array::from_fn(|_| rating.clone()),
            game_count: [0; FACTION_COUNT],
            peak_ratings: std::array::from_fn(|i| PeakRating::unset(Faction::from_index(i))),
            first_game: None,
            last_game: None,
            pending_games: std::array::from_fn(|_| Vec::new()),
            pending_results: std::array::from_fn(|_| Vec::new()),
            updated: [false; FACTION_COUNT],
            status_list: Vec::new(),
            faction_status: std::array::from_fn(|_| Vec::new()),
            elo_by_date: BTreeMap::new(),
            highest_rated_victories: Vec::new(),
            lowest_rated_defeats: Vec::new(),
            vs_players: BTreeMap::new(),
            map_stats: BTreeMap::new(),
            initial_rating: None,
            games_to_become_active: 0,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn set_account(&mut self, account: &str) {
        self.account = account.to_string();
    }

    /// The alias cannot be unset once given.
    pub fn set_alias(&mut self, alias: &str) {
        if alias == "[]" {
            log::error!(
                "Rejecting bad alias '{alias}' for {} ({}).",
                self.account,
                self.user_id
            );
            return;
        }
        self.alias = Some(alias.to_string());
        log::info!("Alias for {} is {alias}", self.user_id);
    }

    pub fn has_alias(&self) -> bool {
        self.alias.as_ref().is_some_and(|a| !a.is_empty())
    }

    /// The display name: the community alias, or the most used quick match
    /// name in brackets.
    pub fn alias(&self) -> String {
        if let Some(alias) = &self.alias {
            if !alias.is_empty() {
                return alias.clone();
            }
        }

        match self.most_used_qm_name() {
            Some(name) => format!("[{name}]"),
            None => {
                log::warn!(
                    "Asking for alias without having any player names yet for player '{}'.",
                    self.account
                );
                "???".to_string()
            }
        }
    }

    pub fn add_name(&mut self, name: &str, ladder: &str) {
        let names = self.names.entry(ladder.to_string()).or_default();
        if names.iter().any(|n| n == name) {
            log::warn!(
                "Name '{name}' already exists for user {} on ladder {ladder}.",
                self.user_id
            );
        } else {
            names.push(name.to_string());
        }
    }

    pub fn names(&self) -> &BTreeMap<String, Vec<String>> {
        &self.names
    }

    pub fn increase_name_usage(&mut self, name: &str) {
        *self.used_qm_names.entry(name.to_string()).or_insert(0) += 1;
    }

    fn most_used_qm_name(&self) -> Option<&String> {
        self.used_qm_names
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(name, _)| name)
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn draws(&self) -> u32 {
        self.draws
    }

    pub fn rating(&self, faction: Faction) -> &Rating {
        &self.ratings[faction.index()]
    }

    pub fn elo(&self, faction: Faction) -> f64 {
        self.ratings[faction.index()].elo()
    }

    pub fn deviation(&self, faction: Faction) -> f64 {
        self.ratings[faction.index()].elo_deviation()
    }

    pub fn volatility(&self, faction: Faction) -> f64 {
        self.ratings[faction.index()].volatility()
    }

    /// Games played with the real factions; the Combined pseudo-faction is
    /// not counted twice.
    pub fn game_count(&self) -> u32 {
        self.game_count[..FACTION_COUNT - 1].iter().sum()
    }

    pub fn faction_game_count(&self, faction: Faction) -> u32 {
        self.game_count[faction.index()]
    }

    pub fn pending_game_count(&self) -> u32 {
        self.pending_games[Faction::Combined.index()].len() as u32
    }

    pub fn first_game(&self) -> Option<NaiveDate> {
        self.first_game
    }

    pub fn last_game(&self) -> Option<NaiveDate> {
        self.last_game
    }

    pub fn is_active(&self, faction: Faction) -> bool {
        // Entries alternate going-active/going-inactive dates, so an odd
        // count means currently active.
        self.faction_status[faction.index()].len() % 2 == 1
    }

    pub fn is_any_active(&self) -> bool {
        ALL_FACTIONS.into_iter().any(|f| self.is_active(f))
    }

    pub fn was_active(&self, faction: Faction) -> bool {
        !self.faction_status[faction.index()].is_empty()
    }

    pub fn was_ever_active(&self) -> bool {
        !self.status_list.is_empty()
    }

    pub fn was_active_before(&self, date: NaiveDate, faction: Faction) -> bool {
        self.faction_status[faction.index()]
            .first()
            .is_some_and(|&first| first < date)
    }

    pub fn status_list(&self) -> &[NaiveDate] {
        &self.status_list
    }

    pub fn faction_status(&self, faction: Faction) -> &[NaiveDate] {
        &self.faction_status[faction.index()]
    }

    /// Highest elo over the active factions; -1 when nothing qualifies.
    pub fn max_rating(&self, include_inactive: bool) -> f64 {
        let mut result = -1.0;
        for faction in ALL_FACTIONS {
            if self.is_active(faction) || (include_inactive && self.was_active(faction)) {
                result = f64::max(result, self.elo(faction));
            }
        }
        result
    }

    /// The active faction with the highest elo; Combined when none is.
    pub fn best_active_faction(&self) -> Faction {
        let mut best = Faction::Combined;
        let mut best_elo = -1.0;
        for faction in ALL_FACTIONS {
            if self.is_active(faction) && self.elo(faction) > best_elo {
                best = faction;
                best_elo = self.elo(faction);
            }
        }
        best
    }

    pub fn peak_rating(&self, faction: Faction) -> PeakRating {
        self.peak_ratings[faction.index()]
    }

    /// The overall peak over all factions.
    pub fn peak(&self) -> PeakRating {
        let mut best = self.peak_ratings[0];
        for peak in &self.peak_ratings[1..] {
            if peak.adjusted_elo > best.adjusted_elo {
                best = *peak;
            }
        }
        best
    }

    /// Elo history for one faction, restricted to days it was active.
    pub fn historical_elo(&self, faction: Faction) -> BTreeMap<u32, (f64, f64)> {
        self.elo_by_date
            .iter()
            .filter(|(_, entries)| entries[faction.index()].0 > 0.0)
            .map(|(&date, entries)| (date, entries[faction.index()]))
            .collect()
    }

    /// Days on which at least one faction was active.
    pub fn days_active(&self) -> u32 {
        self.elo_by_date
            .values()
            .filter(|entries| entries.iter().any(|(elo, _)| *elo > 0.0))
            .count() as u32
    }

    /// Process one game this player participated in. `ratings` carries the
    /// pre-game rating of every seat, captured by the scheduler.
    pub fn process_game(&mut self, game: &Game, index: usize, ratings: &GameRatings) -> Result<()> {
        if self.user_id == 0 {
            bail!("processing game for uninitialized player with user id 0");
        }

        if game.participant_index(self.user_id) != Some(index) {
            bail!(
                "player with index {index} in game {} is {}, but expected was {}",
                game.id,
                game.user_id(index),
                self.user_id
            );
        }

        let faction = game.faction(index);

        if game.game_type == GameType::Quickmatch {
            self.increase_name_usage(&game.participants[index].player_name);
        }

        let result = if game.is_draw {
            self.draws += 1;
            0.5
        } else if game.has_won(index) {
            self.wins += 1;
            1.0
        } else {
            self.losses += 1;
            0.0
        };

        let opponent_triple = if game.player_count() == 2 {
            ratings.triples[index ^ 1]
        } else {
            self.virtual_team_opponent(game, index, ratings)?
        };

        self.pending_games[faction.index()].push(opponent_triple);
        self.pending_results[faction.index()].push(result);
        self.pending_games[Faction::Combined.index()].push(opponent_triple);
        self.pending_results[Faction::Combined.index()].push(result);

        self.game_count[faction.index()] += 1;
        self.game_count[Faction::Combined.index()] += 1;

        self.last_game = Some(game.date());
        if self.first_game.is_none() {
            self.first_game = Some(game.date());
        }

        if game.player_count() == 2 {
            self.track_rated_extremes(game, index, ratings);
            self.track_head_to_head(game, index);
        }

        Ok(())
    }

    /// Synthesize a single virtual opponent for a 2v2 game: the player's
    /// share of the team strength scales the opposing team's elo sum.
    fn virtual_team_opponent(
        &self,
        game: &Game,
        index: usize,
        ratings: &GameRatings,
    ) -> Result<RatingTriple> {
        let mate_index = match game.mate_index(index) {
            Some(mate) => mate,
            None => bail!("mate not found in game {}", game.id),
        };
        let (first_opponent, second_opponent) = match game.opponent_indices(index) {
            Some(indices) => indices,
            None => bail!("opponents not found in game {}", game.id),
        };

        let my_strength = ratings.elo(index).powf(TEAM_SHARE_EXPONENT);
        let mate_strength = ratings.elo(mate_index).powf(TEAM_SHARE_EXPONENT);

        let mut my_share = my_strength / (my_strength + mate_strength);
        if !game.has_won(index) {
            my_share = 1.0 - my_share;
        }

        let opponent_elo = (ratings.elo(first_opponent) + ratings.elo(second_opponent)) * my_share;
        let opponent_deviation = (ratings.elo_deviation(first_opponent)
            + ratings.elo_deviation(second_opponent)
            + ratings.elo_deviation(mate_index))
            / 3.0;

        Ok([
            (opponent_elo - glicko::INITIAL_RATING) / SCALE_FACTOR,
            opponent_deviation / SCALE_FACTOR,
            INITIAL_VOLATILITY,
        ])
    }

    /// Track upset wins and defeats against the bounded top lists. Uses the
    /// ratings stamped into the game.
    fn track_rated_extremes(&mut self, game: &Game, index: usize, ratings: &GameRatings) {
        let opponent_index = index ^ 1;
        let me = &game.participants[index];
        let opponent = &game.participants[opponent_index];

        let eligible = !game.is_bot_game()
            && me.deviation < 200.0
            && opponent.deviation < 200.0
            && ratings.was_active[opponent_index]
            && game.is_underdog_win();

        if !eligible {
            return;
        }

        if game.winner_index() == Some(index) {
            let difference = (opponent.elo - opponent.deviation) - (me.elo + me.deviation);
            insert_top_rated(
                &mut self.highest_rated_victories,
                RatedGame { game_id: game.id, rating_difference: difference },
            );
        } else if game.winner_index() == Some(opponent_index) {
            let difference = (me.elo - me.deviation) - (opponent.elo + opponent.deviation);
            insert_top_rated(
                &mut self.lowest_rated_defeats,
                RatedGame { game_id: game.id, rating_difference: difference },
            );
        }
    }

    /// Head-to-head and per-map records, 1v1 only. Both use the expected
    /// win rate without deviation weighting.
    fn track_head_to_head(&mut self, game: &Game, index: usize) {
        if game.is_draw {
            return;
        }

        let opponent_index = index ^ 1;
        let me = &game.participants[index];
        let opponent = &game.participants[opponent_index];
        let won = game.winner_index() == Some(index);

        let my_rating = Rating::from_elo(me.elo, me.deviation, INITIAL_VOLATILITY);
        let opponent_rating = Rating::from_elo(opponent.elo, opponent.deviation, INITIAL_VOLATILITY);
        let expected = my_rating.e_star(&opponent_rating.to_array(), 0.0);

        self.vs_players
            .entry(opponent.user_id)
            .or_default()
            .add_game(expected, game.date(), won);

        if let Some(map_index) = game.map_index {
            if let Some(setup) = Setup::from_factions(me.faction, opponent.faction) {
                self.map_stats
                    .entry((setup, map_index))
                    .or_default()
                    .add_game(expected, game.date(), won);
            }
        }
    }

    /// Commit the pending buffers into rating updates. Factions touched in
    /// this period are recorded for the decay decision in `apply`.
    pub fn update(&mut self) {
        for i in 0..FACTION_COUNT {
            self.updated[i] = !self.pending_games[i].is_empty();

            if !self.pending_games[i].is_empty() {
                let faction = Faction::from_index(i);
                let current = self.ratings[i].calculation_type();

                if current == CalculationType::Initial {
                    log::info!(
                        "Trying to find initial rating for player {} and faction {}.",
                        self.alias(),
                        faction.name()
                    );
                } else if current == CalculationType::SingleStep {
                    log::info!(
                        "Player {} and faction {} still use single step calculation.",
                        self.alias(),
                        faction.name()
                    );
                }

                let applied = self.ratings[i].update(
                    &self.pending_games[i],
                    &self.pending_results[i],
                    CalculationType::AutoSelect,
                );

                if applied != CalculationType::Normal
                    && self.ratings[i].calculation_type() == CalculationType::Normal
                {
                    log::info!(
                        "Initial rating for player {} and faction {} is [{:.0}, {:.1}].",
                        self.alias(),
                        faction.name(),
                        self.ratings[i].pending_elo(),
                        self.ratings[i].deviation()
                    );
                }
            }

            self.pending_games[i].clear();
            self.pending_results[i].clear();
        }
    }

    /// Close a rating period: commit touched factions, decay idle ones, and
    /// update activity status, peaks and the daily snapshot.
    pub fn apply(&mut self, date: NaiveDate, decay: bool, game_mode: GameMode) {
        for i in 0..FACTION_COUNT {
            let faction = Faction::from_index(i);

            if self.updated[i] {
                self.ratings[i].apply();
            } else if decay {
                let was_active = self.was_ever_active();
                self.ratings[i].decay(
                    was_active,
                    game_mode.decay_factor(),
                    game_mode.max_deviation_after_active(),
                );
            }
            self.updated[i] = false;

            let elo = self.elo(faction);
            let deviation = self.deviation(faction);

            if deviation < game_mode.deviation_threshold_active(elo) && !self.is_active(faction) {
                if !self.is_any_active() {
                    if self.status_list.is_empty() {
                        self.initial_rating = Some(elo);
                        self.games_to_become_active = self.game_count();
                    }
                    self.status_list.push(date);
                }

                self.faction_status[i].push(date);
                log::debug!(
                    "{date} => {} goes active after {} games for faction '{}'.",
                    self.alias(),
                    self.game_count[i],
                    faction.name()
                );
            } else if deviation > game_mode.deviation_threshold_inactive(elo)
                && self.is_active(faction)
            {
                log::debug!("{date} => {} goes inactive for faction '{}'.", self.alias(), faction.name());

                self.faction_status[i].push(date);
                if !self.is_any_active() {
                    self.status_list.push(date);
                }
            }

            let enough_games_for_peak = self.was_ever_active()
                && self.game_count() >= self.games_to_become_active + game_mode.min_games_for_peak();

            if self.is_active(faction)
                && enough_games_for_peak
                && (elo - deviation) > self.peak_ratings[i].adjusted_elo
            {
                self.peak_ratings[i].date = Some(date);
                self.peak_ratings[i].adjusted_elo = elo - deviation;
                self.peak_ratings[i].deviation = deviation;
            }
        }

        let key = date.year() as u32 * 10_000 + date.month() * 100 + date.day();
        let mut snapshot = [(-1.0, 0.0); FACTION_COUNT];
        for (i, entry) in snapshot.iter_mut().enumerate() {
            let faction = Faction::from_index(i);
            if self.is_active(faction) {
                *entry = (self.elo(faction), self.deviation(faction));
            }
        }
        self.elo_by_date.insert(key, snapshot);
    }

    /// One decay step for every faction; used for the idle-day catch-up.
    pub fn decay_all(&mut self, game_mode: GameMode) {
        let was_active = self.was_ever_active();
        for rating in &mut self.ratings {
            rating.decay(
                was_active,
                game_mode.decay_factor(),
                game_mode.max_deviation_after_active(),
            );
        }
    }

    pub fn finalize(&mut self) {
        for probabilities in self.vs_players.values_mut() {
            if !probabilities.is_finalized() {
                probabilities.finalize();
            }
        }
        for probabilities in self.map_stats.values_mut() {
            if !probabilities.is_finalized() {
                probabilities.finalize();
            }
        }
    }

    pub fn highest_rated_victories(&self) -> &[RatedGame] {
        &self.highest_rated_victories
    }

    pub fn lowest_rated_defeats(&self) -> &[RatedGame] {
        &self.lowest_rated_defeats
    }

    pub fn vs_players(&self) -> &BTreeMap<UserId, Probabilities> {
        &self.vs_players
    }

    pub fn map_stats(&self, setup: Setup, map_index: usize) -> Option<&Probabilities> {
        self.map_stats.get(&(setup, map_index))
    }

    pub fn initial_rating(&self) -> Option<f64> {
        self.initial_rating
    }

    #[cfg(test)]
    pub fn force_rating(&mut self, faction: Faction, rating: Rating) {
        self.ratings[faction.index()] = rating;
    }

    /// Lexical ordering on the display name; leading brackets from the
    /// quick-match fallback are ignored.
    pub fn lower_lexical_order(&self, other: &Player) -> bool {
        let mine = self.alias();
        let theirs = other.alias();

        let mine = mine.trim_start_matches('[').to_lowercase();
        let theirs = theirs.trim_start_matches('[').to_lowercase();

        if mine.is_empty() {
            return !theirs.is_empty();
        }
        if theirs.is_empty() {
            return false;
        }
        mine < theirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn one_on_one(me: UserId, opponent: UserId, i_win: bool) -> Game {
        let mut game = Game::new(900, "Alamo", 1_714_521_600, 60, 300);
        game.add_participant(me, "me", Faction::Soviet, i_win, if i_win { 50 } else { -50 });
        game.add_participant(opponent, "them", Faction::Allied, !i_win, if i_win { -50 } else { 50 });
        game
    }

    fn default_ratings(seats: usize) -> GameRatings {
        GameRatings {
            triples: vec![Rating::default().to_array(); seats],
            was_active: vec![false; seats],
        }
    }

    #[test]
    fn a_win_lands_in_both_faction_and_combined_buffers() {
        let mut player = Player::new(1, "me", GameMode::RedAlert2);
        let game = one_on_one(1, 2, true);

        player.process_game(&game, 0, &default_ratings(2)).unwrap();

        assert_eq!(player.wins(), 1);
        assert_eq!(player.pending_game_count(), 1);
        assert_eq!(player.pending_games[Faction::Soviet.index()].len(), 1);
        assert_eq!(player.pending_results[Faction::Soviet.index()], vec![1.0]);
        assert_eq!(player.pending_results[Faction::Combined.index()], vec![1.0]);
        assert_eq!(player.faction_game_count(Faction::Soviet), 1);
        assert_eq!(player.game_count(), 1);
    }

    #[test]
    fn processing_with_a_wrong_index_is_rejected() {
        let mut player = Player::new(1, "me", GameMode::RedAlert2);
        let game = one_on_one(1, 2, true);
        assert!(player.process_game(&game, 1, &default_ratings(2)).is_err());
    }

    #[test]
    fn update_clears_buffers_and_marks_the_faction() {
        let mut player = Player::new(1, "me", GameMode::RedAlert2);
        let game = one_on_one(1, 2, true);
        player.process_game(&game, 0, &default_ratings(2)).unwrap();

        player.update();

        assert_eq!(player.pending_game_count(), 0);
        assert!(player.updated[Faction::Soviet.index()]);
        assert!(player.updated[Faction::Combined.index()]);
        assert!(!player.updated[Faction::Allied.index()]);
    }

    #[test]
    fn apply_commits_updates_and_decays_idle_factions() {
        let mut player = Player::new(1, "me", GameMode::RedAlert2);
        let game = one_on_one(1, 2, true);
        player.process_game(&game, 0, &default_ratings(2)).unwrap();
        player.update();

        let yuri_deviation_before = player.deviation(Faction::Yuri);
        player.apply(date(1), true, GameMode::RedAlert2);

        assert!(player.elo(Faction::Soviet) > 1500.0);
        assert!(player.deviation(Faction::Soviet) < 350.0);
        // First idle period only eats the grace; deviation is unchanged and
        // already at the cap anyway.
        assert!(player.deviation(Faction::Yuri) <= yuri_deviation_before);
    }

    #[test]
    fn status_list_alternates_and_stays_sorted() {
        let mut player = Player::new(1, "me", GameMode::RedAlert2);

        // Force a low deviation so the faction activates.
        player.ratings[Faction::Soviet.index()] = Rating::from_elo(1500.0, 50.0, 0.06);
        player.apply(date(1), false, GameMode::RedAlert2);
        assert!(player.is_active(Faction::Soviet));
        assert_eq!(player.status_list().len(), 1);

        // Blow the deviation up again; the faction deactivates.
        player.ratings[Faction::Soviet.index()] = Rating::from_elo(1500.0, 200.0, 0.06);
        player.apply(date(5), false, GameMode::RedAlert2);
        assert!(!player.is_active(Faction::Soviet));
        assert_eq!(player.status_list().len(), 2);

        let list = player.status_list();
        assert!(list.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn peaks_require_enough_games_since_activation() {
        let mut player = Player::new(1, "me", GameMode::RedAlert2);
        player.ratings[Faction::Soviet.index()] = Rating::from_elo(1700.0, 50.0, 0.06);
        player.apply(date(1), false, GameMode::RedAlert2);

        // Active, but not enough games: no peak yet.
        assert!(player.is_active(Faction::Soviet));
        assert!(!player.peak_rating(Faction::Soviet).is_set());

        player.game_count[Faction::Soviet.index()] = 60;
        player.apply(date(2), false, GameMode::RedAlert2);
        let peak = player.peak_rating(Faction::Soviet);
        assert!(peak.is_set());
        assert!((peak.adjusted_elo - 1650.0).abs() < 1e-9);
        assert_eq!(peak.date, Some(date(2)));
    }

    #[test]
    fn snapshots_are_recorded_for_active_factions_only() {
        let mut player = Player::new(1, "me", GameMode::RedAlert2);
        player.ratings[Faction::Soviet.index()] = Rating::from_elo(1600.0, 50.0, 0.06);
        player.apply(date(3), false, GameMode::RedAlert2);

        let history = player.historical_elo(Faction::Soviet);
        assert_eq!(history.len(), 1);
        assert!(history.contains_key(&20240503));
        assert!(player.historical_elo(Faction::Allied).is_empty());
        assert_eq!(player.days_active(), 1);
    }

    #[test]
    fn two_v_two_synthesizes_the_virtual_opponent() {
        let mut game = Game::new(901, "Texas", 1_714_521_600, 60, 500);
        game.add_participant(1, "a", Faction::Soviet, true, 10);
        game.add_participant(2, "b", Faction::Allied, false, -10);
        game.add_participant(3, "c", Faction::Soviet, true, 10);
        game.add_participant(4, "d", Faction::Allied, false, -10);

        // Equal teammates: the share is exactly one half, so the virtual
        // opponent sits at the mean of the opposing elo sum.
        let ratings = GameRatings {
            triples: vec![
                Rating::from_elo(1800.0, 80.0, 0.06).to_array(),
                Rating::from_elo(1600.0, 80.0, 0.06).to_array(),
                Rating::from_elo(1800.0, 80.0, 0.06).to_array(),
                Rating::from_elo(1600.0, 80.0, 0.06).to_array(),
            ],
            was_active: vec![true; 4],
        };

        let mut player = Player::new(1, "a", GameMode::Blitz2v2);
        player.process_game(&game, 0, &ratings).unwrap();

        let triple = player.pending_games[Faction::Soviet.index()][0];
        let virtual_elo = triple[glicko::MU] * SCALE_FACTOR + glicko::INITIAL_RATING;
        assert!((virtual_elo - 1600.0).abs() < 1e-9);

        let virtual_deviation = triple[glicko::PHI] * SCALE_FACTOR;
        assert!((virtual_deviation - 80.0).abs() < 1e-9);
    }

    #[test]
    fn underdog_wins_enter_the_top_list() {
        let mut player = Player::new(1, "me", GameMode::RedAlert2);
        let mut game = one_on_one(1, 2, true);
        game.set_rating_and_deviation(0, 1200.0, 50.0);
        game.set_rating_and_deviation(1, 1900.0, 50.0);

        let mut ratings = default_ratings(2);
        ratings.was_active[1] = true;

        player.process_game(&game, 0, &ratings).unwrap();

        assert_eq!(player.highest_rated_victories().len(), 1);
        let entry = player.highest_rated_victories()[0];
        assert!((entry.rating_difference - 600.0).abs() < 1e-9);
        assert!(player.lowest_rated_defeats().is_empty());
    }

    #[test]
    fn never_active_opponents_are_excluded_from_top_lists() {
        let mut player = Player::new(1, "me", GameMode::RedAlert2);
        let mut game = one_on_one(1, 2, true);
        game.set_rating_and_deviation(0, 1200.0, 50.0);
        game.set_rating_and_deviation(1, 1900.0, 50.0);

        player.process_game(&game, 0, &default_ratings(2)).unwrap();
        assert!(player.highest_rated_victories().is_empty());
    }

    #[test]
    fn head_to_head_records_expected_and_actual() {
        let mut player = Player::new(1, "me", GameMode::Blitz);
        let mut game = one_on_one(1, 2, true);
        game.set_rating_and_deviation(0, 1500.0, 100.0);
        game.set_rating_and_deviation(1, 1500.0, 100.0);

        player.process_game(&game, 0, &default_ratings(2)).unwrap();
        player.finalize();

        let record = player.vs_players().get(&2).unwrap();
        assert_eq!(record.wins(), 1);
        assert_eq!(record.result(), 1.0);

        // Map stats landed under the SvA setup for the Alamo index.
        let map_record = player.map_stats(Setup::SvA, 0).unwrap();
        assert_eq!(map_record.count(), 1);
    }
}
