//! Cross-player statistics accumulated alongside the rating computation:
//! per-map faction balance, 2v2 team performance, upsets and longest games.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Days, NaiveDate};

use crate::domain::faction::{Faction, Setup};
use crate::domain::game::Game;
use crate::domain::game_mode::GameMode;
use crate::domain::known_players::UserId;
use crate::domain::maps;
use crate::player::Roster;
use crate::rating::glicko::{Rating, INITIAL_VOLATILITY};
use crate::rating::probabilities::Probabilities;

/// Both sides of a map-balance game must be this established.
const MIN_ADJUSTED_ELO_FOR_MAP_STATS: f64 = 1300.0;
const MAX_DEVIATION_FOR_MAP_STATS: f64 = 100.0;

/// Rating gap above which a defeat counts as an upset.
const UPSET_THRESHOLD: f64 = 300.0;

/// A game worth remembering: either an upset or a marathon.
#[derive(Debug, Clone)]
pub struct Upset {
    pub date: NaiveDate,
    pub map: String,
    pub winners: Vec<UserId>,
    pub losers: Vec<UserId>,
    pub winner_factions: Vec<Faction>,
    pub loser_factions: Vec<Faction>,
    pub winner_elos: Vec<i32>,
    pub loser_elos: Vec<i32>,
    pub elo_difference: f64,
    pub duration: u32,
}

impl Upset {
    fn common_faction(factions: &[Faction]) -> Faction {
        for candidate in [Faction::Soviet, Faction::Allied, Faction::Yuri] {
            if factions.iter().all(|&f| f == candidate) {
                return candidate;
            }
        }
        Faction::Combined
    }

    pub fn winner_faction(&self) -> Faction {
        Upset::common_faction(&self.winner_factions)
    }

    pub fn loser_faction(&self) -> Faction {
        Upset::common_faction(&self.loser_factions)
    }
}

/// A 2v2 team that performs above (or below) the sum of its parts.
#[derive(Debug, Clone)]
pub struct TeamRecord {
    pub team_id: u64,
    pub games: u32,
    pub wins: u32,
    pub team_elo: f64,
    pub elo_difference: f64,
    pub last_game: Option<NaiveDate>,
}

impl TeamRecord {
    pub fn player1(&self) -> UserId {
        (self.team_id >> 32) as UserId
    }

    pub fn player2(&self) -> UserId {
        (self.team_id & 0xFFFF_FFFF) as UserId
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapPlayed {
    pub count: u32,
    pub different_players: BTreeSet<UserId>,
}

fn team_id(a: UserId, b: UserId) -> u64 {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    (u64::from(low) << 32) | u64::from(high)
}

fn insert_bounded(list: &mut Vec<Upset>, entry: Upset, capacity: usize, key: fn(&Upset) -> f64) {
    list.push(entry);
    list.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    list.truncate(capacity);
}

pub struct Aggregator {
    game_mode: GameMode,
    /// All relative time windows are measured from here, so a re-run over
    /// the same input produces the same lists.
    reference_date: NaiveDate,

    game_count: u32,
    ignored_maps: BTreeSet<String>,

    map_stats: BTreeMap<(Setup, String), Probabilities>,

    team_stats: BTreeMap<u64, Probabilities>,
    last_team_elos: BTreeMap<u64, (f64, f64)>,
    teams: Vec<TeamRecord>,

    games_per_month: BTreeMap<NaiveDate, BTreeMap<String, MapPlayed>>,
    /// Sum of durations and number of games per map.
    average_duration: BTreeMap<String, (u64, u32)>,

    upsets_monthly: BTreeMap<NaiveDate, Vec<Upset>>,
    upsets_last_12_months: Vec<Upset>,
    upsets_last_30_days: Vec<Upset>,
    upsets_all_time: Vec<Upset>,
    longest_games: Vec<Upset>,
}

impl Aggregator {
    pub fn new(game_mode: GameMode, reference_date: NaiveDate) -> Aggregator {
        Aggregator {
            game_mode,
            reference_date,
            game_count: 0,
            ignored_maps: BTreeSet::new(),
            map_stats: BTreeMap::new(),
            team_stats: BTreeMap::new(),
            last_team_elos: BTreeMap::new(),
            teams: Vec::new(),
            games_per_month: BTreeMap::new(),
            average_duration: BTreeMap::new(),
            upsets_monthly: BTreeMap::new(),
            upsets_last_12_months: Vec::new(),
            upsets_last_30_days: Vec::new(),
            upsets_all_time: Vec::new(),
            longest_games: Vec::new(),
        }
    }

    /// The display name of the map for statistics purposes.
    fn stats_map_name(&mut self, game: &Game) -> Option<String> {
        if self.game_mode == GameMode::Blitz {
            match maps::resolve(&game.map_name) {
                Some(index) => return Some(maps::name(index).to_string()),
                None => {
                    if self.ignored_maps.insert(game.map_name.clone()) {
                        log::info!(
                            "Ignoring map '{}' while making map stats.",
                            game.map_name
                        );
                    }
                    return None;
                }
            }
        }

        let mut name = game.map_name.clone();
        if self.game_mode == GameMode::RedAlert2 && name.len() > 2 {
            name = normalize_ra2_map_name(&name);
        }
        Some(name)
    }

    /// Feed one chronologically ordered game. Ratings must already be
    /// stamped into the participants.
    pub fn process_game(&mut self, game: &Game, roster: &Roster) {
        let map_name = match self.stats_map_name(game) {
            Some(name) => name,
            None => return,
        };

        let game_date = game.date();
        let month = NaiveDate::from_ymd_opt(game_date.year(), game_date.month(), 1)
            .unwrap_or(game_date);

        let played = self
            .games_per_month
            .entry(month)
            .or_default()
            .entry(map_name.clone())
            .or_default();
        played.count += 1;
        played.different_players.insert(game.user_id(0));
        played.different_players.insert(game.user_id(1));

        // Duration 0 marks manually added games, e.g. tournament games.
        if game.duration > 0 {
            let entry = self.average_duration.entry(map_name.clone()).or_default();
            entry.0 += u64::from(game.duration);
            entry.1 += 1;
        }

        if game.is_draw {
            return;
        }

        self.track_upset(game, roster, &map_name);

        if self.game_mode == GameMode::Blitz2v2 {
            self.track_team_game(game);
        }

        self.track_longest_game(game, &map_name);
        self.track_map_balance(game, &map_name);
    }

    fn upset_from(&self, game: &Game, map_name: &str, duration: u32) -> Upset {
        Upset {
            date: game.date(),
            map: map_name.to_string(),
            winners: game.winners().iter().map(|p| p.user_id).collect(),
            losers: game.losers().iter().map(|p| p.user_id).collect(),
            winner_factions: game.winners().iter().map(|p| p.faction).collect(),
            loser_factions: game.losers().iter().map(|p| p.faction).collect(),
            winner_elos: game.winners().iter().map(|p| p.elo as i32).collect(),
            loser_elos: game.losers().iter().map(|p| p.elo as i32).collect(),
            elo_difference: game.difference_for_greatest_defeat(),
            duration,
        }
    }

    fn track_upset(&mut self, game: &Game, roster: &Roster, map_name: &str) {
        let difference = game.difference_for_greatest_defeat();
        if difference <= UPSET_THRESHOLD || game.is_bot_game() {
            return;
        }

        // Every loser needs a settled rating or prior activity; otherwise
        // the gap is an artifact of a fresh account.
        let losers_qualify = game.participants.iter().all(|p| {
            p.has_won
                || p.deviation < 120.0
                || roster
                    .get(p.user_id)
                    .map(|player| player.was_ever_active())
                    .unwrap_or(false)
        });
        if !losers_qualify {
            return;
        }

        log::debug!("Upset in game {} with difference {difference:.0}.", game.id);

        let upset = self.upset_from(game, map_name, 0);
        let game_date = game.date();
        let month = NaiveDate::from_ymd_opt(game_date.year(), game_date.month(), 1)
            .unwrap_or(game_date);

        let monthly = self.upsets_monthly.entry(month).or_default();
        insert_bounded(monthly, upset.clone(), 20, |u| u.elo_difference);

        let year_boundary = self.reference_date - Days::new(365);
        if game_date >= year_boundary {
            insert_bounded(&mut self.upsets_last_12_months, upset.clone(), 50, |u| {
                u.elo_difference
            });
        }

        let month_boundary = self.reference_date - Days::new(31);
        if game_date >= month_boundary {
            insert_bounded(&mut self.upsets_last_30_days, upset.clone(), 50, |u| {
                u.elo_difference
            });
        }

        insert_bounded(&mut self.upsets_all_time, upset, 100, |u| u.elo_difference);
    }

    fn track_team_game(&mut self, game: &Game) {
        let winners = game.winners();
        let losers = game.losers();
        if winners.len() != 2 || losers.len() != 2 {
            return;
        }

        let winner_team = team_id(winners[0].user_id, winners[1].user_id);
        let loser_team = team_id(losers[0].user_id, losers[1].user_id);

        let ordered_elos = |pair: &[&crate::domain::game::Participant]| {
            if pair[0].user_id < pair[1].user_id {
                (pair[0].elo, pair[1].elo)
            } else {
                (pair[1].elo, pair[0].elo)
            }
        };
        self.last_team_elos.insert(winner_team, ordered_elos(&winners));
        self.last_team_elos.insert(loser_team, ordered_elos(&losers));

        let winner_rating = Rating::from_elo(
            winners[0].elo + winners[1].elo,
            winners[0].deviation + winners[1].deviation,
            INITIAL_VOLATILITY,
        );
        let loser_rating = Rating::from_elo(
            losers[0].elo + losers[1].elo,
            losers[0].deviation + losers[1].deviation,
            INITIAL_VOLATILITY,
        );

        let expected = winner_rating.e_star(&loser_rating.to_array(), 0.0);
        let date = game.date();

        self.team_stats
            .entry(winner_team)
            .or_default()
            .add_game(expected, date, true);
        self.team_stats
            .entry(loser_team)
            .or_default()
            .add_game(1.0 - expected, date, false);
    }

    fn track_longest_game(&mut self, game: &Game, map_name: &str) {
        if game.is_bot_game() || game.is_draw || game.duration <= 600 || game.fps == 0 {
            return;
        }

        // Normalize the wall-clock duration by the game speed.
        let duration = game.duration * game.fps / 59;
        let upset = self.upset_from(game, map_name, duration);
        self.longest_games.push(upset);
        self.longest_games.sort_by(|a, b| b.duration.cmp(&a.duration));
        self.longest_games.truncate(25);
    }

    /// Per-map faction balance: 1v1 cross-faction games between settled
    /// players, tracked from the canonical reference side.
    fn track_map_balance(&mut self, game: &Game, map_name: &str) {
        if game.player_count() != 2 || game.faction(0) == game.faction(1) {
            return;
        }

        let setup = match game.setup() {
            Some(setup) => setup.canonical(),
            None => return,
        };

        if !matches!(setup, Setup::AvS | Setup::AvY | Setup::YvS) {
            return;
        }

        self.game_count += 1;

        let reference_faction = setup.first_faction();
        let reference_index = if game.faction(0) == reference_faction { 0 } else { 1 };
        let other_index = reference_index ^ 1;

        let reference = &game.participants[reference_index];
        let other = &game.participants[other_index];

        if reference.elo - reference.deviation < MIN_ADJUSTED_ELO_FOR_MAP_STATS
            || other.elo - other.deviation < MIN_ADJUSTED_ELO_FOR_MAP_STATS
            || reference.deviation > MAX_DEVIATION_FOR_MAP_STATS
            || other.deviation > MAX_DEVIATION_FOR_MAP_STATS
        {
            return;
        }

        let reference_rating =
            Rating::from_elo(reference.elo, reference.deviation, INITIAL_VOLATILITY);
        let other_rating = Rating::from_elo(other.elo, other.deviation, INITIAL_VOLATILITY);
        let expected = reference_rating.e_star(&other_rating.to_array(), 0.0);

        self.map_stats
            .entry((setup, map_name.to_string()))
            .or_default()
            .add_game(
                expected,
                game.date(),
                game.winner_index() == Some(reference_index),
            );
    }

    /// Finalize all probability trackers and build the team performance
    /// records.
    pub fn finalize(&mut self, roster: &Roster) {
        log::info!("Finalizing map statistics.");

        for probabilities in self.map_stats.values_mut() {
            probabilities.finalize();
        }

        for (&team, probabilities) in &mut self.team_stats {
            probabilities.finalize();

            let result = probabilities.result_up_to(self.reference_date);
            let player1 = (team >> 32) as UserId;
            let player2 = (team & 0xFFFF_FFFF) as UserId;

            let (Ok(first), Ok(second)) = (roster.get(player1), roster.get(player2)) else {
                continue;
            };

            // Only teams that actually compete: enough games, both players
            // active, at least one of them established, and a record that is
            // neither flawless nor winless (the elo difference diverges
            // there).
            let qualifies = result.games >= 20
                && first.is_any_active()
                && second.is_any_active()
                && result.wins > 1
                && result.games != result.wins
                && result.wins != 0
                && (first.elo(Faction::Combined) > 1300.0
                    || second.elo(Faction::Combined) > 1300.0);
            if !qualifies {
                continue;
            }

            let elo_difference = -400.0 * ((1.0 / result.normalized) - 1.0).log10();
            self.teams.push(TeamRecord {
                team_id: team,
                games: result.games,
                wins: result.wins,
                team_elo: first.elo(Faction::Combined) + second.elo(Faction::Combined),
                elo_difference,
                last_game: result.last_game,
            });
        }

        self.teams.sort_by(|a, b| {
            b.elo_difference
                .partial_cmp(&a.elo_difference)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.team_id.cmp(&b.team_id))
        });
    }

    pub fn map_result(&self, setup: Setup, map_name: &str) -> Option<&Probabilities> {
        self.map_stats.get(&(setup, map_name.to_string()))
    }

    /// Number of games that entered the map-balance statistics.
    pub fn rated_map_games(&self) -> u32 {
        self.game_count
    }

    /// The members' elos (lower id first) as of the team's last game.
    pub fn last_team_elos(&self, team_id: u64) -> Option<(f64, f64)> {
        self.last_team_elos.get(&team_id).copied()
    }

    pub fn upsets_all_time(&self) -> &[Upset] {
        &self.upsets_all_time
    }

    pub fn upsets_last_12_months(&self) -> &[Upset] {
        &self.upsets_last_12_months
    }

    pub fn upsets_last_30_days(&self) -> &[Upset] {
        &self.upsets_last_30_days
    }

    pub fn upsets_for_month(&self, month: NaiveDate) -> &[Upset] {
        self.upsets_monthly
            .get(&month)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn longest_games(&self) -> &[Upset] {
        &self.longest_games
    }

    pub fn teams(&self) -> &[TeamRecord] {
        &self.teams
    }

    pub fn average_duration(&self, map_name: &str) -> Option<u32> {
        self.average_duration
            .get(map_name)
            .filter(|(_, games)| *games > 0)
            .map(|(total, games)| (total / u64::from(*games)) as u32)
    }

    pub fn games_per_month(&self) -> &BTreeMap<NaiveDate, BTreeMap<String, MapPlayed>> {
        &self.games_per_month
    }
}

/// RA2 map names carry tier digits and parenthesized author notes.
fn normalize_ra2_map_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut depth = 0u32;
    for character in name.chars() {
        match character {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => result.push(character),
            _ => {}
        }
    }

    let trimmed = result
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim();

    let mut collapsed = String::with_capacity(trimmed.len());
    let mut previous_space = false;
    for character in trimmed.chars() {
        if character == ' ' {
            if !previous_space {
                collapsed.push(' ');
            }
            previous_space = true;
        } else {
            collapsed.push(character);
            previous_space = false;
        }
    }

    collapsed
}
