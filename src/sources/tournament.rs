//! Tournament games are submitted as a JSON file and overlaid onto the
//! ladder history with synthetic ids and timestamps.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::faction::Faction;
use crate::domain::game::Game;
use crate::domain::game_mode::GameMode;
use crate::domain::game_type::GameType;
use crate::domain::known_players::UserId;
use crate::domain::maps;
use crate::player::{Player, Roster};

/// Synthetic ids keep tournament games and players clear of the real id
/// space.
pub const SYNTHETIC_ID_BASE: u32 = 100_000_000;

#[derive(Debug, Deserialize)]
pub struct TournamentDay {
    pub map: String,
    /// YYYYMMDD.
    pub date: String,
    pub games: Vec<TournamentGame>,
}

#[derive(Debug, Deserialize)]
pub struct TournamentGame {
    pub p1: String,
    pub p2: String,
    pub f1: String,
    pub f2: String,
    /// 0 = draw, 1 = first player won, 2 = second player won.
    pub result: i32,
}

pub fn parse_tournament_file(contents: &str) -> Result<Vec<TournamentDay>> {
    serde_json::from_str(contents).context("Failed to parse tournament file")
}

pub fn load_tournament_games(
    path: &Path,
    roster: &mut Roster,
    game_mode: GameMode,
    ladder: &str,
    games: &mut Vec<Game>,
) -> Result<u32> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tournament file {}", path.display()))?;
    let days = parse_tournament_file(&contents)?;
    Ok(add_tournament_games(&days, roster, game_mode, ladder, games))
}

/// Overlay the parsed tournament days onto the game list. Unknown aliases
/// get synthetic players so the games still rate. Returns the number of
/// games added.
pub fn add_tournament_games(
    days: &[TournamentDay],
    roster: &mut Roster,
    game_mode: GameMode,
    ladder: &str,
    games: &mut Vec<Game>,
) -> u32 {
    let mut next_game_id = SYNTHETIC_ID_BASE;
    let mut next_user_id = SYNTHETIC_ID_BASE;
    let mut added = 0;

    // Minutes past 20:00 UTC per day, so games within a day keep their
    // submission order.
    let mut time_additions: BTreeMap<u32, i64> = BTreeMap::new();

    for day in days {
        let map_index = match maps::resolve(&day.map) {
            Some(index) => index,
            None => {
                log::error!("Unknown map '{}' in tournament file.", day.map);
                continue;
            }
        };

        let date_key: u32 = match day.date.parse() {
            Ok(key) => key,
            Err(_) => {
                log::error!("Unparseable date '{}' in tournament file.", day.date);
                continue;
            }
        };

        let date = match NaiveDate::from_ymd_opt(
            (date_key / 10_000) as i32,
            date_key / 100 % 100,
            date_key % 100,
        ) {
            Some(date) => date,
            None => {
                log::error!("Invalid date '{}' in tournament file.", day.date);
                continue;
            }
        };

        for tournament_game in &day.games {
            let minutes = time_additions
                .entry(date_key)
                .and_modify(|m| *m += 5)
                .or_insert(1);

            // No exact start time is known; assume the daily block starts
            // at 20:00 UTC. Duration stays 0 and is ignored by any stats
            // that use game times.
            let timestamp = date
                .and_hms_opt(20, 0, 0)
                .map(|t| t.and_utc().timestamp() + 60 * *minutes)
                .unwrap_or_default();

            let player1 = ensure_player(roster, &tournament_game.p1, &mut next_user_id, game_mode, ladder);
            let player2 = ensure_player(roster, &tournament_game.p2, &mut next_user_id, game_mode, ladder);

            let mut game = Game::new(
                next_game_id,
                maps::MAPS[map_index].short_name,
                timestamp,
                0,
                0,
            );
            next_game_id += 1;

            game.game_type = GameType::WorldSeries;
            game.ladder = ladder.to_string();
            game.add_participant(
                player1,
                &tournament_game.p1,
                faction_from_letter(&tournament_game.f1),
                tournament_game.result == 1,
                0,
            );
            game.add_participant(
                player2,
                &tournament_game.p2,
                faction_from_letter(&tournament_game.f2),
                tournament_game.result == 2,
                0,
            );
            if tournament_game.result == 0 {
                game.is_draw = true;
            }

            log::info!(
                "Added tournament game {}: {} vs {} on {}.",
                game.id,
                tournament_game.p1,
                tournament_game.p2,
                day.map
            );

            games.push(game);
            added += 1;
        }
    }

    added
}

fn faction_from_letter(letter: &str) -> Faction {
    if letter == "a" {
        Faction::Allied
    } else {
        Faction::Soviet
    }
}

fn ensure_player(
    roster: &mut Roster,
    alias: &str,
    next_user_id: &mut UserId,
    game_mode: GameMode,
    ladder: &str,
) -> UserId {
    if let Some(user_id) = roster.user_id_from_alias(alias) {
        return user_id;
    }

    let user_id = *next_user_id;
    *next_user_id += 1;

    let mut player = Player::new(user_id, "?", game_mode);
    player.set_alias(alias);
    player.add_name(alias, ladder);
    log::info!("Manually created player {user_id} with alias {alias}.");
    roster.add(player);

    user_id
}
