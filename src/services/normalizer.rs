//! Validity gating and chronological ordering of the raw game set.

use std::collections::BTreeMap;

use crate::domain::game::Game;
use crate::domain::game_mode::GameMode;
use crate::domain::game_type::GameType;
use crate::domain::known_players::{self, UserId};
use crate::domain::maps;

/// Quick match games shorter than this are aborts, not games.
const MIN_QUICKMATCH_DURATION: u32 = 35;

/// Below this average fps the game was unplayably laggy.
const MIN_QUICKMATCH_FPS: u32 = 40;

/// Rewrite every participant to its primary account, drop games that do not
/// qualify for rating, and order the survivors chronologically by game end.
pub fn normalize(
    mut games: Vec<Game>,
    primaries: &BTreeMap<UserId, UserId>,
    game_mode: GameMode,
) -> Vec<Game> {
    rewrite_to_primaries(&mut games, primaries);

    let mut skipped_by_duration = 0u32;
    let mut skipped_by_fps = 0u32;
    let mut skipped_invalid = 0u32;
    let mut skipped_test_games = 0u32;
    let mut ignored_maps: BTreeMap<String, u32> = BTreeMap::new();

    let mut valid = Vec::with_capacity(games.len());

    for mut game in games {
        game.determine_winner();

        log::debug!("Gating game {} on '{}'.", game.id, game.map_name);

        if game.player_count() != game_mode.player_count() {
            log::debug!("Skipping game {} due to player count mismatch.", game.id);
            continue;
        }

        // High-fps games ran fast-forwarded; rescale the wall-clock duration
        // before judging it.
        let mut effective_duration = game.duration;
        if game.game_type == GameType::Quickmatch && game.duration > 0 && game.fps > 60 {
            effective_duration =
                (f64::from(game.duration) * f64::from(game.fps) / 60.0) as u32;
        }

        if game.game_type == GameType::Quickmatch
            && effective_duration != 0
            && effective_duration < MIN_QUICKMATCH_DURATION
        {
            skipped_by_duration += 1;
            continue;
        }

        if game.game_type == GameType::Quickmatch
            && game.fps > 0
            && game.fps < MIN_QUICKMATCH_FPS
        {
            log::debug!("Skipping game {} due to {} fps.", game.id, game.fps);
            skipped_by_fps += 1;
            continue;
        }

        // The bot only plays rated games on the Blitz ladder.
        if game.is_bot_game() && game_mode != GameMode::Blitz {
            continue;
        }

        if game_mode == GameMode::Blitz && maps::resolve(&game.map_name).is_none() {
            let count = ignored_maps.entry(game.map_name.clone()).or_insert_with(|| {
                log::info!("Ignoring blitz games on map {}.", game.map_name);
                0
            });
            *count += 1;
            continue;
        }

        if !game.is_valid() {
            log::info!("Ignoring invalid game {}.", game.id);
            skipped_invalid += 1;
            continue;
        }

        if game
            .participants
            .iter()
            .any(|p| known_players::is_test_account(p.user_id))
        {
            log::info!("Game {} involves a test account and will be ignored.", game.id);
            skipped_test_games += 1;
            continue;
        }

        valid.push(game);
    }

    log::info!("Skipped {skipped_by_fps} games due to low fps.");
    log::info!("Skipped {skipped_by_duration} games due to duration.");
    log::info!("Skipped {skipped_invalid} invalid games.");
    log::info!("Skipped {skipped_test_games} games from test players.");
    for (map, count) in &ignored_maps {
        log::info!("Ignored {count} games on '{map}'.");
    }

    // Games are ordered by when they ended, not when they started.
    valid.sort_by(|a, b| {
        a.end_timestamp()
            .cmp(&b.end_timestamp())
            .then(a.id.cmp(&b.id))
    });

    valid
}

fn rewrite_to_primaries(games: &mut [Game], primaries: &BTreeMap<UserId, UserId>) {
    for game in games {
        for participant in &mut game.participants {
            match primaries.get(&participant.user_id) {
                Some(&primary) => participant.user_id = primary,
                None => {
                    log::error!(
                        "Missing user id {} in the primary mapping; keeping the raw id.",
                        participant.user_id
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::faction::Faction;

    fn quickmatch(id: u32, timestamp: i64, duration: u32, fps: u32) -> Game {
        let mut game = Game::new(id, "Alamo", timestamp, fps, duration);
        game.add_participant(1, "a", Faction::Soviet, true, 10);
        game.add_participant(2, "b", Faction::Allied, false, -10);
        game
    }

    fn identity_primaries() -> BTreeMap<UserId, UserId> {
        [(1, 1), (2, 2), (3, 3)].into_iter().collect()
    }

    #[test]
    fn short_games_are_dropped() {
        let games = vec![
            quickmatch(1, 1000, 20, 60),
            quickmatch(2, 2000, 120, 60),
        ];
        let valid = normalize(games, &identity_primaries(), GameMode::Blitz);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].id, 2);
    }

    #[test]
    fn high_fps_games_rescale_their_duration() {
        // 25 wall-clock seconds at 120 fps is 50 in-game seconds: keep.
        let keep = quickmatch(1, 1000, 25, 120);
        // 25 seconds at 60 fps stays 25: drop.
        let drop = quickmatch(2, 2000, 25, 60);
        let valid = normalize(vec![keep, drop], &identity_primaries(), GameMode::Blitz);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].id, 1);
        // The stored duration is untouched by the rescale.
        assert_eq!(valid[0].duration, 25);
    }

    #[test]
    fn laggy_games_are_dropped_but_unknown_fps_passes() {
        let laggy = quickmatch(1, 1000, 120, 30);
        let unknown = quickmatch(2, 2000, 120, 0);
        let valid = normalize(vec![laggy, unknown], &identity_primaries(), GameMode::Blitz);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].id, 2);
    }

    #[test]
    fn bot_games_only_count_on_blitz() {
        let mut bot_game = quickmatch(1, 1000, 120, 60);
        bot_game.participants[1].user_id = known_players::BLITZ_BOT;

        let primaries: BTreeMap<UserId, UserId> =
            [(1, 1), (known_players::BLITZ_BOT, known_players::BLITZ_BOT)]
                .into_iter()
                .collect();

        let on_blitz = normalize(vec![bot_game.clone()], &primaries, GameMode::Blitz);
        assert_eq!(on_blitz.len(), 1);

        let on_ra2 = normalize(vec![bot_game], &primaries, GameMode::RedAlert2);
        assert!(on_ra2.is_empty());
    }

    #[test]
    fn blitz_games_on_unknown_maps_are_dropped() {
        let mut game = quickmatch(1, 1000, 120, 60);
        game.map_name = "Some Custom Map".to_string();
        game.map_index = None;

        assert!(normalize(vec![game.clone()], &identity_primaries(), GameMode::Blitz).is_empty());
        // Other ladders do not enforce the map pool.
        assert_eq!(
            normalize(vec![game], &identity_primaries(), GameMode::RedAlert2).len(),
            1
        );
    }

    #[test]
    fn participants_are_rewritten_to_their_primaries() {
        let primaries: BTreeMap<UserId, UserId> = [(1, 10), (2, 10), (3, 30)].into_iter().collect();
        let mut game = quickmatch(1, 1000, 120, 60);
        game.participants[1].user_id = 3;

        let valid = normalize(vec![game], &primaries, GameMode::Blitz);
        assert_eq!(valid[0].user_id(0), 10);
        assert_eq!(valid[0].user_id(1), 30);
    }

    #[test]
    fn folding_both_seats_onto_one_account_invalidates_the_game() {
        let primaries: BTreeMap<UserId, UserId> = [(1, 10), (2, 10)].into_iter().collect();
        let game = quickmatch(1, 1000, 120, 60);
        assert!(normalize(vec![game], &primaries, GameMode::Blitz).is_empty());
    }

    #[test]
    fn test_account_games_are_dropped() {
        let mut game = quickmatch(1, 1000, 120, 60);
        game.participants[1].user_id = known_players::TEST_ACCOUNTS[0];
        let mut primaries = identity_primaries();
        primaries.insert(
            known_players::TEST_ACCOUNTS[0],
            known_players::TEST_ACCOUNTS[0],
        );
        assert!(normalize(vec![game], &primaries, GameMode::Blitz).is_empty());
    }

    #[test]
    fn games_are_ordered_by_end_time_not_start_time() {
        // Game 1 starts first but ends last.
        let late_end = quickmatch(1, 1000, 5000, 60);
        let early_end = quickmatch(2, 2000, 100, 60);

        let valid = normalize(vec![late_end, early_end], &identity_primaries(), GameMode::Blitz);
        assert_eq!(valid[0].id, 2);
        assert_eq!(valid[1].id, 1);
        assert!(valid[0].end_timestamp() <= valid[1].end_timestamp());
    }

    #[test]
    fn inconsistent_results_are_rederived_from_points() {
        let mut game = quickmatch(1, 1000, 120, 60);
        game.participants[0].has_won = false;

        let valid = normalize(vec![game], &identity_primaries(), GameMode::Blitz);
        assert_eq!(valid.len(), 1);
        assert!(valid[0].has_won(0));
    }
}
