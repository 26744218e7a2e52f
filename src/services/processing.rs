//! The batch run from raw games to written ratings.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use chrono::Days;

use crate::config::EngineSettings;
use crate::domain::faction::{Faction, ALL_FACTIONS};
use crate::domain::game::Game;
use crate::domain::game_mode::GameMode;
use crate::domain::known_players::UserId;
use crate::identity::resolver;
use crate::player::{Player, Roster};
use crate::services::normalizer;
use crate::services::scheduler::Scheduler;
use crate::sources::{tournament, GameSource, IdentityHints, RatingRow, RatingSink};
use crate::stats::Aggregator;

pub struct ProcessingService {
    settings: EngineSettings,
}

/// Everything the run produced, for callers that want more than the
/// database rows.
pub struct ProcessingOutcome {
    pub roster: Roster,
    pub aggregator: Aggregator,
    pub rows: Vec<RatingRow>,
    pub processed_games: usize,
}

impl ProcessingService {
    pub fn new(settings: EngineSettings) -> ProcessingService {
        ProcessingService { settings }
    }

    pub fn run(
        &self,
        source: &dyn GameSource,
        hints: &dyn IdentityHints,
        sink: &mut dyn RatingSink,
    ) -> Result<ProcessingOutcome> {
        let settings = &self.settings;

        log::info!("End date is {}.", settings.end_date);
        log::info!("Starting ELO computation for ladder '{}'.", settings.ladder);

        let mut games = source.fetch_games(&settings.ladder)?;

        // Count games per raw account; the resolver picks representatives
        // by activity when no alias decides.
        let mut game_counts: BTreeMap<UserId, u32> = BTreeMap::new();
        for game in &games {
            for participant in &game.participants {
                if participant.user_id == 0 {
                    log::error!("Invalid user id in game {}.", game.id);
                }
                *game_counts.entry(participant.user_id).or_default() += 1;
            }
        }

        let mut primaries =
            resolver::resolve_primaries(&game_counts, hints, settings.duplicate_policy)?;

        // Every primary account gets a roster entry, even when the user
        // record is gone (deleted duplicates keep their games).
        let final_user_ids: BTreeSet<UserId> = game_counts
            .keys()
            .map(|user_id| primaries.get(user_id).copied().unwrap_or(*user_id))
            .collect();

        let mut roster = Roster::new();
        for &user_id in &final_user_ids {
            let account = hints.account_name(user_id)?.unwrap_or_default();
            let mut player = Player::new(user_id, &account, settings.game_mode);
            if let Some(alias) = hints.alias(user_id)? {
                player.set_alias(&alias);
            }
            roster.add(player);
        }

        if let Some(tournament_file) = &settings.tournament_file {
            log::info!("Loading tournament games from '{}'.", tournament_file.display());
            let added = tournament::load_tournament_games(
                tournament_file,
                &mut roster,
                settings.game_mode,
                &settings.ladder,
                &mut games,
            )?;
            log::info!("{added} tournament games added.");

            // Tournament players resolve through their alias; their ids are
            // already primary.
            for game in &games {
                for participant in &game.participants {
                    primaries
                        .entry(participant.user_id)
                        .or_insert(participant.user_id);
                    if !roster.contains(participant.user_id) {
                        roster.add(Player::new(
                            participant.user_id,
                            "",
                            settings.game_mode,
                        ));
                    }
                }
            }
        }

        let mut valid_games =
            normalizer::normalize(games, &primaries, settings.game_mode);
        log::info!("{} games are valid for rating.", valid_games.len());

        let reference_date = settings
            .end_date
            .checked_sub_days(Days::new(1))
            .unwrap_or(settings.end_date);
        let mut aggregator = Aggregator::new(settings.game_mode, reference_date);

        let scheduler = Scheduler::new(
            settings.game_mode,
            settings.end_date,
            settings.time_shift_hours,
        );
        scheduler.run(&mut valid_games, &mut roster, &mut aggregator)?;

        aggregator.finalize(&roster);

        let rows = self.rating_rows(&roster);

        if settings.dry_run {
            log::info!("Dry run; skipping the rating write.");
        } else {
            sink.write_ratings(&settings.ladder, &rows)?;
        }

        log::info!("Processed {} games. All done.", valid_games.len());

        Ok(ProcessingOutcome {
            roster,
            aggregator,
            rows,
            processed_games: valid_games.len(),
        })
    }

    /// One row per player with rated games, carrying both ranking views.
    fn rating_rows(&self, roster: &Roster) -> Vec<RatingRow> {
        let active_ranks = roster.active_ranks(self.settings.game_mode);
        let alltime_ranks = roster.alltime_ranks(self.settings.game_mode);

        let mut rows = Vec::new();
        for player in roster.iter() {
            if player.game_count() == 0 {
                continue;
            }

            let faction = self.display_faction(player);
            rows.push(RatingRow {
                user_id: player.user_id(),
                ladder: self.settings.ladder.clone(),
                elo: player.elo(faction),
                deviation: player.deviation(faction),
                active_rank: active_ranks.get(&player.user_id()).copied(),
                alltime_rank: alltime_ranks.get(&player.user_id()).copied(),
                rated_games: player.game_count(),
                is_active: player.is_any_active(),
            });
        }
        rows
    }

    /// The faction whose rating represents the player: Combined on team
    /// ladders, otherwise the strongest faction that saw activity.
    fn display_faction(&self, player: &Player) -> Faction {
        if self.settings.game_mode == GameMode::Blitz2v2 {
            return Faction::Combined;
        }

        let mut best = Faction::Combined;
        let mut best_elo = f64::MIN;
        for faction in ALL_FACTIONS {
            if (player.is_active(faction) || player.was_active(faction))
                && player.elo(faction) > best_elo
            {
                best = faction;
                best_elo = player.elo(faction);
            }
        }
        best
    }
}

/// Convenience wrapper used by integration-style tests: run the whole
/// pipeline over an in-memory game list.
#[cfg(test)]
pub fn run_in_memory(
    settings: EngineSettings,
    games: Vec<Game>,
) -> Result<ProcessingOutcome> {
    use std::cell::RefCell;

    struct MemorySource(RefCell<Vec<Game>>);

    impl GameSource for MemorySource {
        fn fetch_games(&self, _ladder: &str) -> Result<Vec<Game>> {
            Ok(self.0.borrow().clone())
        }
    }

    impl IdentityHints for MemorySource {
        fn hints(&self, _user_id: UserId) -> Result<BTreeSet<UserId>> {
            Ok(BTreeSet::new())
        }

        fn alias(&self, _user_id: UserId) -> Result<Option<String>> {
            Ok(None)
        }

        fn primary_mapping(&self, _user_ids: &[UserId]) -> Result<BTreeMap<UserId, UserId>> {
            Ok(BTreeMap::new())
        }
    }

    struct MemorySink(Vec<RatingRow>);

    impl RatingSink for MemorySink {
        fn write_ratings(&mut self, _ladder: &str, rows: &[RatingRow]) -> Result<()> {
            self.0 = rows.to_vec();
            Ok(())
        }
    }

    let source = MemorySource(RefCell::new(games));
    let mut sink = MemorySink(Vec::new());
    ProcessingService::new(settings).run(&source, &source, &mut sink)
}
