pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod identity;
pub mod player;
pub mod rating;
pub mod services;
pub mod sources;
pub mod stats;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;

use crate::cli::{Cli, Command};
use crate::config::settings::{parse_duplicate_policy, DatabaseSettings, EngineSettings};
use crate::database::SqliteStore;
use crate::domain::game_mode::ALL_GAME_MODES;
use crate::services::ProcessingService;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

#[allow(clippy::too_many_arguments)]
pub fn handle_process(
    gamemode: &str,
    database: Option<String>,
    end_date: Option<NaiveDate>,
    time_shift: i64,
    duplicates: &str,
    tournament_games: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let end_date = end_date.unwrap_or_else(|| Utc::now().date_naive());

    let mut settings = EngineSettings::for_ladder(gamemode, end_date)?;
    settings.time_shift_hours = time_shift;
    settings.duplicate_policy = parse_duplicate_policy(duplicates)?;
    settings.dry_run = dry_run;

    if let Some(tournament_file) = tournament_games {
        if !tournament_file.exists() {
            anyhow::bail!("the file '{}' does not exist", tournament_file.display());
        }
        settings.tournament_file = Some(tournament_file);
    }

    let database_settings = database
        .map(|path| DatabaseSettings { path })
        .unwrap_or_default();

    let pool = database::create_pool(&database_settings.path)
        .with_context(|| format!("Failed to open database '{}'", database_settings.path))?;
    let store = SqliteStore::new(pool.clone());
    store.reset_schema()?;
    let mut sink = SqliteStore::new(pool);

    let service = ProcessingService::new(settings);
    let outcome = service.run(&store, &store, &mut sink)?;

    log::info!(
        "{} players rated, {} currently active.",
        outcome.rows.len(),
        outcome.roster.active_player_count()
    );

    Ok(())
}

pub fn handle_modes() -> Result<()> {
    for mode in ALL_GAME_MODES {
        println!(
            "{:<14} {} ({} players per game)",
            mode.short_name(),
            mode.name(),
            mode.player_count()
        );
    }
    Ok(())
}
