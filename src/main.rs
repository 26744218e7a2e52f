use anyhow::Result;

use elogen::cli::Command;
use elogen::{handle_modes, handle_process, interpret};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::Process {
            gamemode,
            database,
            end_date,
            time_shift,
            duplicates,
            tournament_games,
            dry_run,
        } => handle_process(
            gamemode,
            database.clone(),
            *end_date,
            *time_shift,
            duplicates,
            tournament_games.clone(),
            *dry_run,
        ),
        Command::Modes => handle_modes(),
    }
}
