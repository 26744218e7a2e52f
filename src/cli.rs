use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Glicko-2 rating generator for CnCNet ladder games")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Compute ratings for a ladder and write them to the database
    Process {
        /// Ladder abbreviation. Fully supported are blitz, ra2, yr and
        /// blitz-2v2, but others might work, too.
        #[arg(short = 'm', long)]
        gamemode: String,

        /// Path to the sqlite database (overrides DATABASE_PATH)
        #[arg(long)]
        database: Option<String>,

        /// Chronological cutoff; games on or after this day are ignored.
        /// Defaults to today.
        #[arg(short, long)]
        end_date: Option<NaiveDate>,

        /// Hour offset applied when bucketing game end times into days
        #[arg(long, default_value_t = 0)]
        time_shift: i64,

        /// Duplicate-account policy: hints, primary or ignore
        #[arg(long, default_value = "hints")]
        duplicates: String,

        /// Add tournament games from this JSON file
        #[arg(short, long)]
        tournament_games: Option<PathBuf>,

        /// Run without writing any results (test mode)
        #[arg(short, long)]
        dry_run: bool,
    },
    /// List the supported game modes
    Modes,
}
