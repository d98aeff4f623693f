//! Cross-posts new YouTube uploads to subreddits
//!
//! Meant to be run periodically by something like cron or a systemd timer. Runs must not overlap
//! since nothing guards the watermark file against concurrent writers

mod commands;
mod config;
mod crosspost;
mod delta;
mod log;
mod reddit;
mod repost;
mod types;
mod utils;
mod watermark;
mod youtube;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Log per-item decisions too
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Post everything new since the last run
    Sync(commands::sync::Args),
    /// Show what's tracked for each source
    Status(commands::status::Args),
}

fn main() -> anyhow::Result<()> {
    // A missing .env is fine, everything can come from the real environment
    let _ = dotenv::dotenv();
    let Cli { verbose, command } = Cli::parse();

    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    log::init(default_level)?;

    match command {
        Command::Sync(args) => commands::sync::run(args),
        Command::Status(args) => commands::status::run(args),
    }
}
