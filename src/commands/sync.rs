use std::path::PathBuf;

use super::StateArgs;
use crate::{
    config::{Config, Secrets},
    crosspost::{CrossPoster, Report},
    reddit::Reddit,
    watermark::WatermarkStore,
    youtube::Youtube,
};

#[derive(clap::Args, Debug)]
pub struct Args {
    #[arg(long = "config", env = "CONFIG_PATH")]
    config_path: PathBuf,
    #[arg(long = "secrets", env = "SECRETS_PATH")]
    secrets_path: PathBuf,
    #[command(flatten)]
    state: StateArgs,
    /// Only log what would be submitted
    #[arg(long)]
    dry_run: bool,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let Args {
        config_path,
        secrets_path,
        state: StateArgs { state_path },
        dry_run,
    } = args;

    // Bad configuration bails before anything touches the network
    let config = Config::load(&config_path)?;
    let secrets = Secrets::load(&secrets_path)?;

    let store = WatermarkStore::new(state_path);
    let watermarks = store.load_or_default()?;

    let youtube = Youtube::new(&secrets.youtube, &secrets.reddit.user_agent)?;
    let reddit = Reddit::new(secrets.reddit);

    let Report {
        failed_sources,
        submitted,
        skipped_reposts,
        failed_submissions,
    } = CrossPoster::new(&config, &youtube, &reddit, &store)
        .dry_run(dry_run)
        .run(watermarks)?;

    tracing::info!(
        submitted,
        skipped_reposts,
        failed_submissions,
        failed_sources,
        "Finished run"
    );
    Ok(())
}
