pub mod status;
pub mod sync;

use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct StateArgs {
    /// Where per-source watermarks are persisted between runs
    #[arg(long = "state", env = "STATE_PATH", default_value = "watermarks.json")]
    pub state_path: PathBuf,
}
