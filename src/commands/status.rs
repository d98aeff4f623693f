use super::StateArgs;
use crate::watermark::{SourceWatermark, WatermarkStore};

#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    state: StateArgs,
}

pub fn run(Args { state }: Args) -> anyhow::Result<()> {
    let store = WatermarkStore::new(state.state_path);
    let watermarks = store.load()?;

    if watermarks.is_empty() {
        println!("No watermarks at {}", store.path().display());
        return Ok(());
    }

    for (source, SourceWatermark { recent_ids, change_token }) in &watermarks {
        println!("---");
        println!("source: {source}");
        println!("tracked: {}", recent_ids.len());
        if let Some(newest) = recent_ids.first() {
            println!("newest: {newest}");
        }
        println!("etag: {}", change_token.as_deref().unwrap_or("-"));
    }

    Ok(())
}
