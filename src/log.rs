use std::io;

use tracing_log::LogTracer;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Logs go to stderr. `LOG` directives win over `default_level`
pub fn init(default_level: LevelFilter) -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("LOG")
        .from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_target(default_level >= LevelFilter::DEBUG)
        .with_env_filter(env_filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    // Forward `log` records from roux and reqwest
    LogTracer::init()?;

    Ok(())
}
