use anyhow::{Context, Result};
use log::LevelFilter;
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<()> = OnceCell::new();

pub fn level_filter(level: &str) -> LevelFilter {
    match level {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Installs the global `env_logger` once; later calls keep the first level.
pub fn setup_logger(level: &str) -> Result<()> {
    LOGGER
        .get_or_try_init(|| {
            env_logger::builder()
                .filter_level(level_filter(level))
                .format_timestamp_micros()
                .target(env_logger::Target::Stderr)
                .try_init()
                .context("failed to initialise logger")
        })
        .map(|_| ())
}
