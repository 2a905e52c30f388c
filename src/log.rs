use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human readable, one line per event
    #[default]
    Compact,
    /// JSON lines
    Json,
}

/// Installs the global subscriber. `RUST_LOG` overrides the level picked by `verbose`.
pub fn init_logging(verbose: bool, format: LogFormat) {
    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::INFO, "info")
    };
    // Dependencies (hyper, fjall) stay at warn unless RUST_LOG says otherwise.
    let app_filter = Targets::new()
        .with_target("spotfeed", level_filter)
        .with_default(LevelFilter::WARN);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(app_filter).with(env_filter);
    match format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}
