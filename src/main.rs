use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use spotfeed::log::{LogFormat, init_logging};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for spotfeed::AppCommand {
    fn from(cmd: Commands) -> spotfeed::AppCommand {
        match cmd {
            Commands::Serve => spotfeed::AppCommand::Serve,
            Commands::FetchOnce => spotfeed::AppCommand::FetchOnce,
            Commands::Latest { pair } => spotfeed::AppCommand::Latest(pair),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Collect prices on a schedule and serve the read API
    Serve,
    /// Run a single fetch tick and print the outcome
    FetchOnce,
    /// Show the latest stored price for a pair
    Latest {
        /// Pair symbol, e.g. BTCUSDT
        pair: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    let result = match cli.command {
        Some(Commands::Setup) => spotfeed::cli::setup::setup(),
        Some(cmd) => spotfeed::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
