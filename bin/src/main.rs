//! candlewick CLI - incremental multi-resolution candle aggregation.

use std::path::PathBuf;

use anyhow::Result;
use candlewick_lib::InputFormat;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

mod commands;
mod display;
mod logging;

use display::Format;

#[derive(Parser)]
#[command(name = "candlewick")]
#[command(about = "Incremental multi-resolution candle aggregation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only, no progress output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Candle archive directory. Defaults to the config's state_dir, then the
    /// platform data directory.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
}

/// Tick file format.
#[derive(Clone, Copy, ValueEnum)]
enum Input {
    Csv,
    Ndjson,
}

impl From<Input> for InputFormat {
    fn from(input: Input) -> Self {
        match input {
            Input::Csv => Self::Csv,
            Input::Ndjson => Self::Ndjson,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog pairs
    Pairs {
        /// Filter by category (major, mid-cap, emerging, small-cap)
        #[arg(short, long)]
        category: Option<String>,

        /// Search pattern
        #[arg(short, long)]
        search: Option<String>,

        /// Include inactive pairs
        #[arg(long)]
        all: bool,
    },

    /// Show pair details and archived coverage
    Info {
        /// Pair symbol (e.g. BTC, kPEPE)
        symbol: String,
    },

    /// Replay a recorded tick file on a simulated clock
    Replay {
        /// Tick file (CSV or NDJSON)
        file: PathBuf,

        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input format. Defaults to the file extension.
        #[arg(short, long, value_enum)]
        input: Option<Input>,

        /// Replay in timestamp order instead of file order
        #[arg(long)]
        sorted: bool,

        /// Start of a manual repair window (YYYY-MM-DD or RFC 3339)
        #[arg(long, requires = "repair_to")]
        repair_from: Option<String>,

        /// End of a manual repair window (exclusive)
        #[arg(long, requires = "repair_from")]
        repair_to: Option<String>,
    },

    /// Ingest NDJSON ticks from stdin in real time
    Run {
        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seconds between archive saves
        #[arg(long, default_value = "300")]
        save_every: u64,
    },

    /// Show archived candles
    Candles {
        /// Pair symbol
        symbol: String,

        /// Timeframe (1m, 5m, 15m, 1h, 4h, 1d)
        timeframe: String,

        /// Earliest bucket start (inclusive)
        #[arg(long)]
        from: Option<String>,

        /// Latest bucket start (inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Keep only the most recent N candles
        #[arg(short, long)]
        limit: Option<usize>,

        /// Also show pending candles inside the safety lag
        #[arg(long)]
        include_pending: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: Format,

        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check whether enough materialized candles exist
    Readiness {
        /// Pair symbol
        symbol: String,

        /// Timeframe (1m, 5m, 15m, 1h, 4h, 1d)
        timeframe: String,

        /// Required number of materialized candles
        required: usize,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove archived candles before a cutoff
    Prune {
        /// Timeframe (1m, 5m, 15m, 1h, 4h, 1d)
        timeframe: String,

        /// Cutoff (YYYY-MM-DD or RFC 3339); earlier buckets are removed
        #[arg(long)]
        before: String,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Pairs {
            category,
            search,
            all,
        } => commands::pairs::list_pairs(category.as_deref(), search.as_deref(), all),
        Commands::Info { symbol } => commands::info::show_info(&symbol, cli.state_dir),
        Commands::Replay {
            file,
            config,
            input,
            sorted,
            repair_from,
            repair_to,
        } => {
            let args = commands::replay::ReplayArgs {
                file: &file,
                config: config.as_deref(),
                input: input.map(Into::into),
                sorted,
                repair_from: repair_from.as_deref(),
                repair_to: repair_to.as_deref(),
            };
            commands::replay::replay(&args, cli.state_dir, cli.quiet)
        }
        Commands::Run { config, save_every } => {
            commands::run::run(config.as_deref(), cli.state_dir, save_every, cli.quiet).await
        }
        Commands::Candles {
            symbol,
            timeframe,
            from,
            to,
            limit,
            include_pending,
            format,
            output,
        } => {
            let args = commands::candles::CandlesArgs {
                symbol: &symbol,
                timeframe: &timeframe,
                from: from.as_deref(),
                to: to.as_deref(),
                limit,
                include_pending,
                format,
                output: output.as_deref(),
            };
            commands::candles::show_candles(&args, cli.state_dir)
        }
        Commands::Readiness {
            symbol,
            timeframe,
            required,
            json,
        } => commands::readiness::show_readiness(&symbol, &timeframe, required, json, cli.state_dir),
        Commands::Prune {
            timeframe,
            before,
            yes,
        } => commands::prune::prune(&timeframe, &before, yes, cli.state_dir),
    }
}
