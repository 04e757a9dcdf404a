use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinboard::core::currency::Currency;
use coinboard::core::log::init_logging;
use coinboard::core::market::{SortKey, SortOrder};
use coinboard::core::route::Route;
use coinboard::{AppCommand, MarketsOptions, Page, RunOptions};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Display currency for this run only (e.g. USD)
    #[arg(long, global = true)]
    currency: Option<Currency>,

    /// Do not read or save the currency preference on disk
    #[arg(long, global = true)]
    no_persist: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List coins by market cap with price changes
    Markets {
        /// Column to sort by: rank, name, symbol, price, 1h, 24h, 7d, market-cap, volume
        #[arg(short, long, default_value = "rank")]
        sort: SortKey,
        /// Sort in descending order
        #[arg(long, conflicts_with = "asc")]
        desc: bool,
        /// Sort in ascending order (default)
        #[arg(long)]
        asc: bool,
        /// Show at most this many coins
        #[arg(short, long)]
        limit: Option<usize>,
        /// Page of results to fetch
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Coins per page (1-250)
        #[arg(long)]
        per_page: Option<u32>,
        /// Show a 7 day price sparkline
        #[arg(long)]
        sparkline: bool,
        /// Refresh every N seconds until interrupted
        #[arg(short, long, value_name = "SECS")]
        watch: Option<u64>,
    },
    /// Show details for one coin
    Coin {
        /// Coin id, e.g. bitcoin
        id: String,
    },
    /// Show the value of configured holdings
    Portfolio,
    /// Open a page by route: /, /coin/<id> or /portfolio
    Open {
        route: Route,
    },
    /// Show or change the saved display currency
    Currency {
        /// New currency code
        code: Option<String>,
    },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Markets {
                sort,
                desc,
                asc: _,
                limit,
                page,
                per_page,
                sparkline,
                watch,
            } => AppCommand::Show(Page::Markets(MarketsOptions {
                sort,
                order: if desc {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                },
                limit,
                page,
                per_page,
                sparkline,
                watch,
            })),
            Commands::Coin { id } => AppCommand::Show(Page::Coin { id }),
            Commands::Portfolio => AppCommand::Show(Page::Portfolio),
            Commands::Open { route } => AppCommand::Open { route },
            Commands::Currency { code } => AppCommand::Currency { code },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let options = RunOptions {
        config_path: cli.config_path,
        currency: cli.currency,
        no_persist: cli.no_persist,
    };

    let result = match cli.command {
        Some(Commands::Setup) => coinboard::cli::setup::setup(),
        Some(cmd) => coinboard::run_command(cmd.into(), &options).await,
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
