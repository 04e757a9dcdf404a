pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::currency::Currency;
use crate::core::market::MarketDataProvider;
use crate::core::preferences::{PreferenceStore, resolve_currency};
use crate::core::route::Route;
use crate::providers::caching::CachingMarketProvider;
use crate::providers::coingecko::CoinGeckoProvider;
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

pub use crate::cli::markets::MarketsOptions;

/// A page that fetches market data and renders it.
pub enum Page {
    Markets(MarketsOptions),
    Coin { id: String },
    Portfolio,
}

impl From<Route> for Page {
    fn from(route: Route) -> Self {
        match route {
            Route::Home => Page::Markets(MarketsOptions::default()),
            Route::Coin { id } => Page::Coin { id },
            Route::Portfolio => Page::Portfolio,
        }
    }
}

pub enum AppCommand {
    Show(Page),
    Open { route: Route },
    Currency { code: Option<String> },
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_path: Option<String>,
    /// One-off display currency; never saved.
    pub currency: Option<Currency>,
    /// Keep preferences in memory only.
    pub no_persist: bool,
}

pub async fn run_command(command: AppCommand, options: &RunOptions) -> Result<()> {
    info!("coinboard starting...");

    let config = match options.config_path.as_deref() {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    // Saving a currency must reach the disk store, so it does not fall back to memory
    let saves_currency = matches!(command, AppCommand::Currency { code: Some(_) });
    let store: Box<dyn PreferenceStore> = if saves_currency && !options.no_persist {
        Box::new(store::open_disk_store(&config)?)
    } else {
        store::open_preference_store(&config, !options.no_persist)
    };
    let currency = resolve_currency(store.as_ref(), options.currency, config.currency)?;

    let page = match command {
        AppCommand::Show(page) => page,
        AppCommand::Open { route } => {
            debug!(%route, "Opening page");
            Page::from(route)
        }
        AppCommand::Currency { code } => {
            return cli::currency::run(
                store.as_ref(),
                code.as_deref(),
                currency,
                !options.no_persist,
            );
        }
    };

    let provider = CachingMarketProvider::new(
        CoinGeckoProvider::from_config(&config)?,
        Duration::from_secs(config.cache_ttl_secs),
    );
    render_page(page, &provider, &config, currency).await
}

async fn render_page(
    page: Page,
    provider: &dyn MarketDataProvider,
    config: &AppConfig,
    currency: Currency,
) -> Result<()> {
    match page {
        Page::Markets(options) => {
            cli::markets::run(provider, currency, &options, config.per_page).await
        }
        Page::Coin { id } => cli::coin::run(provider, &id, currency).await,
        Page::Portfolio => cli::portfolio::run(provider, &config.portfolio, currency).await,
    }
}
