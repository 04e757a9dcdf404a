//! Client-side state for the market list: the latest successful fetch.

use crate::core::currency::Currency;
use crate::core::market::{CoinMarket, GlobalMarket, MarketDataProvider, MarketQuery};
use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub currency: Currency,
    pub coins: Vec<CoinMarket>,
    /// `None` when the global stats request failed while the coin list succeeded.
    pub global: Option<GlobalMarket>,
    pub fetched_at: DateTime<Utc>,
}

/// Holds what the market page shows. A snapshot is only ever replaced
/// wholesale by a newer successful fetch.
pub struct MarketBoard {
    query: MarketQuery,
    snapshot: Option<MarketSnapshot>,
    last_error: Option<String>,
}

impl MarketBoard {
    pub fn new(query: MarketQuery) -> Self {
        Self {
            query,
            snapshot: None,
            last_error: None,
        }
    }

    pub fn currency(&self) -> Currency {
        self.query.currency
    }

    pub fn snapshot(&self) -> Option<&MarketSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fetches the coin list and global stats concurrently, bypassing any
    /// responses the provider kept from the previous refresh.
    ///
    /// On failure the previous snapshot stays in place and the error is kept
    /// for display as well as returned.
    pub async fn refresh(&mut self, provider: &dyn MarketDataProvider) -> Result<()> {
        provider.invalidate().await;
        let (markets, global) =
            futures::join!(provider.fetch_markets(&self.query), provider.fetch_global());

        let coins = match markets {
            Ok(coins) => coins,
            Err(e) => {
                warn!(error = %e, "Market refresh failed, keeping previous data");
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let global = match global {
            Ok(global) => Some(global),
            Err(e) => {
                warn!(error = %e, "Global market stats unavailable");
                None
            }
        };

        debug!(coins = coins.len(), "Market snapshot replaced");
        self.snapshot = Some(MarketSnapshot {
            currency: self.query.currency,
            coins,
            global,
            fetched_at: Utc::now(),
        });
        self.last_error = None;
        Ok(())
    }
}
