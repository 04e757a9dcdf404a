use crate::core::cache::Cache;
use crate::core::currency::Currency;
use crate::core::market::{CoinDetail, CoinMarket, GlobalMarket, MarketDataProvider, MarketQuery};
use crate::store::memory::MemoryCache;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Serves repeated requests from memory for `ttl`. Only successful responses
/// are kept, so a failed request is always retried against the inner provider.
pub struct CachingMarketProvider<T: MarketDataProvider> {
    inner: T,
    ttl: Option<Duration>,
    markets: MemoryCache<String, Vec<CoinMarket>>,
    global: MemoryCache<String, GlobalMarket>,
    coins: MemoryCache<String, CoinDetail>,
}

impl<T: MarketDataProvider> CachingMarketProvider<T> {
    /// A zero `ttl` disables caching.
    pub fn new(inner: T, ttl: Duration) -> Self {
        Self {
            inner,
            ttl: (!ttl.is_zero()).then_some(ttl),
            markets: MemoryCache::new(),
            global: MemoryCache::new(),
            coins: MemoryCache::new(),
        }
    }
}

#[async_trait]
impl<T: MarketDataProvider> MarketDataProvider for CachingMarketProvider<T> {
    async fn fetch_markets(&self, query: &MarketQuery) -> Result<Vec<CoinMarket>> {
        let key = query.cache_key();
        if self.ttl.is_some() {
            if let Some(cached) = self.markets.get(&key).await {
                return Ok(cached);
            }
        }
        let coins = self.inner.fetch_markets(query).await?;
        if self.ttl.is_some() {
            self.markets.put(key, coins.clone(), self.ttl).await;
        }
        Ok(coins)
    }

    async fn fetch_global(&self) -> Result<GlobalMarket> {
        let key = "global".to_string();
        if self.ttl.is_some() {
            if let Some(cached) = self.global.get(&key).await {
                return Ok(cached);
            }
        }
        let global = self.inner.fetch_global().await?;
        if self.ttl.is_some() {
            self.global.put(key, global.clone(), self.ttl).await;
        }
        Ok(global)
    }

    async fn fetch_coin(&self, id: &str, currency: Currency) -> Result<CoinDetail> {
        let key = format!("coin:{id}:{}", currency.api_code());
        if self.ttl.is_some() {
            if let Some(cached) = self.coins.get(&key).await {
                debug!("Serving {} from cache", id);
                return Ok(cached);
            }
        }
        let detail = self.inner.fetch_coin(id, currency).await?;
        if self.ttl.is_some() {
            self.coins.put(key, detail.clone(), self.ttl).await;
        }
        Ok(detail)
    }

    async fn invalidate(&self) {
        debug!("Dropping cached market responses");
        self.markets.clear().await;
        self.global.clear().await;
        self.coins.clear().await;
        self.inner.invalidate().await;
    }
}
