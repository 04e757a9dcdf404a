//! Market data abstractions and core types

use crate::core::currency::Currency;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

pub const DEFAULT_PER_PAGE: u32 = 100;
pub const MAX_PER_PAGE: u32 = 250;

/// One row of the `/coins/markets` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sparkline_in_7d: Option<Sparkline>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sparkline {
    #[serde(default)]
    pub price: Vec<f64>,
}

/// Aggregate statistics for the whole crypto market, from `/global`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalMarket {
    #[serde(default)]
    pub active_cryptocurrencies: Option<u64>,
    #[serde(default)]
    pub total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    pub total_volume: HashMap<String, f64>,
    #[serde(default)]
    pub market_cap_percentage: HashMap<String, f64>,
}

impl GlobalMarket {
    pub fn total_market_cap_in(&self, currency: Currency) -> Option<f64> {
        self.total_market_cap.get(&currency.api_code()).copied()
    }

    pub fn total_volume_in(&self, currency: Currency) -> Option<f64> {
        self.total_volume.get(&currency.api_code()).copied()
    }

    /// Market cap dominance in percent for a lowercase coin symbol, e.g. `btc`.
    pub fn dominance(&self, symbol: &str) -> Option<f64> {
        self.market_cap_percentage
            .get(&symbol.to_lowercase())
            .copied()
    }
}

/// A single coin priced in one currency, from `/coins/{id}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub currency: Currency,
    pub market_cap_rank: Option<u32>,
    pub homepage: Option<String>,
    pub description: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub change_1h: Option<f64>,
    pub change_24h: Option<f64>,
    pub change_7d: Option<f64>,
    pub change_30d: Option<f64>,
    pub change_1y: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub atl: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarketQuery {
    pub currency: Currency,
    pub per_page: u32,
    pub page: u32,
    pub ids: Vec<String>,
    pub sparkline: bool,
}

impl MarketQuery {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            per_page: DEFAULT_PER_PAGE,
            page: 1,
            ids: Vec::new(),
            sparkline: false,
        }
    }

    pub fn with_page(mut self, page: u32, per_page: u32) -> Result<Self> {
        if page == 0 {
            return Err(anyhow!("Page numbers start at 1"));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(anyhow!(
                "Results per page must be between 1 and {MAX_PER_PAGE}, got {per_page}"
            ));
        }
        self.page = page;
        self.per_page = per_page;
        Ok(self)
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }

    pub fn with_sparkline(mut self, sparkline: bool) -> Self {
        self.sparkline = sparkline;
        self
    }

    /// Stable cache key for this request.
    pub fn cache_key(&self) -> String {
        format!(
            "markets:{}:{}:{}:{}:{}",
            self.currency.api_code(),
            self.per_page,
            self.page,
            self.ids.join(","),
            self.sparkline
        )
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_markets(&self, query: &MarketQuery) -> Result<Vec<CoinMarket>>;
    async fn fetch_global(&self) -> Result<GlobalMarket>;
    async fn fetch_coin(&self, id: &str, currency: Currency) -> Result<CoinDetail>;

    /// Drops anything kept from earlier requests so the next fetch reaches the API.
    async fn invalidate(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Rank,
    Name,
    Symbol,
    Price,
    Change1h,
    Change24h,
    Change7d,
    MarketCap,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SortKey::Rank => "rank",
                SortKey::Name => "name",
                SortKey::Symbol => "symbol",
                SortKey::Price => "price",
                SortKey::Change1h => "change-1h",
                SortKey::Change24h => "change-24h",
                SortKey::Change7d => "change-7d",
                SortKey::MarketCap => "market-cap",
                SortKey::Volume => "volume",
            }
        )
    }
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "rank" | "#" => Ok(SortKey::Rank),
            "name" => Ok(SortKey::Name),
            "symbol" | "ticker" => Ok(SortKey::Symbol),
            "price" => Ok(SortKey::Price),
            "change-1h" | "1h" => Ok(SortKey::Change1h),
            "change-24h" | "24h" => Ok(SortKey::Change24h),
            "change-7d" | "7d" => Ok(SortKey::Change7d),
            "market-cap" | "marketcap" | "mcap" => Ok(SortKey::MarketCap),
            "volume" | "vol" => Ok(SortKey::Volume),
            _ => Err(anyhow!("Invalid sort key: {}", s)),
        }
    }
}

enum SortValue<'a> {
    Number(Option<f64>),
    Text(&'a str),
}

impl SortKey {
    fn value<'a>(&self, coin: &'a CoinMarket) -> SortValue<'a> {
        match self {
            SortKey::Rank => SortValue::Number(coin.market_cap_rank.map(f64::from)),
            SortKey::Name => SortValue::Text(&coin.name),
            SortKey::Symbol => SortValue::Text(&coin.symbol),
            SortKey::Price => SortValue::Number(coin.current_price),
            SortKey::Change1h => SortValue::Number(coin.price_change_percentage_1h_in_currency),
            SortKey::Change24h => SortValue::Number(coin.price_change_percentage_24h_in_currency),
            SortKey::Change7d => SortValue::Number(coin.price_change_percentage_7d_in_currency),
            SortKey::MarketCap => SortValue::Number(coin.market_cap),
            SortKey::Volume => SortValue::Number(coin.total_volume),
        }
    }
}

fn compare(a: &SortValue, b: &SortValue, order: SortOrder) -> Ordering {
    let directed = |ord: Ordering| match order {
        SortOrder::Ascending => ord,
        SortOrder::Descending => ord.reverse(),
    };
    match (a, b) {
        (SortValue::Text(a), SortValue::Text(b)) => directed(a.to_lowercase().cmp(&b.to_lowercase())),
        (SortValue::Number(a), SortValue::Number(b)) => {
            // Missing or NaN values go last in either direction.
            let a = a.filter(|v| !v.is_nan());
            let b = b.filter(|v| !v.is_nan());
            match (a, b) {
                (Some(a), Some(b)) => directed(a.total_cmp(&b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
        _ => Ordering::Equal,
    }
}

/// Stable in-place sort of a market page.
pub fn sort_coins(coins: &mut [CoinMarket], key: SortKey, order: SortOrder) {
    coins.sort_by(|a, b| compare(&key.value(a), &key.value(b), order));
}
