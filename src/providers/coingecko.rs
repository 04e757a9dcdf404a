use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::util::{HttpStatusError, is_transient, with_retry};
use crate::core::config::AppConfig;
use crate::core::currency::Currency;
use crate::core::market::{CoinDetail, CoinMarket, GlobalMarket, MarketDataProvider, MarketQuery};

const USER_AGENT: &str = concat!("coinboard/", env!("CARGO_PKG_VERSION"));
const DEFAULT_RETRIES: usize = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Market data from the CoinGecko v3 REST API, either directly or through
/// the RapidAPI gateway when an API key is configured.
pub struct CoinGeckoProvider {
    base_url: String,
    api_key: Option<String>,
    api_host: Option<String>,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            api_host: None,
            client,
            retries: DEFAULT_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = Self::new(&config.providers.coingecko.base_url)?
            .with_api_key(config.api_key(), config.providers.coingecko.api_host.clone());
        Ok(provider)
    }

    pub fn with_api_key(mut self, api_key: Option<String>, api_host: Option<String>) -> Self {
        self.api_key = api_key;
        self.api_host = api_host;
        self
    }

    pub fn with_retry_policy(mut self, retries: usize, delay_ms: u64) -> Self {
        self.retries = retries;
        self.retry_delay_ms = delay_ms;
        self
    }

    /// `X-RapidAPI-Host` value: configured explicitly or taken from the base URL.
    fn rapidapi_host(&self) -> Option<String> {
        self.api_host.clone().or_else(|| {
            Url::parse(&self.base_url)
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str], params: &[(&str, String)]) -> Result<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| anyhow!("Invalid URL {}: {}", self.base_url, e))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Base URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    async fn request_text(&self, url: &Url, target: &str) -> Result<String> {
        let mut request = self.client.get(url.clone());
        if let Some(key) = &self.api_key {
            request = request.header("X-RapidAPI-Key", key);
            if let Some(host) = self.rapidapi_host() {
                request = request.header("X-RapidAPI-Host", host);
            }
        }

        let response = request.send().await?;
        debug!(status = %response.status(), "Received CoinGecko response");
        if !response.status().is_success() {
            return Err(HttpStatusError {
                status: response.status(),
                target: target.to_string(),
            }
            .into());
        }
        Ok(response.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
        target: &str,
    ) -> Result<T> {
        let url = self.url(segments, params)?;
        debug!("Requesting {}", url);

        let text = with_retry(
            || self.request_text(&url, target),
            self.retries,
            self.retry_delay_ms,
            is_transient,
        )
        .await?;

        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", target, e))
    }
}

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalMarket,
}

type PerCurrency = Option<HashMap<String, Option<f64>>>;

fn pick(values: &PerCurrency, currency: Currency) -> Option<f64> {
    values
        .as_ref()
        .and_then(|m| m.get(&currency.api_code()).copied().flatten())
}

#[derive(Debug, Default, Deserialize)]
struct CoinLinks {
    #[serde(default)]
    homepage: Vec<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct CoinMarketData {
    #[serde(default)]
    current_price: PerCurrency,
    #[serde(default)]
    market_cap: PerCurrency,
    #[serde(default)]
    total_volume: PerCurrency,
    #[serde(default)]
    high_24h: PerCurrency,
    #[serde(default)]
    low_24h: PerCurrency,
    #[serde(default)]
    price_change_percentage_1h_in_currency: PerCurrency,
    #[serde(default)]
    price_change_percentage_24h_in_currency: PerCurrency,
    #[serde(default)]
    price_change_percentage_7d_in_currency: PerCurrency,
    #[serde(default)]
    price_change_percentage_30d_in_currency: PerCurrency,
    #[serde(default)]
    price_change_percentage_1y_in_currency: PerCurrency,
    #[serde(default)]
    ath: PerCurrency,
    #[serde(default)]
    atl: PerCurrency,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    max_supply: Option<f64>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    id: String,
    symbol: String,
    name: String,
    market_cap_rank: Option<u32>,
    #[serde(default)]
    description: Option<HashMap<String, Option<String>>>,
    #[serde(default)]
    links: Option<CoinLinks>,
    #[serde(default)]
    market_data: Option<CoinMarketData>,
}

impl CoinResponse {
    fn into_detail(self, currency: Currency) -> CoinDetail {
        let data = self.market_data.unwrap_or_default();
        let description = self
            .description
            .and_then(|mut d| d.remove("en").flatten())
            .filter(|d| !d.trim().is_empty());
        let homepage = self
            .links
            .unwrap_or_default()
            .homepage
            .into_iter()
            .flatten()
            .find(|h| !h.trim().is_empty());

        CoinDetail {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            currency,
            market_cap_rank: self.market_cap_rank,
            homepage,
            description,
            current_price: pick(&data.current_price, currency),
            market_cap: pick(&data.market_cap, currency),
            total_volume: pick(&data.total_volume, currency),
            high_24h: pick(&data.high_24h, currency),
            low_24h: pick(&data.low_24h, currency),
            change_1h: pick(&data.price_change_percentage_1h_in_currency, currency),
            change_24h: pick(&data.price_change_percentage_24h_in_currency, currency),
            change_7d: pick(&data.price_change_percentage_7d_in_currency, currency),
            change_30d: pick(&data.price_change_percentage_30d_in_currency, currency),
            change_1y: pick(&data.price_change_percentage_1y_in_currency, currency),
            circulating_supply: data.circulating_supply,
            total_supply: data.total_supply,
            max_supply: data.max_supply,
            ath: pick(&data.ath, currency),
            atl: pick(&data.atl, currency),
            last_updated: data.last_updated,
        }
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    #[instrument(
        name = "CoinGeckoMarkets",
        skip(self, query),
        fields(currency = %query.currency, page = query.page)
    )]
    async fn fetch_markets(&self, query: &MarketQuery) -> Result<Vec<CoinMarket>> {
        let mut params = vec![
            ("vs_currency", query.currency.api_code()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", query.per_page.to_string()),
            ("page", query.page.to_string()),
            ("price_change_percentage", "1h,24h,7d".to_string()),
            ("sparkline", query.sparkline.to_string()),
        ];
        if !query.ids.is_empty() {
            params.push(("ids", query.ids.join(",")));
        }

        let target = format!("markets in {}", query.currency);
        let coins: Vec<CoinMarket> = self.get_json(&["coins", "markets"], &params, &target).await?;
        debug!(count = coins.len(), "Fetched market page");
        Ok(coins)
    }

    #[instrument(name = "CoinGeckoGlobal", skip(self))]
    async fn fetch_global(&self) -> Result<GlobalMarket> {
        let response: GlobalResponse = self.get_json(&["global"], &[], "global market").await?;
        Ok(response.data)
    }

    #[instrument(
        name = "CoinGeckoCoin",
        skip(self, id, currency),
        fields(id = %id, currency = %currency)
    )]
    async fn fetch_coin(&self, id: &str, currency: Currency) -> Result<CoinDetail> {
        if id.is_empty() || id.contains('/') {
            return Err(anyhow!("Invalid coin id: {}", id));
        }
        let params = [
            ("localization", "false".to_string()),
            ("tickers", "false".to_string()),
            ("market_data", "true".to_string()),
            ("community_data", "false".to_string()),
            ("developer_data", "false".to_string()),
            ("sparkline", "false".to_string()),
        ];
        let target = format!("coin: {id}");

        let response = match self.get_json::<CoinResponse>(&["coins", id], &params, &target).await {
            Ok(response) => response,
            Err(e) => {
                let not_found = e
                    .downcast_ref::<HttpStatusError>()
                    .is_some_and(|s| s.status == StatusCode::NOT_FOUND);
                if not_found {
                    return Err(anyhow!("Coin not found: {}", id));
                }
                return Err(e);
            }
        };
        Ok(response.into_detail(currency))
    }
}
