use super::ui;
use crate::core::currency::Currency;
use crate::core::format::{format_compact, format_money, format_number, sparkline};
use crate::core::market::{
    GlobalMarket, MarketDataProvider, MarketQuery, SortKey, SortOrder, sort_coins,
};
use crate::core::state::{MarketBoard, MarketSnapshot};
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};
use std::time::Duration;
use tracing::{debug, warn};

const SPARKLINE_WIDTH: usize = 24;

/// How the market list is fetched and laid out.
#[derive(Debug, Clone)]
pub struct MarketsOptions {
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub page: u32,
    pub per_page: Option<u32>,
    pub sparkline: bool,
    /// Refresh interval in seconds; `None` renders once.
    pub watch: Option<u64>,
}

impl Default for MarketsOptions {
    fn default() -> Self {
        MarketsOptions {
            sort: SortKey::Rank,
            order: SortOrder::Ascending,
            limit: None,
            page: 1,
            per_page: None,
            sparkline: false,
            watch: None,
        }
    }
}

fn total_line(label: &str, value: Option<f64>, currency: Currency) -> String {
    let value_text = value.map_or_else(
        || ui::style_text("N/A", ui::StyleType::Subtle),
        |v| {
            let text = format!("{} ({})", format_money(v, currency), format_compact(v));
            ui::style_text(&text, ui::StyleType::TotalValue)
        },
    );
    format!(
        "{}: {}",
        ui::style_text(label, ui::StyleType::TotalLabel),
        value_text
    )
}

/// Coin count and bitcoin dominance, when the global stats carry them.
fn market_breadth(global: &GlobalMarket) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(active) = global.active_cryptocurrencies {
        parts.push(format!("{} coins tracked", format_number(active as f64, 0)));
    }
    if let Some(btc) = global.dominance("btc") {
        parts.push(format!("BTC dominance {btc:.1}%"));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Renders one snapshot: the market header followed by the coin table.
pub fn render_snapshot(snapshot: &MarketSnapshot, options: &MarketsOptions) -> String {
    let currency = snapshot.currency;
    let mut output = format!(
        "{}    Currency: {}\n",
        ui::style_text("Cryptocurrency Prices by Market Cap", ui::StyleType::Title),
        ui::style_text(currency.code(), ui::StyleType::TotalLabel)
    );
    output.push_str(&ui::style_text(
        "Stay up to date in the ever changing world of Cryptocurrency!",
        ui::StyleType::Subtle,
    ));
    output.push_str("\n\n");

    let global = snapshot.global.as_ref();
    output.push_str(&total_line(
        "Total Crypto Marketcap",
        global.and_then(|g| g.total_market_cap_in(currency)),
        currency,
    ));
    output.push('\n');
    output.push_str(&total_line(
        "24 hour Trading Volume",
        global.and_then(|g| g.total_volume_in(currency)),
        currency,
    ));
    if let Some(breadth) = global.and_then(market_breadth) {
        output.push('\n');
        output.push_str(&ui::style_text(&breadth, ui::StyleType::Subtle));
    }
    output.push_str("\n\n");

    if snapshot.coins.is_empty() {
        output.push_str("No coins returned for this page.");
        return output;
    }

    let mut coins = snapshot.coins.clone();
    sort_coins(&mut coins, options.sort, options.order);
    if let Some(limit) = options.limit {
        coins.truncate(limit);
    }

    let mut table = ui::new_styled_table();
    let mut header = vec![
        ui::header_cell("#"),
        ui::header_cell("Coin"),
        ui::header_cell("Name"),
        ui::header_cell("Price"),
        ui::header_cell("1h"),
        ui::header_cell("24h"),
        ui::header_cell("7d"),
        ui::header_cell("Market Cap"),
        ui::header_cell("24h Volume"),
    ];
    if options.sparkline {
        header.push(ui::header_cell("Last 7 Days"));
    }
    table.set_header(header);

    for coin in &coins {
        let mut row = vec![
            ui::format_optional_cell(coin.market_cap_rank, |r| format!("{r}.")),
            Cell::new(coin.symbol.to_uppercase()),
            Cell::new(&coin.name),
            ui::money_cell(coin.current_price, currency),
            ui::change_cell(coin.price_change_percentage_1h_in_currency),
            ui::change_cell(coin.price_change_percentage_24h_in_currency),
            ui::change_cell(coin.price_change_percentage_7d_in_currency),
            ui::money_cell(coin.market_cap, currency),
            ui::money_cell(coin.total_volume, currency),
        ];
        if options.sparkline {
            let line = coin
                .sparkline_in_7d
                .as_ref()
                .map(|s| sparkline(&s.price, SPARKLINE_WIDTH))
                .unwrap_or_default();
            row.push(Cell::new(ui::style_delta(
                &line,
                coin.price_change_percentage_7d_in_currency,
            ))
            .set_alignment(CellAlignment::Left));
        }
        table.add_row(row);
    }

    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{}",
        ui::style_text(
            &format!(
                "Sorted by {} ({}), fetched {}",
                options.sort,
                match options.order {
                    SortOrder::Ascending => "ascending",
                    SortOrder::Descending => "descending",
                },
                snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            ui::StyleType::Subtle
        )
    ));
    output
}

/// Renders whatever the board holds, including a failed refresh on top of
/// stale data.
pub fn render_board(board: &MarketBoard, options: &MarketsOptions) -> String {
    match (board.snapshot(), board.last_error()) {
        (Some(snapshot), None) => render_snapshot(snapshot, options),
        (Some(snapshot), Some(error)) => format!(
            "{}\n{}",
            render_snapshot(snapshot, options),
            ui::style_text(
                &format!("Refresh failed, showing last data: {error}"),
                ui::StyleType::Error
            )
        ),
        (None, Some(error)) => ui::style_text(
            &format!("Could not load {} market data: {error}", board.currency()),
            ui::StyleType::Error,
        ),
        (None, None) => format!("Fetching {} market data...", board.currency()),
    }
}

pub fn build_query(
    currency: Currency,
    options: &MarketsOptions,
    default_per_page: u32,
) -> Result<MarketQuery> {
    MarketQuery::new(currency)
        .with_page(options.page, options.per_page.unwrap_or(default_per_page))
        .map(|q| q.with_sparkline(options.sparkline))
}

pub async fn run(
    provider: &dyn MarketDataProvider,
    currency: Currency,
    options: &MarketsOptions,
    default_per_page: u32,
) -> Result<()> {
    let query = build_query(currency, options, default_per_page)?;
    let mut board = MarketBoard::new(query);

    let pb = ui::new_spinner("Fetching market data...");
    let first = board.refresh(provider).await;
    pb.finish_and_clear();

    let Some(interval) = options.watch else {
        first?;
        println!("{}", render_board(&board, options));
        return Ok(());
    };

    let term = console::Term::stdout();
    let period = Duration::from_secs(interval.max(1));
    loop {
        term.clear_screen()?;
        println!("{}", render_board(&board, options));
        println!(
            "\n{}",
            ui::style_text(
                &format!("Refreshing every {}s, Ctrl-C to quit", period.as_secs()),
                ui::StyleType::Subtle
            )
        );

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = tokio::signal::ctrl_c() => {
                debug!("Stopping market watch");
                return Ok(());
            }
        }

        if let Err(e) = board.refresh(provider).await {
            warn!(error = %e, "Watch refresh failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::market::{CoinDetail, CoinMarket, GlobalMarket, Sparkline};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Serves a fixed coin list until told to fail.
    #[derive(Default)]
    struct SwitchProvider {
        offline: AtomicBool,
    }

    #[async_trait]
    impl MarketDataProvider for SwitchProvider {
        async fn fetch_markets(&self, _query: &MarketQuery) -> Result<Vec<CoinMarket>> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(anyhow!("HTTP error: 503 Service Unavailable"));
            }
            Ok(vec![
                coin("bitcoin", "btc", 1, 104523.12, 2.0),
                coin("ethereum", "eth", 2, 5432.1, -1.26),
            ])
        }

        async fn fetch_global(&self) -> Result<GlobalMarket> {
            Ok(GlobalMarket::default())
        }

        async fn fetch_coin(&self, _id: &str, _currency: Currency) -> Result<CoinDetail> {
            Err(anyhow!("not used"))
        }
    }

    fn coin(id: &str, symbol: &str, rank: u32, price: f64, change_24h: f64) -> CoinMarket {
        CoinMarket {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: id.to_string(),
            image: None,
            current_price: Some(price),
            market_cap: Some(price * 1000.0),
            market_cap_rank: Some(rank),
            total_volume: None,
            high_24h: None,
            low_24h: None,
            circulating_supply: None,
            price_change_percentage_1h_in_currency: Some(0.1),
            price_change_percentage_24h_in_currency: Some(change_24h),
            price_change_percentage_7d_in_currency: None,
            last_updated: None,
            sparkline_in_7d: Some(Sparkline {
                price: vec![1.0, 2.0, 3.0],
            }),
        }
    }

    fn snapshot(global: Option<GlobalMarket>) -> MarketSnapshot {
        MarketSnapshot {
            currency: Currency::Nzd,
            coins: vec![
                coin("ethereum", "eth", 2, 5432.1, -1.26),
                coin("bitcoin", "btc", 1, 104523.12, 2.0),
                coin("solana", "sol", 5, 250.0, 7.5),
            ],
            global,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_snapshot_header_and_rows() {
        let global = GlobalMarket {
            total_market_cap: HashMap::from([("nzd".to_string(), 5_812_345_678_901.5)]),
            total_volume: HashMap::new(),
            market_cap_percentage: HashMap::from([("btc".to_string(), 56.34)]),
            active_cryptocurrencies: Some(15234),
        };
        let output = render_snapshot(&snapshot(Some(global)), &MarketsOptions::default());

        assert!(output.contains("Cryptocurrency Prices by Market Cap"));
        assert!(output.contains("NZD"));
        assert!(output.contains("$5,812,345,678,901.5 (5.81T)"));
        assert!(output.contains("24 hour Trading Volume"));
        assert!(output.contains("N/A"));
        assert!(output.contains("15,234 coins tracked, BTC dominance 56.3%"));
        assert!(output.contains("BTC"));
        assert!(output.contains("$104,523.12"));
        assert!(output.contains("-1.3%"));
        assert!(output.contains("Sorted by rank (ascending)"));
        // rank order
        let btc = output.find("BTC").unwrap();
        let eth = output.find("ETH").unwrap();
        let sol = output.find("SOL").unwrap();
        assert!(btc < eth && eth < sol);
    }

    #[test]
    fn test_render_snapshot_sort_and_limit() {
        let options = MarketsOptions {
            sort: SortKey::Change24h,
            order: SortOrder::Descending,
            limit: Some(2),
            sparkline: true,
            ..Default::default()
        };
        let output = render_snapshot(&snapshot(None), &options);
        let sol = output.find("SOL").unwrap();
        let btc = output.find("BTC").unwrap();
        assert!(sol < btc);
        assert!(!output.contains("ETH"));
        assert!(output.contains("Last 7 Days"));
        assert!(output.contains("▁"));
        assert!(!output.contains("coins tracked"));
    }

    #[test]
    fn test_render_board_before_first_fetch() {
        let board = MarketBoard::new(MarketQuery::new(Currency::Aud));
        let output = render_board(&board, &MarketsOptions::default());
        assert_eq!(output, "Fetching AUD market data...");
    }

    #[tokio::test]
    async fn test_render_board_keeps_rows_after_failed_refresh() {
        let provider = SwitchProvider::default();
        let mut board = MarketBoard::new(MarketQuery::new(Currency::Nzd));
        board.refresh(&provider).await.unwrap();

        provider.offline.store(true, Ordering::SeqCst);
        assert!(board.refresh(&provider).await.is_err());

        let output = render_board(&board, &MarketsOptions::default());
        assert!(output.contains("BTC"));
        assert!(output.contains("ETH"));
        assert!(output.contains("$104,523.12"));
        assert!(output.contains("Refresh failed, showing last data"));
        assert!(output.contains("503 Service Unavailable"));
    }

    #[tokio::test]
    async fn test_render_board_first_fetch_failure() {
        let provider = SwitchProvider::default();
        provider.offline.store(true, Ordering::SeqCst);
        let mut board = MarketBoard::new(MarketQuery::new(Currency::Usd));
        assert!(board.refresh(&provider).await.is_err());

        let output = render_board(&board, &MarketsOptions::default());
        assert!(output.contains("Could not load USD market data"));
        assert!(output.contains("503 Service Unavailable"));
        assert!(!output.contains("showing last data"));
        assert!(!output.contains("BTC"));
    }

    #[test]
    fn test_build_query_uses_config_page_size() {
        let options = MarketsOptions {
            page: 3,
            sparkline: true,
            ..Default::default()
        };
        let query = build_query(Currency::Usd, &options, 25).unwrap();
        assert_eq!(query.per_page, 25);
        assert_eq!(query.page, 3);
        assert!(query.sparkline);

        let options = MarketsOptions {
            per_page: Some(500),
            ..Default::default()
        };
        assert!(build_query(Currency::Usd, &options, 25).is_err());
    }
}
