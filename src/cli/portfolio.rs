use super::ui;
use crate::core::config::Holding;
use crate::core::currency::Currency;
use crate::core::format::{format_money, format_number, format_percent};
use crate::core::market::{CoinMarket, MAX_PER_PAGE, MarketDataProvider, MarketQuery};
use crate::core::portfolio::{PortfolioValue, calculate_portfolio_value};
use anyhow::Result;
use comfy_table::Cell;
use futures::future::try_join_all;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

impl PortfolioValue {
    pub fn display_as_table(&self) -> String {
        let currency = self.currency;
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Coin"),
            ui::header_cell("Amount"),
            ui::header_cell("Price"),
            ui::header_cell(&format!("Value ({currency})")),
            ui::header_cell("24h"),
            ui::header_cell("Weight (%)"),
            ui::header_cell("Profit"),
        ]);

        for holding in &self.holdings {
            let name_display = match (&holding.name, &holding.symbol) {
                (Some(name), Some(symbol)) => format!("{name} ({})", symbol.to_uppercase()),
                _ => holding.id.clone(),
            };

            if let Some(error) = &holding.error {
                table.add_row(vec![
                    Cell::new(name_display),
                    Cell::new(format_number(holding.amount, 8)),
                    ui::na_cell(true),
                    Cell::new(ui::style_text(error, ui::StyleType::Error)),
                    ui::na_cell(true),
                    ui::na_cell(true),
                    ui::na_cell(true),
                ]);
                continue;
            }

            table.add_row(vec![
                Cell::new(name_display),
                ui::format_optional_cell(Some(holding.amount), |a| format_number(a, 8)),
                ui::money_cell(holding.price, currency),
                ui::money_cell(holding.value, currency),
                ui::change_cell(holding.change_24h_pct),
                ui::format_optional_cell(holding.weight, |w| format!("{w:.2}%")),
                ui::money_cell(holding.profit, currency),
            ]);
        }

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Portfolio", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        let (total_text, total_style) = match self.total_value {
            Some(total) => (format_money(total, currency), ui::StyleType::TotalValue),
            None => ("N/A".to_string(), ui::StyleType::Error),
        };
        output.push_str(&format!(
            "\n\nTotal Value ({}): {}",
            ui::style_text(currency.code(), ui::StyleType::TotalLabel),
            ui::style_text(&total_text, total_style)
        ));

        if let Some(change) = self.total_change_24h {
            let pct = self.total_change_24h_pct();
            let text = match pct {
                Some(p) => format!("{} ({})", format_money(change, currency), format_percent(p)),
                None => format_money(change, currency),
            };
            output.push_str(&format!(
                "\n24h Change: {}",
                ui::style_delta(&text, pct.or(Some(change)))
            ));
        }
        if let Some(profit) = self.total_profit {
            output.push_str(&format!(
                "\nProfit: {}",
                ui::style_delta(&format_money(profit, currency), Some(profit))
            ));
        }
        output
    }
}

/// Fetches market rows for every distinct holding id, one request per page
/// of ids.
pub async fn fetch_holdings_markets(
    provider: &dyn MarketDataProvider,
    holdings: &[Holding],
    currency: Currency,
) -> Result<HashMap<String, CoinMarket>> {
    let ids: Vec<String> = holdings
        .iter()
        .map(|h| h.id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let queries = ids
        .chunks(MAX_PER_PAGE as usize)
        .map(|chunk| {
            MarketQuery::new(currency)
                .with_page(1, chunk.len() as u32)
                .map(|q| q.with_ids(chunk.iter().cloned()))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(ids = ids.len(), requests = queries.len(), "Fetching holdings");

    let pages = try_join_all(queries.iter().map(|q| provider.fetch_markets(q))).await?;
    Ok(pages
        .into_iter()
        .flatten()
        .map(|coin| (coin.id.clone(), coin))
        .collect())
}

pub async fn run(
    provider: &dyn MarketDataProvider,
    holdings: &[Holding],
    currency: Currency,
) -> Result<()> {
    if holdings.is_empty() {
        println!("No holdings configured. Add coins under `portfolio:` in the config file.");
        return Ok(());
    }

    let pb = ui::new_spinner("Fetching prices...");
    let markets = fetch_holdings_markets(provider, holdings, currency).await;
    pb.finish_and_clear();

    let value = calculate_portfolio_value(holdings, &markets?, currency);
    println!("{}", value.display_as_table());
    Ok(())
}
