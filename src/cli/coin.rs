use super::ui;
use crate::core::currency::Currency;
use crate::core::format::{format_money, format_number, format_percent};
use crate::core::market::{CoinDetail, MarketDataProvider};
use anyhow::Result;
use comfy_table::Cell;

const DESCRIPTION_LIMIT: usize = 480;

/// Drops markup from an API description and keeps the first paragraph.
fn plain_description(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    let paragraph = text
        .split("\r\n\r\n")
        .flat_map(|p| p.split("\n\n"))
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or_default();

    if paragraph.chars().count() > DESCRIPTION_LIMIT {
        let truncated: String = paragraph.chars().take(DESCRIPTION_LIMIT).collect();
        format!("{}...", truncated.trim_end())
    } else {
        paragraph.to_string()
    }
}

fn change_row(label: &str, change: Option<f64>) -> Vec<Cell> {
    vec![Cell::new(label), ui::change_cell(change)]
}

fn money_row(label: &str, value: Option<f64>, currency: Currency) -> Vec<Cell> {
    vec![Cell::new(label), ui::money_cell(value, currency)]
}

fn supply_row(label: &str, value: Option<f64>, symbol: &str) -> Vec<Cell> {
    vec![
        Cell::new(label),
        ui::format_optional_cell(value, |v| format!("{} {symbol}", format_number(v, 0))),
    ]
}

impl CoinDetail {
    pub fn display_as_table(&self) -> String {
        let currency = self.currency;
        let symbol = self.symbol.to_uppercase();

        let title = format!("{} ({symbol})", self.name);
        let mut output = ui::style_text(&title, ui::StyleType::Title);
        if let Some(rank) = self.market_cap_rank {
            output.push_str(&format!(
                "  {}",
                ui::style_text(&format!("Rank #{rank}"), ui::StyleType::Subtle)
            ));
        }
        output.push_str("\n\n");

        let price_text = self
            .current_price
            .map_or_else(|| "N/A".to_string(), |p| format_money(p, currency));
        let change_text = self.change_24h.map_or_else(String::new, |c| {
            format!(" {}", ui::style_delta(&format_percent(c), Some(c)))
        });
        output.push_str(&format!(
            "Price ({}): {}{}\n\n",
            ui::style_text(currency.code(), ui::StyleType::TotalLabel),
            ui::style_text(&price_text, ui::StyleType::TotalValue),
            change_text
        ));

        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Statistic"), ui::header_cell("Value")]);
        table.add_row(change_row("1h change", self.change_1h));
        table.add_row(change_row("24h change", self.change_24h));
        table.add_row(change_row("7d change", self.change_7d));
        table.add_row(change_row("30d change", self.change_30d));
        table.add_row(change_row("1y change", self.change_1y));
        table.add_row(money_row("Market cap", self.market_cap, currency));
        table.add_row(money_row("24h volume", self.total_volume, currency));
        table.add_row(money_row("24h high", self.high_24h, currency));
        table.add_row(money_row("24h low", self.low_24h, currency));
        table.add_row(money_row("All-time high", self.ath, currency));
        table.add_row(money_row("All-time low", self.atl, currency));
        table.add_row(supply_row("Circulating supply", self.circulating_supply, &symbol));
        table.add_row(supply_row("Total supply", self.total_supply, &symbol));
        table.add_row(supply_row("Max supply", self.max_supply, &symbol));
        output.push_str(&table.to_string());

        if let Some(homepage) = &self.homepage {
            output.push_str(&format!("\n\nHomepage: {homepage}"));
        }
        if let Some(description) = self
            .description
            .as_deref()
            .map(plain_description)
            .filter(|d| !d.is_empty())
        {
            output.push_str(&format!("\n\n{description}"));
        }
        if let Some(updated) = self.last_updated {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(
                    &format!("Last updated {}", updated.format("%Y-%m-%d %H:%M:%S UTC")),
                    ui::StyleType::Subtle
                )
            ));
        }
        output
    }
}

pub async fn run(provider: &dyn MarketDataProvider, id: &str, currency: Currency) -> Result<()> {
    let pb = ui::new_spinner(&format!("Fetching {id}..."));
    let detail = provider.fetch_coin(id, currency).await;
    pb.finish_and_clear();

    println!("{}", detail?.display_as_table());
    Ok(())
}
