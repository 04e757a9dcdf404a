//! Valuation of the configured holdings against fetched market prices.
use crate::core::config::Holding;
use crate::core::currency::Currency;
use crate::core::market::CoinMarket;
use std::collections::HashMap;
use tracing::debug;

/// The calculated value of a single holding.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingValue {
    pub id: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub amount: f64,
    pub price: Option<f64>,
    pub value: Option<f64>,
    pub change_24h_pct: Option<f64>,
    pub change_24h_value: Option<f64>,
    pub cost_basis: Option<f64>,
    pub profit: Option<f64>,
    pub weight: Option<f64>,
    pub error: Option<String>,
}

/// All holdings valued in one currency.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioValue {
    pub currency: Currency,
    pub holdings: Vec<HoldingValue>,
    pub total_value: Option<f64>,
    pub total_change_24h: Option<f64>,
    pub total_profit: Option<f64>,
}

impl PortfolioValue {
    /// Portfolio-wide 24h change in percent, relative to the value a day ago.
    pub fn total_change_24h_pct(&self) -> Option<f64> {
        let total = self.total_value?;
        let change = self.total_change_24h?;
        let previous = total - change;
        (previous > 0.0).then(|| change / previous * 100.0)
    }
}

/// Value change over 24h implied by the current value and the percentage move.
fn change_from_pct(value: f64, pct: f64) -> Option<f64> {
    let denominator = 100.0 + pct;
    (denominator > 0.0).then(|| value * pct / denominator)
}

/// Values every holding using `markets`, keyed by coin id.
///
/// Totals and weights are only produced when every holding could be priced;
/// a holding missing from `markets` or without a price carries an error.
pub fn calculate_portfolio_value(
    holdings: &[Holding],
    markets: &HashMap<String, CoinMarket>,
    currency: Currency,
) -> PortfolioValue {
    let mut values = Vec::with_capacity(holdings.len());
    let mut total_value = 0.0;
    let mut total_change = Some(0.0);
    let mut total_profit = Some(0.0);
    let mut all_valid = true;

    for holding in holdings {
        let mut value = HoldingValue {
            id: holding.id.clone(),
            name: None,
            symbol: None,
            amount: holding.amount,
            price: None,
            value: None,
            change_24h_pct: None,
            change_24h_value: None,
            cost_basis: holding.cost_basis,
            profit: None,
            weight: None,
            error: None,
        };

        match markets.get(&holding.id) {
            Some(market) => {
                value.name = Some(market.name.clone());
                value.symbol = Some(market.symbol.clone());
                value.change_24h_pct = market.price_change_percentage_24h_in_currency;
                match market.current_price {
                    Some(price) => {
                        let current = holding.amount * price;
                        value.price = Some(price);
                        value.value = Some(current);
                        value.change_24h_value = value
                            .change_24h_pct
                            .and_then(|pct| change_from_pct(current, pct));
                        value.profit = holding.cost_basis.map(|cost| current - cost);
                        total_value += current;
                    }
                    None => {
                        value.error = Some(format!("No {currency} price for {}", holding.id));
                    }
                }
            }
            None => {
                debug!(id = %holding.id, "Coin missing from market response");
                value.error = Some(format!("Unknown coin: {}", holding.id));
            }
        }

        if value.error.is_some() {
            all_valid = false;
        } else {
            total_change = total_change.zip(value.change_24h_value).map(|(t, c)| t + c);
            total_profit = total_profit.zip(value.profit).map(|(t, p)| t + p);
        }
        values.push(value);
    }

    if !all_valid {
        return PortfolioValue {
            currency,
            holdings: values,
            total_value: None,
            total_change_24h: None,
            total_profit: None,
        };
    }

    if total_value > 0.0 {
        for value in &mut values {
            value.weight = value.value.map(|v| v / total_value * 100.0);
        }
    }

    PortfolioValue {
        currency,
        holdings: values,
        total_value: Some(total_value),
        total_change_24h: total_change,
        total_profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(id: &str, price: Option<f64>, change_24h: Option<f64>) -> CoinMarket {
        CoinMarket {
            id: id.to_string(),
            symbol: id[..3].to_string(),
            name: id.to_uppercase(),
            image: None,
            current_price: price,
            market_cap: None,
            market_cap_rank: None,
            total_volume: None,
            high_24h: None,
            low_24h: None,
            circulating_supply: None,
            price_change_percentage_1h_in_currency: None,
            price_change_percentage_24h_in_currency: change_24h,
            price_change_percentage_7d_in_currency: None,
            last_updated: None,
            sparkline_in_7d: None,
        }
    }

    fn holding(id: &str, amount: f64, cost_basis: Option<f64>) -> Holding {
        Holding {
            id: id.to_string(),
            amount,
            cost_basis,
        }
    }

    fn markets(items: Vec<CoinMarket>) -> HashMap<String, CoinMarket> {
        items.into_iter().map(|m| (m.id.clone(), m)).collect()
    }

    #[test]
    fn test_single_holding() {
        let markets = markets(vec![market("bitcoin", Some(50000.0), Some(25.0))]);
        let value = calculate_portfolio_value(
            &[holding("bitcoin", 0.5, Some(20000.0))],
            &markets,
            Currency::Usd,
        );

        assert_eq!(value.total_value, Some(25000.0));
        assert_eq!(value.total_profit, Some(5000.0));
        // 25000 now after +25% means 20000 a day ago
        assert_eq!(value.total_change_24h, Some(5000.0));
        assert_eq!(value.total_change_24h_pct(), Some(25.0));
        let btc = &value.holdings[0];
        assert_eq!(btc.name.as_deref(), Some("BITCOIN"));
        assert_eq!(btc.weight, Some(100.0));
        assert_eq!(btc.error, None);
    }

    #[test]
    fn test_weights_across_holdings() {
        let markets = markets(vec![
            market("bitcoin", Some(100.0), None),
            market("ethereum", Some(10.0), Some(0.0)),
        ]);
        let value = calculate_portfolio_value(
            &[holding("bitcoin", 3.0, None), holding("ethereum", 10.0, None)],
            &markets,
            Currency::Nzd,
        );

        assert_eq!(value.total_value, Some(400.0));
        assert_eq!(value.holdings[0].weight, Some(75.0));
        assert_eq!(value.holdings[1].weight, Some(25.0));
        // bitcoin has no 24h change so the total change is unknown
        assert_eq!(value.total_change_24h, None);
        assert_eq!(value.total_profit, None);
    }

    #[test]
    fn test_unknown_coin_invalidates_totals() {
        let markets = markets(vec![market("bitcoin", Some(100.0), Some(1.0))]);
        let value = calculate_portfolio_value(
            &[holding("bitcoin", 1.0, None), holding("notacoin", 1.0, None)],
            &markets,
            Currency::Usd,
        );

        assert_eq!(value.total_value, None);
        assert_eq!(value.holdings[0].value, Some(100.0));
        assert_eq!(value.holdings[0].weight, None);
        assert_eq!(
            value.holdings[1].error.as_deref(),
            Some("Unknown coin: notacoin")
        );
    }

    #[test]
    fn test_missing_price_is_an_error() {
        let markets = markets(vec![market("deadcoin", None, None)]);
        let value =
            calculate_portfolio_value(&[holding("deadcoin", 5.0, None)], &markets, Currency::Aud);
        assert_eq!(value.total_value, None);
        assert_eq!(
            value.holdings[0].error.as_deref(),
            Some("No AUD price for deadcoin")
        );
    }

    #[test]
    fn test_empty_portfolio() {
        let value = calculate_portfolio_value(&[], &HashMap::new(), Currency::Usd);
        assert_eq!(value.total_value, Some(0.0));
        assert_eq!(value.total_change_24h_pct(), None);
        assert!(value.holdings.is_empty());
    }
}
