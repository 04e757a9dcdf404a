//! Display currency selection

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    #[default]
    Nzd,
    Usd,
    Aud,
    Eur,
    Gbp,
    Cad,
    Jpy,
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 8] = [
        Currency::Nzd,
        Currency::Usd,
        Currency::Aud,
        Currency::Eur,
        Currency::Gbp,
        Currency::Cad,
        Currency::Jpy,
        Currency::Inr,
    ];

    /// Uppercase code, e.g. `NZD`.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Nzd => "NZD",
            Currency::Usd => "USD",
            Currency::Aud => "AUD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cad => "CAD",
            Currency::Jpy => "JPY",
            Currency::Inr => "INR",
        }
    }

    /// Lowercase code used as `vs_currency` and as the key of per-currency maps.
    pub fn api_code(&self) -> String {
        self.code().to_lowercase()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Nzd | Currency::Usd | Currency::Aud | Currency::Cad => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Jpy => "¥",
            Currency::Inr => "₹",
        }
    }

    pub fn supported_codes() -> String {
        Self::ALL
            .iter()
            .map(|c| c.code())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| {
                anyhow!(
                    "Unsupported currency: {} (supported: {})",
                    s,
                    Self::supported_codes()
                )
            })
    }
}

impl TryFrom<String> for Currency {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.code().to_string()
    }
}
