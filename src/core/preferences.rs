//! The persisted user preference: the display currency.

use crate::core::currency::Currency;
use anyhow::Result;
use tracing::{debug, warn};

pub const CURRENCY_KEY: &str = "currency";

pub trait PreferenceStore: Send + Sync {
    /// Raw stored value for `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// The stored currency. A value that no longer parses is treated as unset.
    fn currency(&self) -> Result<Option<Currency>> {
        match self.get(CURRENCY_KEY)? {
            Some(raw) => match raw.parse::<Currency>() {
                Ok(currency) => Ok(Some(currency)),
                Err(e) => {
                    warn!(stored = %raw, error = %e, "Ignoring stored currency");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn set_currency(&self, currency: Currency) -> Result<()> {
        debug!(%currency, "Persisting currency preference");
        self.set(CURRENCY_KEY, currency.code())
    }
}

/// Picks the currency for this run: an explicit override, then the stored
/// preference, then the configured default, then NZD.
pub fn resolve_currency(
    store: &dyn PreferenceStore,
    override_currency: Option<Currency>,
    config_default: Option<Currency>,
) -> Result<Currency> {
    if let Some(currency) = override_currency {
        debug!(%currency, "Using currency override");
        return Ok(currency);
    }
    let resolved = store
        .currency()?
        .or(config_default)
        .unwrap_or_default();
    debug!(currency = %resolved, "Resolved display currency");
    Ok(resolved)
}
