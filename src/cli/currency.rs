use super::ui;
use crate::core::currency::Currency;
use crate::core::preferences::PreferenceStore;
use anyhow::Result;

/// Lists supported currencies with the active one marked.
pub fn render_currencies(active: Currency) -> String {
    let mut output = format!(
        "Currency: {}\n\nSupported:",
        ui::style_text(active.code(), ui::StyleType::TotalValue)
    );
    for currency in Currency::ALL {
        let marker = if currency == active { "*" } else { " " };
        output.push_str(&format!(
            "\n {marker} {} ({})",
            currency.code(),
            currency.symbol()
        ));
    }
    output
}

/// Confirms a new selection, saying whether it outlives this run.
pub fn render_selection(currency: Currency, saved: bool) -> String {
    let code = ui::style_text(currency.code(), ui::StyleType::TotalValue);
    if saved {
        format!("Currency set to {code}")
    } else {
        format!("Currency {code} used for this run only, not saved because --no-persist is set")
    }
}

/// Shows the active currency, or validates and stores a new choice.
///
/// With `persist` off the store is in memory and the choice is reported as not saved.
pub fn run(
    store: &dyn PreferenceStore,
    code: Option<&str>,
    active: Currency,
    persist: bool,
) -> Result<()> {
    match code {
        Some(code) => {
            let currency: Currency = code.parse()?;
            store.set_currency(currency)?;
            if persist {
                tracing::info!(%currency, "Currency preference updated");
            } else {
                tracing::info!(%currency, "Currency preference not saved");
            }
            println!("{}", render_selection(currency, persist));
        }
        None => println!("{}", render_currencies(active)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryPreferenceStore;

    #[test]
    fn test_render_marks_active() {
        let output = render_currencies(Currency::Aud);
        assert!(output.contains(" * AUD ($)"));
        assert!(output.contains("   NZD ($)"));
        assert!(output.contains("   EUR (€)"));
    }

    #[test]
    fn test_set_currency_persists() -> Result<()> {
        let store = MemoryPreferenceStore::new();
        run(&store, Some("usd"), Currency::Nzd, true)?;
        assert_eq!(store.currency()?, Some(Currency::Usd));

        assert!(run(&store, Some("BTC"), Currency::Usd, true).is_err());
        assert_eq!(store.currency()?, Some(Currency::Usd));
        Ok(())
    }

    #[test]
    fn test_selection_message_reports_unsaved_choice() {
        let saved = render_selection(Currency::Usd, true);
        assert!(saved.contains("Currency set to"));
        assert!(saved.contains("USD"));

        let unsaved = render_selection(Currency::Usd, false);
        assert!(unsaved.contains("USD"));
        assert!(unsaved.contains("not saved"));
        assert!(!unsaved.contains("Currency set to"));
    }
}
