//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod format;
pub mod log;
pub mod market;
pub mod portfolio;
pub mod preferences;
pub mod route;
pub mod state;

// Re-export main types for cleaner imports
pub use currency::Currency;
pub use market::{CoinDetail, CoinMarket, GlobalMarket, MarketDataProvider, MarketQuery};
pub use preferences::PreferenceStore;
pub use route::Route;
