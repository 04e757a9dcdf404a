pub mod caching;
pub mod coingecko;
pub mod util;
