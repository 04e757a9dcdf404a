//! Terminal pages, one module per page.

pub mod coin;
pub mod currency;
pub mod markets;
pub mod portfolio;
pub mod setup;
pub mod ui;
