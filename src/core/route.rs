//! Page routing: maps a path such as `/coin/bitcoin` to the page that renders it.

use anyhow::{Result, anyhow};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Coin { id: String },
    Portfolio,
}

impl Route {
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        let without_suffix = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let normalized = without_suffix.strip_suffix('/').unwrap_or(without_suffix);
        let segments: Vec<&str> = normalized
            .strip_prefix('/')
            .unwrap_or(normalized)
            .split('/')
            .collect();

        match segments.as_slice() {
            [""] => Ok(Route::Home),
            ["portfolio"] => Ok(Route::Portfolio),
            ["coin", id] if !id.is_empty() => Ok(Route::Coin { id: id.to_string() }),
            _ => Err(anyhow!("No page matches route: {}", path)),
        }
    }
}

impl FromStr for Route {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::parse(s)
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Home => write!(f, "/"),
            Route::Coin { id } => write!(f, "/coin/{id}"),
            Route::Portfolio => write!(f, "/portfolio"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_routes() {
        assert_eq!(Route::parse("/").unwrap(), Route::Home);
        assert_eq!(Route::parse("").unwrap(), Route::Home);
        assert_eq!(Route::parse("/portfolio/").unwrap(), Route::Portfolio);
        assert_eq!(
            Route::parse("/coin/bitcoin?tab=chart#top").unwrap(),
            Route::Coin {
                id: "bitcoin".to_string()
            }
        );
        assert_eq!(
            Route::parse("coin/wrapped-bitcoin").unwrap(),
            Route::Coin {
                id: "wrapped-bitcoin".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_routes() {
        for path in ["/coin", "/coin/", "/coin/a/b", "/settings"] {
            let err = Route::parse(path).unwrap_err();
            assert_eq!(err.to_string(), format!("No page matches route: {path}"));
        }
    }

    #[test]
    fn test_display_is_canonical() {
        for path in ["/", "/portfolio", "/coin/ethereum"] {
            assert_eq!(Route::parse(path).unwrap().to_string(), path);
        }
    }
}
