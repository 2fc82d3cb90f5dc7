//! Ticker normalization and search-input validation.

use crate::error::SearchError;
use serde::{Deserialize, Serialize};

/// Longest search input accepted from the user.
pub const MAX_INPUT_LEN: usize = 15;

/// Rules deciding which symbols are domestically listed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolRules {
    /// Suffix Yahoo uses for the domestic exchange
    #[serde(default = "default_suffix")]
    pub domestic_suffix: String,

    /// Plain tickers that are US-listed and must not get the suffix
    #[serde(default = "default_us_listed")]
    pub us_listed: Vec<String>,
}

impl Default for SymbolRules {
    fn default() -> Self {
        Self {
            domestic_suffix: default_suffix(),
            us_listed: default_us_listed(),
        }
    }
}

fn default_suffix() -> String {
    ".NS".to_string()
}

fn default_us_listed() -> Vec<String> {
    ["AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "NVDA", "NFLX"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl SymbolRules {
    /// Whether `symbol` looks like a plain domestic ticker.
    pub fn is_domestic(&self, symbol: &str) -> bool {
        let upper = symbol.trim().to_uppercase();
        !upper.is_empty()
            && upper.chars().all(|c| c.is_ascii_uppercase())
            && !self.us_listed.iter().any(|s| s.eq_ignore_ascii_case(&upper))
    }

    /// Uppercase `symbol` and append the domestic suffix when it needs one.
    ///
    /// Idempotent: an already normalized symbol comes back unchanged.
    pub fn ensure_nse(&self, symbol: &str) -> String {
        let upper = symbol.trim().to_uppercase();
        if self.is_domestic(&upper) && !upper.ends_with(&self.domestic_suffix) {
            format!("{}{}", upper, self.domestic_suffix)
        } else {
            upper
        }
    }
}

/// [`SymbolRules::ensure_nse`] with the default rules.
#[allow(dead_code)] // The app goes through the configured rules
pub fn ensure_nse(symbol: &str) -> String {
    SymbolRules::default().ensure_nse(symbol)
}

/// Drop characters a ticker can never contain and uppercase the rest.
pub fn sanitize_input(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .take(MAX_INPUT_LEN)
        .collect::<String>()
        .to_uppercase()
}

/// Validate a submitted search and return the symbol to activate.
pub fn parse_search(raw: &str) -> Result<String, SearchError> {
    let symbol = sanitize_input(raw.trim());
    if symbol.is_empty() {
        return Err(SearchError::Empty);
    }
    if !symbol.chars().all(|c| c.is_ascii_uppercase() || c == '.') {
        return Err(SearchError::Invalid);
    }
    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_nse_domestic() {
        assert_eq!(ensure_nse("TCS"), "TCS.NS");
        assert_eq!(ensure_nse(" reliance "), "RELIANCE.NS");
    }

    #[test]
    fn test_ensure_nse_us_listed() {
        assert_eq!(ensure_nse("AAPL"), "AAPL");
        assert_eq!(ensure_nse("nvda"), "NVDA");
    }

    #[test]
    fn test_ensure_nse_idempotent() {
        assert_eq!(ensure_nse("TCS.NS"), "TCS.NS");
        assert_eq!(ensure_nse(&ensure_nse("INFY")), ensure_nse("INFY"));
        assert_eq!(ensure_nse("BTC-USD"), "BTC-USD");
    }

    #[test]
    fn test_ensure_nse_empty() {
        assert_eq!(ensure_nse(""), "");
        assert!(!SymbolRules::default().is_domestic(""));
    }

    #[test]
    fn test_custom_rules() {
        let rules = SymbolRules {
            domestic_suffix: ".BO".to_string(),
            us_listed: vec!["IBM".to_string()],
        };
        assert_eq!(rules.ensure_nse("TCS"), "TCS.BO");
        assert_eq!(rules.ensure_nse("IBM"), "IBM");
    }

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input("tcs.ns!"), "TCS.NS");
        assert_eq!(sanitize_input("a b-c"), "ABC");
        assert_eq!(sanitize_input("ABCDEFGHIJKLMNOPQRST").len(), MAX_INPUT_LEN);
    }

    #[test]
    fn test_parse_search() {
        assert_eq!(parse_search(" infy "), Ok("INFY".to_string()));
        assert_eq!(parse_search("   "), Err(SearchError::Empty));
        assert_eq!(parse_search("$$"), Err(SearchError::Empty));
        assert_eq!(parse_search("ABC1"), Err(SearchError::Invalid));
    }
}
