//! Data models for quotes, fundamentals, charts, news and history.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Live quote for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol (e.g., "TCS.NS", "AAPL")
    pub symbol: String,
    /// Full name of the security
    pub name: String,
    /// Current price
    pub price: f64,
    /// Price change from previous close
    pub change: f64,
    /// Percentage change from previous close
    pub change_percent: f64,
    /// Previous closing price
    pub previous_close: f64,
    /// Opening price for the day
    pub open: f64,
    /// Day's high price
    pub day_high: f64,
    /// Day's low price
    pub day_low: f64,
    /// 52-week high
    pub year_high: f64,
    /// 52-week low
    pub year_low: f64,
    /// Trading volume
    pub volume: u64,
    /// Market capitalization
    pub market_cap: Option<f64>,
    /// Currency of the quote
    pub currency: String,
    /// Exchange where the security is traded
    pub exchange: String,
    /// Market state (PRE, REGULAR, POST, CLOSED)
    pub market_state: MarketState,
    /// Timestamp of the quote
    pub timestamp: DateTime<Utc>,
}

impl Default for Quote {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            name: String::new(),
            price: 0.0,
            change: 0.0,
            change_percent: 0.0,
            previous_close: 0.0,
            open: 0.0,
            day_high: 0.0,
            day_low: 0.0,
            year_high: 0.0,
            year_low: 0.0,
            volume: 0,
            market_cap: None,
            currency: "INR".to_string(),
            exchange: String::new(),
            market_state: MarketState::Closed,
            timestamp: Utc::now(),
        }
    }
}

impl Quote {
    /// Whether the price is quoted in US dollars rather than rupees.
    pub fn is_usd(&self) -> bool {
        self.currency == "USD"
    }
}

/// Market trading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MarketState {
    Pre,
    Regular,
    Post,
    #[default]
    Closed,
}

impl MarketState {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("PRE") | Some("PREPRE") => MarketState::Pre,
            Some("REGULAR") => MarketState::Regular,
            Some("POST") | Some("POSTPOST") => MarketState::Post,
            _ => MarketState::Closed,
        }
    }
}

impl std::fmt::Display for MarketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketState::Pre => write!(f, "Pre"),
            MarketState::Regular => write!(f, "Open"),
            MarketState::Post => write!(f, "Post"),
            MarketState::Closed => write!(f, "Closed"),
        }
    }
}

/// Company fundamentals from the quote summary modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub book_value: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub fifty_day_average: Option<f64>,
    pub two_hundred_day_average: Option<f64>,
    pub target_mean_price: Option<f64>,
}

/// One intraday OHLC bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix seconds
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Intraday series, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub symbol: String,
    pub candles: Vec<Candle>,
}

impl Chart {
    /// Most recent complete bar.
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Closing prices scaled for a sparkline (integers, min at zero).
    pub fn sparkline(&self) -> Vec<u64> {
        let min = self
            .candles
            .iter()
            .map(|c| c.close)
            .fold(f64::INFINITY, f64::min);
        if !min.is_finite() {
            return Vec::new();
        }
        self.candles
            .iter()
            .map(|c| ((c.close - min) * 100.0).round() as u64)
            .collect()
    }
}

/// A news article as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl NewsArticle {
    /// Text sent to the summarizer: `"title. description"`.
    pub fn summary_text(&self) -> String {
        format!("{}. {}", self.title, self.description.as_deref().unwrap_or(""))
    }

    /// Publication time, if the backend sent a parseable one.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.published_at.as_deref()?)
    }
}

/// Backend stock overview. The backend sends every field pre-formatted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockOverview {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub change_percent: Option<String>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub country: Option<String>,
    pub day_high: Option<String>,
    pub day_low: Option<String>,
    pub week52_high: Option<String>,
    pub week52_low: Option<String>,
    pub open: Option<String>,
    pub previous_close: Option<String>,
    pub volume: Option<String>,
    pub week50_day_average: Option<String>,
    pub week200_day_average: Option<String>,
    pub market_cap: Option<String>,
    pub pe_ratio: Option<String>,
    pub pb_ratio: Option<String>,
    pub eps: Option<String>,
    pub dividend_yield: Option<String>,
    pub roe: Option<String>,
    pub book_value: Option<String>,
    pub analyst_target_price: Option<String>,
}

impl StockOverview {
    pub fn currency_symbol(&self) -> &'static str {
        if self.currency.as_deref() == Some("USD") {
            "$"
        } else {
            "₹"
        }
    }

    /// A pre-formatted field, or `N/A` when blank.
    pub fn text(field: Option<&str>) -> String {
        match field.map(str::trim) {
            Some(value) if !value.is_empty() && value != "N/A" => value.to_string(),
            _ => "N/A".to_string(),
        }
    }

    /// A pre-formatted price with the overview's currency symbol.
    pub fn money(&self, field: Option<&str>) -> String {
        match Self::text(field) {
            value if value == "N/A" => value,
            value => format!("{}{}", self.currency_symbol(), value),
        }
    }
}

/// A past search, optionally with the AI summary generated for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HistoryEntry {
    pub fn searched_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.timestamp.as_deref()?)
    }
}

/// Token and identity returned by login and register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response wrapper used by every backend endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Read an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept RFC 3339 and the zone-less `LocalDateTime` the backend serializes.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_text() {
        let article = NewsArticle {
            title: "Results beat estimates".to_string(),
            description: Some("Profit rose 12%".to_string()),
            source: "Wire".to_string(),
            url: String::new(),
            published_at: None,
        };
        assert_eq!(article.summary_text(), "Results beat estimates. Profit rose 12%");

        let bare = NewsArticle {
            description: None,
            ..article
        };
        assert_eq!(bare.summary_text(), "Results beat estimates. ");
    }

    #[test]
    fn test_news_with_null_fields() {
        let json = r#"[
            {"title":"Q3 results","description":null,"source":null,"url":null,"publishedAt":null},
            {"title":"Buyback approved","source":"Wire"}
        ]"#;
        let news: Vec<NewsArticle> = serde_json::from_str(json).unwrap();
        assert_eq!(news.len(), 2);
        assert_eq!(news[0].source, "");
        assert_eq!(news[0].url, "");
        assert_eq!(news[1].source, "Wire");
        assert_eq!(news[1].url, "");
    }

    #[test]
    fn test_history_entry_deserialize() {
        let json = r#"{"id":7,"symbol":"TCS","name":"TCS","aiSummary":null,"timestamp":"2026-01-05T10:15:30.123"}"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, 7);
        assert_eq!(entry.ai_summary, None);
        assert!(entry.searched_at().is_some());
    }

    #[test]
    fn test_envelope_without_data() {
        let json = r#"{"success":false,"message":"Invalid credentials"}"#;
        let envelope: Envelope<AuthResponse> = serde_json::from_str(json).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn test_overview_currency_symbol() {
        let overview: StockOverview =
            serde_json::from_str(r#"{"symbol":"AAPL","currency":"USD","peRatio":"31.2"}"#).unwrap();
        assert_eq!(overview.currency_symbol(), "$");
        assert_eq!(overview.pe_ratio.as_deref(), Some("31.2"));
        assert_eq!(StockOverview::default().currency_symbol(), "₹");
    }

    #[test]
    fn test_overview_moving_averages_and_blanks() {
        let json = r#"{"currency":"INR","week50DayAverage":"3890.10","week200DayAverage":"N/A","open":""}"#;
        let overview: StockOverview = serde_json::from_str(json).unwrap();
        assert_eq!(overview.money(overview.week50_day_average.as_deref()), "₹3890.10");
        assert_eq!(overview.money(overview.week200_day_average.as_deref()), "N/A");
        assert_eq!(overview.money(overview.open.as_deref()), "N/A");
        assert_eq!(StockOverview::text(None), "N/A");
    }

    #[test]
    fn test_chart_sparkline() {
        let candle = |time, close| Candle {
            time,
            open: close,
            high: close,
            low: close,
            close,
        };
        let chart = Chart {
            symbol: "TCS.NS".to_string(),
            candles: vec![candle(1, 10.0), candle(2, 10.5), candle(3, 10.25)],
        };
        assert_eq!(chart.sparkline(), vec![0, 50, 25]);
        assert_eq!(chart.latest().map(|c| c.time), Some(3));
        assert!(Chart::default().sparkline().is_empty());
    }

    #[test]
    fn test_market_state_parse() {
        assert_eq!(MarketState::parse(Some("REGULAR")), MarketState::Regular);
        assert_eq!(MarketState::parse(Some("POSTPOST")), MarketState::Post);
        assert_eq!(MarketState::parse(None), MarketState::Closed);
    }
}
