//! View state tying the current symbol to news, overview, history and summary.
//!
//! The current symbol is the only trigger for re-fetching. Changing it clears
//! everything derived from the previous symbol, including the displayed AI
//! summary, unless the change comes from a history entry that carries one.

use crate::error::{ApiError, SearchError};
use crate::models::{HistoryEntry, NewsArticle, StockOverview};
use crate::segment::segment;
use crate::symbol::parse_search;

/// Shown in place of a summary when summarization fails.
pub const SUMMARY_FAILED: &str = "Failed to generate summary. Please try again.";

/// What the insights panel should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insights {
    NoSymbol,
    NoNews,
    NotGenerated,
    Generating,
    /// A summary exists but nothing in it survived segmentation.
    Empty,
    Points(Vec<String>),
}

#[derive(Debug, Default)]
pub struct Dashboard {
    pub symbol: Option<String>,
    pub summary: Option<String>,
    pub summarizing: bool,
    pub news: Vec<NewsArticle>,
    pub news_loading: bool,
    pub news_error: Option<String>,
    pub overview: Option<StockOverview>,
    pub overview_loading: bool,
    pub history: Vec<HistoryEntry>,
    pub history_selected: usize,
}

impl Dashboard {
    /// Validate a search and make it the current symbol with no summary.
    pub fn submit_search(&mut self, raw: &str) -> Result<String, SearchError> {
        let symbol = parse_search(raw)?;
        self.set_symbol(symbol.clone(), None);
        Ok(symbol)
    }

    /// Switch to the highlighted history entry, seeding its stored summary.
    pub fn select_history(&mut self) -> Option<String> {
        let entry = self.history.get(self.history_selected)?.clone();
        self.set_symbol(entry.symbol.clone(), entry.ai_summary.filter(|s| !s.is_empty()));
        Some(entry.symbol)
    }

    fn set_symbol(&mut self, symbol: String, summary: Option<String>) {
        self.symbol = Some(symbol);
        self.summary = summary;
        self.summarizing = false;
        self.news.clear();
        self.news_loading = true;
        self.news_error = None;
        self.overview = None;
        self.overview_loading = true;
    }

    /// Drop the current symbol and everything derived from it.
    pub fn clear_symbol(&mut self) {
        self.symbol = None;
        self.summary = None;
        self.summarizing = false;
        self.news.clear();
        self.news_loading = false;
        self.news_error = None;
        self.overview = None;
        self.overview_loading = false;
    }

    fn is_current(&self, symbol: &str) -> bool {
        self.symbol.as_deref() == Some(symbol)
    }

    /// Store fetched news; late answers for another symbol are ignored.
    pub fn news_loaded(&mut self, symbol: &str, result: Result<Vec<NewsArticle>, ApiError>) {
        if !self.is_current(symbol) {
            return;
        }
        self.news_loading = false;
        match result {
            Ok(articles) => {
                self.news = articles;
                self.news_error = None;
            }
            Err(err) => {
                self.news.clear();
                self.news_error = Some(err.to_string());
            }
        }
    }

    pub fn overview_loaded(&mut self, symbol: &str, result: Result<StockOverview, ApiError>) {
        if !self.is_current(symbol) {
            return;
        }
        self.overview_loading = false;
        self.overview = result.ok();
    }

    /// Whether a summary can be requested right now.
    pub fn can_summarize(&self) -> bool {
        self.symbol.is_some() && !self.news.is_empty() && !self.summarizing
    }

    /// Mark a summary request as started for the current symbol.
    pub fn begin_summary(&mut self) -> Option<String> {
        if !self.can_summarize() {
            return None;
        }
        self.summarizing = true;
        self.symbol.clone()
    }

    /// Record a generated summary. Returns false when the symbol moved on.
    pub fn summary_generated(&mut self, symbol: &str, summary: String) -> bool {
        if !self.is_current(symbol) {
            return false;
        }
        self.summarizing = false;
        self.summary = Some(summary);
        true
    }

    pub fn summary_failed(&mut self, symbol: &str) {
        if self.is_current(symbol) {
            self.summarizing = false;
            self.summary = Some(SUMMARY_FAILED.to_string());
        }
    }

    pub fn insights(&self) -> Insights {
        if self.symbol.is_none() {
            return Insights::NoSymbol;
        }
        if self.summarizing {
            return Insights::Generating;
        }
        match self.summary.as_deref() {
            Some(summary) => {
                let points = segment(summary);
                if points.is_empty() {
                    Insights::Empty
                } else {
                    Insights::Points(points)
                }
            }
            None if self.news.is_empty() && !self.news_loading => Insights::NoNews,
            None => Insights::NotGenerated,
        }
    }

    /// Replace the history list, keeping the cursor in range.
    pub fn history_loaded(&mut self, history: Vec<HistoryEntry>) {
        self.history = history;
        self.history_selected = self.history_selected.min(self.history.len().saturating_sub(1));
    }

    pub fn selected_history(&self) -> Option<&HistoryEntry> {
        self.history.get(self.history_selected)
    }

    pub fn history_up(&mut self) {
        self.history_selected = self.history_selected.saturating_sub(1);
    }

    pub fn history_down(&mut self) {
        if self.history_selected < self.history.len().saturating_sub(1) {
            self.history_selected += 1;
        }
    }
}
