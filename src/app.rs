//! Application state and logic.
//!
//! The app owns the three market-data pollers, the dashboard view state and
//! the backend session. Slow backend calls are queued as an [`Action`] so the
//! UI can draw a loading state before the call blocks the loop.

use crate::backend::BackendClient;
use crate::cli::Args;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::error::ApiError;
use crate::market::MarketClient;
use crate::models::{Chart, Fundamentals, Quote};
use crate::poll::{PollState, Poller, Schedule};
use crate::session::{SessionContext, SessionStore};
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Minimum live quote refresh interval.
const MIN_DELAY_SECS: f64 = 1.0;

/// Configured poll interval, raised to the minimum refresh delay.
fn poll_interval(configured: Duration) -> Duration {
    let min = Duration::from_secs_f64(MIN_DELAY_SECS);
    if configured < min {
        warn!("poll interval {:?} raised to {:?}", configured, min);
        return min;
    }
    configured
}

/// What keyboard input currently edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Search,
    Login,
    Help,
}

/// Which panel j/k and Enter apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Main,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

/// Email/password being typed into the login overlay.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub field: LoginField,
}

impl LoginForm {
    pub fn push(&mut self, c: char) {
        match self.field {
            LoginField::Email => self.email.push(c),
            LoginField::Password => self.password.push(c),
        }
    }

    pub fn pop(&mut self) {
        match self.field {
            LoginField::Email => self.email.pop(),
            LoginField::Password => self.password.pop(),
        };
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }

    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

/// Backend work queued by a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Search(String),
    SelectHistory,
    Summarize(String),
    DeleteHistory(i64),
    Reload,
    Login { email: String, password: String },
}

/// Application state.
pub struct App {
    pub dashboard: Dashboard,
    pub quote: Poller<Quote>,
    pub chart: Poller<Chart>,
    pub fundamentals: Poller<Fundamentals>,
    backend: BackendClient,
    session_store: Option<SessionStore>,
    /// Queued backend work
    pending: Option<Action>,
    pub mode: Mode,
    pub focus: Focus,
    /// Search box contents
    pub input: String,
    pub login: LoginForm,
    /// Error overlay, cleared by any key
    pub error: Option<String>,
    /// Short note in the footer
    pub status: Option<String>,
    pub history_error: Option<String>,
    pub refresh_interval: Duration,
    pub iteration: u64,
    /// Maximum iterations (0 = infinite)
    pub max_iterations: u64,
    pub running: bool,
    pub batch_mode: bool,
    /// Batch mode also prints AI insights
    pub summarize_in_batch: bool,
}

impl App {
    /// Create a new application from CLI args and config.
    pub fn new(args: &Args, config: &Config) -> Result<Self> {
        Self::with_session_store(args, config, SessionStore::default_location())
    }

    /// Like [`App::new`], keeping the login session in `session_store`.
    pub fn with_session_store(args: &Args, config: &Config, session_store: Option<SessionStore>) -> Result<Self> {
        let saved = match session_store.as_ref().map(SessionStore::load).transpose() {
            Ok(session) => session.flatten(),
            Err(e) => {
                warn!("Ignoring saved session: {:#}", e);
                None
            }
        };
        let session = SessionContext::new(saved);

        let timeout = args.timeout.unwrap_or(config.general.timeout);
        let base_url = args.api_url.as_deref().unwrap_or(&config.backend.base_url);
        let backend = BackendClient::new(base_url, timeout, session)?;
        let market = MarketClient::new(timeout, config.market.clone(), config.symbols.clone())?;

        let refresh_interval = match args.delay {
            Some(delay) => Duration::from_secs_f64(delay.max(MIN_DELAY_SECS)),
            None => poll_interval(config.general.quote_interval),
        };
        let chart_interval = poll_interval(config.general.chart_interval);

        let (primary, fallback) = market.quote_source();
        let quote = Poller::new("quote", primary, fallback, Schedule::Every(refresh_interval))
            .with_failure_message("Failed to stream live price");
        let (primary, fallback) = market.chart_source();
        let chart = Poller::new("chart", primary, fallback, Schedule::Every(chart_interval))
            .with_failure_message("Failed to load intraday chart");
        let (primary, fallback) = market.fundamentals_source();
        let fundamentals = Poller::new("fundamentals", primary, fallback, Schedule::Once)
            .with_failure_message("Failed to load company fundamentals");

        let mode = if args.batch || backend.session().is_authenticated() {
            Mode::Normal
        } else {
            Mode::Login
        };

        Ok(Self {
            dashboard: Dashboard::default(),
            quote,
            chart,
            fundamentals,
            backend,
            session_store,
            pending: None,
            mode,
            focus: Focus::Main,
            input: String::new(),
            login: LoginForm::default(),
            error: None,
            status: None,
            history_error: None,
            refresh_interval,
            iteration: 0,
            max_iterations: args.iterations,
            running: true,
            batch_mode: args.batch,
            summarize_in_batch: args.summarize,
        })
    }

    /// Email of the logged-in user.
    pub fn user(&self) -> Option<String> {
        self.backend.session().email()
    }

    pub fn quote_state(&self) -> PollState<Quote> {
        self.quote.state()
    }

    pub fn chart_state(&self) -> PollState<Chart> {
        self.chart.state()
    }

    pub fn fundamentals_state(&self) -> PollState<Fundamentals> {
        self.fundamentals.state()
    }

    /// Queue backend work for the next loop turn.
    pub fn queue(&mut self, action: Action) {
        self.pending = Some(action);
    }

    pub fn take_pending(&mut self) -> Option<Action> {
        self.pending.take()
    }

    /// Run a queued action.
    pub async fn perform(&mut self, action: Action) {
        if !matches!(action, Action::Login { .. }) {
            debug!(?action, "performing action");
        }
        match action {
            Action::Search(raw) => self.search(&raw).await,
            Action::SelectHistory => self.select_history().await,
            Action::Summarize(symbol) => self.generate_summary(&symbol).await,
            Action::DeleteHistory(id) => self.delete_history(id).await,
            Action::Reload => self.reload().await,
            Action::Login { email, password } => self.login(&email, &password).await,
        }
    }

    /// Submit a search: switch symbol, record it and load its news.
    pub async fn search(&mut self, raw: &str) {
        let symbol = match self.dashboard.submit_search(raw) {
            Ok(symbol) => symbol,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };
        info!(%symbol, "searching");
        self.activate_pollers(&symbol);
        self.record_history(&symbol, None).await;
        self.load_symbol_data(&symbol).await;
    }

    /// Open the highlighted history entry with its stored summary.
    pub async fn select_history(&mut self) {
        let Some(symbol) = self.dashboard.select_history() else {
            return;
        };
        self.focus = Focus::Main;
        self.activate_pollers(&symbol);
        self.load_symbol_data(&symbol).await;
    }

    fn activate_pollers(&self, symbol: &str) {
        self.quote.activate(symbol);
        self.chart.activate(symbol);
        self.fundamentals.activate(symbol);
    }

    fn cancel_pollers(&self) {
        self.quote.cancel();
        self.chart.cancel();
        self.fundamentals.cancel();
    }

    async fn load_symbol_data(&mut self, symbol: &str) {
        let news = self.backend.news(symbol).await;
        if let Err(e) = &news {
            self.api_failed("news", e);
        }
        self.dashboard.news_loaded(symbol, news);

        let overview = self.backend.overview(symbol).await;
        if let Err(e) = &overview {
            self.api_failed("overview", e);
        }
        self.dashboard.overview_loaded(symbol, overview);
    }

    /// Mark a summary as generating and queue the request.
    ///
    /// Returns false when there is nothing to summarize.
    pub fn request_summary(&mut self) -> bool {
        match self.dashboard.begin_summary() {
            Some(symbol) => {
                self.queue(Action::Summarize(symbol));
                true
            }
            None => false,
        }
    }

    /// Summarize right away (batch mode).
    pub async fn summarize(&mut self) {
        if let Some(symbol) = self.dashboard.begin_summary() {
            self.generate_summary(&symbol).await;
        }
    }

    async fn generate_summary(&mut self, symbol: &str) {
        let articles = self.dashboard.news.clone();
        match self.backend.summarize(symbol, &articles).await {
            Ok(summary) => {
                if self.dashboard.summary_generated(symbol, summary.clone()) {
                    self.record_history(symbol, Some(&summary)).await;
                }
            }
            Err(e) => {
                self.api_failed("summary", &e);
                self.dashboard.summary_failed(symbol);
            }
        }
    }

    /// Save a search (and its summary) to the backend, then reload the list.
    async fn record_history(&mut self, symbol: &str, summary: Option<&str>) {
        if !self.backend.session().is_authenticated() {
            debug!(%symbol, "not logged in, history not saved");
            return;
        }
        if let Err(e) = self.backend.add_history(symbol, summary).await {
            self.api_failed("history", &e);
            return;
        }
        self.reload_history().await;
    }

    pub async fn reload_history(&mut self) {
        if !self.backend.session().is_authenticated() {
            self.dashboard.history_loaded(Vec::new());
            return;
        }
        match self.backend.history().await {
            Ok(history) => {
                self.dashboard.history_loaded(history);
                self.history_error = None;
            }
            Err(e) => {
                self.api_failed("history", &e);
                self.history_error = Some("Failed to load search history".to_string());
            }
        }
    }

    pub async fn delete_history(&mut self, id: i64) {
        match self.backend.delete_history(id).await {
            Ok(()) => self.reload_history().await,
            Err(e) => {
                self.api_failed("history", &e);
                self.error = Some(format!("Failed to delete history entry: {}", e));
            }
        }
    }

    /// Id of the highlighted history entry, when the sidebar has focus.
    pub fn focused_history_id(&self) -> Option<i64> {
        (self.focus == Focus::History)
            .then(|| self.dashboard.selected_history().map(|e| e.id))
            .flatten()
    }

    /// Refetch everything for the current symbol.
    pub async fn reload(&mut self) {
        self.quote.restart();
        self.chart.restart();
        self.fundamentals.restart();
        self.reload_history().await;
        if let Some(symbol) = self.dashboard.symbol.clone() {
            self.dashboard.news_loading = true;
            self.dashboard.overview_loading = true;
            self.load_symbol_data(&symbol).await;
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) {
        match self.backend.login(email.trim(), password).await {
            Ok(auth) => {
                info!(email = %auth.email, "logged in");
                self.logged_in(&auth.email).await;
            }
            Err(e) => self.error = Some(format!("Login failed: {}", e)),
        }
    }

    pub async fn register(&mut self, name: &str, email: &str, password: &str) {
        match self.backend.register(name, email.trim(), password).await {
            Ok(auth) => {
                info!(email = %auth.email, "registered");
                self.logged_in(&auth.email).await;
            }
            Err(e) => self.error = Some(format!("Registration failed: {}", e)),
        }
    }

    async fn logged_in(&mut self, email: &str) {
        self.persist_session();
        self.login = LoginForm::default();
        self.mode = Mode::Normal;
        self.status = Some(format!("Logged in as {}", email));
        self.reload_history().await;
    }

    pub fn logout(&mut self) {
        self.backend.logout();
        self.persist_session();
        self.cancel_pollers();
        self.dashboard.clear_symbol();
        self.dashboard.history_loaded(Vec::new());
        self.focus = Focus::Main;
        self.status = Some("Logged out".to_string());
        if !self.batch_mode {
            self.mode = Mode::Login;
        }
    }

    /// Route a backend failure.
    ///
    /// A 401 ends the session and a 403 drops the token; both are written
    /// back to the session file.
    fn api_failed(&mut self, what: &str, err: &ApiError) {
        match err {
            ApiError::AuthExpired => {
                warn!(what, "session expired");
                self.persist_session();
                self.error = Some(err.to_string());
                if !self.batch_mode {
                    self.mode = Mode::Login;
                }
            }
            ApiError::AuthAmbiguous => {
                warn!(what, "request forbidden");
                self.persist_session();
            }
            _ => warn!(what, error = %err, "backend request failed"),
        }
    }

    fn persist_session(&self) {
        if let Some(store) = &self.session_store {
            if let Err(e) = store.save(self.backend.session()) {
                warn!("Failed to save session: {:#}", e);
            }
        }
    }

    /// Wait until every active poller has a first result, or `limit` passes.
    pub async fn wait_for_market_data(&self, limit: Duration) {
        let settled = async {
            let mut quote = self.quote.subscribe();
            let mut chart = self.chart.subscribe();
            let mut fundamentals = self.fundamentals.subscribe();
            quote.wait_until(|s| !s.loading).await;
            chart.wait_until(|s| !s.loading).await;
            fundamentals.wait_until(|s| !s.loading).await;
        };
        if tokio::time::timeout(limit, settled).await.is_err() {
            warn!("market data still loading after {:?}", limit);
        }
    }

    pub fn toggle_help(&mut self) {
        self.mode = match self.mode {
            Mode::Help => Mode::Normal,
            _ => Mode::Help,
        };
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Main => Focus::History,
            Focus::History => Focus::Main,
        };
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Check if max iterations reached.
    pub fn should_quit(&self) -> bool {
        !self.running || (self.max_iterations > 0 && self.iteration >= self.max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use clap::Parser;

    fn app(argv: &[&str]) -> App {
        let args = Args::try_parse_from(argv).unwrap();
        App::with_session_store(&args, &Config::default(), None).unwrap()
    }

    /// Interactive app started from a saved session in `dir`.
    fn logged_in_app(dir: &std::path::Path) -> (App, SessionStore) {
        let store = SessionStore::new(dir.join("session.toml"));
        let saved = SessionContext::new(Some(Session {
            token: Some("jwt".to_string()),
            email: "asha@example.com".to_string(),
            name: None,
        }));
        store.save(&saved).unwrap();

        let args = Args::try_parse_from(["marketbrief"]).unwrap();
        let app = App::with_session_store(&args, &Config::default(), Some(store.clone())).unwrap();
        assert_eq!(app.mode, Mode::Normal);
        (app, store)
    }

    #[tokio::test]
    async fn test_unauthorized_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, store) = logged_in_app(dir.path());

        app.backend.session().clear();
        app.api_failed("news", &ApiError::AuthExpired);

        assert_eq!(app.mode, Mode::Login);
        assert!(app.error.is_some());
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_forbidden_drops_saved_token() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, store) = logged_in_app(dir.path());

        app.backend.session().drop_token();
        app.api_failed("news", &ApiError::AuthAmbiguous);

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.error, None);
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.token, None);
        assert_eq!(saved.email, "asha@example.com");
    }

    #[tokio::test]
    async fn test_unauthorized_in_batch_keeps_mode() {
        let args = Args::try_parse_from(["marketbrief", "-b"]).unwrap();
        let mut app = App::with_session_store(&args, &Config::default(), None).unwrap();
        app.api_failed("history", &ApiError::AuthExpired);
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.error.is_some());
    }

    #[tokio::test]
    async fn test_zero_config_intervals_raised() {
        let config: Config = toml::from_str(
            r#"
            [general]
            quote_interval = "0s"
            chart_interval = "0s"
            "#,
        )
        .unwrap();
        let args = Args::try_parse_from(["marketbrief", "-b"]).unwrap();
        let app = App::with_session_store(&args, &config, None).unwrap();
        assert_eq!(app.refresh_interval, Duration::from_secs(1));

        assert_eq!(poll_interval(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(poll_interval(Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn test_login_form_editing() {
        let mut form = LoginForm::default();
        for c in "a@b.in".chars() {
            form.push(c);
        }
        form.next_field();
        form.push('p');
        form.push('w');
        form.pop();
        assert_eq!(form.email, "a@b.in");
        assert_eq!(form.password, "p");
        assert!(form.is_complete());
    }

    #[tokio::test]
    async fn test_delay_clamped_and_override() {
        let fast = app(&["marketbrief", "-b", "-d", "0.2"]);
        assert_eq!(fast.refresh_interval, Duration::from_secs(1));

        let default = app(&["marketbrief", "-b"]);
        assert_eq!(default.refresh_interval, Duration::from_secs(10));
        assert_eq!(default.mode, Mode::Normal);
    }

    #[tokio::test]
    async fn test_invalid_search_sets_error() {
        let mut app = app(&["marketbrief", "-b"]);
        app.search("   ").await;
        assert_eq!(app.error.as_deref(), Some("Please enter a valid stock symbol"));
        assert_eq!(app.quote.key(), None);
    }

    #[tokio::test]
    async fn test_summary_request_needs_news() {
        let mut app = app(&["marketbrief", "-b"]);
        assert!(!app.request_summary());
        assert_eq!(app.take_pending(), None);
    }

    #[tokio::test]
    async fn test_iterations() {
        let mut app = app(&["marketbrief", "-b", "-n", "2"]);
        assert!(!app.should_quit());
        app.iteration = 2;
        assert!(app.should_quit());
    }

    #[tokio::test]
    async fn test_focus_and_help_toggle() {
        let mut app = app(&["marketbrief", "-b"]);
        app.toggle_focus();
        assert_eq!(app.focus, Focus::History);
        assert_eq!(app.focused_history_id(), None);
        app.toggle_help();
        assert_eq!(app.mode, Mode::Help);
        app.toggle_help();
        assert_eq!(app.mode, Mode::Normal);
    }
}
