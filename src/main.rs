//! MarketBrief - a terminal dashboard for stock research with AI news insights.

mod app;
mod backend;
mod cli;
mod config;
mod dashboard;
mod error;
mod format;
mod market;
mod models;
mod poll;
mod segment;
mod session;
mod symbol;
mod ui;

use anyhow::{Context, Result};
use app::{Action, App, Focus, Mode};
use cli::Args;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use session::{SessionContext, SessionStore};
use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse_args();

    init_tracing(args.batch)?;

    // Load configuration
    let mut config = match args.config {
        Some(ref path) if args.init_config && !path.exists() => Config::default(),
        Some(ref path) => Config::load(path)?,
        None => Config::load_or_default(),
    };

    if args.init_config {
        return init_config(&args, &mut config);
    }

    if args.logout {
        if let Some(store) = SessionStore::default_location() {
            store.save(&SessionContext::default())?;
            info!(path = %store.path().display(), "session removed");
        }
        println!("Logged out.");
        return Ok(());
    }

    if args.batch && args.symbol.is_none() {
        eprintln!("Error: No symbol to show.");
        eprintln!("Batch mode needs a symbol via the -s flag.");
        eprintln!();
        eprintln!("Example: marketbrief -b -s TCS");
        eprintln!();
        eprintln!("Config file location: {:?}", Config::default_config_path());
        eprintln!();
        eprintln!("Sample config:");
        eprintln!("{}", config::sample_config());
        std::process::exit(1);
    }

    let mut app = App::new(&args, &config)?;

    if args.register {
        if let (Some(name), Some((email, password))) = (args.name.as_deref(), args.credentials()) {
            app.register(name, email, password).await;
        }
    } else if let Some((email, password)) = args.credentials() {
        app.login(email, password).await;
    }
    if app.batch_mode {
        if let Some(error) = app.error.take() {
            eprintln!("Error: {}", error);
        }
    }

    app.reload_history().await;
    if let Some(ref symbol) = args.symbol {
        app.search(symbol).await;
    }
    if app.batch_mode {
        if let Some(error) = app.error.take() {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
    }

    // Run in batch mode or interactive mode
    if app.batch_mode {
        let timeout = args.timeout.unwrap_or(config.general.timeout);
        run_batch(&mut app, Duration::from_secs(timeout * 2 + 1)).await
    } else {
        run_interactive(&mut app).await
    }
}

/// Log to stderr in batch mode and to a file while the TUI owns the terminal.
fn init_tracing(batch: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if batch {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(());
    }

    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("marketbrief");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    let path = dir.join("marketbrief.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Write the effective configuration (file plus CLI overrides) and exit.
fn init_config(args: &Args, config: &mut Config) -> Result<()> {
    if let Some(ref url) = args.api_url {
        config.backend.base_url = url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.general.timeout = timeout;
    }

    let path = match args.config.clone().or_else(Config::default_config_path) {
        Some(path) => path,
        None => anyhow::bail!("No configuration directory available, pass --config"),
    };
    config.save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Run in batch mode (non-interactive, like top -b).
async fn run_batch(app: &mut App, settle: Duration) -> Result<()> {
    loop {
        app.wait_for_market_data(settle).await;
        if app.summarize_in_batch && app.dashboard.summary.is_none() {
            app.summarize().await;
        }

        ui::render_batch(app);
        app.iteration += 1;

        if app.should_quit() {
            break;
        }

        tokio::time::sleep(app.refresh_interval).await;
    }

    Ok(())
}

/// Run in interactive mode with TUI.
async fn run_interactive(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("interactive session started");
    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Main application loop.
async fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        // Draw UI
        terminal.draw(|f| ui::render(f, app))?;

        // Queued work runs after the frame showing its loading state
        if let Some(action) = app.take_pending() {
            app.perform(action).await;
            continue;
        }

        // Handle events with timeout
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key_event(app, key.code, key.modifiers);
                }
            }
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

/// Handle keyboard input.
fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    // Clear error on any key
    if app.error.is_some() {
        app.error = None;
        return;
    }

    match app.mode {
        Mode::Help => app.mode = Mode::Normal,
        Mode::Login => handle_login_key(app, code),
        Mode::Search => handle_search_key(app, code),
        Mode::Normal => handle_normal_key(app, code),
    }
}

fn handle_login_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.quit(),
        KeyCode::Tab | KeyCode::Down | KeyCode::Up => app.login.next_field(),
        KeyCode::Backspace => app.login.pop(),
        KeyCode::Enter if app.login.is_complete() => {
            let action = Action::Login {
                email: app.login.email.clone(),
                password: app.login.password.clone(),
            };
            app.queue(action);
        }
        KeyCode::Enter => app.login.next_field(),
        KeyCode::Char(c) => app.login.push(c),
        _ => {}
    }
}

fn handle_search_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.input.clear();
            app.mode = Mode::Normal;
        }
        KeyCode::Enter => {
            let input = std::mem::take(&mut app.input);
            app.mode = Mode::Normal;
            app.queue(Action::Search(input));
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) if app.input.chars().count() < symbol::MAX_INPUT_LEN => app.input.push(c),
        _ => {}
    }
}

fn handle_normal_key(app: &mut App, code: KeyCode) {
    match code {
        // Quit
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        KeyCode::Char('/') => {
            app.focus = Focus::Main;
            app.mode = Mode::Search;
        }
        KeyCode::Char('a') => {
            if !app.request_summary() {
                app.status = Some("Nothing to summarize yet".to_string());
            }
        }

        // History
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Up | KeyCode::Char('k') if app.focus == Focus::History => app.dashboard.history_up(),
        KeyCode::Down | KeyCode::Char('j') if app.focus == Focus::History => app.dashboard.history_down(),
        KeyCode::Enter if app.focus == Focus::History => app.queue(Action::SelectHistory),
        KeyCode::Char('d') => {
            if let Some(id) = app.focused_history_id() {
                app.queue(Action::DeleteHistory(id));
            }
        }

        KeyCode::Char('R') => app.queue(Action::Reload),
        KeyCode::Char('L') => app.logout(),
        KeyCode::Char('h') | KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}
