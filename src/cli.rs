//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

/// A terminal dashboard for stock research.
///
/// Search a ticker to see its live quote, intraday chart, fundamentals and
/// recent news, then have the MarketBrief backend summarize that news into
/// key insights. Plain domestic tickers get the exchange suffix
/// automatically (TCS becomes TCS.NS).
#[derive(Parser, Debug, Clone)]
#[command(name = "marketbrief")]
#[command(version)]
#[command(about = "A terminal dashboard for stock research with AI news insights", long_about = None)]
pub struct Args {
    /// Symbol to open on start
    ///
    /// Examples: TCS, RELIANCE.NS, AAPL
    #[arg(short = 's', long, env = "MARKETBRIEF_SYMBOL")]
    pub symbol: Option<String>,

    /// Live quote refresh delay in seconds (overrides the config file)
    #[arg(short = 'd', long, env = "MARKETBRIEF_DELAY")]
    pub delay: Option<f64>,

    /// Number of iterations before exiting in batch mode
    ///
    /// 0 means infinite
    #[arg(short = 'n', long, default_value = "1")]
    pub iterations: u64,

    /// Batch mode - print the dashboard as text instead of running the TUI
    #[arg(short = 'b', long)]
    pub batch: bool,

    /// Also generate and print AI insights in batch mode
    #[arg(long)]
    pub summarize: bool,

    /// Configuration file path
    #[arg(short = 'c', long, env = "MARKETBRIEF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the default configuration file and exit
    #[arg(long)]
    pub init_config: bool,

    /// Backend base URL (overrides the config file)
    #[arg(long, env = "MARKETBRIEF_API_URL")]
    pub api_url: Option<String>,

    /// Log in with this email before starting
    #[arg(long, env = "MARKETBRIEF_EMAIL")]
    pub email: Option<String>,

    /// Password for --email
    #[arg(long, env = "MARKETBRIEF_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Create the account first (needs --name, --email and --password)
    #[arg(long, requires_all = ["name", "email", "password"])]
    pub register: bool,

    /// Display name for --register
    #[arg(long)]
    pub name: Option<String>,

    /// Forget the saved session and exit
    #[arg(long)]
    pub logout: bool,

    /// API timeout in seconds (overrides the config file)
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Email and password, when both were given.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.password.as_deref()?))
    }
}
