//! Terminal user interface with ratatui.

use crate::app::{App, Focus, LoginField, Mode};
use crate::dashboard::Insights;
use crate::format::{
    format_currency, format_indian_number, format_large_number, format_percentage, format_price,
    format_volume, truncate_string,
};
use crate::models::{Chart, Fundamentals, HistoryEntry, NewsArticle, Quote, StockOverview};
use crate::poll::PollState;
use crate::segment::segment_opt;
use chrono::{DateTime, Local, Utc};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Colors for the UI.
pub struct UiColors {
    pub gain: Color,
    pub loss: Color,
    pub neutral: Color,
    pub muted: Color,
    pub accent: Color,
    pub header_bg: Color,
    pub selected_bg: Color,
    pub border: Color,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            gain: Color::Green,
            loss: Color::Red,
            neutral: Color::White,
            muted: Color::DarkGray,
            accent: Color::Cyan,
            header_bg: Color::DarkGray,
            selected_bg: Color::Rgb(40, 40, 60),
            border: Color::DarkGray,
        }
    }
}

impl UiColors {
    fn change(&self, value: f64) -> Color {
        if value > 0.0 {
            self.gain
        } else if value < 0.0 {
            self.loss
        } else {
            self.neutral
        }
    }
}

/// Render the main UI.
pub fn render(frame: &mut Frame, app: &App) {
    let colors = UiColors::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Min(10),   // Panels
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0], &colors);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(26),     // History
            Constraint::Min(40),        // Stock
            Constraint::Percentage(32), // Insights
        ])
        .split(chunks[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55), // Overview
            Constraint::Min(8),         // Insights
        ])
        .split(columns[2]);

    render_history(frame, app, columns[0], &colors);
    render_stock(frame, app, columns[1], &colors);
    render_overview(frame, app, side[0], &colors);
    render_insights(frame, app, side[1], &colors);

    render_footer(frame, app, chunks[2], &colors);

    match app.mode {
        Mode::Help => render_help_overlay(frame, &colors),
        Mode::Login => render_login_overlay(frame, app, &colors),
        Mode::Normal | Mode::Search => {}
    }

    if let Some(ref error) = app.error {
        render_error(frame, error, &colors);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let symbol = app.dashboard.symbol.as_deref().unwrap_or("no symbol");
    let user = app.user().unwrap_or_else(|| "not logged in".to_string());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "MARKETBRIEF ",
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("- {}  ", symbol)),
        Span::styled(user, Style::default().fg(colors.muted)),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.border)),
    );

    frame.render_widget(header, area);
}

fn panel<'a>(title: &'a str, focused: bool, colors: &UiColors) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { colors.accent } else { colors.border }))
}

fn placeholder<'a>(text: impl Into<String>, colors: &UiColors) -> Paragraph<'a> {
    Paragraph::new(text.into())
        .style(Style::default().fg(colors.muted))
        .wrap(Wrap { trim: true })
}

fn render_history(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let focused = app.focus == Focus::History;
    let block = panel(" History ", focused, colors);
    let history = &app.dashboard.history;

    if let Some(ref error) = app.history_error {
        let widget = Paragraph::new(error.as_str())
            .style(Style::default().fg(colors.loss))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(widget, area);
        return;
    }
    if history.is_empty() {
        frame.render_widget(placeholder("No search history yet", colors).block(block), area);
        return;
    }

    let current = app.dashboard.symbol.as_deref();
    let rows = history.iter().map(|entry| {
        let style = if Some(entry.symbol.as_str()) == current {
            Style::default().fg(colors.accent)
        } else {
            Style::default()
        };
        let marker = if entry.ai_summary.as_deref().is_some_and(|s| !s.is_empty()) {
            "*"
        } else {
            " "
        };
        Row::new(vec![
            Cell::from(format!("{}{}", marker, truncate_string(&entry.symbol, 11))),
            Cell::from(short_time(entry.searched_at())),
        ])
        .style(style)
    });

    let table = Table::new(rows, [Constraint::Length(12), Constraint::Length(12)])
        .block(block)
        .row_highlight_style(Style::default().bg(colors.selected_bg));

    let mut state = TableState::default();
    if focused {
        state.select(Some(app.dashboard.history_selected));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_stock(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),  // Quote
            Constraint::Length(5),  // Chart
            Constraint::Length(10), // Fundamentals
            Constraint::Min(4),     // News
        ])
        .split(area);

    if app.dashboard.symbol.is_none() {
        let hint = placeholder("Press / and type a symbol (TCS, RELIANCE, AAPL) to get started", colors)
            .block(panel(" Search ", false, colors));
        frame.render_widget(hint, area);
        return;
    }

    render_quote(frame, &app.quote_state(), app.dashboard.overview.as_ref(), chunks[0], colors);
    render_chart(frame, &app.chart_state(), chunks[1], colors);
    render_fundamentals(frame, &app.fundamentals_state(), chunks[2], colors);
    render_news(frame, app, chunks[3], colors);
}

fn render_quote(
    frame: &mut Frame,
    state: &PollState<Quote>,
    overview: Option<&StockOverview>,
    area: Rect,
    colors: &UiColors,
) {
    let block = panel(" Quote ", false, colors);

    let Some(ref quote) = state.data else {
        let text = if state.loading {
            "Loading quote...".to_string()
        } else if let Some(line) = overview.and_then(overview_line) {
            line
        } else {
            state.error.clone().unwrap_or_else(|| "No quote".to_string())
        };
        frame.render_widget(placeholder(text, colors).block(block), area);
        return;
    };

    let change_style = Style::default().fg(colors.change(quote.change));
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} ", quote.symbol),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(truncate_string(&quote.name, 40)),
        ]),
        Line::from(vec![
            Span::styled(
                format!("{}  ", money(quote, quote.price)),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:+.2} ({:+.2}%)", quote.change, quote.change_percent),
                change_style,
            ),
        ]),
        Line::from(format!(
            "O {}  H {}  L {}  Vol {}",
            money(quote, quote.open),
            money(quote, quote.day_high),
            money(quote, quote.day_low),
            format_volume(quote.volume)
        )),
        Line::from(Span::styled(
            format!(
                "{} · {} · {}{}",
                if quote.exchange.is_empty() { "-" } else { quote.exchange.as_str() },
                quote.market_state,
                local_time(quote.timestamp),
                overview
                    .and_then(|o| o.sector.as_deref())
                    .map(|s| format!(" · {}", s))
                    .unwrap_or_default()
            ),
            Style::default().fg(colors.muted),
        )),
    ];
    if let Some(ref error) = state.error {
        lines.push(Line::from(Span::styled(
            format!("stale: {}", error),
            Style::default().fg(colors.loss),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Backend overview used when the live quote is unavailable.
fn overview_line(overview: &StockOverview) -> Option<String> {
    let price = overview.price.as_deref()?;
    Some(format!(
        "{} {}{} ({}%)  via backend",
        overview.name.as_deref().or(overview.symbol.as_deref()).unwrap_or("-"),
        overview.currency_symbol(),
        price,
        overview.change_percent.as_deref().unwrap_or("0.00")
    ))
}

fn render_chart(frame: &mut Frame, state: &PollState<Chart>, area: Rect, colors: &UiColors) {
    let block = panel(" Intraday ", false, colors);

    let chart = match state.data {
        Some(ref chart) if !chart.candles.is_empty() => chart,
        _ => {
            let text = if state.loading {
                "Loading chart...".to_string()
            } else {
                state
                    .error
                    .clone()
                    .unwrap_or_else(|| "Chart data not available".to_string())
            };
            frame.render_widget(placeholder(text, colors).block(block), area);
            return;
        }
    };

    let width = area.width.saturating_sub(2) as usize;
    let first = chart.candles.first().map(|c| c.close).unwrap_or_default();
    let last = chart.latest().map(|c| c.close).unwrap_or_default();
    let lines = vec![
        Line::from(Span::styled(
            sparkline_text(&chart.sparkline(), width),
            Style::default().fg(colors.change(last - first)),
        )),
        Line::from(Span::styled(
            format!("last {}  ({} points)", format_price(last), chart.candles.len()),
            Style::default().fg(colors.muted),
        )),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_fundamentals(frame: &mut Frame, state: &PollState<Fundamentals>, area: Rect, colors: &UiColors) {
    let block = panel(" Fundamentals ", false, colors);

    let Some(ref f) = state.data else {
        let text = if state.loading {
            "Loading fundamentals...".to_string()
        } else {
            state
                .error
                .clone()
                .unwrap_or_else(|| "Fundamental data not available".to_string())
        };
        frame.render_widget(placeholder(text, colors).block(block), area);
        return;
    };

    let rows = fundamentals_rows(f).into_iter().map(|(left, right)| {
        Row::new(vec![
            Cell::from(left.0).style(Style::default().fg(colors.muted)),
            Cell::from(left.1),
            Cell::from(right.0).style(Style::default().fg(colors.muted)),
            Cell::from(right.1),
        ])
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Length(14),
        Constraint::Length(12),
        Constraint::Length(14),
    ];
    frame.render_widget(Table::new(rows, widths).block(block), area);
}

type Field = (&'static str, String);

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}", v))
}

/// Label/value pairs of the fundamentals panel, two per row.
fn fundamentals_rows(f: &Fundamentals) -> Vec<(Field, Field)> {
    vec![
        (("Market Cap", format_large_number(f.market_cap)), ("P/E", ratio(f.trailing_pe))),
        (("P/B", ratio(f.price_to_book)), ("EPS", ratio(f.trailing_eps))),
        (("Book Value", ratio(f.book_value)), ("Div Yield", format_percentage(f.dividend_yield))),
        (("ROE", format_percentage(f.return_on_equity)), ("Debt/Eq", ratio(f.debt_to_equity))),
        (
            ("50D Avg", format_indian_number(f.fifty_day_average)),
            ("200D Avg", format_indian_number(f.two_hundred_day_average)),
        ),
        (
            ("Target", f.target_mean_price.map_or_else(|| "N/A".to_string(), |v| format_currency(Some(v)))),
            ("Sector", f.sector.clone().unwrap_or_else(|| "N/A".to_string())),
        ),
    ]
}

fn render_overview(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let block = panel(" Overview ", false, colors);
    let dash = &app.dashboard;

    if dash.symbol.is_none() {
        frame.render_widget(placeholder("Search a symbol to see the company overview", colors).block(block), area);
        return;
    }
    if dash.overview_loading {
        frame.render_widget(placeholder("Loading overview...", colors).block(block), area);
        return;
    }
    let Some(ref overview) = dash.overview else {
        frame.render_widget(placeholder("Unable to load stock data", colors).block(block), area);
        return;
    };

    let mut lines = vec![Line::from(Span::styled(
        overview_title(overview),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    if let Some(ref description) = overview.description {
        lines.push(Line::from(Span::styled(
            truncate_string(description, 160),
            Style::default().fg(colors.muted),
        )));
    }
    lines.push(Line::from(""));

    let label = |text: &'static str| Span::styled(format!("{:<10} ", text), Style::default().fg(colors.muted));
    for ((l1, v1), (l2, v2)) in overview_rows(overview) {
        lines.push(Line::from(vec![
            label(l1),
            Span::raw(format!("{:<12} ", v1)),
            label(l2),
            Span::raw(v2),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

/// Name, exchange, sector and country, skipping the blanks.
fn overview_title(overview: &StockOverview) -> String {
    let name = overview
        .name
        .as_deref()
        .or(overview.symbol.as_deref())
        .unwrap_or("-")
        .to_string();
    [&overview.exchange, &overview.sector, &overview.country]
        .into_iter()
        .map(|field| StockOverview::text(field.as_deref()))
        .filter(|value| value != "N/A")
        .fold(name, |title, value| format!("{} · {}", title, value))
}

/// Label/value pairs of the overview panel, two per row.
fn overview_rows(o: &StockOverview) -> Vec<(Field, Field)> {
    let text = |field: &Option<String>| StockOverview::text(field.as_deref());
    let money = |field: &Option<String>| o.money(field.as_deref());
    vec![
        (("Day High", money(&o.day_high)), ("Day Low", money(&o.day_low))),
        (("52W High", money(&o.week52_high)), ("52W Low", money(&o.week52_low))),
        (("50D Avg", money(&o.week50_day_average)), ("200D Avg", money(&o.week200_day_average))),
        (("Open", money(&o.open)), ("Prev Close", money(&o.previous_close))),
        (("Volume", text(&o.volume)), ("Target", money(&o.analyst_target_price))),
        (("Mkt Cap", text(&o.market_cap)), ("ROE", text(&o.roe))),
        (("P/E", text(&o.pe_ratio)), ("EPS", text(&o.eps))),
        (("P/B", text(&o.pb_ratio)), ("Div Yield", text(&o.dividend_yield))),
        (("Book Value", money(&o.book_value)), ("Industry", text(&o.industry))),
    ]
}

fn render_news(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let block = panel(" News ", false, colors);
    let dash = &app.dashboard;

    if dash.news_loading {
        frame.render_widget(placeholder("Loading news...", colors).block(block), area);
        return;
    }
    if let Some(ref error) = dash.news_error {
        frame.render_widget(placeholder(format!("Failed to load news: {}", error), colors).block(block), area);
        return;
    }
    if dash.news.is_empty() {
        frame.render_widget(placeholder("No recent news for this symbol", colors).block(block), area);
        return;
    }

    let lines: Vec<Line> = dash
        .news
        .iter()
        .flat_map(|article| news_lines(article, colors))
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn news_lines<'a>(article: &'a NewsArticle, colors: &UiColors) -> [Line<'a>; 2] {
    [
        Line::from(Span::styled(article.title.as_str(), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(
            format!("{} · {}", source_name(article), short_time(article.published())),
            Style::default().fg(colors.muted),
        )),
    ]
}

fn source_name(article: &NewsArticle) -> &str {
    if article.source.is_empty() {
        "Unknown source"
    } else {
        &article.source
    }
}

fn render_insights(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let block = panel(" AI Insights ", false, colors);

    let text = match app.dashboard.insights() {
        Insights::NoSymbol => "Search a symbol to see AI insights",
        Insights::NoNews => "No news to summarize",
        Insights::NotGenerated => "Press a to generate insights from the latest news",
        Insights::Generating => "Generating insights...",
        Insights::Empty => "No insights available",
        Insights::Points(points) => {
            let lines: Vec<Line> = points
                .into_iter()
                .enumerate()
                .flat_map(|(i, point)| {
                    [
                        Line::from(vec![
                            Span::styled(format!("{}. ", i + 1), Style::default().fg(colors.accent)),
                            Span::raw(point),
                        ]),
                        Line::from(""),
                    ]
                })
                .collect();
            frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
            return;
        }
    };

    frame.render_widget(placeholder(text, colors).block(block), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let footer = if app.mode == Mode::Search {
        Line::from(vec![key(" Search: "), Span::raw(format!("{}_", app.input))])
    } else {
        let mut spans = vec![
            key(" q"),
            Span::raw(":quit "),
            key("/"),
            Span::raw(":search "),
            key("a"),
            Span::raw(":insights "),
            key("Tab"),
            Span::raw(":history "),
            key("R"),
            Span::raw(":reload "),
            key("h"),
            Span::raw(":help "),
        ];
        if let Some(ref status) = app.status {
            spans.push(Span::raw(format!("| {}", status)));
        }
        Line::from(spans)
    };

    frame.render_widget(Paragraph::new(footer).style(Style::default().bg(colors.header_bg)), area);
}

fn render_help_overlay(frame: &mut Frame, colors: &UiColors) {
    let area = centered_rect(60, 70, frame.area());

    let help_text = vec![
        Line::from(Span::styled(
            "MARKETBRIEF HELP",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Search:"),
        Line::from("  /         Search a symbol"),
        Line::from("  Enter     Submit"),
        Line::from("  Esc       Cancel"),
        Line::from(""),
        Line::from("History:"),
        Line::from("  Tab       Focus history"),
        Line::from("  ↑/k ↓/j   Move"),
        Line::from("  Enter     Open entry with its insights"),
        Line::from("  d         Delete entry"),
        Line::from(""),
        Line::from("Actions:"),
        Line::from("  a         Generate AI insights"),
        Line::from("  R         Reload"),
        Line::from("  L         Log out"),
        Line::from("  q/Esc     Quit"),
        Line::from("  h/?       Toggle help"),
        Line::from(""),
        Line::from("Press any key to close"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

fn render_login_overlay(frame: &mut Frame, app: &App, colors: &UiColors) {
    let area = centered_rect(50, 40, frame.area());
    let form = &app.login;

    let field = |label: &'static str, value: String, active: bool| {
        let style = if active {
            Style::default().fg(colors.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(label, style),
            Span::raw(value),
            Span::raw(if active { "_" } else { "" }),
        ])
    };

    let lines = vec![
        Line::from("Log in to load news, history and AI insights."),
        Line::from(""),
        field("Email:    ", form.email.clone(), form.field == LoginField::Email),
        field(
            "Password: ",
            "*".repeat(form.password.chars().count()),
            form.field == LoginField::Password,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "Tab: switch field  Enter: log in  Esc: quit",
            Style::default().fg(colors.muted),
        )),
    ];

    let login = Paragraph::new(lines).block(
        Block::default()
            .title(" Login ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.accent)),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(login, area);
}

fn render_error(frame: &mut Frame, error: &str, colors: &UiColors) {
    let area = centered_rect(50, 20, frame.area());

    let error_widget = Paragraph::new(error)
        .block(
            Block::default()
                .title(" Error ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.loss)),
        )
        .style(Style::default().fg(colors.loss))
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, area);
    frame.render_widget(error_widget, area);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Price in the quote's own currency.
fn money(quote: &Quote, value: f64) -> String {
    if quote.is_usd() {
        format!("${:.2}", value)
    } else {
        format_currency(Some(value))
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn short_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.with_timezone(&Local).format("%d %b %H:%M").to_string())
        .unwrap_or_default()
}

/// Block-character sparkline of the last `width` values.
fn sparkline_text(values: &[u64], width: usize) -> String {
    let tail = &values[values.len().saturating_sub(width)..];
    let max = tail.iter().copied().max().unwrap_or(0);
    tail.iter()
        .map(|&v| {
            let level = if max == 0 {
                0
            } else {
                (v * (SPARK_BARS.len() as u64 - 1) / max) as usize
            };
            SPARK_BARS[level]
        })
        .collect()
}

fn print_state<T>(label: &str, state: &PollState<T>) {
    if state.loading {
        println!("{}: loading", label);
    } else if let Some(ref error) = state.error {
        println!("{}: {}", label, error);
    } else {
        println!("{}: no data", label);
    }
}

fn print_history(history: &[HistoryEntry]) {
    if history.is_empty() {
        return;
    }
    println!("History:");
    for entry in history {
        println!(
            "  {:<14} {:<14} {} insights",
            entry.symbol,
            short_time(entry.searched_at()),
            segment_opt(entry.ai_summary.as_deref()).len()
        );
    }
}

/// Render batch mode output (non-interactive).
pub fn render_batch(app: &App) {
    let dash = &app.dashboard;

    println!(
        "\n=== MARKETBRIEF {} ===",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(user) = app.user() {
        println!("User: {}", user);
    }

    let quote = app.quote_state();
    match quote.data {
        Some(ref q) => println!(
            "{:<14} {:<30} {:>14} {:>+10.2} {:>+9.2}% Vol {:>10} {}",
            q.symbol,
            truncate_string(&q.name, 30),
            money(q, q.price),
            q.change,
            q.change_percent,
            format_volume(q.volume),
            q.market_state
        ),
        None => print_state("Quote", &quote),
    }

    let chart = app.chart_state();
    match chart.data {
        Some(ref c) if !c.candles.is_empty() => println!(
            "Chart: {} last {}",
            sparkline_text(&c.sparkline(), 60),
            format_price(c.latest().map(|l| l.close).unwrap_or_default())
        ),
        _ => print_state("Chart", &chart),
    }

    let fundamentals = app.fundamentals_state();
    match fundamentals.data {
        Some(ref f) => {
            println!("Fundamentals:");
            for ((l1, v1), (l2, v2)) in fundamentals_rows(f) {
                println!("  {:<12} {:>16}   {:<12} {:>16}", l1, v1, l2, v2);
            }
        }
        None => print_state("Fundamentals", &fundamentals),
    }

    if let Some(ref overview) = dash.overview {
        println!("Overview: {}", overview_title(overview));
        if let Some(ref description) = overview.description {
            println!("  {}", truncate_string(description, 200));
        }
        for ((l1, v1), (l2, v2)) in overview_rows(overview) {
            println!("  {:<12} {:>16}   {:<12} {:>16}", l1, v1, l2, v2);
        }
    } else if dash.symbol.is_some() && !dash.overview_loading {
        println!("Overview: unable to load stock data");
    }

    if let Some(ref error) = dash.news_error {
        println!("News: {}", error);
    } else if !dash.news.is_empty() {
        println!("News:");
        for article in &dash.news {
            println!("  - {} ({})", article.title, source_name(article));
        }
    }

    match dash.insights() {
        Insights::Points(points) => {
            println!("AI Insights:");
            for (i, point) in points.iter().enumerate() {
                println!("  {}. {}", i + 1, point);
            }
        }
        Insights::Empty => println!("AI Insights: none"),
        _ => {}
    }

    print_history(&dash.history);
    println!();
}
