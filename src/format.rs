//! Number formatting for rupee-denominated market data.
//!
//! Large values use the Indian scale (lakh, crore) below a billion and the
//! western suffixes above it, which is how the domestic financial press
//! writes them.

use num_format::{CustomFormat, Grouping, ToFormattedString};
use once_cell::sync::Lazy;

const RUPEE: &str = "₹";

static INDIAN: Lazy<Option<CustomFormat>> = Lazy::new(|| {
    CustomFormat::builder()
        .grouping(Grouping::Indian)
        .separator(",")
        .build()
        .ok()
});

/// Group digits the Indian way: 12,34,567.
fn group(n: u64) -> String {
    match INDIAN.as_ref() {
        Some(format) => n.to_formatted_string(format),
        None => n.to_string(),
    }
}

/// Split a value into sign, whole part and hundredths, rounded half away from zero.
fn split_cents(value: f64) -> (bool, u64, u64) {
    let cents = (value.abs() * 100.0).round() as u64;
    (value < 0.0 && cents > 0, cents / 100, cents % 100)
}

/// Format as rupees with Indian digit grouping and two decimals.
pub fn format_currency(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let (negative, whole, cents) = split_cents(v);
            format!(
                "{}{}{}.{:02}",
                if negative { "-" } else { "" },
                RUPEE,
                group(whole),
                cents
            )
        }
        _ => format!("{}0.00", RUPEE),
    }
}

/// Indian digit grouping with at most two decimals.
pub fn format_indian_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let (negative, whole, cents) = split_cents(v);
            let sign = if negative { "-" } else { "" };
            let grouped = group(whole);
            match cents {
                0 => format!("{}{}", sign, grouped),
                c if c % 10 == 0 => format!("{}{}.{}", sign, grouped, c / 10),
                c => format!("{}{}.{:02}", sign, grouped, c),
            }
        }
        _ => "0.00".to_string(),
    }
}

/// Compact rupee amount: T, B, Cr (1e7) and L (1e5) suffixes.
pub fn format_large_number(value: Option<f64>) -> String {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return "N/A".to_string();
    };

    let abs = v.abs();
    if abs >= 1e12 {
        format!("{}{:.2}T", RUPEE, v / 1e12)
    } else if abs >= 1e9 {
        format!("{}{:.2}B", RUPEE, v / 1e9)
    } else if abs >= 1e7 {
        format!("{}{:.2}Cr", RUPEE, v / 1e7)
    } else if abs >= 1e5 {
        format!("{}{:.2}L", RUPEE, v / 1e5)
    } else {
        format_currency(Some(v))
    }
}

/// Percentage with two decimals; fractional inputs (0.15) are scaled to 15.00%.
pub fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let p = if v.abs() < 1.0 && v != 0.0 { v * 100.0 } else { v };
            format!("{:.2}%", p)
        }
        _ => "N/A".to_string(),
    }
}

/// Format price with appropriate precision.
pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format!("{}{:.2}", RUPEE, price)
    } else {
        format!("{}{:.6}", RUPEE, price)
    }
}

/// Format volume with suffixes.
pub fn format_volume(volume: u64) -> String {
    if volume >= 10_000_000 {
        format!("{:.2}Cr", volume as f64 / 1e7)
    } else if volume >= 100_000 {
        format!("{:.2}L", volume as f64 / 1e5)
    } else {
        group(volume)
    }
}

/// Truncate string to max length (in characters).
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
