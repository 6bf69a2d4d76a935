//! Number, date and filename formatting shared by the generated documents.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid regex"));

/// Formats a value with thousands separators and a fixed number of decimals,
/// e.g. `1234567.891` with 2 decimals becomes `1,234,567.89`.
pub fn format_currency(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", decimals as usize, rounded.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (text.clone(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `DD.MM.YYYY`, the date stamp used in document filenames.
pub fn filename_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Uppercases and collapses every run of non-alphanumeric characters to `_`.
pub fn sanitize_for_filename(value: &str) -> String {
    let replaced = NON_ALNUM.replace_all(value.trim(), "_");
    replaced.trim_matches('_').to_uppercase()
}

/// Decimal to f64 for spreadsheet cells. Computation never goes through f64.
pub fn to_cell(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or_default()
}
