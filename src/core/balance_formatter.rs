//! Conversion of raw `"<amount> <symbol>"` balance strings into keyed maps.

use std::collections::BTreeMap;

/// Split a raw asset string into its amount and symbol halves.
///
/// Anything after the second space is ignored; a missing symbol yields `""`.
fn split_asset(raw: &str) -> (&str, &str) {
    let mut parts = raw.split(' ');
    let amount = parts.next().unwrap_or_default();
    let symbol = parts.next().unwrap_or_default();
    (amount, symbol)
}

/// Number of fractional digits per symbol, as written by the node.
pub fn format_precisions<S: AsRef<str>>(balances: &[S]) -> BTreeMap<String, u8> {
    let mut precision = BTreeMap::new();
    for raw in balances {
        let (amount, symbol) = split_asset(raw.as_ref());
        let digits = amount
            .split('.')
            .nth(1)
            .map(|suffix| suffix.len().min(u8::MAX as usize) as u8)
            .unwrap_or(0);
        precision.insert(symbol.to_string(), digits);
    }
    precision
}

/// Parsed amount per symbol.
///
/// `forced_symbol` is seeded at zero first so an empty node answer still
/// produces an entry. Unparseable amounts become `NaN`.
pub fn format_balances<S: AsRef<str>>(
    balances: &[S],
    forced_symbol: Option<&str>,
) -> BTreeMap<String, f64> {
    let mut formatted = BTreeMap::new();
    if let Some(symbol) = forced_symbol {
        formatted.insert(symbol.to_string(), 0.0);
    }
    for raw in balances {
        let (amount, symbol) = split_asset(raw.as_ref());
        formatted.insert(symbol.to_string(), parse_amount(amount));
    }
    formatted
}

/// Lenient float parse: the longest numeric prefix wins, otherwise `NaN`.
fn parse_amount(amount: &str) -> f64 {
    let trimmed = amount.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return value;
    }
    let mut end = 0;
    let mut seen_dot = false;
    for (idx, ch) in trimmed.char_indices() {
        let accepted = match ch {
            '0'..='9' => true,
            '.' if !seen_dot => {
                seen_dot = true;
                true
            }
            '-' | '+' => idx == 0,
            _ => false,
        };
        if !accepted {
            break;
        }
        end = idx + ch.len_utf8();
    }
    trimmed[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Zero asset string for a chain token, e.g. `0.0000 WAX` for precision 4.
pub fn zero_asset(precision: u8, symbol: &str) -> String {
    if precision == 0 {
        return format!("0 {symbol}");
    }
    format!("0.{} {symbol}", "0".repeat(precision as usize))
}
