//! Price helpers for the UI. Prices are stored as whole minor units (pence)
//! and only turned into decimal text at the edges.

use anyhow::{anyhow, bail, Context, Result};

/// Currency symbol used when the configuration does not name one.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "£";
/// Digits allowed before the decimal point while typing a price.
pub const DEFAULT_MAX_PRICE_DIGITS: usize = 4;
/// Digits allowed after the decimal point while typing a price.
pub const DEFAULT_MAX_PRICE_DECIMALS: usize = 2;

/// Render `minor` units as `symbol` followed by the amount with exactly two
/// decimals, e.g. `1050` → `£10.50`.
pub fn format_price(minor: i64, symbol: &str) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{symbol}{}.{:02}", abs / 100, abs % 100)
}

/// Parse price text back into minor units. The currency symbol is optional;
/// digits beyond the second decimal are truncated, so `£10.509` → `1050`.
pub fn parse_price(text: &str, symbol: &str) -> Result<i64> {
    let trimmed = text.trim();
    let amount = trimmed
        .strip_prefix(symbol)
        .unwrap_or(trimmed)
        .trim();
    if amount.is_empty() {
        bail!("Price is required.");
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if !whole.chars().all(|ch| ch.is_ascii_digit())
        || !fraction.chars().all(|ch| ch.is_ascii_digit())
        || (whole.is_empty() && fraction.is_empty())
    {
        return Err(anyhow!("'{text}' is not a valid price."));
    }

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .with_context(|| format!("'{text}' is too large a price."))?
    };
    let mut cents: String = fraction.chars().take(2).collect();
    while cents.len() < 2 {
        cents.push('0');
    }
    let cents: i64 = cents.parse().context("invalid price decimals")?;

    units
        .checked_mul(100)
        .and_then(|value| value.checked_add(cents))
        .ok_or_else(|| anyhow!("'{text}' is too large a price."))
}

/// Live clamp for a price being typed. Returns `after` when it stays within
/// `max_before_point` digits before the point and `max_decimals` after it,
/// otherwise returns `before` so the edit is discarded. A leading point is
/// expanded to `0.`.
pub fn check_price_format(
    before: &str,
    after: &str,
    max_before_point: usize,
    max_decimals: usize,
) -> String {
    let after = if after.starts_with('.') {
        format!("0{after}")
    } else {
        after.to_string()
    };

    let mut seen_point = false;
    let mut above = 0;
    let mut below = 0;
    for ch in after.chars() {
        if ch == '.' {
            seen_point = true;
        } else if seen_point {
            below += 1;
            if below > max_decimals {
                return before.to_string();
            }
        } else {
            above += 1;
            if above > max_before_point {
                return before.to_string();
            }
        }
    }
    after
}

/// Pad price text with zeros so it ends in two decimals: `£5` → `£5.00`,
/// `£5.5` → `£5.50`. Text that already has two or more decimals is returned
/// as is.
pub fn pad_price_decimals(text: &str) -> String {
    match text.split_once('.') {
        None => format!("{text}.00"),
        Some((_, decimals)) => match decimals.chars().count() {
            0 => format!("{text}00"),
            1 => format!("{text}0"),
            _ => text.to_string(),
        },
    }
}
