//! Text-level parsing shared by the marketplace extractors.
//!
//! Every function takes already-extracted card text. Nothing here touches
//! the DOM.

use std::sync::LazyLock;

use regex::Regex;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*").expect("valid regex"));
static PAREN_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d[\d,]*)\)").expect("valid regex"));
static SOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d.]*[kK]?)\s+Sold").expect("valid regex"));
static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-5]\.[0-9]{1,2}").expect("valid regex"));
static REVIEWS_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d,]*)\s*reviews?").expect("valid regex"));
static LAC_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Rs\.?\s*(\d[\d,]*(?:\.\d+)?)(\s*(?:lac|lakh)\b)?").expect("valid regex")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One lakh, the unit OLX uses for large prices ("Rs 1.5 Lac").
pub(crate) const LAKH: f64 = 100_000.0;

fn digits(raw: &str) -> Option<i64> {
    raw.replace(',', "").parse::<i64>().ok()
}

/// First integer in `text`, thousands separators removed.
///
/// `"Rs. 169,500"` gives `Some(169500)`.
pub(crate) fn parse_price(text: &str) -> Option<i64> {
    NUMBER_RE.find(text).and_then(|m| digits(m.as_str()))
}

/// Every integer in `text`, in order of appearance.
pub(crate) fn all_prices(text: &str) -> Vec<i64> {
    NUMBER_RE
        .find_iter(text)
        .filter_map(|m| digits(m.as_str()))
        .collect()
}

/// First count in `text`, e.g. `"1,204 reviews"` gives `Some(1204)`.
pub(crate) fn parse_count(text: &str) -> Option<u32> {
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse::<u32>().ok())
}

/// Count wrapped in parentheses, the review-count convention on several
/// sources: `"4.5 (1,234)"` gives `Some(1234)`.
pub(crate) fn paren_count(text: &str) -> Option<u32> {
    PAREN_COUNT_RE
        .captures(text)
        .and_then(|c| c[1].replace(',', "").parse::<u32>().ok())
}

/// `"N Reviews"` style count.
pub(crate) fn reviews_word_count(text: &str) -> Option<u32> {
    REVIEWS_WORD_RE
        .captures(text)
        .and_then(|c| c[1].replace(',', "").parse::<u32>().ok())
}

/// The whole `"1.2K Sold"` fragment, as displayed.
pub(crate) fn sold_text(text: &str) -> Option<String> {
    SOLD_RE.find(text).map(|m| m.as_str().to_string())
}

/// First `d.dd` rating in `[0, 5]`.
pub(crate) fn parse_rating(text: &str) -> Option<f64> {
    RATING_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Parses a listing price that may be written in lakhs.
///
/// Returns the price in rupees and the matched text, so callers can keep the
/// original wording. `"Rs 1.5 Lac"` gives `(150000, "Rs 1.5 Lac")`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn parse_lac_price(text: &str) -> Option<(i64, String)> {
    let caps = LAC_PRICE_RE.captures(text)?;
    let raw = caps.get(0)?.as_str().trim().to_string();
    let number = caps[1].replace(',', "");

    let price = if caps.get(2).is_some() {
        (number.parse::<f64>().ok()? * LAKH).round() as i64
    } else {
        // Plain rupee amounts never carry decimals worth keeping.
        let whole = number.split('.').next().unwrap_or_default();
        whole.parse::<i64>().ok()?
    };

    Some((price, raw))
}

/// Collapses every whitespace run to one space and trims.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
