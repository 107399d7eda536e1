use serde::Serialize;

use super::HistoryEntry;

/// Latest price below this share of the average is a real deal.
const GENUINE_DEAL_RATIO: f64 = 0.9;
/// Latest original price above this multiple of the highest price seen is an
/// inflated "was" price.
const SUSPICIOUS_ORIGINAL_RATIO: f64 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DealVerdict {
    GenuineDeal,
    Suspicious,
    Fair,
}

/// Statistics over one product's price history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    pub current: i64,
    pub average: f64,
    pub lowest: i64,
    pub highest: i64,
    pub observations: usize,
    pub verdict: DealVerdict,
}

/// Summarizes `entries` (oldest first). `None` for an empty history.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(entries: &[HistoryEntry]) -> Option<PriceSummary> {
    let latest = entries.last()?;
    let lowest = entries.iter().map(|e| e.price).min()?;
    let highest = entries.iter().map(|e| e.price).max()?;
    let total: i64 = entries.iter().map(|e| e.price).sum();
    let average = total as f64 / entries.len() as f64;

    let verdict = if (latest.price as f64) < average * GENUINE_DEAL_RATIO {
        DealVerdict::GenuineDeal
    } else if latest
        .original_price
        .is_some_and(|original| original as f64 > highest as f64 * SUSPICIOUS_ORIGINAL_RATIO)
    {
        DealVerdict::Suspicious
    } else {
        DealVerdict::Fair
    };

    Some(PriceSummary {
        current: latest.price,
        average: (average * 100.0).round() / 100.0,
        lowest,
        highest,
        observations: entries.len(),
        verdict,
    })
}
