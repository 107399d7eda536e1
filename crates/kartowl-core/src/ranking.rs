//! Quality scoring and the diversity-first merge of per-marketplace results.
//!
//! The merge runs in two phases. Phase one deals the top [`PHASE_ONE_DEPTH`]
//! ranks of every source round-robin so the head of the list always shows
//! each marketplace. Phase two drains what is left in clusters of
//! [`CLUSTER_SIZE`] per source, rotating until every source is empty.

use std::collections::VecDeque;

use crate::products::Product;

/// Lower bound of the "accessible" price band, inclusive.
pub const ACCESSIBLE_BAND_MIN: i64 = 1_000;
/// Upper bound of the "accessible" price band, inclusive.
pub const ACCESSIBLE_BAND_MAX: i64 = 100_000;

pub const PHASE_ONE_DEPTH: usize = 3;
pub const CLUSTER_SIZE: usize = 2;

const DISCOUNT_CAP: u8 = 50;
const DISCOUNT_WEIGHT: f64 = 0.6;
const REVIEWS_CAP: f64 = 25.0;
const RATING_WEIGHT: f64 = 4.0;

/// Deterministic placement score for a single product. Higher ranks earlier.
///
/// | Signal | Contribution |
/// |--------|--------------|
/// | discount | `min(discount, 50) * 0.6` |
/// | reviews | `min(log10(reviews + 1) * 10, 25)` |
/// | rating | `rating * 4` |
/// | price band | +10 inside `[1 000, 100 000]`, +5 above, 0 below |
/// | in stock | +5 |
/// | image present | +5 |
#[must_use]
pub fn quality_score(product: &Product) -> f64 {
    let mut score = 0.0;

    if product.discount > 0 {
        score += f64::from(product.discount.min(DISCOUNT_CAP)) * DISCOUNT_WEIGHT;
    }

    if let Some(reviews) = product.reviews {
        score += ((f64::from(reviews) + 1.0).log10() * 10.0).min(REVIEWS_CAP);
    }

    if let Some(rating) = product.rating {
        score += rating.clamp(0.0, 5.0) * RATING_WEIGHT;
    }

    let price = product.current_price;
    if (ACCESSIBLE_BAND_MIN..=ACCESSIBLE_BAND_MAX).contains(&price) {
        score += 10.0;
    } else if price > ACCESSIBLE_BAND_MAX {
        score += 5.0;
    }

    if product.in_stock {
        score += 5.0;
    }
    if product.has_image() {
        score += 5.0;
    }

    score
}

/// Merges per-source lists, given in canonical source order, into one
/// ranked sequence.
///
/// Pure: the same input lists always produce the same output order.
#[must_use]
pub fn merge(per_source: Vec<Vec<Product>>) -> Vec<Product> {
    let total = per_source.iter().map(Vec::len).sum();
    let mut queues: Vec<VecDeque<Product>> = per_source
        .into_iter()
        .map(|list| VecDeque::from(sort_by_score(list)))
        .collect();

    let mut merged = Vec::with_capacity(total);

    for _ in 0..PHASE_ONE_DEPTH {
        for queue in &mut queues {
            if let Some(product) = queue.pop_front() {
                merged.push(product);
            }
        }
    }

    while queues.iter().any(|q| !q.is_empty()) {
        for queue in &mut queues {
            for _ in 0..CLUSTER_SIZE {
                match queue.pop_front() {
                    Some(product) => merged.push(product),
                    None => break,
                }
            }
        }
    }

    merged
}

/// Stable descending sort: equal scores keep their scraped order.
fn sort_by_score(list: Vec<Product>) -> Vec<Product> {
    let mut scored: Vec<(f64, Product)> = list
        .into_iter()
        .map(|product| (quality_score(&product), product))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, product)| product).collect()
}
