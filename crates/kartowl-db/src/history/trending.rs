use std::collections::HashSet;

use kartowl_core::Product;
use rand::seq::SliceRandom;
use rand::Rng;

use super::HistoryEntry;

/// Only entries with a discount strictly above this are trending.
pub(crate) const MIN_DISCOUNT: i32 = 5;
pub(crate) const PER_SOURCE_LIMIT: usize = 5;
pub(crate) const MAX_TRENDING: usize = 20;

/// Shuffles the per-source candidates, keeps the first entry per URL, caps
/// the list and projects each survivor into the product shape.
pub(crate) fn assemble<R: Rng + ?Sized>(
    mut candidates: Vec<HistoryEntry>,
    rng: &mut R,
) -> Vec<Product> {
    candidates.shuffle(rng);

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|e| seen.insert(e.product_url.clone()))
        .take(MAX_TRENDING)
        .map(into_product)
        .collect()
}

/// Stock state is not recorded, so every projected product is in stock. The
/// stored discount wins over one recomputed from the prices.
fn into_product(entry: HistoryEntry) -> Product {
    let mut product = Product::new(
        entry.marketplace,
        entry.product_title,
        entry.price,
        entry.product_url,
    )
    .with_original_price(entry.original_price)
    .with_image(entry.image_url)
    .with_in_stock(true);
    product.id = entry.id.simple().to_string();
    if let Some(discount) = entry.discount.and_then(|d| u8::try_from(d).ok()) {
        product.discount = discount;
    }
    product
}
