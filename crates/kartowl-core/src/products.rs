use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// One of the fixed external marketplaces searched for every query.
///
/// Declaration order is the canonical source order: it drives the ranker's
/// round-robin and the per-source trending queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    Daraz,
    PriceOye,
    Telemart,
    Olx,
}

impl Marketplace {
    pub const ALL: [Marketplace; 4] = [
        Marketplace::Daraz,
        Marketplace::PriceOye,
        Marketplace::Telemart,
        Marketplace::Olx,
    ];

    /// Wire and storage identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Marketplace::Daraz => "daraz",
            Marketplace::PriceOye => "priceoye",
            Marketplace::Telemart => "telemart",
            Marketplace::Olx => "olx",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Marketplace::Daraz => "Daraz",
            Marketplace::PriceOye => "PriceOye",
            Marketplace::Telemart => "Telemart",
            Marketplace::Olx => "OLX",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marketplace {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daraz" => Ok(Marketplace::Daraz),
            "priceoye" => Ok(Marketplace::PriceOye),
            "telemart" => Ok(Marketplace::Telemart),
            "olx" => Ok(Marketplace::Olx),
            other => Err(CoreError::UnknownMarketplace(other.to_string())),
        }
    }
}

/// A single search hit, normalized from one marketplace's markup.
///
/// Prices are whole rupees. `original_price`, when present, is never lower
/// than `current_price`; use [`Product::with_original_price`] to set it so the
/// discount stays consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub current_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<i64>,
    pub discount: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub marketplace: Marketplace,
    pub product_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_text: Option<String>,
    pub in_stock: bool,
}

impl Product {
    /// Creates a product with a fresh local id, no original price, zero
    /// discount and `in_stock = true`.
    pub fn new(
        marketplace: Marketplace,
        title: impl Into<String>,
        current_price: i64,
        product_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            title: title.into(),
            current_price,
            original_price: None,
            discount: 0,
            image: None,
            marketplace,
            product_url: product_url.into(),
            rating: None,
            reviews: None,
            sold: None,
            location: None,
            price_text: None,
            in_stock: true,
        }
    }

    /// Sets the strikethrough price and recomputes the discount.
    ///
    /// A missing, zero, or lower-than-current original collapses to the
    /// current price, giving a zero discount.
    #[must_use]
    pub fn with_original_price(mut self, original: Option<i64>) -> Self {
        let original = reconcile_original_price(self.current_price, original);
        self.discount = discount_percent(original, self.current_price);
        self.original_price = Some(original);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image.filter(|s| !s.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_rating(mut self, rating: Option<f64>) -> Self {
        self.rating = rating.filter(|r| r.is_finite()).map(|r| r.clamp(0.0, 5.0));
        self
    }

    #[must_use]
    pub fn with_reviews(mut self, reviews: Option<u32>) -> Self {
        self.reviews = reviews;
        self
    }

    #[must_use]
    pub fn with_sold(mut self, sold: Option<String>) -> Self {
        self.sold = sold;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn with_price_text(mut self, price_text: Option<String>) -> Self {
        self.price_text = price_text;
        self
    }

    #[must_use]
    pub fn with_in_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = in_stock;
        self
    }

    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Returns the original price to report for a card whose current price is
/// `current`.
///
/// Anything that would make the original lower than the current price
/// (absent, zero, misparsed) falls back to `current`.
#[must_use]
pub fn reconcile_original_price(current: i64, original: Option<i64>) -> i64 {
    match original {
        Some(original) if original >= current => original,
        _ => current,
    }
}

/// Percentage off `original`, rounded to the nearest whole percent.
///
/// Zero whenever `original <= current`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn discount_percent(original: i64, current: i64) -> u8 {
    if original <= current || original <= 0 {
        return 0;
    }
    let pct = ((original - current) as f64 / original as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
