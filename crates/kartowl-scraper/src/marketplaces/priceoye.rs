use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use kartowl_core::{Marketplace, Product};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{encode_query, page_html, results_ready, Extractor, ScraperSettings, Timings};
use crate::browser::Session;
use crate::dom::{absolutize, attr, first_text, image_url, selector, text_of};
use crate::error::ScraperError;
use crate::parse::{parse_count, parse_price, reviews_word_count};

const ORIGIN: &str = "https://priceoye.pk";
const RESULTS: &str = ".product-list";
const MAX_CARDS: usize = 15;
const MAX_STARS: usize = 5;

const TIMINGS: Timings = Timings {
    navigation: Duration::from_secs(30),
    results: Duration::from_secs(10),
    scroll_steps: 0,
    scroll_pause: Duration::ZERO,
    settle: Duration::ZERO,
};

static CARD_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(".product-list .p-item, .product-list .productBox"));
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".p-title, .product-title"));
static AMP_IMG_SEL: LazyLock<Selector> = LazyLock::new(|| selector("amp-img"));
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static PRICE_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".price-box"));
static PRICE_DIFF_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".price-diff"));
static RATING_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".user-rating-content"));
static STAR_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".stars i, .stars img"));
static REVIEW_COUNT_SEL: LazyLock<Selector> = LazyLock::new(|| selector("span.rating-h7.bold"));
static RATING_BOX_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".user-rating-box"));
static OUT_OF_STOCK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"img[src*="out-of-stock"], img[alt*="out of stock"], [class*="out-of-stock"]"#)
});

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

/// PriceOye search. Listings without a struck price are reported out of
/// stock.
pub struct PriceOyeExtractor {
    settings: ScraperSettings,
    timings: Timings,
}

impl PriceOyeExtractor {
    #[must_use]
    pub fn new(settings: ScraperSettings) -> Self {
        Self {
            settings,
            timings: TIMINGS,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_timings(settings: ScraperSettings, timings: Timings) -> Self {
        Self { settings, timings }
    }
}

#[async_trait]
impl Extractor for PriceOyeExtractor {
    fn marketplace(&self) -> Marketplace {
        Marketplace::PriceOye
    }

    async fn extract(
        &self,
        query: &str,
        session: &dyn Session,
    ) -> Result<Vec<Product>, ScraperError> {
        let url = format!("{ORIGIN}/search?q={}", encode_query(query));

        self.settings.jitter().await;
        session.goto(&url, self.timings.navigation).await?;

        if !results_ready(session, Marketplace::PriceOye, RESULTS, self.timings.results).await {
            return Ok(Vec::new());
        }
        let Some(html) = page_html(session, Marketplace::PriceOye).await else {
            return Ok(Vec::new());
        };

        let products = parse_results(&html);
        tracing::debug!(
            marketplace = %Marketplace::PriceOye,
            query,
            count = products.len(),
            "cards parsed"
        );
        Ok(products)
    }
}

fn parse_results(html: &str) -> Vec<Product> {
    let doc = Html::parse_document(html);
    doc.select(&CARD_SEL)
        .take(MAX_CARDS)
        .filter_map(parse_card)
        .collect()
}

fn parse_card(card: ElementRef<'_>) -> Option<Product> {
    let href = card
        .select(&LINK_SEL)
        .next()
        .and_then(|a| attr(a, "href"))?;
    let img = card.select(&IMG_SEL).next();

    let title = first_text(card, &TITLE_SEL).or_else(|| img.and_then(|i| attr(i, "alt")))?;

    let current = first_text(card, &PRICE_SEL)
        .and_then(|t| parse_price(&t))
        .filter(|p| *p > 0)?;

    let price_diff = card.select(&PRICE_DIFF_SEL).next();
    let original = price_diff.map(text_of).and_then(|t| parse_price(&t));

    let image = card
        .select(&AMP_IMG_SEL)
        .next()
        .and_then(|amp| attr(amp, "src"))
        .or_else(|| img.and_then(image_url))
        .map(|src| absolutize(&src, ORIGIN));

    let out_of_stock_marker = card.select(&OUT_OF_STOCK_SEL).next().is_some();

    let product = Product::new(Marketplace::PriceOye, title, current, absolutize(&href, ORIGIN))
        .with_original_price(original)
        .with_image(image)
        .with_rating(rating(card))
        .with_reviews(reviews(card));

    let prices_equal = product.original_price == Some(product.current_price);
    let in_stock = price_diff.is_some() && !out_of_stock_marker && !prices_equal;
    Some(product.with_in_stock(in_stock))
}

/// Numeric rating, else the number of star icons.
#[allow(clippy::cast_precision_loss)]
fn rating(card: ElementRef<'_>) -> Option<f64> {
    let numeric = first_text(card, &RATING_SEL)
        .and_then(|t| DECIMAL_RE.find(&t).and_then(|m| m.as_str().parse::<f64>().ok()))
        .filter(|r| *r > 0.0);
    if numeric.is_some() {
        return numeric;
    }

    let stars = card.select(&STAR_SEL).count();
    (stars > 0).then(|| stars.min(MAX_STARS) as f64)
}

fn reviews(card: ElementRef<'_>) -> Option<u32> {
    first_text(card, &REVIEW_COUNT_SEL)
        .and_then(|t| parse_count(&t))
        .filter(|n| *n > 0)
        .or_else(|| first_text(card, &RATING_BOX_SEL).and_then(|t| reviews_word_count(&t)))
}
