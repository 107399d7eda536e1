use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use kartowl_core::{Marketplace, Product};
use scraper::{ElementRef, Html, Selector};

use super::{encode_query, page_html, results_ready, Extractor, ScraperSettings, Timings};
use crate::browser::Session;
use crate::dom::{absolutize, attr, first_text, image_url, lines_of, selector, text_of};
use crate::error::ScraperError;
use crate::parse::parse_lac_price;

const ORIGIN: &str = "https://www.olx.com.pk";
const RESULTS: &str = r#"li[aria-label="Listing"], li article"#;
const MAX_LISTINGS: usize = 15;
const DEFAULT_LOCATION: &str = "Pakistan";
const MAJOR_CITIES: [&str; 6] = [
    "Lahore",
    "Karachi",
    "Islamabad",
    "Rawalpindi",
    "Multan",
    "Peshawar",
];

const TIMINGS: Timings = Timings {
    navigation: Duration::from_secs(30),
    results: Duration::from_secs(10),
    scroll_steps: 0,
    scroll_pause: Duration::ZERO,
    settle: Duration::ZERO,
};

static CARD_SEL: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"li[aria-label="Listing"], li article, .listing-card"#)
});
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| selector(r#"[aria-label="Title"]"#));
static H2_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h2"));
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static LOCATION_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[aria-label="Location"]"#));

/// OLX classifieds. Listings are second-hand: there is no struck price,
/// prices may be written in lakhs, and each card carries a location.
pub struct OlxExtractor {
    settings: ScraperSettings,
    timings: Timings,
}

impl OlxExtractor {
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
impl Extractor for OlxExtractor {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Olx
    }

    async fn extract(
        &self,
        query: &str,
        session: &dyn Session,
    ) -> Result<Vec<Product>, ScraperError> {
        let url = format!("{ORIGIN}/items/q-{}", encode_query(query));

        self.settings.jitter().await;
        session.goto(&url, self.timings.navigation).await?;

        if !results_ready(session, Marketplace::Olx, RESULTS, self.timings.results).await {
            return Ok(Vec::new());
        }
        let Some(html) = page_html(session, Marketplace::Olx).await else {
            return Ok(Vec::new());
        };

        let products = parse_results(&html);
        tracing::debug!(
            marketplace = %Marketplace::Olx,
            query,
            count = products.len(),
            "listings parsed"
        );
        Ok(products)
    }
}

fn parse_results(html: &str) -> Vec<Product> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();

    doc.select(&CARD_SEL)
        .filter_map(parse_card)
        .filter(|p| seen.insert(p.product_url.clone()))
        .take(MAX_LISTINGS)
        .collect()
}

fn parse_card(card: ElementRef<'_>) -> Option<Product> {
    let text = text_of(card);
    if is_delivery_promo(&text) {
        return None;
    }

    let link = card.select(&LINK_SEL).next()?;
    let href = attr(link, "href")?;
    let img = card.select(&IMG_SEL).next();

    let title = first_text(card, &TITLE_SEL)
        .or_else(|| first_text(card, &H2_SEL))
        .or_else(|| attr(link, "title"))
        .or_else(|| img.and_then(|i| attr(i, "alt")))?;

    let (price, price_text) = parse_lac_price(&text)?;
    if price <= 0 {
        return None;
    }

    Some(
        Product::new(Marketplace::Olx, title, price, absolutize(&href, ORIGIN))
            .with_image(img.and_then(image_url).map(|src| absolutize(&src, ORIGIN)))
            .with_location(Some(location(card)))
            .with_price_text(Some(price_text))
            .with_in_stock(true),
    )
}

/// "Buy with delivery" carousels mix shop items into the listing grid.
fn is_delivery_promo(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("buy with delivery") || (lower.contains("delivery") && lower.contains("buy"))
}

fn location(card: ElementRef<'_>) -> String {
    if let Some(loc) = first_text(card, &LOCATION_SEL) {
        return loc;
    }
    let lines = lines_of(card);
    if lines.len() > 2 {
        if let Some(line) = lines
            .into_iter()
            .find(|line| MAJOR_CITIES.iter().any(|city| line.contains(city)))
        {
            return line;
        }
    }
    DEFAULT_LOCATION.to_string()
}
