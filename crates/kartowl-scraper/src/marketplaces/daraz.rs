use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use kartowl_core::{Marketplace, Product};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{
    encode_query, page_html, results_ready, scroll_to_load, Extractor, ScraperSettings, Timings,
};
use crate::browser::Session;
use crate::dom::{absolutize, attr, image_url, is_struck, selector, text_of};
use crate::error::ScraperError;
use crate::parse::{paren_count, parse_price, sold_text};

const ORIGIN: &str = "https://www.daraz.pk";
const CARD: &str = r#"[data-qa-locator="product-item"]"#;
const MAX_CARDS: usize = 20;

const TIMINGS: Timings = Timings {
    navigation: Duration::from_secs(45),
    results: Duration::from_secs(15),
    scroll_steps: 3,
    scroll_pause: Duration::from_secs(1),
    settle: Duration::from_secs(2),
};

static CARD_SEL: LazyLock<Selector> = LazyLock::new(|| selector(CARD));
static TITLE_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| selector("a[title]"));
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static SPAN_SEL: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static DEL_SEL: LazyLock<Selector> = LazyLock::new(|| selector("del"));

/// CDN thumbnail suffixes (`_200x200q80.jpg_.webp`) that shrink the image.
static THUMB_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\d+x\d+.*$").expect("valid regex"));
static WEBP_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\.webp$").expect("valid regex"));

/// Daraz catalog search. Results lazy-load, so the page is scrolled before
/// it is read.
pub struct DarazExtractor {
    settings: ScraperSettings,
    timings: Timings,
}

impl DarazExtractor {
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
impl Extractor for DarazExtractor {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Daraz
    }

    async fn extract(
        &self,
        query: &str,
        session: &dyn Session,
    ) -> Result<Vec<Product>, ScraperError> {
        let url = format!("{ORIGIN}/catalog/?q={}", encode_query(query));

        self.settings.jitter().await;
        session.goto(&url, self.timings.navigation).await?;
        scroll_to_load(session, Marketplace::Daraz, &self.timings).await;

        if !results_ready(session, Marketplace::Daraz, CARD, self.timings.results).await {
            return Ok(Vec::new());
        }
        let Some(html) = page_html(session, Marketplace::Daraz).await else {
            return Ok(Vec::new());
        };

        let products = parse_results(&html);
        tracing::debug!(
            marketplace = %Marketplace::Daraz,
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
    let title_link = card.select(&TITLE_LINK_SEL).next();
    let img = card.select(&IMG_SEL).next();

    let title = title_link
        .and_then(|a| attr(a, "title"))
        .or_else(|| img.and_then(|i| attr(i, "alt")))?;

    let href = title_link
        .and_then(|a| attr(a, "href"))
        .or_else(|| card.select(&LINK_SEL).next().and_then(|a| attr(a, "href")))?;

    let current = card
        .select(&SPAN_SEL)
        .filter(|span| !is_struck(*span))
        .map(text_of)
        .filter(|text| text.contains("Rs."))
        .find_map(|text| parse_price(&text).filter(|p| *p > 0))?;

    let original = card
        .select(&DEL_SEL)
        .next()
        .map(text_of)
        .filter(|text| text.contains("Rs."))
        .and_then(|text| parse_price(&text));

    let card_text = text_of(card);

    Some(
        Product::new(Marketplace::Daraz, title, current, absolutize(&href, ORIGIN))
            .with_original_price(original)
            .with_image(img.and_then(image_url).map(|src| full_size_image(&src)))
            .with_reviews(paren_count(&card_text))
            .with_sold(Some(sold_text(&card_text).unwrap_or_else(|| "0 Sold".to_string())))
            .with_in_stock(true),
    )
}

fn full_size_image(src: &str) -> String {
    let src = absolutize(src, ORIGIN);
    let src = THUMB_SUFFIX_RE.replace(&src, "");
    WEBP_SUFFIX_RE.replace(&src, "").into_owned()
}
