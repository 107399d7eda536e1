use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use kartowl_core::{Marketplace, Product};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{page_html, results_ready, Extractor, ScraperSettings, Timings};
use crate::browser::Session;
use crate::dom::{absolutize, attr, image_url, is_struck, selector, text_of};
use crate::error::ScraperError;
use crate::parse::{all_prices, collapse_whitespace, paren_count, parse_rating, reviews_word_count};

const ORIGIN: &str = "https://telemart.pk";
const SEARCH_BOX: &str = "#search-box";
const PRODUCT_LINKS: &str =
    r#"a[href^="/"][href*="-"], a[href^="https://telemart.pk/"][href*="-"]"#;
const MAX_LINKS: usize = 15;
const MIN_SLUG_LEN: usize = 6;
const MIN_TITLE_LEN: usize = 5;
/// Numbers at or below this are ratings, percentages or counts, not prices.
const MIN_PLAUSIBLE_PRICE: i64 = 30;

const EXCLUDED_HREF_PARTS: [&str; 4] = ["#", "/cart", "/account", "/wishlist"];
const NAV_TITLE_WORDS: [&str; 2] = ["Home", "Category"];

const TIMINGS: Timings = Timings {
    navigation: Duration::from_secs(30),
    results: Duration::from_secs(15),
    scroll_steps: 0,
    scroll_pause: Duration::ZERO,
    settle: Duration::ZERO,
};
const SEARCH_BOX_TIMEOUT: Duration = Duration::from_secs(10);
const SUBMIT_SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| selector(PRODUCT_LINKS));
static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h3, h4, h5, h6"));
static ANY_SEL: LazyLock<Selector> = LazyLock::new(|| selector("*"));
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| selector("img"));

static OFF_BADGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[0-9]+\s*%\s*OFF").expect("valid regex"));
static RATING_FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9.]+\s*[0-9]*\s*Ratings?\s*&?\s*Reviews?").expect("valid regex")
});
static PRICE_FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Rs\.\s*[0-9,]+").expect("valid regex"));

/// Telemart has no stable search URL: the query goes through the search box
/// on the home page, and result cards are found through their product links.
pub struct TelemartExtractor {
    settings: ScraperSettings,
    timings: Timings,
}

impl TelemartExtractor {
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
impl Extractor for TelemartExtractor {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Telemart
    }

    async fn extract(
        &self,
        query: &str,
        session: &dyn Session,
    ) -> Result<Vec<Product>, ScraperError> {
        self.settings.jitter().await;
        session.goto(ORIGIN, self.timings.navigation).await?;

        if !results_ready(session, Marketplace::Telemart, SEARCH_BOX, SEARCH_BOX_TIMEOUT).await {
            return Ok(Vec::new());
        }
        if let Err(e) = session.submit_search(SEARCH_BOX, query).await {
            tracing::warn!(
                marketplace = %Marketplace::Telemart,
                error = %e,
                "search form submit failed"
            );
            return Ok(Vec::new());
        }
        if let Err(e) = session.wait_for_network_idle(SUBMIT_SETTLE_TIMEOUT).await {
            tracing::debug!(
                marketplace = %Marketplace::Telemart,
                error = %e,
                "results page still busy; reading anyway"
            );
        }

        let ready = results_ready(
            session,
            Marketplace::Telemart,
            PRODUCT_LINKS,
            self.timings.results,
        )
        .await;
        if !ready {
            return Ok(Vec::new());
        }
        let Some(html) = page_html(session, Marketplace::Telemart).await else {
            return Ok(Vec::new());
        };

        let products = parse_results(&html);
        tracing::debug!(
            marketplace = %Marketplace::Telemart,
            query,
            count = products.len(),
            "cards parsed"
        );
        Ok(products)
    }
}

fn parse_results(html: &str) -> Vec<Product> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();

    doc.select(&LINK_SEL)
        .filter_map(|link| {
            let href = attr(link, "href")?;
            is_product_href(&href).then(|| (link, absolutize(&href, ORIGIN)))
        })
        .filter(|(_, url)| seen.insert(url.clone()))
        .take(MAX_LINKS)
        .filter_map(|(link, url)| parse_card(link, url))
        .collect()
}

/// Drops navigation links and short category slugs like `/phones`.
fn is_product_href(href: &str) -> bool {
    if EXCLUDED_HREF_PARTS.iter().any(|part| href.contains(part)) {
        return false;
    }
    let path = href.strip_prefix(ORIGIN).unwrap_or(href);
    path.split('/')
        .nth(1)
        .is_some_and(|segment| segment.len() >= MIN_SLUG_LEN)
}

fn parse_card(link: ElementRef<'_>, product_url: String) -> Option<Product> {
    let title = clean_title(
        &link
            .select(&HEADING_SEL)
            .next()
            .map_or_else(|| text_of(link), text_of),
    );
    if title.len() < MIN_TITLE_LEN || NAV_TITLE_WORDS.iter().any(|w| title.contains(w)) {
        return None;
    }

    let container = card_container(link);
    let (current, original) = prices(container);
    if current == 0 {
        return None;
    }

    let text = text_of(container);
    let image = container
        .select(&IMG_SEL)
        .next()
        .and_then(image_url)
        .map(|src| absolutize(&src, ORIGIN));

    let product = Product::new(Marketplace::Telemart, title, current, product_url)
        .with_original_price((original > 0).then_some(original))
        .with_image(image)
        .with_rating(parse_rating(&text))
        .with_reviews(paren_count(&text).or_else(|| reviews_word_count(&text)));

    let in_stock = original > 0 && product.original_price != Some(product.current_price);
    Some(product.with_in_stock(in_stock))
}

/// Strips badge, rating and price fragments that share the link text.
fn clean_title(raw: &str) -> String {
    let title = collapse_whitespace(raw);
    let title = OFF_BADGE_RE.replace_all(&title, "");
    let title = RATING_FRAGMENT_RE.replace_all(&title, "");
    let title = PRICE_FRAGMENT_RE.replace_all(&title, "");
    collapse_whitespace(&title)
}

/// Nearest enclosing `div`, else the parent element, else the link itself.
fn card_container(link: ElementRef<'_>) -> ElementRef<'_> {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")
        .or_else(|| link.parent().and_then(ElementRef::wrap))
        .unwrap_or(link)
}

/// Returns `(current, original)`, either zero when not found.
///
/// Struck prices feed the original (largest wins). Elsewhere the largest
/// plausible first number is the current price, and a second number in the
/// same element is taken as the original when none was struck.
fn prices(container: ElementRef<'_>) -> (i64, i64) {
    let mut current = 0;
    let mut original = 0;

    for el in container.select(&ANY_SEL) {
        let text = text_of(el);
        if !(text.contains("Rs") || text.contains("PKR")) || text.contains("OFF") {
            continue;
        }
        let numbers = all_prices(&text);
        let Some(&first) = numbers.first() else {
            continue;
        };

        if is_struck(el) {
            original = original.max(first);
            continue;
        }
        if first > current && first > MIN_PLAUSIBLE_PRICE {
            current = first;
        }
        if original == 0 {
            if let Some(&second) = numbers.get(1) {
                if second > MIN_PLAUSIBLE_PRICE {
                    original = second;
                }
            }
        }
    }

    (current, original)
}
