//! Small DOM helpers over `scraper::ElementRef`.

use scraper::{ElementRef, Selector};

use crate::parse::collapse_whitespace;

/// Attributes checked for a real image URL, lazy-load first.
const IMAGE_ATTRS: [&str; 4] = ["data-ks-lazyload", "data-src", "data-original", "src"];

const STRUCK_TAGS: [&str; 3] = ["del", "s", "strike"];

/// Builds a selector from a compile-time constant.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// All descendant text with whitespace collapsed.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Non-empty text lines of the element, one per text node.
pub(crate) fn lines_of(el: ElementRef<'_>) -> Vec<String> {
    el.text()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Collapsed text of the first descendant matching `sel`, if non-empty.
pub(crate) fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
}

/// Trimmed attribute value, if present and non-empty.
pub(crate) fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// Best image URL on `img`: lazy-load attributes before `src`, inline
/// `data:` placeholders ignored.
pub(crate) fn image_url(img: ElementRef<'_>) -> Option<String> {
    IMAGE_ATTRS
        .iter()
        .filter_map(|name| attr(img, name))
        .find(|v| !v.starts_with("data:"))
}

/// Makes `href` absolute against `origin` (scheme + host, no trailing slash).
pub(crate) fn absolutize(href: &str, origin: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}

/// `true` if the element or any ancestor is a strikethrough tag.
pub(crate) fn is_struck(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|e| STRUCK_TAGS.contains(&e.value().name()))
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        doc.select(&selector(css)).next().unwrap()
    }

    #[test]
    fn text_of_collapses_nested_whitespace() {
        let doc = Html::parse_fragment("<div> Galaxy\n <b>A15</b>   128GB </div>");
        assert_eq!(text_of(first(&doc, "div")), "Galaxy A15 128GB");
    }

    #[test]
    fn lines_of_skips_blank_nodes() {
        let doc = Html::parse_fragment("<li><span>Rs 45,000</span> <span>Lahore</span></li>");
        assert_eq!(lines_of(first(&doc, "li")), vec!["Rs 45,000", "Lahore"]);
    }

    #[test]
    fn image_prefers_lazy_attribute() {
        let doc = Html::parse_fragment(
            r#"<img src="data:image/gif;base64,R0l" data-src="https://img.example/p.jpg">"#,
        );
        assert_eq!(
            image_url(first(&doc, "img")).as_deref(),
            Some("https://img.example/p.jpg")
        );
    }

    #[test]
    fn image_placeholder_only_is_none() {
        let doc = Html::parse_fragment(r#"<img src="data:image/gif;base64,R0l">"#);
        assert!(image_url(first(&doc, "img")).is_none());
    }

    #[test]
    fn absolutize_handles_each_form() {
        let origin = "https://telemart.pk";
        assert_eq!(absolutize("//cdn.pk/a.jpg", origin), "https://cdn.pk/a.jpg");
        assert_eq!(absolutize("/galaxy-a15", origin), "https://telemart.pk/galaxy-a15");
        assert_eq!(absolutize("galaxy-a15", origin), "https://telemart.pk/galaxy-a15");
        assert_eq!(absolutize("https://x.pk/a", origin), "https://x.pk/a");
    }

    #[test]
    fn struck_detects_ancestor() {
        let doc = Html::parse_fragment(
            "<p><del><span>Rs. 52,000</span></del><span>Rs. 45,000</span></p>",
        );
        let spans: Vec<_> = doc.select(&selector("span")).collect();
        assert!(is_struck(spans[0]));
        assert!(!is_struck(spans[1]));
    }
}
