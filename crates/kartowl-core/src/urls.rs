use url::Url;

/// Query parameters that only carry attribution and never identify a product.
const TRACKING_PARAMS: [&str; 6] = ["click_id", "gclid", "fbclid", "source", "spm", "scm"];

/// Hosts whose product pages are fully identified by the path; every query
/// parameter on them is session or tracking noise.
const PATH_ONLY_HOSTS: [&str; 1] = ["daraz.pk"];

/// Canonical form of a product URL, used as the price-history key.
///
/// Forces `https`, drops known tracking parameters, and drops the whole query
/// for path-only hosts. Unparseable input is returned trimmed but otherwise
/// untouched. Idempotent.
#[must_use]
pub fn canonicalize_product_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    if url.scheme() == "http" {
        // http -> https is always permitted for special schemes.
        let _ = url.set_scheme("https");
    }

    if is_path_only_host(&url) {
        url.set_query(None);
    } else if let Some(query) = url.query() {
        // Filter the raw segments so kept values keep their exact encoding.
        let kept = query
            .split('&')
            .filter(|segment| !is_tracking_segment(segment))
            .collect::<Vec<_>>()
            .join("&");
        let stripped = query.len() != kept.len();

        if kept.is_empty() && stripped {
            url.set_query(None);
        } else if stripped {
            url.set_query(Some(&kept));
        }
    }

    url.into()
}

fn is_tracking_segment(segment: &str) -> bool {
    let key = segment.split_once('=').map_or(segment, |(key, _)| key);
    TRACKING_PARAMS.contains(&key)
}

fn is_path_only_host(url: &Url) -> bool {
    url.host_str().is_some_and(|host| {
        PATH_ONLY_HOSTS
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{h}")))
    })
}
