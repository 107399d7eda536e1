use std::sync::LazyLock;

use regex::Regex;

use super::SearchError;

pub(crate) const MIN_QUERY_CHARS: usize = 2;
pub(crate) const MAX_QUERY_CHARS: usize = 100;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static JS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("valid regex"));
static INLINE_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+=").expect("valid regex"));
static FORBIDDEN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>"'`;(){}\[\]]"#).expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strips markup and injection fragments from a raw query and checks its
/// length.
///
/// # Errors
///
/// Returns [`SearchError`] when the cleaned query is shorter than 2 or
/// longer than 100 characters.
pub fn sanitize_query(raw: &str) -> Result<String, SearchError> {
    let cleaned = HTML_TAG.replace_all(raw.trim(), "");
    let cleaned = JS_SCHEME.replace_all(&cleaned, "");
    let cleaned = INLINE_HANDLER.replace_all(&cleaned, "");
    let cleaned = FORBIDDEN_CHARS.replace_all(&cleaned, "");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ").trim().to_string();

    match cleaned.chars().count() {
        n if n < MIN_QUERY_CHARS => Err(SearchError::QueryTooShort {
            min: MIN_QUERY_CHARS,
        }),
        n if n > MAX_QUERY_CHARS => Err(SearchError::QueryTooLong {
            max: MAX_QUERY_CHARS,
        }),
        _ => Ok(cleaned),
    }
}
