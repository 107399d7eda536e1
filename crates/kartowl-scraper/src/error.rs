use chromiumoxide::error::CdpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("browser protocol error: {0}")]
    Cdp(Box<CdpError>),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },
}

impl ScraperError {
    /// `true` for a bounded wait that expired rather than a broken session.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScraperError::Timeout { .. })
    }
}

impl From<CdpError> for ScraperError {
    fn from(err: CdpError) -> Self {
        ScraperError::Cdp(Box::new(err))
    }
}
