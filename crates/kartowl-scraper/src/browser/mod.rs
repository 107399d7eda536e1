//! Browser sessions: the capability extractors drive, and the scoped guard
//! that guarantees every session is closed.
//!
//! [`Session`] is the narrow surface an extractor needs from a page. The
//! production implementation lives in [`chrome`]; tests drive extractors
//! through a fixture-backed fake.

mod chrome;
#[cfg(test)]
pub(crate) mod fake;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kartowl_core::AppConfig;

use crate::error::ScraperError;

pub use chrome::{BrowserSessionManager, BrowserStatus};

pub(crate) const DEFAULT_VIEWPORT: (u32, u32) = (1366, 768);

/// Launch settings for the shared browser process.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub launch_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            user_agent: kartowl_core::config::DEFAULT_USER_AGENT.to_string(),
            viewport_width: DEFAULT_VIEWPORT.0,
            viewport_height: DEFAULT_VIEWPORT.1,
            launch_timeout: Duration::from_secs(30),
        }
    }
}

impl BrowserSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            executable: config.browser_executable.clone(),
            headless: config.browser_headless,
            user_agent: config.scraper_user_agent.clone(),
            launch_timeout: Duration::from_secs(config.browser_launch_timeout_secs),
            ..Self::default()
        }
    }
}

/// One isolated browsing context plus a single page inside it.
///
/// Every wait is bounded by the timeout the caller passes in.
#[async_trait]
pub trait Session: Send + Sync {
    /// Navigates and waits for the load event.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Navigation`] if the page fails to load within `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), ScraperError>;

    /// Polls until `selector` matches at least one element.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Timeout`] if nothing matches within `timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), ScraperError>;

    /// Waits for an in-flight navigation (e.g. after a form submit) to settle.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Timeout`] if the page does not settle within `timeout`.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ScraperError>;

    /// Scrolls the viewport down by `pixels` to trigger lazy loading.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the page rejects the script.
    async fn scroll_by(&self, pixels: u32) -> Result<(), ScraperError>;

    /// Types `text` into the input matched by `input_selector` and presses Enter.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::ElementNotFound`] if the input is missing.
    async fn submit_search(&self, input_selector: &str, text: &str) -> Result<(), ScraperError>;

    /// Serialized DOM of the current page.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the page cannot be read.
    async fn content(&self) -> Result<String, ScraperError>;

    /// Closes the page and disposes its context. Never touches the shared browser.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the browser rejects the close.
    async fn close(&self) -> Result<(), ScraperError>;
}

/// Hands out fresh isolated sessions.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError::BrowserUnavailable`] when no browser is running.
    async fn new_session(&self) -> Result<SessionGuard, ScraperError>;
}

/// Owns a session until it is closed.
///
/// Call [`SessionGuard::close`] on the normal path. If the guard is dropped
/// without closing (early return, panic unwinding) the close is scheduled on
/// the current runtime so the context is still released.
pub struct SessionGuard {
    session: Arc<dyn Session>,
    closed: bool,
}

impl SessionGuard {
    #[must_use]
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    #[must_use]
    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    /// Closes the session. Failures are logged; the context is considered gone.
    pub async fn close(mut self) {
        self.closed = true;
        if let Err(e) = self.session.close().await {
            tracing::warn!(error = %e, "failed to close browser session");
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let session = Arc::clone(&self.session);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!(error = %e, "deferred session close failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("session dropped outside a runtime; context left open");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeSession;
    use super::*;

    #[tokio::test]
    async fn explicit_close_closes_once() {
        let fake = Arc::new(FakeSession::new("<html></html>"));
        let guard = SessionGuard::new(fake.clone());
        guard.close().await;
        tokio::task::yield_now().await;
        assert_eq!(fake.close_count(), 1);
    }

    #[tokio::test]
    async fn dropped_guard_schedules_close() {
        let fake = Arc::new(FakeSession::new("<html></html>"));
        {
            let _guard = SessionGuard::new(fake.clone());
        }
        for _ in 0..10 {
            if fake.close_count() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(fake.close_count(), 1);
    }

    #[test]
    fn settings_follow_app_config() {
        let config = AppConfig {
            database_url: None,
            env: kartowl_core::Environment::Test,
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            log_level: "info".to_string(),
            cors_origins: Vec::new(),
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
            cache_ttl_secs: 3600,
            cache_max_entries: 1000,
            rate_limit_max_requests: 120,
            rate_limit_window_secs: 60,
            browser_executable: Some(PathBuf::from("/usr/bin/chromium")),
            browser_headless: false,
            browser_launch_timeout_secs: 5,
            scraper_user_agent: "ua/1.0".to_string(),
            scraper_jitter_min_ms: 0,
            scraper_jitter_max_ms: 0,
        };
        let settings = BrowserSettings::from_app_config(&config);
        assert!(!settings.headless);
        assert_eq!(settings.launch_timeout, Duration::from_secs(5));
        assert_eq!(settings.user_agent, "ua/1.0");
        assert_eq!(
            settings.executable.as_deref(),
            Some(std::path::Path::new("/usr/bin/chromium"))
        );
        assert_eq!(
            (settings.viewport_width, settings.viewport_height),
            DEFAULT_VIEWPORT
        );
    }
}
