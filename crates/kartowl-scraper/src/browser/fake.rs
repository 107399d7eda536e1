//! Fixture-backed [`Session`] for extractor tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::Session;
use crate::error::ScraperError;

/// Serves a fixed HTML document. `wait_for_selector` succeeds iff the
/// selector matches the fixture, and every call is recorded.
pub(crate) struct FakeSession {
    html: String,
    fail_navigation: bool,
    calls: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

impl FakeSession {
    pub(crate) fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            fail_navigation: false,
            calls: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_navigation() -> Self {
        Self {
            fail_navigation: true,
            ..Self::new("")
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn matches(&self, selector: &str) -> bool {
        let Ok(selector) = Selector::parse(selector) else {
            return false;
        };
        Html::parse_document(&self.html)
            .select(&selector)
            .next()
            .is_some()
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        self.record(format!("goto {url}"));
        if self.fail_navigation {
            return Err(ScraperError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {}s", timeout.as_secs()),
            });
        }
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        self.record(format!("wait {selector}"));
        if self.matches(selector) {
            Ok(())
        } else {
            Err(ScraperError::Timeout {
                what: selector.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        }
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<(), ScraperError> {
        self.record("idle".to_string());
        Ok(())
    }

    async fn scroll_by(&self, pixels: u32) -> Result<(), ScraperError> {
        self.record(format!("scroll {pixels}"));
        Ok(())
    }

    async fn submit_search(&self, input_selector: &str, text: &str) -> Result<(), ScraperError> {
        self.record(format!("submit {input_selector} {text}"));
        if self.matches(input_selector) {
            Ok(())
        } else {
            Err(ScraperError::ElementNotFound {
                selector: input_selector.to_string(),
            })
        }
    }

    async fn content(&self) -> Result<String, ScraperError> {
        Ok(self.html.clone())
    }

    async fn close(&self) -> Result<(), ScraperError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
