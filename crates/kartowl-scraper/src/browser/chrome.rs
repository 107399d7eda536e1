use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::{BrowserSettings, Session, SessionGuard, SessionSource};
use crate::error::ScraperError;

/// Extra flags on top of `--no-sandbox`.
const LAUNCH_ARGS: [&str; 2] = [
    "--disable-setuid-sandbox",
    "--disable-blink-features=AutomationControlled",
];

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Externally visible lifecycle of the shared browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserStatus {
    Uninitialized,
    Starting,
    Ready,
    Unavailable,
    Stopped,
}

impl BrowserStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BrowserStatus::Uninitialized => "uninitialized",
            BrowserStatus::Starting => "starting",
            BrowserStatus::Ready => "ready",
            BrowserStatus::Unavailable => "unavailable",
            BrowserStatus::Stopped => "stopped",
        }
    }
}

enum BrowserState {
    Uninitialized,
    Starting,
    Ready(Arc<Browser>),
    /// Terminal: the launch is never retried.
    Unavailable(String),
    Stopped,
}

impl BrowserState {
    fn status(&self) -> BrowserStatus {
        match self {
            BrowserState::Uninitialized => BrowserStatus::Uninitialized,
            BrowserState::Starting => BrowserStatus::Starting,
            BrowserState::Ready(_) => BrowserStatus::Ready,
            BrowserState::Unavailable(_) => BrowserStatus::Unavailable,
            BrowserState::Stopped => BrowserStatus::Stopped,
        }
    }
}

/// Owns the single long-lived headless browser and hands out isolated
/// contexts from it.
///
/// `Uninitialized -> Starting -> Ready | Unavailable`, then `Ready -> Stopped`
/// on [`stop`](Self::stop). A failed launch never raises; every later
/// [`new_session`](SessionSource::new_session) reports the browser as
/// unavailable instead.
pub struct BrowserSessionManager {
    settings: BrowserSettings,
    state: RwLock<BrowserState>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

impl BrowserSessionManager {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(BrowserState::Uninitialized),
            handler: Mutex::new(None),
        }
    }

    pub async fn status(&self) -> BrowserStatus {
        self.state.read().await.status()
    }

    /// Launches the browser. Only the first call does anything.
    pub async fn start(&self) -> BrowserStatus {
        {
            let mut state = self.state.write().await;
            if !matches!(*state, BrowserState::Uninitialized) {
                return state.status();
            }
            *state = BrowserState::Starting;
        }

        let launch_timeout = self.settings.launch_timeout;
        let next = match tokio::time::timeout(launch_timeout, self.launch()).await {
            Ok(Ok((browser, handler))) => {
                *self.handler.lock().await = Some(handler);
                tracing::info!(headless = self.settings.headless, "browser launched");
                BrowserState::Ready(Arc::new(browser))
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "browser launch failed; scraping disabled");
                BrowserState::Unavailable(e.to_string())
            }
            Err(_) => {
                let reason = format!("launch timed out after {}s", launch_timeout.as_secs());
                tracing::error!(reason = %reason, "browser launch failed; scraping disabled");
                BrowserState::Unavailable(reason)
            }
        };

        let mut state = self.state.write().await;
        *state = next;
        state.status()
    }

    /// Closes the shared browser. Call once at shutdown.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state.write().await, BrowserState::Stopped);

        if let BrowserState::Ready(browser) = previous {
            match Arc::try_unwrap(browser) {
                Ok(mut browser) => {
                    if let Err(e) = browser.close().await {
                        tracing::warn!(error = %e, "browser close failed");
                    }
                    if let Err(e) = browser.wait().await {
                        tracing::warn!(error = %e, "browser process did not exit cleanly");
                    }
                }
                Err(_) => {
                    tracing::warn!("sessions still open at shutdown; browser killed on drop");
                }
            }
        }

        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }
        tracing::info!("browser stopped");
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>), ScraperError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .args(LAUNCH_ARGS)
            .window_size(self.settings.viewport_width, self.settings.viewport_height);
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ScraperError::BrowserUnavailable)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        let task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                }
            }
            tracing::debug!("browser handler exited");
        });

        Ok((browser, task))
    }

    async fn ready_browser(&self) -> Result<Arc<Browser>, ScraperError> {
        match &*self.state.read().await {
            BrowserState::Ready(browser) => Ok(Arc::clone(browser)),
            BrowserState::Unavailable(reason) => {
                Err(ScraperError::BrowserUnavailable(reason.clone()))
            }
            BrowserState::Uninitialized | BrowserState::Starting => Err(
                ScraperError::BrowserUnavailable("browser not started".to_string()),
            ),
            BrowserState::Stopped => Err(ScraperError::BrowserUnavailable(
                "browser stopped".to_string(),
            )),
        }
    }

    async fn open_page(
        &self,
        browser: &Browser,
        context_id: &BrowserContextId,
    ) -> Result<Page, ScraperError> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(ScraperError::BrowserUnavailable)?;
        let page = browser.new_page(target).await?;

        page.execute(SetUserAgentOverrideParams::new(
            self.settings.user_agent.clone(),
        ))
        .await?;
        page.execute(
            SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(self.settings.viewport_width))
                .height(i64::from(self.settings.viewport_height))
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(ScraperError::BrowserUnavailable)?,
        )
        .await?;

        Ok(page)
    }
}

#[async_trait]
impl SessionSource for BrowserSessionManager {
    async fn new_session(&self) -> Result<SessionGuard, ScraperError> {
        let browser = self.ready_browser().await?;

        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await?
            .result
            .browser_context_id;

        let page = match self.open_page(&browser, &context_id).await {
            Ok(page) => page,
            Err(e) => {
                dispose_context(&browser, context_id).await;
                return Err(e);
            }
        };

        Ok(SessionGuard::new(Arc::new(ChromeSession {
            page,
            context_id,
            browser,
        })))
    }
}

async fn dispose_context(browser: &Browser, context_id: BrowserContextId) {
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
    {
        tracing::warn!(error = %e, "failed to dispose browser context");
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

struct ChromeSession {
    page: Page,
    context_id: BrowserContextId,
    browser: Arc<Browser>,
}

#[async_trait]
impl Session for ChromeSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScraperError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ScraperError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {}ms", millis(timeout)),
            }),
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        let started = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                tracing::debug!(
                    selector,
                    elapsed_ms = millis(started.elapsed()),
                    "selector appeared"
                );
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(ScraperError::Timeout {
                    what: selector.to_string(),
                    timeout_ms: millis(timeout),
                });
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ScraperError> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(result) => result.map(|_| ()).map_err(ScraperError::from),
            Err(_) => Err(ScraperError::Timeout {
                what: "network idle".to_string(),
                timeout_ms: millis(timeout),
            }),
        }
    }

    async fn scroll_by(&self, pixels: u32) -> Result<(), ScraperError> {
        self.page
            .evaluate(format!("window.scrollBy(0, {pixels})"))
            .await?;
        Ok(())
    }

    async fn submit_search(&self, input_selector: &str, text: &str) -> Result<(), ScraperError> {
        let input = self.page.find_element(input_selector).await.map_err(|_| {
            ScraperError::ElementNotFound {
                selector: input_selector.to_string(),
            }
        })?;
        input.click().await?;
        input.type_str(text).await?;
        input.press_key("Enter").await?;
        Ok(())
    }

    async fn content(&self) -> Result<String, ScraperError> {
        Ok(self.page.content().await?)
    }

    async fn close(&self) -> Result<(), ScraperError> {
        if let Err(e) = self.page.clone().close().await {
            tracing::debug!(error = %e, "page close failed; disposing context anyway");
        }
        self.browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await?;
        Ok(())
    }
}
