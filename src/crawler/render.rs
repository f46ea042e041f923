//! Headless browser backend
//!
//! Pages are loaded in Chromium through `chromiumoxide`. After navigation the
//! backend waits for `document.readyState`, optionally scrolls to force lazy
//! content, lets client-side routing settle, then captures:
//! - the serialized DOM
//! - every anchor `href` the live DOM exposes
//! - the result of a script that walks the DOM, including open shadow roots

use super::fetcher::{FetchError, PageFetchResult, PageFetcher, RenderedSnapshot};
use crate::config::{BackendKind, Config};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SCROLL_PAUSE: Duration = Duration::from_millis(300);

const READY_STATE_SCRIPT: &str = "document.readyState";

const SCROLL_DOWN_SCRIPT: &str =
    "window.scrollTo(0, document.body ? document.body.scrollHeight : 0); true";

const SCROLL_UP_SCRIPT: &str = "window.scrollTo(0, 0); true";

const LINK_WALK_SCRIPT: &str = r#"
(() => {
    const found = new Set();
    const visit = (root) => {
        root.querySelectorAll('a[href], area[href], [data-href], [routerlink]').forEach((el) => {
            const value = (typeof el.href === 'string' && el.href)
                || el.getAttribute('href')
                || el.getAttribute('data-href')
                || el.getAttribute('routerlink');
            if (value) found.add(value);
        });
        root.querySelectorAll('*').forEach((el) => {
            if (el.shadowRoot) visit(el.shadowRoot);
        });
    };
    visit(document);
    return { links: Array.from(found) };
})()
"#;

/// Rendered backend built on a single shared browser
pub struct RenderedFetcher {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    settle: Duration,
    scroll: bool,
}

impl RenderedFetcher {
    /// Launches a headless browser for the crawl
    pub async fn launch(config: &Config) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(config.crawl.page_timeout_ms))
            .window_size(1366, 900)
            .arg(format!("--user-agent={}", config.user_agent.header_value()))
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--mute-audio");

        if let Some(path) = &config.render.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder.build().map_err(FetchError::Render)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Render(format!("failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {}", e);
                }
            }
            tracing::debug!("browser handler finished");
        });

        tracing::info!("Headless browser launched");

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            settle: Duration::from_millis(config.render.settle_ms),
            scroll: config.render.scroll,
        })
    }

    async fn render(&self, page: &Page, url: &Url, timeout: Duration) -> Result<PageFetchResult, FetchError> {
        let started = Instant::now();

        page.wait_for_navigation().await.map_err(render_error)?;
        let budget = ready_budget(timeout, self.settle, self.scroll, started.elapsed());
        wait_until_ready(page, budget).await;

        if self.scroll {
            page.evaluate(SCROLL_DOWN_SCRIPT).await.map_err(render_error)?;
            tokio::time::sleep(SCROLL_PAUSE).await;
            page.evaluate(SCROLL_UP_SCRIPT).await.map_err(render_error)?;
        }

        tokio::time::sleep(self.settle).await;

        let content = page.content().await.map_err(render_error)?;

        let final_url = page
            .url()
            .await
            .map_err(render_error)?
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        let mut dom_links = Vec::new();
        for element in page.find_elements("a[href]").await.map_err(render_error)? {
            if let Ok(Some(href)) = element.attribute("href").await {
                dom_links.push(href);
            }
        }

        let script_result = match page.evaluate(LINK_WALK_SCRIPT).await {
            Ok(result) => result.into_value::<Value>().ok(),
            Err(e) => {
                tracing::debug!("link walk script failed on {}: {}", url, e);
                None
            }
        };

        Ok(PageFetchResult {
            requested_url: url.clone(),
            final_url,
            status: None,
            content_type: Some("text/html".to_string()),
            content,
            reachable: true,
            elapsed: started.elapsed(),
            rendered: Some(RenderedSnapshot {
                dom_links,
                script_result,
            }),
        })
    }
}

#[async_trait]
impl PageFetcher for RenderedFetcher {
    fn backend(&self) -> BackendKind {
        BackendKind::Rendered
    }

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<PageFetchResult, FetchError> {
        let page = {
            let browser = self.browser.lock().await;
            browser.new_page(url.as_str()).await.map_err(render_error)?
        };

        let tab = TabGuard(Some(page.clone()));
        let result = self.render(&page, url, timeout).await;
        tab.close(url).await;

        result
    }

    async fn close(&self) -> Result<(), FetchError> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(render_error)?;
        if let Err(e) = browser.wait().await {
            tracing::debug!("browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}

/// Closes its tab when dropped before `close` was awaited
///
/// A fetch that hits its timeout is dropped mid-render; the tab is then
/// closed on a spawned task.
struct TabGuard(Option<Page>);

impl TabGuard {
    async fn close(mut self, url: &Url) {
        if let Some(page) = self.0.take() {
            if let Err(e) = page.close().await {
                tracing::debug!("failed to close tab for {}: {}", url, e);
            }
        }
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        let Some(page) = self.0.take() else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                if let Err(e) = page.close().await {
                    tracing::debug!("failed to close abandoned tab: {}", e);
                }
            });
        }
    }
}

/// Time left for readiness polling once settling and scrolling are reserved
fn ready_budget(timeout: Duration, settle: Duration, scroll: bool, elapsed: Duration) -> Duration {
    let reserved = settle + if scroll { SCROLL_PAUSE } else { Duration::ZERO };
    timeout.saturating_sub(reserved).saturating_sub(elapsed)
}

/// Polls `document.readyState` until it is `complete` or the budget runs out
async fn wait_until_ready(page: &Page, budget: Duration) {
    let started = Instant::now();

    while started.elapsed() < budget {
        match page.evaluate(READY_STATE_SCRIPT).await {
            Ok(result) => {
                if result.into_value::<String>().ok().as_deref() == Some("complete") {
                    return;
                }
            }
            Err(e) => tracing::trace!("readyState check failed: {}", e),
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }

    tracing::debug!("page not ready after {:?}, continuing", budget);
}

fn render_error(e: impl std::fmt::Display) -> FetchError {
    FetchError::Render(e.to_string())
}
