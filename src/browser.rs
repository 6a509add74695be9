use crate::config::BrowserSettings;
use crate::error::{Result, ScraperError};
use crate::session::{PortalSession, SessionLauncher};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Chromium flags for a throwaway session against a portal with weak TLS.
const HARDENED_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-software-rasterizer",
    "--ignore-certificate-errors",
    "--allow-insecure-localhost",
    "--log-level=3",
    "--no-first-run",
    "--no-default-browser-check",
];

/// Launches a fresh headless Chromium per scrape.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeLauncher;

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self, settings: &BrowserSettings) -> Result<ChromeSession> {
        let (width, height) = settings.window;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .viewport(None)
            .args(HARDENED_ARGS.iter().copied());
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ScraperError::BrowserError)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // The CDP handler must be driven for the browser to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event error: {}", e);
                }
            }
        });

        let page = browser.new_page("about:blank").await?;

        Ok(ChromeSession {
            browser,
            page,
            handler: HandlerGuard::new(handler_task),
        })
    }
}

/// Owns the CDP handler task. Dropping the guard aborts the task, so a
/// cancelled scrape does not leave it running.
struct HandlerGuard {
    handle: Option<JoinHandle<()>>,
}

impl HandlerGuard {
    fn new(handle: JoinHandle<()>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Aborts the task and waits for it to finish.
    async fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Browser handler task failed: {}", e);
                }
            }
        }
    }
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: HandlerGuard,
}

impl ChromeSession {
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        let result = self.page.evaluate(script).await?;
        result
            .into_value()
            .map_err(|e| ScraperError::ParsingError(format!("Unexpected script result: {}", e)))
    }

    /// Runs `body` with `el` bound to the first match of `selector`.
    /// `body` must produce a value; `missing` is returned when nothing matches.
    async fn with_element<T: DeserializeOwned>(
        &self,
        selector: &str,
        body: &str,
        missing: &str,
    ) -> Result<T> {
        let quoted = serde_json::to_string(selector)
            .map_err(|e| ScraperError::ParsingError(e.to_string()))?;
        self.eval(format!(
            "(() => {{ const el = document.querySelector({quoted}); if (!el) return {missing}; {body} }})()"
        ))
        .await
    }
}

const VISIBLE_JS: &str = "const s = window.getComputedStyle(el); const r = el.getBoundingClientRect(); \
     return s.display !== 'none' && s.visibility !== 'hidden' && r.width > 0 && r.height > 0;";

#[async_trait]
impl PortalSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    async fn is_present(&mut self, selector: &str) -> Result<bool> {
        self.with_element(selector, "return true;", "false").await
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool> {
        self.with_element(selector, VISIBLE_JS, "false").await
    }

    async fn is_clickable(&mut self, selector: &str) -> Result<bool> {
        let body = format!("if (el.disabled) return false; {}", VISIBLE_JS);
        self.with_element(selector, &body, "false").await
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
        let element = self.page.find_element(selector).await?;
        element.focus().await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        // Hit-test the centre of the element the way a real mouse would.
        let hit: String = self
            .with_element(
                selector,
                "el.scrollIntoView({block: 'center'}); \
                 const r = el.getBoundingClientRect(); \
                 const hit = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
                 return (hit === el || el.contains(hit)) ? 'clear' : 'covered';",
                "'missing'",
            )
            .await?;

        match hit.as_str() {
            "missing" => Err(ScraperError::ElementNotFound(selector.to_string())),
            "covered" => Err(ScraperError::ClickIntercepted(selector.to_string())),
            _ => {
                self.page.find_element(selector).await?.click().await?;
                Ok(())
            }
        }
    }

    async fn script_click(&mut self, selector: &str) -> Result<()> {
        let clicked: bool = self
            .with_element(selector, "el.click(); return true;", "false")
            .await?;
        if clicked {
            Ok(())
        } else {
            Err(ScraperError::ElementNotFound(selector.to_string()))
        }
    }

    async fn scroll_into_view(&mut self, selector: &str) -> Result<()> {
        let found: bool = self
            .with_element(selector, "el.scrollIntoView(true); return true;", "false")
            .await?;
        if found {
            Ok(())
        } else {
            Err(ScraperError::ElementNotFound(selector.to_string()))
        }
    }

    async fn hide(&mut self, selector: &str) -> Result<()> {
        let _: bool = self
            .with_element(selector, "el.style.display = 'none'; return true;", "false")
            .await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<Option<String>> {
        Ok(self.page.url().await?)
    }

    async fn html(&mut self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.shutdown().await;
        closed?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HandlerGuard;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn parked_task() -> (HandlerGuard, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        (HandlerGuard::new(handle), rx)
    }

    #[tokio::test]
    async fn test_dropping_guard_aborts_handler_task() {
        let (guard, rx) = parked_task();

        drop(guard);

        // The sender is released only once the aborted task is torn down.
        let closed = tokio::time::timeout(Duration::from_secs(1), rx).await;
        assert!(matches!(closed, Ok(Err(_))), "got {:?}", closed);
    }

    #[tokio::test]
    async fn test_shutdown_joins_handler_task() {
        let (mut guard, mut rx) = parked_task();

        guard.shutdown().await;

        assert!(guard.handle.is_none());
        assert!(rx.try_recv().is_err());
        // A later drop has nothing left to abort.
        drop(guard);
    }
}
