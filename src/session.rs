use crate::config::BrowserSettings;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};

/// One disposable browser instance driven through the portal.
///
/// All element arguments are CSS selectors resolved against the current page.
#[async_trait]
pub trait PortalSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn is_present(&mut self, selector: &str) -> Result<bool>;

    async fn is_visible(&mut self, selector: &str) -> Result<bool>;

    /// Visible and not disabled.
    async fn is_clickable(&mut self, selector: &str) -> Result<bool>;

    async fn fill(&mut self, selector: &str, value: &str) -> Result<()>;

    /// Native click. Fails with [`ScraperError::ClickIntercepted`] when
    /// another element would receive it.
    ///
    /// [`ScraperError::ClickIntercepted`]: crate::ScraperError::ClickIntercepted
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// `element.click()` dispatched from page script.
    async fn script_click(&mut self, selector: &str) -> Result<()>;

    async fn scroll_into_view(&mut self, selector: &str) -> Result<()>;

    /// Sets `display: none` on the first match, if any.
    async fn hide(&mut self, selector: &str) -> Result<()>;

    /// Address of the document currently loaded, if the browser reports one.
    async fn current_url(&mut self) -> Result<Option<String>>;

    /// Serialized DOM of the current page.
    async fn html(&mut self) -> Result<String>;

    /// Releases the browser. Called exactly once per session.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: PortalSession;

    async fn launch(&self, settings: &BrowserSettings) -> Result<Self::Session>;
}

/// Something a bounded wait can poll for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition<'a> {
    Present(&'a str),
    Visible(&'a str),
    Clickable(&'a str),
}

impl Condition<'_> {
    async fn holds<S: PortalSession + ?Sized>(&self, session: &mut S) -> Result<bool> {
        match *self {
            Condition::Present(selector) => session.is_present(selector).await,
            Condition::Visible(selector) => session.is_visible(selector).await,
            Condition::Clickable(selector) => session.is_clickable(selector).await,
        }
    }
}

/// Polls `conditions` in order until one holds and returns its index.
///
/// Returns `Ok(None)` once `bound` has elapsed, including when a single
/// check hangs past the bound. Errors from the session end the wait early.
pub async fn wait_for_first<S: PortalSession + ?Sized>(
    session: &mut S,
    conditions: &[Condition<'_>],
    bound: Duration,
    poll_interval: Duration,
) -> Result<Option<usize>> {
    let deadline = Instant::now() + bound;

    match timeout(bound, poll_until(session, conditions, deadline, poll_interval)).await {
        Ok(result) => result,
        Err(_) => Ok(None),
    }
}

async fn poll_until<S: PortalSession + ?Sized>(
    session: &mut S,
    conditions: &[Condition<'_>],
    deadline: Instant,
    poll_interval: Duration,
) -> Result<Option<usize>> {
    loop {
        for (index, condition) in conditions.iter().enumerate() {
            if condition.holds(session).await? {
                return Ok(Some(index));
            }
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(poll_interval).await;
    }
}

/// Single-condition form of [`wait_for_first`].
pub async fn wait_for<S: PortalSession + ?Sized>(
    session: &mut S,
    condition: Condition<'_>,
    bound: Duration,
    poll_interval: Duration,
) -> Result<bool> {
    Ok(wait_for_first(session, &[condition], bound, poll_interval)
        .await?
        .is_some())
}
