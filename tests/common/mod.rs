// tests/common/mod.rs
//
// A scripted, offline stand-in for the portal. Pages are plain HTML
// strings; presence and visibility are answered with `scraper` selectors.

#![allow(dead_code)]

use async_trait::async_trait;
use attendify_core::markup::{STUDENT_LINK, SUBMIT_BUTTON};
use attendify_core::{
    AttendifyCoreClient, AvailabilityProbe, BrowserSettings, PortalConfig, PortalSession, Result,
    ScraperError, SessionLauncher, Timeouts,
};
use scraper::{ElementRef, Html, Selector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "http://portal.test/";

/// Config with every bound shrunk so timeouts elapse quickly.
pub fn fast_config() -> PortalConfig {
    PortalConfig {
        base_url: BASE_URL.to_string(),
        timeouts: Timeouts {
            probe: Duration::from_millis(200),
            entry_point: Duration::from_millis(40),
            login_form: Duration::from_millis(40),
            login_verdict: Duration::from_millis(40),
            attendance_table: Duration::from_millis(40),
            poll_interval: Duration::from_millis(5),
        },
        ..PortalConfig::default()
    }
}

pub fn landing_page() -> String {
    r##"<html><body>
        <a id="studentLink" href="#">Student</a>
        <form id="studentForm">
            <input id="inputStuId" type="text">
            <input id="inputPassword" type="password">
            <button id="studentSubmitButton" type="button">Login</button>
        </form>
        <div class="navbar-fixed-bottom">footer</div>
    </body></html>"##
        .to_string()
}

/// Landing page with the login error indicator shown, carrying `message`.
pub fn rejected_page(message: &str) -> String {
    landing_page().replace(
        "</body>",
        &format!(r#"<div id="studentErrorDiv">{}</div></body>"#, message),
    )
}

/// One `(subject code, present, conducted)` row as the portal renders it.
pub fn fragment(code: &str, present: &str, conducted: &str) -> String {
    format!(
        r#"<fieldset class="x-fieldset bottom-border x-fieldset-default">
            <div class="x-fieldset-body">
                <div class="x-field x-form-item"><div class="x-form-display-field">#</div></div>
                <div class="x-field x-form-item"><div class="x-form-display-field">{code}</div></div>
                <div class="x-field x-form-item"><div class="x-form-display-field">{present}</div></div>
                <div class="x-field x-form-item"><div class="x-form-display-field">{conducted}</div></div>
            </div>
        </fieldset>"#
    )
}

pub fn profile_page(name: &str, roll: &str, fragments: &[String]) -> String {
    format!(
        r#"<html><body>
            <div class="x-component profDetails"><img src="/photos/{roll}.jpg"></div>
            <div class="x-form-display-field">{name}</div>
            <div id="profileUsn"><label>USN</label><div class="x-form-display-field">{roll}</div></div>
            <div class="attendance">{rows}</div>
        </body></html>"#,
        rows = fragments.join("\n")
    )
}

/// Observations shared between the test and the fakes it hands out.
#[derive(Clone, Default)]
pub struct Calls {
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub probes: Arc<AtomicUsize>,
    log: Arc<Mutex<Vec<String>>>,
}

impl Calls {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

/// What the fake portal serves and how it misbehaves.
#[derive(Clone)]
pub struct Scenario {
    pub landing: String,
    pub after_submit: String,
    /// URL the browser reports once the login form has been submitted.
    pub after_submit_url: String,
    pub intercept_submit: bool,
    /// Native submit click fails with a CDP-style error.
    pub broken_submit_click: bool,
    pub fail_launch: bool,
    pub panic_on_html: bool,
}

impl Scenario {
    pub fn new(after_submit: String) -> Self {
        Self {
            landing: landing_page(),
            after_submit,
            after_submit_url: format!("{}studentHome.action", BASE_URL),
            intercept_submit: false,
            broken_submit_click: false,
            fail_launch: false,
            panic_on_html: false,
        }
    }
}

pub struct FakeSession {
    scenario: Scenario,
    page: String,
    url: Option<String>,
    calls: Calls,
}

impl FakeSession {
    fn with_first<T>(&self, selector: &str, f: impl FnOnce(ElementRef<'_>) -> T) -> Option<T> {
        let document = Html::parse_document(&self.page);
        let selector = Selector::parse(selector).ok()?;
        document.select(&selector).next().map(f)
    }

    fn submit(&mut self) {
        self.page = self.scenario.after_submit.clone();
        self.url = Some(self.scenario.after_submit_url.clone());
    }
}

fn visible(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let hidden_style = value
        .attr("style")
        .map(|style| style.replace(' ', "").contains("display:none"))
        .unwrap_or(false);
    value.attr("hidden").is_none() && !hidden_style
}

#[async_trait]
impl PortalSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.calls.push(format!("navigate {}", url));
        self.page = self.scenario.landing.clone();
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn is_present(&mut self, selector: &str) -> Result<bool> {
        Ok(self.with_first(selector, |_| true).unwrap_or(false))
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool> {
        Ok(self.with_first(selector, visible).unwrap_or(false))
    }

    async fn is_clickable(&mut self, selector: &str) -> Result<bool> {
        Ok(self
            .with_first(selector, |el| visible(el) && el.value().attr("disabled").is_none())
            .unwrap_or(false))
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
        if !self.is_present(selector).await? {
            return Err(ScraperError::ElementNotFound(selector.to_string()));
        }
        self.calls.push(format!("fill {}={}", selector, value));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.calls.push(format!("click {}", selector));
        if selector == SUBMIT_BUTTON {
            if self.scenario.intercept_submit {
                return Err(ScraperError::ClickIntercepted(selector.to_string()));
            }
            if self.scenario.broken_submit_click {
                return Err(ScraperError::BrowserError(
                    "Could not compute box model.".to_string(),
                ));
            }
            self.submit();
        } else if selector != STUDENT_LINK && !self.is_present(selector).await? {
            return Err(ScraperError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn script_click(&mut self, selector: &str) -> Result<()> {
        self.calls.push(format!("script_click {}", selector));
        if selector == SUBMIT_BUTTON {
            self.submit();
        }
        Ok(())
    }

    async fn scroll_into_view(&mut self, selector: &str) -> Result<()> {
        self.calls.push(format!("scroll {}", selector));
        Ok(())
    }

    async fn hide(&mut self, selector: &str) -> Result<()> {
        self.calls.push(format!("hide {}", selector));
        Ok(())
    }

    async fn current_url(&mut self) -> Result<Option<String>> {
        Ok(self.url.clone())
    }

    async fn html(&mut self) -> Result<String> {
        if self.scenario.panic_on_html {
            panic!("renderer crashed");
        }
        Ok(self.page.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeLauncher {
    pub scenario: Scenario,
    pub calls: Calls,
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self, _settings: &BrowserSettings) -> Result<FakeSession> {
        self.calls.launches.fetch_add(1, Ordering::SeqCst);
        if self.scenario.fail_launch {
            return Err(ScraperError::BrowserError("chrome not found".to_string()));
        }
        Ok(FakeSession {
            scenario: self.scenario.clone(),
            page: String::new(),
            url: None,
            calls: self.calls.clone(),
        })
    }
}

pub struct FakeProbe {
    pub reachable: bool,
    pub calls: Calls,
}

#[async_trait]
impl AvailabilityProbe for FakeProbe {
    async fn is_reachable(&self, _url: &str) -> bool {
        self.calls.probes.fetch_add(1, Ordering::SeqCst);
        self.reachable
    }
}

/// A fresh session outside of any client, for driving stages directly.
pub fn session_on(page: String, scenario: Scenario, calls: &Calls) -> FakeSession {
    FakeSession {
        scenario,
        page,
        url: Some(BASE_URL.to_string()),
        calls: calls.clone(),
    }
}

pub fn client_for(
    scenario: Scenario,
    reachable: bool,
) -> (AttendifyCoreClient<FakeProbe, FakeLauncher>, Calls) {
    let calls = Calls::default();
    let client = AttendifyCoreClient::with_parts(
        fast_config(),
        FakeProbe {
            reachable,
            calls: calls.clone(),
        },
        FakeLauncher {
            scenario,
            calls: calls.clone(),
        },
    );
    (client, calls)
}
