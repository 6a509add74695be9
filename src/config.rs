use crate::error::{Result, ScraperError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORTAL_URL: &str = "http://mitsims.in/";
pub const DEFAULT_MAIL_DOMAIN: &str = "mits.ac.in";

/// Upper bounds for every wait in the scrape pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Preflight reachability probe.
    pub probe: Duration,
    /// Until the "Student" entry point is clickable.
    pub entry_point: Duration,
    /// Until the login form is visible.
    pub login_form: Duration,
    /// Until either the error indicator or the profile marker shows up.
    pub login_verdict: Duration,
    /// Until the first attendance fragment is rendered.
    pub attendance_table: Duration,
    /// Pause between two checks of a wait condition.
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(10),
            entry_point: Duration::from_secs(20),
            login_form: Duration::from_secs(20),
            login_verdict: Duration::from_secs(10),
            attendance_table: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// How the headless browser is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Window size in pixels; kept wide so the desktop layout is served.
    pub window: (u32, u32),
    /// Explicit Chrome/Chromium binary. Auto-detected when `None`.
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window: (1920, 1080),
            chrome_executable: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    pub timeouts: Timeouts,
    pub browser: BrowserSettings,
    /// Domain appended to the registration number for report emails.
    pub mail_domain: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PORTAL_URL.to_string(),
            timeouts: Timeouts::default(),
            browser: BrowserSettings::default(),
            mail_domain: DEFAULT_MAIL_DOMAIN.to_string(),
        }
    }
}

impl PortalConfig {
    /// Reads overrides from the process environment, loading `.env` first
    /// when one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Missing keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ATTENDIFY_PORTAL_URL") {
            config.base_url = url;
        }
        if let Some(domain) = lookup("ATTENDIFY_MAIL_DOMAIN") {
            config.mail_domain = domain;
        }
        if let Some(path) = lookup("CHROME_PATH") {
            config.browser.chrome_executable = Some(PathBuf::from(path));
        }
        if let Some(headless) = parse_var::<bool>(&lookup, "ATTENDIFY_HEADLESS")? {
            config.browser.headless = headless;
        }

        let timeouts = &mut config.timeouts;
        let secs = [
            ("ATTENDIFY_PROBE_TIMEOUT_SECS", &mut timeouts.probe),
            ("ATTENDIFY_ENTRY_TIMEOUT_SECS", &mut timeouts.entry_point),
            ("ATTENDIFY_FORM_TIMEOUT_SECS", &mut timeouts.login_form),
            ("ATTENDIFY_LOGIN_TIMEOUT_SECS", &mut timeouts.login_verdict),
            ("ATTENDIFY_TABLE_TIMEOUT_SECS", &mut timeouts.attendance_table),
        ];
        for (key, slot) in secs {
            if let Some(value) = parse_var::<u64>(&lookup, key)? {
                *slot = Duration::from_secs(value);
            }
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "ATTENDIFY_POLL_INTERVAL_MS")? {
            if ms == 0 {
                return Err(ScraperError::ConfigError(
                    "ATTENDIFY_POLL_INTERVAL_MS must be greater than zero".to_string(),
                ));
            }
            timeouts.poll_interval = Duration::from_millis(ms);
        }

        reqwest::Url::parse(&config.base_url).map_err(|e| {
            ScraperError::ConfigError(format!("ATTENDIFY_PORTAL_URL is not a valid URL: {}", e))
        })?;

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            ScraperError::ConfigError(format!("{} has invalid value {:?}: {}", key, raw, e))
        }),
    }
}
