// tests/config_test.rs

use attendify_core::{PortalConfig, ScraperError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = PortalConfig::from_lookup(|_| None).unwrap();

    assert_eq!(config, PortalConfig::default());
    assert_eq!(config.base_url, "http://mitsims.in/");
    assert_eq!(config.timeouts.probe, Duration::from_secs(10));
    assert_eq!(config.timeouts.entry_point, Duration::from_secs(20));
    assert_eq!(config.timeouts.login_verdict, Duration::from_secs(10));
    assert_eq!(config.timeouts.attendance_table, Duration::from_secs(15));
    assert_eq!(config.browser.window, (1920, 1080));
    assert!(config.browser.headless);
    assert_eq!(config.mail_domain, "mits.ac.in");
}

#[test]
fn test_overrides() {
    let config = PortalConfig::from_lookup(lookup_from(&[
        ("ATTENDIFY_PORTAL_URL", "https://staging.portal.test/"),
        ("ATTENDIFY_LOGIN_TIMEOUT_SECS", "3"),
        ("ATTENDIFY_POLL_INTERVAL_MS", "100"),
        ("ATTENDIFY_HEADLESS", "false"),
        ("CHROME_PATH", "/opt/chromium/chrome"),
        ("ATTENDIFY_MAIL_DOMAIN", "example.edu"),
    ]))
    .unwrap();

    assert_eq!(config.base_url, "https://staging.portal.test/");
    assert_eq!(config.timeouts.login_verdict, Duration::from_secs(3));
    assert_eq!(config.timeouts.poll_interval, Duration::from_millis(100));
    assert_eq!(config.timeouts.entry_point, Duration::from_secs(20));
    assert!(!config.browser.headless);
    assert_eq!(
        config.browser.chrome_executable,
        Some(PathBuf::from("/opt/chromium/chrome"))
    );
    assert_eq!(config.mail_domain, "example.edu");
}

#[test]
fn test_invalid_values_are_rejected() {
    let bad_number = PortalConfig::from_lookup(lookup_from(&[("ATTENDIFY_TABLE_TIMEOUT_SECS", "soon")]));
    assert!(matches!(bad_number, Err(ScraperError::ConfigError(_))));

    let zero_poll = PortalConfig::from_lookup(lookup_from(&[("ATTENDIFY_POLL_INTERVAL_MS", "0")]));
    assert!(matches!(zero_poll, Err(ScraperError::ConfigError(_))));

    let bad_url = PortalConfig::from_lookup(lookup_from(&[("ATTENDIFY_PORTAL_URL", "not a url")]));
    assert!(matches!(bad_url, Err(ScraperError::ConfigError(_))));
}
