use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Request to the portal failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Browser session error: {0}")]
    BrowserError(String),

    #[error("Failed to parse HTML: {0}")]
    ParsingError(String),

    #[error("Could not find required element on the page: {0}")]
    ElementNotFound(String),

    #[error("Click on {0} was intercepted by another element")]
    ClickIntercepted(String),

    #[error("Timed out after {bound:?} waiting for {stage}")]
    Timeout { stage: &'static str, bound: Duration },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid credentials input: {0}")]
    InvalidInput(&'static str),
}

impl From<chromiumoxide::error::CdpError> for ScraperError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ScraperError::BrowserError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
