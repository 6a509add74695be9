use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{debug, warn};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.0.0 Safari/537.36";

/// Cheap check that the portal answers before a browser is started.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Plain HTTP GET against the portal's base address.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            // The portal is known to serve self-signed certificates.
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AvailabilityProbe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!(%status, url, "Portal probe answered");
                status.is_success()
            }
            Err(e) => {
                warn!(url, "Portal probe failed: {}", e);
                false
            }
        }
    }
}
