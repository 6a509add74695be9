use crate::browser::ChromeLauncher;
use crate::config::PortalConfig;
use crate::error::Result;
use crate::markup::RowSchema;
use crate::models::{Credentials, ScrapeFailure, ScrapeOutcome};
use crate::notify::{self, Notifier};
use crate::pipeline::Pipeline;
use crate::probe::{AvailabilityProbe, HttpProbe};
use crate::session::{PortalSession, SessionLauncher};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Entry point for attendance scrapes.
///
/// Every call gets its own browser session; nothing is pooled or shared
/// between calls, so one client can serve concurrent requests.
pub struct AttendifyCoreClient<P = HttpProbe, L = ChromeLauncher> {
    config: PortalConfig,
    probe: P,
    launcher: L,
    schema: RowSchema,
    notifier: Option<Arc<dyn Notifier>>,
}

impl AttendifyCoreClient {
    /// Chrome-backed client with the default portal configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(PortalConfig::default())
    }

    /// Chrome-backed client configured from the environment (and `.env`).
    pub fn from_env() -> Result<Self> {
        Self::with_config(PortalConfig::from_env()?)
    }

    pub fn with_config(config: PortalConfig) -> Result<Self> {
        let probe = HttpProbe::new(config.timeouts.probe)?;
        Ok(Self::with_parts(config, probe, ChromeLauncher))
    }
}

impl<P, L> AttendifyCoreClient<P, L>
where
    P: AvailabilityProbe,
    L: SessionLauncher,
{
    pub fn with_parts(config: PortalConfig, probe: P, launcher: L) -> Self {
        Self {
            config,
            probe,
            launcher,
            schema: RowSchema::PORTAL,
            notifier: None,
        }
    }

    /// Sends a report email through `notifier` after each successful scrape
    /// made with [`scrape_and_notify`](Self::scrape_and_notify).
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_row_schema(mut self, schema: RowSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Validates the raw credential pair and scrapes.
    pub async fn scrape_attendance(&self, reg_no: &str, password: &str) -> ScrapeOutcome {
        match Credentials::new(reg_no, password) {
            Ok(credentials) => self.scrape(&credentials).await,
            Err(e) => ScrapeOutcome::Failed(ScrapeFailure::Unexpected(e.to_string())),
        }
    }

    /// Runs one full scrape. The browser session, if one was started, is
    /// closed before this returns.
    pub async fn scrape(&self, credentials: &Credentials) -> ScrapeOutcome {
        info!(reg_no = %credentials.reg_no, "Starting attendance scrape");

        let reachable = timeout(
            self.config.timeouts.probe,
            self.probe.is_reachable(&self.config.base_url),
        )
        .await
        .unwrap_or(false);
        if !reachable {
            warn!(url = %self.config.base_url, "Portal is unreachable");
            return ScrapeOutcome::Failed(ScrapeFailure::SiteUnreachable);
        }

        let mut session = match self.launcher.launch(&self.config.browser).await {
            Ok(session) => session,
            Err(e) => {
                error!("Could not start browser session: {}", e);
                return ScrapeOutcome::Failed(ScrapeFailure::Unexpected(format!(
                    "Could not start browser session: {}",
                    e
                )));
            }
        };

        let outcome = self.run_guarded(&mut session, credentials).await;

        if let Err(e) = session.close().await {
            warn!("Browser session did not close cleanly: {}", e);
        }

        match &outcome {
            ScrapeOutcome::Report(report) => info!(
                reg_no = %credentials.reg_no,
                percentage = report.percentage(),
                "Attendance scrape finished"
            ),
            ScrapeOutcome::Failed(failure) => {
                warn!(reg_no = %credentials.reg_no, kind = failure.kind(), "Attendance scrape failed")
            }
        }
        outcome
    }

    /// [`scrape`](Self::scrape), then hands a successful report to the
    /// notifier without waiting for delivery.
    pub async fn scrape_and_notify(&self, credentials: &Credentials) -> ScrapeOutcome {
        let outcome = self.scrape(credentials).await;

        if let (ScrapeOutcome::Report(report), Some(notifier)) = (&outcome, &self.notifier) {
            notify::dispatch_detached(
                Arc::clone(notifier),
                report.clone(),
                credentials.reg_no.clone(),
                self.config.mail_domain.clone(),
            );
        }

        outcome
    }

    /// Runs the stages, turning a panic inside any of them into an
    /// `unexpected` failure so the caller can still close the session.
    async fn run_guarded(
        &self,
        session: &mut L::Session,
        credentials: &Credentials,
    ) -> ScrapeOutcome {
        let pipeline = Pipeline::new(session, &self.config, credentials, self.schema);
        match AssertUnwindSafe(pipeline.run()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Scrape pipeline panicked: {}", message);
                ScrapeOutcome::Failed(ScrapeFailure::Unexpected(message))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "scrape pipeline panicked".to_string()
    }
}
