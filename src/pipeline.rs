//! The scrape as an explicit forward-only state machine.
//!
//! `Init` and `AvailabilityChecked` are handled by the client before a
//! session exists, and closing the session happens after [`Pipeline::run`]
//! returns; the stages here cover everything in between.

use crate::config::PortalConfig;
use crate::driver::{self, LoginVerdict};
use crate::error::ScraperError;
use crate::extractor;
use crate::markup::RowSchema;
use crate::models::{AttendanceReport, Credentials, Profile, ScrapeFailure, ScrapeOutcome};
use crate::session::PortalSession;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    SessionOpen,
    FormReached,
    CredentialsSubmitted,
    AuthFailed,
    AuthOk,
    TableAbsent(Profile),
    TablePresent(Profile),
    Finished(ScrapeOutcome),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::SessionOpen => "session_open",
            Stage::FormReached => "form_reached",
            Stage::CredentialsSubmitted => "credentials_submitted",
            Stage::AuthFailed => "auth_failed",
            Stage::AuthOk => "auth_ok",
            Stage::TableAbsent(_) => "table_absent",
            Stage::TablePresent(_) => "table_present",
            Stage::Finished(_) => "finished",
        }
    }
}

/// Maps errors from the navigation and extraction stages.
///
/// Missing elements and elapsed waits point at a layout change on the
/// portal; everything else is unexpected.
fn classify(err: ScraperError) -> ScrapeFailure {
    match err {
        ScraperError::Timeout { .. } | ScraperError::ElementNotFound(_) => {
            ScrapeFailure::ExtractionFailed(err.to_string())
        }
        other => ScrapeFailure::Unexpected(other.to_string()),
    }
}

/// One scrape over an already opened session.
pub struct Pipeline<'a, S: PortalSession + ?Sized> {
    session: &'a mut S,
    config: &'a PortalConfig,
    credentials: &'a Credentials,
    schema: RowSchema,
}

impl<'a, S: PortalSession + ?Sized> Pipeline<'a, S> {
    pub fn new(
        session: &'a mut S,
        config: &'a PortalConfig,
        credentials: &'a Credentials,
        schema: RowSchema,
    ) -> Self {
        Self {
            session,
            config,
            credentials,
            schema,
        }
    }

    /// Drives the stages from `SessionOpen` to a finished outcome.
    pub async fn run(mut self) -> ScrapeOutcome {
        let mut stage = Stage::SessionOpen;
        loop {
            stage = match stage {
                Stage::Finished(outcome) => return outcome,
                current => {
                    let from = current.name();
                    let next = self.advance(current).await;
                    debug!(from, to = next.name(), "Stage transition");
                    next
                }
            };
        }
    }

    /// Performs the single transition out of `stage`.
    pub async fn advance(&mut self, stage: Stage) -> Stage {
        match stage {
            Stage::SessionOpen => self.reach_form().await,
            Stage::FormReached => self.submit().await,
            Stage::CredentialsSubmitted => self.verify_login().await,
            Stage::AuthFailed => Stage::Finished(ScrapeOutcome::Failed(
                ScrapeFailure::InvalidCredentials,
            )),
            Stage::AuthOk => self.locate_table().await,
            Stage::TableAbsent(profile) => {
                Stage::Finished(ScrapeOutcome::Report(AttendanceReport::empty(profile)))
            }
            Stage::TablePresent(profile) => self.parse_rows(profile).await,
            finished @ Stage::Finished(_) => finished,
        }
    }

    async fn reach_form(&mut self) -> Stage {
        let timeouts = self.config.timeouts;
        match driver::open_login_form(&mut *self.session, &self.config.base_url, &timeouts).await {
            Ok(()) => Stage::FormReached,
            Err(e) => Stage::Finished(ScrapeOutcome::Failed(classify(e))),
        }
    }

    async fn submit(&mut self) -> Stage {
        match driver::submit_credentials(&mut *self.session, self.credentials).await {
            Ok(()) => Stage::CredentialsSubmitted,
            Err(e) => Stage::Finished(ScrapeOutcome::Failed(classify(e))),
        }
    }

    /// Any problem while waiting for the verdict counts as a rejection.
    async fn verify_login(&mut self) -> Stage {
        let timeouts = self.config.timeouts;
        match driver::await_login_verdict(&mut *self.session, &timeouts).await {
            Ok(LoginVerdict::Accepted) => Stage::AuthOk,
            Ok(LoginVerdict::Rejected) => Stage::AuthFailed,
            Ok(LoginVerdict::NoSignal) => {
                warn!(bound = ?timeouts.login_verdict, "No login verdict, treating as rejected");
                Stage::AuthFailed
            }
            Err(e) => {
                warn!("Error during login validation: {}", e);
                Stage::AuthFailed
            }
        }
    }

    async fn locate_table(&mut self) -> Stage {
        let profile = match extractor::read_profile(&mut *self.session, &self.config.base_url).await
        {
            Ok(profile) => profile,
            Err(e) => return Stage::Finished(ScrapeOutcome::Failed(classify(e))),
        };

        let timeouts = self.config.timeouts;
        match extractor::await_attendance_table(&mut *self.session, &timeouts).await {
            Ok(true) => Stage::TablePresent(profile),
            Ok(false) => Stage::TableAbsent(profile),
            Err(e) => Stage::Finished(ScrapeOutcome::Failed(classify(e))),
        }
    }

    async fn parse_rows(&mut self, profile: Profile) -> Stage {
        match extractor::read_attendance(&mut *self.session, &self.schema, profile).await {
            Ok(report) => Stage::Finished(ScrapeOutcome::Report(report)),
            Err(e) => Stage::Finished(ScrapeOutcome::Failed(classify(e))),
        }
    }
}
