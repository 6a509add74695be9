//! Portal session driver: everything between a fresh browser and an
//! authenticated profile page.

use crate::config::Timeouts;
use crate::error::{Result, ScraperError};
use crate::markup::{
    DISPLAY_FIELD, ERROR_INDICATOR, FIXED_OVERLAY, PASSWORD_INPUT, REG_NO_INPUT, STUDENT_FORM,
    STUDENT_LINK, SUBMIT_BUTTON,
};
use crate::models::Credentials;
use crate::session::{Condition, PortalSession, wait_for, wait_for_first};
use tracing::{debug, info, warn};

/// What the portal signalled after the credentials were submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginVerdict {
    /// The profile marker rendered with no error indicator in sight.
    Accepted,
    /// The error indicator became visible.
    Rejected,
    /// Neither signal appeared within the bound.
    NoSignal,
}

/// Opens the landing page and brings up the student login form.
///
/// A timeout here means the page layout changed, not that the
/// credentials are wrong.
pub async fn open_login_form<S: PortalSession + ?Sized>(
    session: &mut S,
    base_url: &str,
    timeouts: &Timeouts,
) -> Result<()> {
    session.navigate(base_url).await?;

    if !wait_for(
        session,
        Condition::Clickable(STUDENT_LINK),
        timeouts.entry_point,
        timeouts.poll_interval,
    )
    .await?
    {
        return Err(ScraperError::Timeout {
            stage: "student entry point",
            bound: timeouts.entry_point,
        });
    }
    session.click(STUDENT_LINK).await?;

    if !wait_for(
        session,
        Condition::Visible(STUDENT_FORM),
        timeouts.login_form,
        timeouts.poll_interval,
    )
    .await?
    {
        return Err(ScraperError::Timeout {
            stage: "student login form",
            bound: timeouts.login_form,
        });
    }

    debug!("Student login form is visible");
    Ok(())
}

/// Fills the form and clicks submit, falling back to a script click when
/// the native click fails for any reason.
pub async fn submit_credentials<S: PortalSession + ?Sized>(
    session: &mut S,
    credentials: &Credentials,
) -> Result<()> {
    session.fill(REG_NO_INPUT, &credentials.reg_no).await?;
    session.fill(PASSWORD_INPUT, &credentials.password).await?;

    session.scroll_into_view(SUBMIT_BUTTON).await?;

    // The fixed bottom navbar overlaps the button on some window sizes.
    if let Err(e) = session.hide(FIXED_OVERLAY).await {
        debug!("Could not hide fixed overlay: {}", e);
    }

    if let Err(e) = session.click(SUBMIT_BUTTON).await {
        warn!("Native submit click failed ({}), retrying from script", e);
        session.script_click(SUBMIT_BUTTON).await?;
    }

    info!(reg_no = %credentials.reg_no, "Submitted login form");
    Ok(())
}

/// Waits for the first post-submit signal.
///
/// The error indicator is checked before the profile marker on every poll,
/// so a page showing both counts as a rejection.
pub async fn await_login_verdict<S: PortalSession + ?Sized>(
    session: &mut S,
    timeouts: &Timeouts,
) -> Result<LoginVerdict> {
    let signals = [
        Condition::Visible(ERROR_INDICATOR),
        Condition::Present(DISPLAY_FIELD),
    ];

    let verdict = match wait_for_first(
        session,
        &signals,
        timeouts.login_verdict,
        timeouts.poll_interval,
    )
    .await?
    {
        Some(0) => LoginVerdict::Rejected,
        Some(_) => LoginVerdict::Accepted,
        None => LoginVerdict::NoSignal,
    };

    debug!(?verdict, "Login verdict");
    Ok(verdict)
}
