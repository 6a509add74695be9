//! Attendance extractor: reads the authenticated page into a report.

use crate::config::Timeouts;
use crate::error::Result;
use crate::markup::{ATTENDANCE_FRAGMENT, RowSchema};
use crate::models::{AttendanceReport, Profile};
use crate::parsers;
use crate::session::{Condition, PortalSession, wait_for};
use tracing::{info, warn};

/// Reads the profile header, resolving relative links against the page the
/// browser is actually on and falling back to `base_url`.
pub async fn read_profile<S: PortalSession + ?Sized>(
    session: &mut S,
    base_url: &str,
) -> Result<Profile> {
    let html = session.html().await?;
    let page_url = match session.current_url().await {
        Ok(Some(url)) => url,
        Ok(None) => base_url.to_string(),
        Err(e) => {
            warn!("Could not read current page URL: {}", e);
            base_url.to_string()
        }
    };
    Ok(parsers::profile::parse_profile_from_html(&html, &page_url))
}

/// Whether at least one attendance fragment rendered within the bound.
pub async fn await_attendance_table<S: PortalSession + ?Sized>(
    session: &mut S,
    timeouts: &Timeouts,
) -> Result<bool> {
    let present = wait_for(
        session,
        Condition::Present(ATTENDANCE_FRAGMENT),
        timeouts.attendance_table,
        timeouts.poll_interval,
    )
    .await?;

    if !present {
        warn!(bound = ?timeouts.attendance_table, "Attendance table not found");
    }
    Ok(present)
}

pub async fn read_attendance<S: PortalSession + ?Sized>(
    session: &mut S,
    schema: &RowSchema,
    profile: Profile,
) -> Result<AttendanceReport> {
    let html = session.html().await?;
    let fragments = parsers::attendance::count_fragments(&html);
    let report = parsers::attendance::parse_attendance_from_html(&html, schema).finish(profile);

    info!(
        fragments,
        subjects = report.subjects().len(),
        total_classes = report.total_classes(),
        percentage = report.percentage(),
        "Extracted attendance"
    );
    Ok(report)
}
