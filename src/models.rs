use crate::error::{Result, ScraperError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Login credentials for the student portal, supplied per request.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Registration number, also used as the portal login id.
    pub reg_no: String,
    pub password: String,
}

impl Credentials {
    /// Builds a credential pair, rejecting blank values.
    pub fn new(reg_no: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let reg_no = reg_no.into();
        let password = password.into();

        if reg_no.trim().is_empty() {
            return Err(ScraperError::InvalidInput("registration number is empty"));
        }
        if password.is_empty() {
            return Err(ScraperError::InvalidInput("password is empty"));
        }

        Ok(Self { reg_no, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("reg_no", &self.reg_no)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Profile metadata shown at the top of the authenticated page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Student's full name, or `"Unknown"`.
    pub name: String,
    /// Roll number as printed by the portal, or `"Not Found"`.
    pub roll_number: String,
    /// Absolute URL of the profile photo, or `"Image not found"`.
    pub image_url: String,
}

/// Attendance for a single subject.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SubjectRecord {
    /// Classes the student attended, as the portal printed it.
    pub present: i64,
    /// Classes held so far.
    pub conducted: i64,
    /// `conducted - present`. Negative when the portal reports more
    /// attended classes than were conducted.
    pub absent: i64,
}

impl SubjectRecord {
    pub fn new(present: i64, conducted: i64) -> Self {
        Self {
            present,
            conducted,
            absent: conducted - present,
        }
    }
}

/// Running totals over parsed attendance rows.
///
/// Totals include every row fed in; a repeated subject code replaces the
/// earlier entry in the subject map but both rows still count.
#[derive(Debug, Default, Clone)]
pub struct AttendanceTally {
    subjects: BTreeMap<String, SubjectRecord>,
    total_present: i64,
    total_conducted: i64,
}

impl AttendanceTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, code: impl Into<String>, record: SubjectRecord) {
        self.total_present += record.present;
        self.total_conducted += record.conducted;
        self.subjects.insert(code.into(), record);
    }

    pub fn finish(self, profile: Profile) -> AttendanceReport {
        AttendanceReport {
            name: profile.name,
            roll_number: profile.roll_number,
            image_url: profile.image_url,
            total_classes: self.total_conducted,
            present: self.total_present,
            absent: self.total_conducted - self.total_present,
            percentage: attendance_percentage(self.total_present, self.total_conducted),
            subjects: self.subjects,
        }
    }
}

/// `present / conducted * 100` rounded to two decimals, `0.0` when nothing
/// has been conducted.
///
/// Exact halves round to the even neighbour, so 1 of 160 is `0.62`.
pub fn attendance_percentage(present: i64, conducted: i64) -> f64 {
    if conducted == 0 {
        return 0.0;
    }
    let raw = present as f64 / conducted as f64 * 100.0;
    (raw * 100.0).round_ties_even() / 100.0
}

/// The finished attendance report for one scrape.
///
/// Built once through [`AttendanceTally::finish`] and read-only afterwards.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AttendanceReport {
    name: String,
    roll_number: String,
    image_url: String,
    total_classes: i64,
    present: i64,
    absent: i64,
    percentage: f64,
    subjects: BTreeMap<String, SubjectRecord>,
}

impl AttendanceReport {
    /// Report for an account whose attendance panel never rendered.
    pub fn empty(profile: Profile) -> Self {
        AttendanceTally::new().finish(profile)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roll_number(&self) -> &str {
        &self.roll_number
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Sum of conducted classes across subjects.
    pub fn total_classes(&self) -> i64 {
        self.total_classes
    }

    pub fn present(&self) -> i64 {
        self.present
    }

    pub fn absent(&self) -> i64 {
        self.absent
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn subjects(&self) -> &BTreeMap<String, SubjectRecord> {
        &self.subjects
    }
}

/// Classified reasons a scrape produced no report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeFailure {
    /// The preflight probe could not reach the portal.
    SiteUnreachable,
    /// The login was rejected, or no verdict arrived in time.
    InvalidCredentials,
    /// The portal's pages did not have the expected structure.
    ExtractionFailed(String),
    /// Anything else that went wrong inside the pipeline.
    Unexpected(String),
}

impl ScrapeFailure {
    /// Stable machine-readable key.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeFailure::SiteUnreachable => "site_unreachable",
            ScrapeFailure::InvalidCredentials => "invalid_credentials",
            ScrapeFailure::ExtractionFailed(_) => "extraction_failed",
            ScrapeFailure::Unexpected(_) => "unexpected",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ScrapeFailure::SiteUnreachable => "Website is down".to_string(),
            ScrapeFailure::InvalidCredentials => "Your Login Credentials are incorrect".to_string(),
            ScrapeFailure::ExtractionFailed(detail) | ScrapeFailure::Unexpected(detail) => {
                detail.clone()
            }
        }
    }

    /// Suggested status for the HTTP layer answering the request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScrapeFailure::SiteUnreachable => StatusCode::SERVICE_UNAVAILABLE,
            ScrapeFailure::InvalidCredentials => StatusCode::BAD_REQUEST,
            ScrapeFailure::ExtractionFailed(_) | ScrapeFailure::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ScrapeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

/// The single result of a scrape call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Report(AttendanceReport),
    Failed(ScrapeFailure),
}

impl ScrapeOutcome {
    pub fn report(&self) -> Option<&AttendanceReport> {
        match self {
            ScrapeOutcome::Report(report) => Some(report),
            ScrapeOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ScrapeFailure> {
        match self {
            ScrapeOutcome::Report(_) => None,
            ScrapeOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ScrapeOutcome::Report(_) => StatusCode::OK,
            ScrapeOutcome::Failed(failure) => failure.status_code(),
        }
    }

    /// JSON body for the request layer: the report fields, or an object
    /// with `error` and `kind` keys.
    pub fn to_payload(&self) -> serde_json::Value {
        match self {
            ScrapeOutcome::Report(report) => {
                serde_json::to_value(report).unwrap_or_else(|err| {
                    serde_json::json!({ "error": err.to_string(), "kind": "unexpected" })
                })
            }
            ScrapeOutcome::Failed(failure) => serde_json::json!({
                "error": failure.message(),
                "kind": failure.kind(),
            }),
        }
    }
}
