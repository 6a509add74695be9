use crate::models::AttendanceReport;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const REPORT_SUBJECT: &str = "Your Attendance Report";

/// A composed report email, ready for whatever transport delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Delivery backend for report emails.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, email: &ReportEmail) -> Result<(), String>;
}

/// Institutional address of the student with `reg_no`.
pub fn recipient_for(reg_no: &str, mail_domain: &str) -> String {
    format!("{}@{}", reg_no.trim(), mail_domain)
}

fn feedback(percentage: f64) -> &'static str {
    if percentage >= 80.0 {
        "Excellent work! Your consistency is commendable."
    } else if percentage >= 75.0 {
        "Good going! Aim a little higher for excellence."
    } else {
        "Your attendance is below expected levels. Please improve to stay eligible."
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds the report email sent after a successful scrape.
pub fn compose_report_email<Tz>(
    report: &AttendanceReport,
    reg_no: &str,
    mail_domain: &str,
    sent_at: &DateTime<Tz>,
) -> ReportEmail
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let timestamp = sent_at.format("%d-%b-%Y %I:%M %p");
    let name = escape_html(report.name());
    let roll = escape_html(reg_no);

    let html_body = format!(
        r#"<html>
<head>
  <style>
    table {{ border-collapse: collapse; width: 100%; max-width: 400px; font-family: Arial, sans-serif; }}
    th, td {{ border: 1px solid #ddd; padding: 8px 12px; text-align: left; }}
    th {{ background-color: #4CAF50; color: white; font-weight: bold; }}
    h2 {{ font-family: Arial, sans-serif; color: #333; }}
    p {{ font-family: Arial, sans-serif; color: #555; }}
  </style>
</head>
<body>
  <p>Hello MITSian,</p>
  <p><b>Name:</b> {name}<br/>
  <b>Roll No:</b> {roll}<br/>
  <b>Date &amp; Time:</b> {timestamp}</p>
  <h2>Here's your latest Attendance Report:</h2>
  <table>
    <tr><th>Category</th><th>Details</th></tr>
    <tr><td><b>Total Classes Conducted</b></td><td>{total}</td></tr>
    <tr><td><b>Classes Attended</b></td><td>{present}</td></tr>
    <tr><td><b>Classes Missed</b></td><td>{absent}</td></tr>
    <tr><td><b>Attendance Percentage</b></td><td>{percentage}%</td></tr>
  </table>
  <p><b>Feedback:</b> {feedback}</p>
  <p>Note: This attendance is calculated using the base formula:<br/>
  (Total Attended / Total Conducted) &times; 100</p>
  <p>&ndash; MITS Attendance System</p>
</body>
</html>
"#,
        total = report.total_classes(),
        present = report.present(),
        absent = report.absent(),
        percentage = report.percentage(),
        feedback = feedback(report.percentage()),
    );

    ReportEmail {
        to: recipient_for(reg_no, mail_domain),
        subject: REPORT_SUBJECT.to_string(),
        html_body,
    }
}

/// Composes and delivers the report on a detached task.
///
/// The scrape result is already settled when this is called; a failed
/// delivery is only logged.
pub fn dispatch_detached(
    notifier: Arc<dyn Notifier>,
    report: AttendanceReport,
    reg_no: String,
    mail_domain: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let email = compose_report_email(&report, &reg_no, &mail_domain, &Local::now());
        match notifier.deliver(&email).await {
            Ok(()) => info!(to = %email.to, "Attendance report email sent"),
            Err(e) => warn!(to = %email.to, "Attendance report email failed: {}", e),
        }
    })
}
