// Declare all our modules
mod browser;
mod client;
mod config;
pub mod driver;
mod error;
pub mod extractor;
pub mod markup;
mod models;
pub mod notify;
pub mod parsers;
pub mod pipeline;
mod probe;
pub mod session;

// Publicly export the parts of our library that users will need
pub use browser::{ChromeLauncher, ChromeSession};
pub use client::AttendifyCoreClient;
pub use config::{BrowserSettings, PortalConfig, Timeouts};
pub use driver::LoginVerdict;
pub use error::{Result, ScraperError};
pub use models::*; // Credentials, AttendanceReport, ScrapeOutcome, ...
pub use notify::{Notifier, ReportEmail};
pub use probe::{AvailabilityProbe, HttpProbe};
pub use session::{PortalSession, SessionLauncher};
