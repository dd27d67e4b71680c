//! # pagegrep - Keyword Reports for Web Pages
//!
//! This crate fetches a single web page, extracts its visible text, finds every
//! occurrence of a keyword and writes the matches, each with its surrounding
//! context, into a PDF report.
//!
//! ## Features
//!
//! - Browser-like page fetching with a bounded timeout and redirect following
//! - Visible-text extraction that skips scripts, styles and page chrome
//! - Literal keyword search, optionally case sensitive or whole word only
//! - Paginated PDF reports with a summary table and highlighted matches
//! - JSON configuration merged over built-in defaults
//! - Background scans with ordered progress events and cooperative cancellation
//!
//! ## Example
//!
//! ```rust,no_run
//! use pagegrep::matcher::SearchOptions;
//! use pagegrep::scan::{ScanRequest, Scanner};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = ScanRequest::new(
//!         "https://www.rust-lang.org",
//!         "memory",
//!         ".",
//!         SearchOptions::new(false, true),
//!     );
//!
//!     let outcome = Scanner::default()
//!         .run(&request, |event| println!("{event}"), &CancellationToken::new())
//!         .await?;
//!
//!     println!("{} matches saved to {}", outcome.match_count, outcome.path.display());
//!     Ok(())
//! }
//! ```

mod error;

pub mod analyzer;
pub mod config;
pub mod fetcher;
pub mod matcher;
pub mod report;
pub mod scan;

pub use error::{Error, Result};

/// Re-export of commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::matcher::SearchOptions;
    pub use crate::scan::{ScanEvent, ScanOutcome, ScanRequest, Scanner};
}
