//! # Scan Orchestrator Module
//!
//! Runs one scan end to end: validate the request, fetch the page, analyze
//! it, search for the keyword and render the PDF report.
//!
//! ## Key Components
//!
//! - `ScanRequest`: the caller's input, validated before any network call
//! - `Scanner`: the pipeline, configured once and reusable across runs
//! - `ScanEvent`: ordered progress notifications
//! - `ScanHandle`: a scan running on a background task
//!
//! Stages run strictly in sequence. Cancellation is cooperative: the token is
//! checked between stages and raced against the fetch, and a cancelled run
//! writes no file.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::analyzer::analyze_page;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{Fetcher, FetcherConfig};
use crate::matcher::{DEFAULT_CONTEXT_RADIUS, Matcher, SearchOptions};
use crate::report::{ReportConfig, ReportData, ReportRenderer};

/// Input for a single scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Page to fetch; must use http or https
    pub url: String,

    /// Keyword to search for; surrounding whitespace is ignored
    pub keyword: String,

    /// Existing directory the report is written into
    pub output_dir: PathBuf,

    pub options: SearchOptions,
}

impl ScanRequest {
    pub fn new(
        url: impl Into<String>,
        keyword: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        options: SearchOptions,
    ) -> Self {
        Self {
            url: url.into(),
            keyword: keyword.into(),
            output_dir: output_dir.into(),
            options,
        }
    }

    /// Check the request and return the parsed URL
    ///
    /// # Errors
    ///
    /// `Error::Validation` for an empty keyword, a URL without an http(s)
    /// scheme or that does not parse, or a missing output directory.
    pub fn validate(&self) -> Result<Url> {
        if self.keyword.trim().is_empty() {
            return Err(Error::Validation("keyword must not be empty".to_string()));
        }

        let raw = self.url.trim();
        if !(raw.starts_with("http://") || raw.starts_with("https://")) {
            return Err(Error::Validation(format!(
                "URL must start with http:// or https://: {raw}"
            )));
        }
        let url =
            Url::parse(raw).map_err(|e| Error::Validation(format!("invalid URL {raw}: {e}")))?;

        if !self.output_dir.is_dir() {
            return Err(Error::Validation(format!(
                "output directory does not exist: {}",
                self.output_dir.display()
            )));
        }

        Ok(url)
    }

    /// The keyword as it is searched
    pub fn search_keyword(&self) -> &str {
        self.keyword.trim()
    }
}

/// Result of a successful scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Path of the written report
    pub path: PathBuf,

    /// Number of keyword occurrences found
    pub match_count: usize,
}

/// Progress milestones, emitted in this order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// The page request is about to be sent
    Connecting { url: String },

    /// The page arrived and its content is being analyzed
    Analyzing,

    /// The keyword search has started
    Searching { keyword: String },

    /// The search finished
    MatchesFound { count: usize },

    /// The PDF report is being built
    Rendering,

    /// The report was written
    Saved { path: PathBuf },
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEvent::Connecting { url } => write!(f, "Connecting to {url}..."),
            ScanEvent::Analyzing => write!(f, "Analyzing page content..."),
            ScanEvent::Searching { keyword } => write!(f, "Searching for '{keyword}'..."),
            ScanEvent::MatchesFound { count } => write!(f, "Found {count} matches."),
            ScanEvent::Rendering => write!(f, "Creating PDF report..."),
            ScanEvent::Saved { path } => {
                let name = path.file_name().map(Path::new).unwrap_or(path);
                write!(f, "PDF saved: {}", name.display())
            }
        }
    }
}

/// The scan pipeline
#[derive(Debug, Clone)]
pub struct Scanner {
    fetcher_config: FetcherConfig,
    report_config: ReportConfig,
    context_radius: usize,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(FetcherConfig::default(), ReportConfig::default())
    }
}

impl Scanner {
    pub fn new(fetcher_config: FetcherConfig, report_config: ReportConfig) -> Self {
        Self {
            fetcher_config,
            report_config,
            context_radius: DEFAULT_CONTEXT_RADIUS,
        }
    }

    /// Build a scanner from the application settings
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.fetcher_config(), config.report_config())
            .with_context_radius(config.context_radius())
    }

    /// Set the characters of context kept on each side of a match
    pub fn with_context_radius(mut self, context_radius: usize) -> Self {
        self.context_radius = context_radius;
        self
    }

    pub fn fetcher_config(&self) -> &FetcherConfig {
        &self.fetcher_config
    }

    pub fn report_config(&self) -> &ReportConfig {
        &self.report_config
    }

    /// Run a scan, reporting progress through `progress`
    ///
    /// # Returns
    ///
    /// The report path and match count. On failure no report file exists.
    #[instrument(skip_all, fields(url = %request.url, keyword = %request.keyword))]
    pub async fn run<F>(
        &self,
        request: &ScanRequest,
        mut progress: F,
        token: &CancellationToken,
    ) -> Result<ScanOutcome>
    where
        F: FnMut(ScanEvent),
    {
        let url = request.validate()?;
        // Shown as typed; `Url` normalizes e.g. a bare host to `host/`
        let display_url = request.url.trim();
        let keyword = request.search_keyword();
        let matcher =
            Matcher::new(keyword, request.options)?.with_context_radius(self.context_radius);
        ensure_active(token)?;

        progress(ScanEvent::Connecting {
            url: display_url.to_string(),
        });
        let fetcher = Fetcher::new(self.fetcher_config.clone())?;
        let page = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Cancelled),
            page = fetcher.fetch(&url) => page?,
        };
        debug!(
            status = page.status,
            bytes = page.body.len(),
            final_url = %page.final_url,
            "Page fetched"
        );
        ensure_active(token)?;

        progress(ScanEvent::Analyzing);
        let mut analyzed = analyze_page(&page.body, &page.requested_url);
        analyzed.info.url = display_url.to_string();
        if analyzed.text.is_empty() {
            warn!("No visible text found on {}", page.requested_url);
        }
        ensure_active(token)?;

        progress(ScanEvent::Searching {
            keyword: keyword.to_string(),
        });
        let matches = matcher.find_all(&analyzed.text);
        progress(ScanEvent::MatchesFound {
            count: matches.len(),
        });
        ensure_active(token)?;

        progress(ScanEvent::Rendering);
        let data = ReportData {
            page: &analyzed.info,
            keyword,
            options: request.options,
            matches: &matches,
        };
        let renderer = ReportRenderer::new(self.report_config.clone());
        let path = renderer
            .render(&data, &request.output_dir, Local::now())
            .await?;

        progress(ScanEvent::Saved { path: path.clone() });
        info!(
            matches = matches.len(),
            "Scan finished, report at {}",
            path.display()
        );

        Ok(ScanOutcome {
            path,
            match_count: matches.len(),
        })
    }

    /// Run a scan on a background task
    pub fn spawn(self, request: ScanRequest) -> ScanHandle {
        let (tx, events) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            self.run(
                &request,
                |event| {
                    // The receiver may already be gone; the run still completes.
                    let _ = tx.send(event);
                },
                &task_token,
            )
            .await
        });

        ScanHandle {
            events,
            token,
            task,
        }
    }
}

/// Run a scan with default settings
pub async fn start<F>(
    url: &str,
    keyword: &str,
    output_dir: &Path,
    options: SearchOptions,
    progress: F,
) -> Result<ScanOutcome>
where
    F: FnMut(ScanEvent),
{
    let request = ScanRequest::new(url, keyword, output_dir, options);
    Scanner::default()
        .run(&request, progress, &CancellationToken::new())
        .await
}

/// A scan running on a background task
#[derive(Debug)]
pub struct ScanHandle {
    events: mpsc::UnboundedReceiver<ScanEvent>,
    token: CancellationToken,
    task: JoinHandle<Result<ScanOutcome>>,
}

impl ScanHandle {
    /// Next progress event, or `None` once the scan has stopped emitting
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        self.events.recv().await
    }

    /// Ask the scan to stop at the next stage boundary
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token controlling this scan
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the scan to finish
    pub async fn join(self) -> Result<ScanOutcome> {
        self.task
            .await
            .map_err(|e| Error::Other(format!("scan task failed: {e}")))?
    }
}

fn ensure_active(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        info!("Scan cancelled");
        return Err(Error::Cancelled);
    }
    Ok(())
}
