//! # Report Renderer Module
//!
//! Builds the PDF report for a scan: a title, a summary table describing the
//! page and the search, then one highlighted box per match (or a notice when
//! nothing matched).
//!
//! ## Key Components
//!
//! - `ReportData`: the page metadata, keyword, options and matches to render
//! - `ReportRenderer`: lays the report out and writes it to disk
//! - `output_file_name`: the `Rapor_<keyword>_<timestamp>.pdf` naming rule
//!
//! Rendering happens fully in memory; the file is written only once the
//! whole document has been serialized.

mod config;
mod document;
mod error;
mod fonts;
mod markup;
mod pdf;

pub use config::{DEFAULT_HIGHLIGHT_COLOR, PageSize, ReportConfig, ReportConfigBuilder};
pub use document::{
    Block, NO_MATCHES_NOTICE, REPORT_TITLE, ReportData, SummaryRow, build_blocks, case_label,
    match_type_label,
};
pub use error::RenderError;
pub use fonts::{BOLD_FILE, FontFile, FontFiles, REGULAR_FILE, default_font_dirs};
pub use markup::{Rgb, Span, escape_markup, highlight_keyword, parse_markup, plain_text};

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::{debug, info, instrument};

use fonts::Fonts;
use pdf::PdfLayout;

/// Report file name for `keyword` generated at `timestamp`
///
/// Characters other than word characters, whitespace and hyphens are
/// dropped, the result is trimmed and spaces become underscores.
pub fn output_file_name(keyword: &str, timestamp: NaiveDateTime) -> String {
    let kept: String = keyword
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();
    let safe_keyword = kept.trim().replace(' ', "_");
    format!("Rapor_{}_{}.pdf", safe_keyword, timestamp.format("%Y%m%d_%H%M%S"))
}

/// Renders scan reports to PDF
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    config: ReportConfig,
}

impl ReportRenderer {
    /// Create a renderer with the given configuration
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// The configuration this renderer uses
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Render the report into an in-memory PDF
    ///
    /// # Errors
    ///
    /// `RenderError::Font` when the report fonts cannot be found
    pub fn render_bytes(
        &self,
        data: &ReportData<'_>,
        generated_at: NaiveDateTime,
    ) -> Result<Vec<u8>, RenderError> {
        let blocks = build_blocks(data, generated_at, &self.config.highlight_color)?;
        debug!(blocks = blocks.len(), "Report blocks assembled");

        let files = FontFiles::locate(self.config.font_dir.as_deref())?;
        let mut layout = PdfLayout::new(&self.config, Fonts::new(&files)?);
        layout.add_blocks(&blocks)?;
        layout.finish(REPORT_TITLE)
    }

    /// Render the report and write it into `output_dir`
    ///
    /// # Returns
    ///
    /// The path of the written PDF
    #[instrument(skip(self, data), fields(keyword = data.keyword, matches = data.matches.len()))]
    pub async fn render(
        &self,
        data: &ReportData<'_>,
        output_dir: &Path,
        now: DateTime<Local>,
    ) -> Result<PathBuf, RenderError> {
        let is_dir = tokio::fs::metadata(output_dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(RenderError::OutputDir(output_dir.to_path_buf()));
        }

        let generated_at = now.naive_local();
        let bytes = self.render_bytes(data, generated_at)?;
        let path = output_dir.join(output_file_name(data.keyword, generated_at));
        tokio::fs::write(&path, &bytes).await?;

        info!("Report written to {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}
