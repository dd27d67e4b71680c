//! # Report Configuration Module
//!
//! Page geometry and typography for the PDF report.

use std::path::PathBuf;
use std::str::FromStr;

use crate::report::markup::Rgb;

/// Default emphasis color for keyword occurrences
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#e74c3c";

/// Supported page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Width and height in points
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            other => Err(format!("unsupported page size: {other}")),
        }
    }
}

/// Configuration for the report renderer
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Paper size
    pub page_size: PageSize,

    /// Margins in points
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,

    /// Base font size in points
    pub font_size: f32,

    /// Emphasis color for keyword occurrences, as `#rrggbb`
    pub highlight_color: String,

    /// Directory holding the report fonts; searched for when unset
    pub font_dir: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin_top: 72.0,
            margin_bottom: 72.0,
            margin_left: 72.0,
            margin_right: 72.0,
            font_size: 10.0,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
            font_dir: None,
        }
    }
}

/// Builder for ReportConfig
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl ReportConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ReportConfig::default(),
        }
    }

    /// Set the page size
    pub fn page_size(mut self, page_size: PageSize) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Set all four margins
    pub fn margins(mut self, top: f32, bottom: f32, left: f32, right: f32) -> Self {
        self.config.margin_top = top;
        self.config.margin_bottom = bottom;
        self.config.margin_left = left;
        self.config.margin_right = right;
        self
    }

    /// Set the base font size
    pub fn font_size(mut self, font_size: f32) -> Self {
        self.config.font_size = font_size;
        self
    }

    /// Set the keyword emphasis color. Unparseable colors are ignored.
    pub fn highlight_color(mut self, color: impl Into<String>) -> Self {
        let color = color.into();
        if Rgb::parse(&color).is_some() {
            self.config.highlight_color = color;
        } else {
            tracing::warn!("Ignoring invalid highlight color {:?}", color);
        }
        self
    }

    /// Load the report fonts from `dir` instead of searching for them
    pub fn font_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.font_dir = Some(dir.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> ReportConfig {
        self.config
    }
}

impl ReportConfig {
    /// Create a new builder
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::new()
    }

    /// Width available for content between the side margins
    pub fn content_width(&self) -> f32 {
        let (width, _) = self.page_size.dimensions();
        (width - self.margin_left - self.margin_right).max(72.0)
    }
}
