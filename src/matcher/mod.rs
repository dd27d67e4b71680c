//! # Keyword Matcher Module
//!
//! Finds every occurrence of a keyword in normalized page text and cuts a
//! context window around each one.
//!
//! ## Semantics
//!
//! - The keyword is always matched literally; pattern metacharacters in it
//!   are escaped.
//! - Whole-word mode wraps the keyword in `\b` assertions, so `cat` does not
//!   match inside `category`. Substring mode matches anywhere.
//! - Case-insensitive mode uses Unicode simple case folding. The context is
//!   always cut from the original text, so casing is preserved.
//! - Positions and context bounds are character offsets. Matches never
//!   overlap and are reported left to right, numbered from 1.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Characters of context kept on each side of a match
pub const DEFAULT_CONTEXT_RADIUS: usize = 150;

/// Flags controlling how a keyword is matched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Match only the exact casing of the keyword
    pub case_sensitive: bool,

    /// Match the keyword only when it is bounded by non-word characters
    pub whole_word: bool,
}

impl SearchOptions {
    /// Create options from the two flags
    pub fn new(case_sensitive: bool, whole_word: bool) -> Self {
        Self {
            case_sensitive,
            whole_word,
        }
    }
}

/// A single keyword occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Trimmed text surrounding the match
    pub context: String,

    /// Character offset of the match in the normalized text
    pub position: usize,

    /// 1-based sequence number in text order
    pub match_number: usize,
}

/// Build the regex used to find `keyword`
///
/// The report highlighter uses the same construction with `whole_word` off,
/// so emphasis follows the same case rule as the search.
pub fn keyword_regex(
    keyword: &str,
    case_sensitive: bool,
    whole_word: bool,
) -> std::result::Result<Regex, regex::Error> {
    let escaped = regex::escape(keyword);
    let pattern = if whole_word {
        format!(r"\b{escaped}\b")
    } else {
        escaped
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
}

/// Compiled keyword search
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    context_radius: usize,
}

impl Matcher {
    /// Compile a matcher for `keyword`
    ///
    /// An empty keyword is rejected.
    pub fn new(keyword: &str, options: SearchOptions) -> Result<Self> {
        if keyword.is_empty() {
            return Err(Error::Validation("keyword must not be empty".to_string()));
        }
        let regex = keyword_regex(keyword, options.case_sensitive, options.whole_word)?;
        Ok(Self {
            regex,
            context_radius: DEFAULT_CONTEXT_RADIUS,
        })
    }

    /// Use a different number of context characters on each side
    pub fn with_context_radius(mut self, context_radius: usize) -> Self {
        self.context_radius = context_radius;
        self
    }

    /// Find all matches in `text`
    pub fn find_all(&self, text: &str) -> Vec<MatchRecord> {
        // Byte offset of every char, plus the end of the text
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;
        let char_index = |byte: usize| boundaries.partition_point(|&b| b < byte);

        let matches: Vec<MatchRecord> = self
            .regex
            .find_iter(text)
            .enumerate()
            .map(|(i, m)| {
                let start = char_index(m.start());
                let end = char_index(m.end());
                let window_start = start.saturating_sub(self.context_radius);
                let window_end = end.saturating_add(self.context_radius).min(char_len);
                let context = text[boundaries[window_start]..boundaries[window_end]].trim();

                MatchRecord {
                    context: context.to_string(),
                    position: start,
                    match_number: i + 1,
                }
            })
            .collect();

        debug!(count = matches.len(), "Keyword search finished");
        matches
    }
}

/// Find all matches of `keyword` in `text` with the default context radius
pub fn find_matches(text: &str, keyword: &str, options: SearchOptions) -> Result<Vec<MatchRecord>> {
    Ok(Matcher::new(keyword, options)?.find_all(text))
}
