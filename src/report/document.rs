//! Report data assembly: the block sequence a report is laid out from.

use chrono::NaiveDateTime;

use crate::analyzer::PageInfo;
use crate::matcher::{MatchRecord, SearchOptions};
use crate::report::RenderError;
use crate::report::markup::{escape_markup, highlight_keyword};

pub const REPORT_TITLE: &str = "Website Keyword Report";
pub const SUMMARY_HEADING: &str = "Scan Summary";
pub const MATCHES_HEADING: &str = "Matches Found";
pub const NO_MATCHES_NOTICE: &str = "No matches were found on the page for the given keyword.";

const LINK_COLOR: &str = "#0000ff";
const MATCH_NUMBER_COLOR: &str = "#3498db";

/// Everything a report is rendered from
#[derive(Debug, Clone, Copy)]
pub struct ReportData<'a> {
    pub page: &'a PageInfo,
    pub keyword: &'a str,
    pub options: SearchOptions,
    pub matches: &'a [MatchRecord],
}

/// One row of the summary table; both cells are markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub label: String,
    pub value: String,
}

/// A unit of report layout. Text payloads are markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading(String),
    Spacer(f32),
    Summary(Vec<SummaryRow>),
    MatchHeader(String),
    MatchContext(String),
    Notice(String),
}

/// Label for the case-sensitivity setting
pub fn case_label(options: SearchOptions) -> &'static str {
    if options.case_sensitive {
        "Sensitive"
    } else {
        "Insensitive"
    }
}

/// Label for the match-type setting
pub fn match_type_label(options: SearchOptions) -> &'static str {
    if options.whole_word {
        "Whole word"
    } else {
        "Substring"
    }
}

/// Assemble the report blocks
///
/// Page-derived strings and the keyword are escaped before they are placed in
/// markup. Matches are numbered by their position in `data.matches`.
pub fn build_blocks(
    data: &ReportData<'_>,
    generated_at: NaiveDateTime,
    highlight_color: &str,
) -> Result<Vec<Block>, RenderError> {
    let mut blocks = vec![
        Block::Title(escape_markup(REPORT_TITLE)),
        Block::Spacer(15.0),
        Block::Heading(escape_markup(SUMMARY_HEADING)),
        Block::Spacer(10.0),
        Block::Summary(summary_rows(data, generated_at)),
        Block::Spacer(20.0),
    ];

    if data.matches.is_empty() {
        blocks.push(Block::Notice(escape_markup(NO_MATCHES_NOTICE)));
        return Ok(blocks);
    }

    blocks.push(Block::Heading(escape_markup(MATCHES_HEADING)));
    blocks.push(Block::Spacer(10.0));
    for (i, record) in data.matches.iter().enumerate() {
        blocks.push(Block::MatchHeader(format!(
            r#"<b><font color="{MATCH_NUMBER_COLOR}">Match #{}</font></b> (Position: {})"#,
            i + 1,
            record.position
        )));
        let context = highlight_keyword(
            &record.context,
            data.keyword,
            data.options.case_sensitive,
            highlight_color,
        )?;
        blocks.push(Block::MatchContext(format!("...{context}...")));
    }

    Ok(blocks)
}

fn summary_rows(data: &ReportData<'_>, generated_at: NaiveDateTime) -> Vec<SummaryRow> {
    let url = escape_markup(&data.page.url);
    let row = |label: &str, value: String| SummaryRow {
        label: format!("<b>{}</b>", escape_markup(label)),
        value,
    };

    vec![
        row("Page Title:", escape_markup(&data.page.title)),
        row(
            "URL:",
            format!(r#"<a href="{url}"><font color="{LINK_COLOR}">{url}</font></a>"#),
        ),
        row("Description:", escape_markup(&data.page.description)),
        row("Keyword:", escape_markup(data.keyword)),
        row("Matches Found:", data.matches.len().to_string()),
        row("Case:", case_label(data.options).to_string()),
        row("Match Type:", match_type_label(data.options).to_string()),
        row(
            "Report Date:",
            generated_at.format("%d.%m.%Y %H:%M:%S").to_string(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::markup::{parse_markup, plain_text};
    use chrono::NaiveDate;

    fn page() -> PageInfo {
        PageInfo {
            title: "Tom & Jerry <Official>".to_string(),
            url: "https://example.com/?a=1&b=2".to_string(),
            domain: "example.com".to_string(),
            description: "Cartoons".to_string(),
        }
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    fn record(n: usize, position: usize, context: &str) -> MatchRecord {
        MatchRecord {
            context: context.to_string(),
            position,
            match_number: n,
        }
    }

    #[test]
    fn test_no_matches_renders_notice() {
        let page = page();
        let data = ReportData {
            page: &page,
            keyword: "cat",
            options: SearchOptions::default(),
            matches: &[],
        };
        let blocks = build_blocks(&data, timestamp(), "#e74c3c").unwrap();

        assert_eq!(
            blocks.last(),
            Some(&Block::Notice(NO_MATCHES_NOTICE.to_string()))
        );
        assert!(!blocks.iter().any(|b| matches!(b, Block::MatchHeader(_))));
        assert!(!blocks.contains(&Block::Heading(MATCHES_HEADING.to_string())));
    }

    #[test]
    fn test_summary_rows() {
        let page = page();
        let matches = [record(1, 3, "a cat b")];
        let data = ReportData {
            page: &page,
            keyword: "cat",
            options: SearchOptions::new(true, true),
            matches: &matches,
        };
        let blocks = build_blocks(&data, timestamp(), "#e74c3c").unwrap();
        let Some(Block::Summary(rows)) = blocks.iter().find(|b| matches!(b, Block::Summary(_)))
        else {
            panic!("summary table missing");
        };

        let values: Vec<String> = rows.iter().map(|r| plain_text(&r.value).unwrap()).collect();
        assert_eq!(
            values,
            vec![
                "Tom & Jerry <Official>",
                "https://example.com/?a=1&b=2",
                "Cartoons",
                "cat",
                "1",
                "Sensitive",
                "Whole word",
                "09.03.2025 14:05:07",
            ]
        );

        let url_spans = parse_markup(&rows[1].value).unwrap();
        assert_eq!(
            url_spans[0].link.as_deref(),
            Some("https://example.com/?a=1&b=2")
        );
    }

    #[test]
    fn test_match_blocks_are_numbered_and_highlighted() {
        let page = page();
        let matches = [record(1, 0, "Cat here"), record(2, 40, "more <cat>")];
        let data = ReportData {
            page: &page,
            keyword: "cat",
            options: SearchOptions::default(),
            matches: &matches,
        };
        let blocks = build_blocks(&data, timestamp(), "#e74c3c").unwrap();

        let headers: Vec<String> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::MatchHeader(m) => Some(plain_text(m).unwrap()),
                _ => None,
            })
            .collect();
        assert_eq!(headers, vec!["Match #1 (Position: 0)", "Match #2 (Position: 40)"]);

        let contexts: Vec<&String> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::MatchContext(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(plain_text(contexts[1]).unwrap(), "...more <cat>...");
        let emphasized: Vec<String> = parse_markup(contexts[0])
            .unwrap()
            .into_iter()
            .filter(|s| s.bold)
            .map(|s| s.text)
            .collect();
        assert_eq!(emphasized, vec!["Cat"]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(case_label(SearchOptions::new(false, false)), "Insensitive");
        assert_eq!(match_type_label(SearchOptions::new(false, false)), "Substring");
        assert_eq!(match_type_label(SearchOptions::new(false, true)), "Whole word");
    }
}
