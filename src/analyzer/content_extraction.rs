//! Content extraction functionality for the analyzer module

use scraper::{ElementRef, Html, Node, Selector};
use tracing::warn;
use url::Url;

use crate::analyzer::PageInfo;

/// Title used when the page has no usable `<title>`
pub const TITLE_FALLBACK: &str = "Title not found";

/// Description used when the page has no `<meta name="description">`
pub const DESCRIPTION_FALLBACK: &str = "No description found.";

/// Maximum number of characters kept from the meta description
pub const MAX_DESCRIPTION_CHARS: usize = 300;

/// Elements whose subtree never contributes visible text
const HIDDEN_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "link", "meta", "header", "footer", "nav",
];

/// Extract page metadata
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `url` - The URL the page was requested from
///
/// # Returns
///
/// Title, description and domain of the page, with fallbacks filled in
pub fn extract_page_info(document: &Html, url: &Url) -> PageInfo {
    let title = select_first(document, "title")
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| TITLE_FALLBACK.to_string());

    let description = select_first(document, "meta[name='description']")
        .and_then(|element| element.value().attr("content"))
        .map(truncate_description)
        .unwrap_or_else(|| DESCRIPTION_FALLBACK.to_string());

    PageInfo {
        title,
        url: url.to_string(),
        domain: domain_of(url),
        description,
    }
}

/// Produce the normalized visible text of the page body
///
/// `source` is the markup `document` was parsed from. The HTML5 parser
/// always synthesizes a `<body>`, so a page whose source has no body tag
/// yields empty text.
///
/// Hidden and structural elements are skipped together with everything
/// inside them. Remaining text nodes are trimmed, empty ones dropped, and the
/// rest joined by single spaces with inner whitespace runs collapsed.
pub fn normalized_text(document: &Html, source: &str) -> String {
    if !has_body_tag(source) {
        return String::new();
    }
    let Some(body) = select_first(document, "body") else {
        return String::new();
    };

    let mut pieces: Vec<&str> = Vec::new();
    // Depth-first, in document order, without recursion
    let mut stack = vec![*body];
    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pieces.push(trimmed);
                }
            }
            Node::Element(element) if HIDDEN_ELEMENTS.contains(&element.name()) => {}
            Node::Element(_) => {
                let children: Vec<_> = node.children().collect();
                stack.extend(children.into_iter().rev());
            }
            _ => {}
        }
    }

    pieces
        .iter()
        .flat_map(|piece| piece.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether the markup contains a `<body>` start tag, in any letter case
pub fn has_body_tag(source: &str) -> bool {
    const TAG: &[u8] = b"<body";
    let bytes = source.as_bytes();
    bytes.windows(TAG.len()).enumerate().any(|(i, window)| {
        window.eq_ignore_ascii_case(TAG)
            && bytes
                .get(i + TAG.len())
                .is_none_or(|&next| next == b'>' || next == b'/' || next.is_ascii_whitespace())
    })
}

/// Network location of the URL: host plus an explicit port
pub fn domain_of(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        let head: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        format!("{head}...")
    } else {
        description.to_string()
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).next(),
        Err(e) => {
            warn!("Failed to parse selector '{}': {}", selector, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_extract_page_info() {
        let html = r#"<html><head>
            <title>  Rust Weekly  </title>
            <meta name="description" content="News about Rust">
        </head><body><p>hi</p></body></html>"#;
        let document = Html::parse_document(html);
        let info = extract_page_info(&document, &url("https://blog.example.com/post?id=1"));

        assert_eq!(info.title, "Rust Weekly");
        assert_eq!(info.description, "News about Rust");
        assert_eq!(info.domain, "blog.example.com");
        assert_eq!(info.url, "https://blog.example.com/post?id=1");
    }

    #[test]
    fn test_missing_metadata_uses_fallbacks() {
        let document = Html::parse_document("<html><body>text</body></html>");
        let info = extract_page_info(&document, &url("http://localhost:8080/"));

        assert_eq!(info.title, TITLE_FALLBACK);
        assert_eq!(info.description, DESCRIPTION_FALLBACK);
        assert_eq!(info.domain, "localhost:8080");
    }

    #[test]
    fn test_long_description_is_truncated() {
        let long = "ç".repeat(350);
        let html = format!(r#"<html><head><meta name="description" content="{long}"></head></html>"#);
        let document = Html::parse_document(&html);
        let info = extract_page_info(&document, &url("https://example.com"));

        assert!(info.description.ends_with("..."));
        assert_eq!(info.description.chars().count(), MAX_DESCRIPTION_CHARS + 3);
    }

    #[test]
    fn test_description_at_limit_is_kept() {
        let exact = "a".repeat(MAX_DESCRIPTION_CHARS);
        assert_eq!(truncate_description(&exact), exact);
    }

    #[test]
    fn test_normalized_text_skips_hidden_elements() {
        let html = r#"<html><head><style>p { color: red }</style></head><body>
            <header>Site header</header>
            <nav><a href="/">Home</a></nav>
            <h1>Main   title</h1>
            <script>var x = "hidden";</script>
            <noscript>enable js</noscript>
            <p>First
               paragraph</p><p>Second</p>
            <footer>Copyright</footer>
        </body></html>"#;
        let document = Html::parse_document(html);

        assert_eq!(
            normalized_text(&document, html),
            "Main title First paragraph Second"
        );
    }

    #[test]
    fn test_normalized_text_keeps_document_order() {
        let html = "<body><div>a<span>b</span>c</div><div>d</div></body>";
        let document = Html::parse_document(html);
        assert_eq!(normalized_text(&document, html), "a b c d");
    }

    #[test]
    fn test_normalized_text_of_empty_body() {
        let html = "<html><body>  \n\t </body></html>";
        let document = Html::parse_document(html);
        assert_eq!(normalized_text(&document, html), "");
    }

    #[test]
    fn test_page_without_body_has_no_text() {
        let html = "<p>just a fragment cat</p>";
        let document = Html::parse_document(html);
        assert_eq!(normalized_text(&document, html), "");

        let html = "<html><head><title>t</title></head><p>cat</p></html>";
        let document = Html::parse_document(html);
        assert_eq!(normalized_text(&document, html), "");
    }

    #[test]
    fn test_body_tag_detection() {
        assert!(has_body_tag("<BODY class=\"x\">cat</BODY>"));
        assert!(has_body_tag("<html><Body>cat"));
        assert!(has_body_tag("<body/>"));
        assert!(!has_body_tag("<bodyguard>cat</bodyguard>"));
        assert!(!has_body_tag("<p>no body here</p>"));
    }
}
