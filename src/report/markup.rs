//! Inline markup used for report text.
//!
//! Report strings carry a tiny tag language: `<b>`, `<font color="...">` and
//! `<a href="...">`, with `&amp;`, `&lt;`, `&gt;` and `&quot;` entities. Any
//! text coming from the page or the user goes through [`escape_markup`]
//! before tags are wrapped around it, so it can only ever become literal
//! characters in the document.

use crate::matcher::keyword_regex;
use crate::report::RenderError;

/// An RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `#rgb` or one of a few color names
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "black" => return Some(Self::BLACK),
            "red" => return Some(Self::new(1.0, 0.0, 0.0)),
            "green" => return Some(Self::new(0.0, 0.5, 0.0)),
            "blue" => return Some(Self::new(0.0, 0.0, 1.0)),
            _ => {}
        }

        let hex = value.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| f32::from(v) / 255.0);
        match hex.len() {
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let doubled: String = hex.chars().flat_map(|c| [c, c]).collect();
                Self::parse(&format!("#{doubled}"))
            }
            _ => None,
        }
    }
}

/// A run of text with uniform style
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub color: Option<Rgb>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Style {
    bold: bool,
    color: Option<Rgb>,
    link: Option<String>,
}

/// Escape the characters that have meaning in report markup
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape `text` and emphasize every occurrence of `keyword` in it.
///
/// Occurrences are located in the raw text with the matcher's case rule (as
/// a substring), then each piece is escaped on its own and only the escaped
/// keyword pieces get wrapped in emphasis tags.
pub fn highlight_keyword(
    text: &str,
    keyword: &str,
    case_sensitive: bool,
    color: &str,
) -> Result<String, RenderError> {
    if keyword.is_empty() {
        return Ok(escape_markup(text));
    }

    let regex = keyword_regex(keyword, case_sensitive, false)?;
    let color = escape_markup(color);
    let mut out = String::with_capacity(text.len() + 64);
    let mut last = 0;
    for m in regex.find_iter(text) {
        out.push_str(&escape_markup(&text[last..m.start()]));
        out.push_str(&format!(
            r#"<font color="{color}"><b>{}</b></font>"#,
            escape_markup(m.as_str())
        ));
        last = m.end();
    }
    out.push_str(&escape_markup(&text[last..]));
    Ok(out)
}

/// Parse markup into styled spans
pub fn parse_markup(markup: &str) -> Result<Vec<Span>, RenderError> {
    let mut spans = Vec::new();
    let mut stack: Vec<(String, Style)> = Vec::new();
    let mut buffer = String::new();
    let mut rest = markup;

    while let Some(c) = rest.chars().next() {
        match c {
            '<' => {
                let end = rest
                    .find('>')
                    .ok_or_else(|| RenderError::Markup(format!("unterminated tag in {markup:?}")))?;
                let tag = &rest[1..end];
                rest = &rest[end + 1..];

                let current = stack.last().map(|(_, s)| s.clone()).unwrap_or_default();
                flush(&mut spans, &mut buffer, &current);

                if let Some(closing) = tag.strip_prefix('/') {
                    match stack.pop() {
                        Some((name, _)) if name == closing.trim() => {}
                        _ => {
                            return Err(RenderError::Markup(format!(
                                "unexpected closing tag </{closing}>"
                            )));
                        }
                    }
                } else {
                    let (name, style) = open_tag(tag, current)?;
                    stack.push((name, style));
                }
            }
            '&' => {
                let end = rest
                    .find(';')
                    .ok_or_else(|| RenderError::Markup("unterminated entity".to_string()))?;
                buffer.push(decode_entity(&rest[1..end])?);
                rest = &rest[end + 1..];
            }
            _ => {
                buffer.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if let Some((name, _)) = stack.last() {
        return Err(RenderError::Markup(format!("unclosed tag <{name}>")));
    }
    flush(&mut spans, &mut buffer, &Style::default());
    Ok(spans)
}

/// Plain text of a markup string
pub fn plain_text(markup: &str) -> Result<String, RenderError> {
    Ok(parse_markup(markup)?
        .into_iter()
        .map(|span| span.text)
        .collect())
}

fn flush(spans: &mut Vec<Span>, buffer: &mut String, style: &Style) {
    if buffer.is_empty() {
        return;
    }
    spans.push(Span {
        text: std::mem::take(buffer),
        bold: style.bold,
        color: style.color,
        link: style.link.clone(),
    });
}

fn open_tag(tag: &str, mut style: Style) -> Result<(String, Style), RenderError> {
    let tag = tag.trim();
    let (name, attrs) = tag.split_once(char::is_whitespace).unwrap_or((tag, ""));
    let attrs = parse_attributes(attrs)?;
    let attr = |key: &str| {
        attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| RenderError::Markup(format!("<{name}> requires a {key} attribute")))
    };

    match name {
        "b" => style.bold = true,
        "font" => {
            let value = attr("color")?;
            let color = Rgb::parse(&value)
                .ok_or_else(|| RenderError::Markup(format!("invalid color {value:?}")))?;
            style.color = Some(color);
        }
        "a" => style.link = Some(attr("href")?),
        other => return Err(RenderError::Markup(format!("unknown tag <{other}>"))),
    }
    Ok((name.to_string(), style))
}

fn parse_attributes(mut input: &str) -> Result<Vec<(String, String)>, RenderError> {
    let mut attrs = Vec::new();
    loop {
        input = input.trim_start();
        if input.is_empty() {
            return Ok(attrs);
        }
        let (key, after) = input
            .split_once('=')
            .ok_or_else(|| RenderError::Markup(format!("malformed attribute {input:?}")))?;
        let after = after.trim_start();
        let quote = after
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| RenderError::Markup(format!("unquoted attribute {key}")))?;
        let body = &after[1..];
        let end = body
            .find(quote)
            .ok_or_else(|| RenderError::Markup(format!("unterminated attribute {key}")))?;
        attrs.push((key.trim().to_string(), unescape(&body[..end])?));
        input = &body[end + 1..];
    }
}

fn unescape(value: &str) -> Result<String, RenderError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let end = rest[start..]
            .find(';')
            .ok_or_else(|| RenderError::Markup("unterminated entity".to_string()))?;
        out.push(decode_entity(&rest[start + 1..start + end])?);
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_entity(entity: &str) -> Result<char, RenderError> {
    match entity {
        "amp" => Ok('&'),
        "lt" => Ok('<'),
        "gt" => Ok('>'),
        "quot" => Ok('"'),
        "#39" | "apos" => Ok('\''),
        other => Err(RenderError::Markup(format!("unknown entity &{other};"))),
    }
}
