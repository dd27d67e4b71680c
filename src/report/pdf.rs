//! Page layout and PDF serialization with lopdf.
//!
//! Blocks are flowed top to bottom onto pages. Text is wrapped with the
//! embedded fonts' glyph widths; shaded boxes and table grids are plain
//! rectangle fills and strokes.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

use crate::report::RenderError;
use crate::report::config::ReportConfig;
use crate::report::document::{Block, SummaryRow};
use crate::report::fonts::{
    self, FontFace, Fonts, Glyph, glyph_bytes, pdf_text_string, text_width, to_unicode_cmap,
};
use crate::report::markup::{Rgb, Span, parse_markup};

const TITLE_SIZE: f32 = 20.0;
const TITLE_COLOR: Rgb = Rgb::new(0.173, 0.243, 0.314); // #2c3e50
const HEADING_SIZE: f32 = 14.0;
const HEADING_COLOR: Rgb = Rgb::new(0.204, 0.286, 0.369); // #34495e

const TABLE_LABEL_SHARE: f32 = 2.2 / 6.5;
const TABLE_PAD_X: f32 = 6.0;
const TABLE_PAD_Y: f32 = 8.0;
const TABLE_LABEL_FILL: Rgb = Rgb::new(0.941, 0.941, 0.941); // #f0f0f0
const TABLE_GRID: Rgb = Rgb::new(0.867, 0.867, 0.867); // #dddddd

const BOX_INDENT: f32 = 20.0;
const BOX_PADDING: f32 = 12.0;
const BOX_FILL: Rgb = Rgb::new(0.976, 0.976, 0.976); // #f9f9f9
const BOX_BORDER: Rgb = Rgb::new(0.8, 0.8, 0.8); // #cccccc

/// A run of shaped text with one style
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Run {
    pub glyphs: Vec<Glyph>,
    pub bold: bool,
    pub color: Rgb,
    pub link: Option<String>,
    pub width: f32,
}

/// One wrapped line
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Line {
    pub runs: Vec<Run>,
    pub width: f32,
}

impl Line {
    fn is_blank(&self) -> bool {
        self.runs.is_empty()
    }

    fn push(&mut self, glyphs: &[Glyph], span: &Span, font_size: f32) {
        let width = text_width(glyphs, font_size);
        let color = span.color.unwrap_or(Rgb::BLACK);
        self.width += width;
        if let Some(last) = self.runs.last_mut() {
            if last.bold == span.bold && last.color == color && last.link == span.link {
                last.glyphs.extend_from_slice(glyphs);
                last.width += width;
                return;
            }
        }
        self.runs.push(Run {
            glyphs: glyphs.to_vec(),
            bold: span.bold,
            color,
            link: span.link.clone(),
            width,
        });
    }

    /// Take the line out, dropping trailing spaces
    fn take_trimmed(&mut self, font_size: f32) -> Line {
        let mut line = std::mem::take(self);
        while let Some(last) = line.runs.last_mut() {
            while let Some(glyph) = last.glyphs.last().copied().filter(Glyph::is_space) {
                last.glyphs.pop();
                let w = text_width(&[glyph], font_size);
                last.width -= w;
                line.width -= w;
            }
            if last.glyphs.is_empty() {
                line.runs.pop();
            } else {
                break;
            }
        }
        line
    }
}

/// Number of leading glyphs of `word` that fit in `max_width`
fn fit_prefix(word: &[Glyph], font_size: f32, max_width: f32) -> usize {
    let mut width = 0.0;
    for (i, glyph) in word.iter().enumerate() {
        width += glyph.width * font_size / 1000.0;
        if width > max_width {
            return i;
        }
    }
    word.len()
}

/// Wrap styled spans into lines no wider than `max_width`
pub(crate) fn wrap(
    spans: &[Span],
    fonts: &mut Fonts<'_>,
    font_size: f32,
    max_width: f32,
) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::default();

    for span in spans {
        let face = fonts.face(span.bold);
        let space = face.glyph(' ');
        for (i, word) in span.text.split(char::is_whitespace).enumerate() {
            if i > 0 && !current.is_blank() {
                current.push(std::slice::from_ref(&space), span, font_size);
            }
            let glyphs = face.glyphs(word);
            let mut word = glyphs.as_slice();
            while !word.is_empty() {
                let width = text_width(word, font_size);
                if current.width + width <= max_width {
                    current.push(word, span, font_size);
                    break;
                }
                let trimmed = current.take_trimmed(font_size);
                if !trimmed.is_blank() {
                    lines.push(trimmed);
                    continue;
                }
                // Longer than a whole line: break inside the word
                let n = fit_prefix(word, font_size, max_width).max(1);
                current.push(&word[..n], span, font_size);
                lines.push(current.take_trimmed(font_size));
                word = &word[n..];
            }
        }
    }

    let last = current.take_trimmed(font_size);
    if !last.is_blank() {
        lines.push(last);
    }
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

#[derive(Debug, Default)]
struct PageContent {
    operations: Vec<Operation>,
    links: Vec<([f32; 4], String)>,
}

/// Flows blocks onto pages
pub(crate) struct PdfLayout<'a> {
    config: &'a ReportConfig,
    fonts: Fonts<'a>,
    page_height: f32,
    pages: Vec<PageContent>,
    y: f32,
}

impl<'a> PdfLayout<'a> {
    pub fn new(config: &'a ReportConfig, fonts: Fonts<'a>) -> Self {
        let (_, page_height) = config.page_size.dimensions();
        Self {
            config,
            fonts,
            page_height,
            pages: vec![PageContent::default()],
            y: page_height - config.margin_top,
        }
    }

    fn top(&self) -> f32 {
        self.page_height - self.config.margin_top
    }

    fn bottom(&self) -> f32 {
        self.config.margin_bottom
    }

    fn left(&self) -> f32 {
        self.config.margin_left
    }

    fn at_page_top(&self) -> bool {
        (self.y - self.top()).abs() < f32::EPSILON
    }

    fn new_page(&mut self) {
        self.pages.push(PageContent::default());
        self.y = self.top();
    }

    /// Start a new page unless `needed` points still fit
    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < self.bottom() && !self.at_page_top() {
            self.new_page();
        }
    }

    fn page(&mut self) -> &mut PageContent {
        if self.pages.is_empty() {
            self.pages.push(PageContent::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn add_blocks(&mut self, blocks: &[Block]) -> Result<(), RenderError> {
        let mut iter = blocks.iter().peekable();
        while let Some(block) = iter.next() {
            match block {
                Block::Title(markup) => {
                    let spans = emphasize(parse_markup(markup)?, TITLE_COLOR);
                    self.paragraph(&spans, TITLE_SIZE, TITLE_SIZE * 1.2, Align::Center, 0.0);
                    self.y -= 25.0;
                }
                Block::Heading(markup) => {
                    let spans = emphasize(parse_markup(markup)?, HEADING_COLOR);
                    self.ensure_space(HEADING_SIZE * 1.2 * 3.0);
                    self.paragraph(&spans, HEADING_SIZE, HEADING_SIZE * 1.2, Align::Left, 0.0);
                    self.y -= 15.0;
                }
                Block::Spacer(height) => {
                    self.y -= height;
                }
                Block::Summary(rows) => self.summary_table(rows)?,
                Block::MatchHeader(markup) => {
                    // Keep the header on the same page as the start of its box
                    let fs = self.config.font_size;
                    if matches!(iter.peek(), Some(Block::MatchContext(_))) {
                        self.ensure_space(fs * 1.4 + fs * 1.5 * 2.0 + BOX_PADDING * 2.0);
                    }
                    self.paragraph(&parse_markup(markup)?, fs, fs * 1.4, Align::Left, 0.0);
                    self.y -= 4.0;
                }
                Block::MatchContext(markup) => self.context_box(&parse_markup(markup)?),
                Block::Notice(markup) => {
                    let fs = self.config.font_size;
                    self.paragraph(&parse_markup(markup)?, fs, fs * 1.4, Align::Left, 0.0);
                }
            }
        }
        Ok(())
    }

    fn paragraph(&mut self, spans: &[Span], size: f32, leading: f32, align: Align, indent: f32) {
        let width = self.config.content_width() - indent;
        let x0 = self.left() + indent;
        for line in wrap(spans, &mut self.fonts, size, width) {
            self.ensure_space(leading);
            let x = match align {
                Align::Left => x0,
                Align::Center => x0 + (width - line.width).max(0.0) / 2.0,
            };
            let baseline = baseline_in_slot(self.y, leading, size);
            self.draw_line(&line, x, baseline, size);
            self.y -= leading;
        }
    }

    fn summary_table(&mut self, rows: &[SummaryRow]) -> Result<(), RenderError> {
        let fs = self.config.font_size;
        let leading = fs * 1.4;
        let total = self.config.content_width();
        let label_w = total * TABLE_LABEL_SHARE;
        let value_w = total - label_w;
        let max_lines = (((self.top() - self.bottom()) - TABLE_PAD_Y * 2.0) / leading)
            .floor()
            .max(1.0) as usize;

        for row in rows {
            let mut label = wrap(
                &parse_markup(&row.label)?,
                &mut self.fonts,
                fs,
                label_w - TABLE_PAD_X * 2.0,
            );
            let mut value = wrap(
                &parse_markup(&row.value)?,
                &mut self.fonts,
                fs,
                value_w - TABLE_PAD_X * 2.0,
            );
            label.truncate(max_lines);
            value.truncate(max_lines);

            let lines = label.len().max(value.len()).max(1);
            let row_h = lines as f32 * leading + TABLE_PAD_Y * 2.0;
            self.ensure_space(row_h);

            let x = self.left();
            let top = self.y;
            self.fill_rect(x, top - row_h, label_w, row_h, TABLE_LABEL_FILL);
            self.stroke_rect(x, top - row_h, label_w, row_h, TABLE_GRID);
            self.stroke_rect(x + label_w, top - row_h, value_w, row_h, TABLE_GRID);

            for (cell, cell_x) in [(&label, x), (&value, x + label_w)] {
                let mut slot = top - TABLE_PAD_Y;
                for line in cell.iter() {
                    let baseline = baseline_in_slot(slot, leading, fs);
                    self.draw_line(line, cell_x + TABLE_PAD_X, baseline, fs);
                    slot -= leading;
                }
            }
            self.y -= row_h;
        }
        Ok(())
    }

    /// Shaded, bordered box; splits across pages when it runs long
    fn context_box(&mut self, spans: &[Span]) {
        let fs = self.config.font_size;
        let leading = fs * 1.5;
        let box_w = self.config.content_width() - BOX_INDENT * 2.0;
        let lines = wrap(spans, &mut self.fonts, fs, box_w - BOX_PADDING * 2.0);
        let mut remaining = lines.as_slice();

        while !remaining.is_empty() {
            let mut fit = ((self.y - self.bottom() - BOX_PADDING * 2.0) / leading).floor();
            if fit < 1.0 && !self.at_page_top() {
                self.new_page();
                fit = ((self.y - self.bottom() - BOX_PADDING * 2.0) / leading).floor();
            }
            let take = (fit.max(1.0) as usize).min(remaining.len());
            let (chunk, rest) = remaining.split_at(take);

            let box_h = chunk.len() as f32 * leading + BOX_PADDING * 2.0;
            let x = self.left() + BOX_INDENT;
            let top = self.y;
            self.fill_rect(x, top - box_h, box_w, box_h, BOX_FILL);
            self.stroke_rect(x, top - box_h, box_w, box_h, BOX_BORDER);

            let mut slot = top - BOX_PADDING;
            for line in chunk {
                let baseline = baseline_in_slot(slot, leading, fs);
                self.draw_line(line, x + BOX_PADDING, baseline, fs);
                slot -= leading;
            }

            self.y -= box_h;
            remaining = rest;
            if !remaining.is_empty() {
                self.new_page();
            }
        }
        self.y -= 20.0;
    }

    fn draw_line(&mut self, line: &Line, x: f32, baseline: f32, size: f32) {
        let mut x = x;
        for run in &line.runs {
            let font = if run.bold { fonts::BOLD } else { fonts::REGULAR };
            let page = self.page();
            page.operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), real(size)]),
                Operation::new("rg", rgb_operands(run.color)),
                Operation::new("Td", vec![real(x), real(baseline)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        glyph_bytes(&run.glyphs),
                        StringFormat::Hexadecimal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ]);
            if let Some(uri) = &run.link {
                let rect = [x, baseline - size * 0.25, x + run.width, baseline + size * 0.9];
                page.links.push((rect, uri.clone()));
            }
            x += run.width;
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.page().operations.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", rgb_operands(color)),
            Operation::new("re", vec![real(x), real(y), real(w), real(h)]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.page().operations.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", rgb_operands(color)),
            Operation::new("w", vec![real(1.0)]),
            Operation::new("re", vec![real(x), real(y), real(w), real(h)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Serialize all pages into a PDF file image
    pub fn finish(self, title: &str) -> Result<Vec<u8>, RenderError> {
        let (page_width, page_height) = self.config.page_size.dimensions();
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = embed_font(&mut doc, &self.fonts.regular);
        let bold_id = embed_font(&mut doc, &self.fonts.bold);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                fonts::REGULAR => regular_id,
                fonts::BOLD => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for page in self.pages {
            let content = Content {
                operations: page.operations,
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

            let annots: Vec<Object> = page
                .links
                .into_iter()
                .map(|(rect, uri)| Object::Reference(doc.add_object(link_annotation(rect, &uri))))
                .collect();

            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if !annots.is_empty() {
                page_dict.set("Annots", annots);
            }
            kids.push(doc.add_object(page_dict).into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => resources_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(page_width), real(page_height)],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(pdf_text_string(title), StringFormat::Hexadecimal),
            "Producer" => Object::string_literal(concat!("pagegrep ", env!("CARGO_PKG_VERSION"))),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        Ok(bytes)
    }
}

/// Baseline for text of `size` centred in a line slot starting at `slot_top`
fn baseline_in_slot(slot_top: f32, leading: f32, size: f32) -> f32 {
    slot_top - (leading - size) / 2.0 - size * 0.8
}

fn emphasize(spans: Vec<Span>, color: Rgb) -> Vec<Span> {
    spans
        .into_iter()
        .map(|span| Span {
            bold: true,
            color: span.color.or(Some(color)),
            ..span
        })
        .collect()
}

fn real(value: f32) -> Object {
    Object::Real(value)
}

fn rgb_operands(color: Rgb) -> Vec<Object> {
    vec![real(color.r), real(color.g), real(color.b)]
}

/// Embed a face as a Type0 font with `Identity-H` encoding
fn embed_font(doc: &mut Document, face: &FontFace<'_>) -> ObjectId {
    let file = face.file();
    let metrics = face.metrics();
    let name = file.name.as_str();

    let font_file_id = doc.add_object(Stream::new(
        dictionary! {
            "Length1" => Object::Integer(file.data.len() as i64),
        },
        file.data.clone(),
    ));
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => name,
        "Flags" => Object::Integer(32),
        "FontBBox" => metrics.bbox.iter().map(|v| Object::Integer(*v)).collect::<Vec<Object>>(),
        "ItalicAngle" => Object::Integer(0),
        "Ascent" => Object::Integer(metrics.ascent),
        "Descent" => Object::Integer(metrics.descent),
        "CapHeight" => Object::Integer(metrics.cap_height),
        "StemV" => Object::Integer(80),
        "FontFile2" => font_file_id,
    });

    let mut widths: Vec<Object> = Vec::with_capacity(face.used().len() * 2);
    for (id, glyph) in face.used() {
        widths.push(Object::Integer(i64::from(*id)));
        widths.push(vec![Object::Integer(glyph.width.round() as i64)].into());
    }
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => name,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => Object::Integer(0),
        },
        "FontDescriptor" => descriptor_id,
        "DW" => Object::Integer(metrics.default_width),
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Stream::new(
        dictionary! {},
        to_unicode_cmap(face.used()).into_bytes(),
    ));
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => name,
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => to_unicode_id,
    })
}

fn link_annotation(rect: [f32; 4], uri: &str) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect.iter().map(|v| real(*v)).collect::<Vec<Object>>(),
        "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(uri),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fonts::FontFiles;
    use crate::report::fonts::tests::bundled_fonts;

    fn plain(text: &str) -> Span {
        Span {
            text: text.to_string(),
            bold: false,
            color: None,
            link: None,
        }
    }

    fn line_text(line: &Line) -> String {
        line.runs
            .iter()
            .flat_map(|r| r.glyphs.iter().map(|g| g.ch))
            .collect()
    }

    fn measure(fonts: &mut Fonts<'_>, text: &str) -> f32 {
        let glyphs = fonts.regular.glyphs(text);
        text_width(&glyphs, 10.0)
    }

    #[test]
    fn test_wrap_breaks_on_spaces() {
        let files = bundled_fonts();
        let mut fonts = Fonts::new(&files).unwrap();
        let max_width = measure(&mut fonts, "aaaa aaaa") + 1.0;

        let lines = wrap(&[plain("aaaa aaaa aaaa")], &mut fonts, 10.0, max_width);
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["aaaa aaaa", "aaaa"]);
        assert!(lines.iter().all(|l| l.width <= max_width));
    }

    #[test]
    fn test_wrap_splits_overlong_words() {
        let files = bundled_fonts();
        let mut fonts = Fonts::new(&files).unwrap();
        let word = "x".repeat(40);
        let lines = wrap(&[plain(&word)], &mut fonts, 10.0, 50.0);
        assert!(lines.len() > 1);
        let joined: String = lines.iter().map(line_text).collect();
        assert_eq!(joined, word);
        assert!(lines.iter().all(|l| l.width <= 50.0));
    }

    #[test]
    fn test_wrap_merges_runs_and_keeps_styles() {
        let files = bundled_fonts();
        let mut fonts = Fonts::new(&files).unwrap();
        let bold = Span {
            bold: true,
            ..plain("cat")
        };
        let lines = wrap(&[plain("a "), bold, plain(" b")], &mut fonts, 10.0, 500.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].runs.len(), 3);
        assert!(lines[0].runs[1].bold);
        assert_eq!(line_text(&lines[0]), "a cat b");
    }

    #[test]
    fn test_wrap_keeps_non_latin_text() {
        let files = bundled_fonts();
        let mut fonts = Fonts::new(&files).unwrap();
        let lines = wrap(&[plain("Привет мир ağ")], &mut fonts, 10.0, 500.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(line_text(&lines[0]), "Привет мир ağ");
        assert!(lines[0].runs[0].glyphs.iter().all(|g| g.id != 0));
    }

    #[test]
    fn test_wrap_empty_input() {
        let files = bundled_fonts();
        let mut fonts = Fonts::new(&files).unwrap();
        assert!(wrap(&[], &mut fonts, 10.0, 100.0).is_empty());
        assert!(wrap(&[plain("   ")], &mut fonts, 10.0, 100.0).is_empty());
    }

    #[test]
    fn test_long_context_spans_pages() {
        let config = ReportConfig::default();
        let files = bundled_fonts();
        let mut layout = PdfLayout::new(&config, Fonts::new(&files).unwrap());
        let text = "word ".repeat(3000);
        layout
            .add_blocks(&[Block::MatchContext(text)])
            .unwrap();
        assert!(layout.pages.len() > 1);
        let bytes = layout.finish("test").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
    }

    #[test]
    fn test_fonts_are_embedded_with_unicode_map() {
        let config = ReportConfig::default();
        let files: FontFiles = bundled_fonts();
        let mut layout = PdfLayout::new(&config, Fonts::new(&files).unwrap());
        layout
            .add_blocks(&[Block::MatchContext("Привет мир".to_string())])
            .unwrap();
        let bytes = layout.finish("Rapor ğ").unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let streams: Vec<&Stream> = doc
            .objects
            .values()
            .filter_map(|o| match o {
                Object::Stream(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(streams.iter().filter(|s| s.dict.has(b"Length1")).count(), 2);

        let cmaps: Vec<String> = streams
            .iter()
            .map(|s| s.decompressed_content().unwrap_or_else(|_| s.content.clone()))
            .map(|c| String::from_utf8_lossy(&c).into_owned())
            .filter(|c| c.contains("beginbfchar"))
            .collect();
        // U+041F CYRILLIC CAPITAL LETTER PE
        assert!(cmaps.iter().any(|c| c.contains("<041F>")));
    }
}
