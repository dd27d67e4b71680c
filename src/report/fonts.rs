//! Embedded TrueType fonts: locating the font files, mapping characters to
//! glyphs and measuring advance widths.
//!
//! Reports embed DejaVu Sans (regular and bold) so any script the font covers
//! renders as-is. Text is written as 2-byte glyph ids (`Identity-H`), and the
//! glyphs a report actually uses are tracked so the PDF can carry their widths
//! and a `ToUnicode` map for copy and search.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;
use ttf_parser::{Face, GlyphId};

use crate::report::RenderError;

/// Resource name of the regular face
pub const REGULAR: &str = "F1";

/// Resource name of the bold face
pub const BOLD: &str = "F2";

/// File name of the regular face
pub const REGULAR_FILE: &str = "DejaVuSans.ttf";

/// File name of the bold face
pub const BOLD_FILE: &str = "DejaVuSans-Bold.ttf";

/// Directories searched for the report fonts when none is configured
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("assets")];
    if let Some(exe_assets) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets")))
    {
        candidates.push(exe_assets);
    }
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("assets"));
    if let Some(user_fonts) = dirs::font_dir() {
        candidates.push(user_fonts);
    }
    candidates.extend(
        [
            "/usr/share/fonts/truetype/dejavu",
            "/usr/share/fonts/dejavu",
            "/usr/share/fonts/TTF",
            "/usr/local/share/fonts",
            "/Library/Fonts",
            "C:\\Windows\\Fonts",
        ]
        .map(PathBuf::from),
    );
    candidates
}

/// A font program read from disk
#[derive(Debug, Clone)]
pub struct FontFile {
    /// PDF font name, derived from the file name
    pub name: String,
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl FontFile {
    /// Read and validate a TrueType file
    pub fn read(path: &Path) -> Result<Self, RenderError> {
        let data = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))?;
        Face::parse(&data, 0)
            .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))?;

        let name = path
            .file_stem()
            .map(|stem| {
                stem.to_string_lossy()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect::<String>()
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());

        Ok(Self {
            name,
            path: path.to_path_buf(),
            data,
        })
    }
}

/// The regular and bold font programs of a report
#[derive(Debug, Clone)]
pub struct FontFiles {
    pub regular: FontFile,
    pub bold: FontFile,
}

impl FontFiles {
    /// Load the fonts from `dir`, or from the first default directory that
    /// holds both faces
    ///
    /// # Errors
    ///
    /// `RenderError::Font` when a face is missing or is not a valid font
    pub fn locate(dir: Option<&Path>) -> Result<Self, RenderError> {
        if let Some(dir) = dir {
            return Self::load_from(dir);
        }

        let candidates = default_font_dirs();
        match candidates
            .iter()
            .find(|dir| dir.join(REGULAR_FILE).is_file() && dir.join(BOLD_FILE).is_file())
        {
            Some(dir) => Self::load_from(dir),
            None => Err(RenderError::Font(format!(
                "{REGULAR_FILE} and {BOLD_FILE} not found in any of: {}",
                candidates
                    .iter()
                    .map(|dir| dir.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// Load both faces from `dir`
    pub fn load_from(dir: &Path) -> Result<Self, RenderError> {
        let regular = FontFile::read(&dir.join(REGULAR_FILE))?;
        let bold = FontFile::read(&dir.join(BOLD_FILE))?;
        debug!("Using report fonts from {}", dir.display());
        Ok(Self { regular, bold })
    }
}

/// One shaped character
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Glyph {
    /// Character the glyph stands for; whitespace is normalized to a space
    pub ch: char,
    pub id: u16,
    /// Advance width in 1/1000 em
    pub width: f32,
}

impl Glyph {
    pub fn is_space(&self) -> bool {
        self.ch == ' '
    }
}

/// Font-wide metrics in 1/1000 em, as a PDF font descriptor wants them
#[derive(Debug, Clone, Copy)]
pub(crate) struct FontMetrics {
    pub ascent: i64,
    pub descent: i64,
    pub cap_height: i64,
    pub bbox: [i64; 4],
    pub default_width: i64,
}

/// A parsed face plus the glyphs used from it so far
pub(crate) struct FontFace<'a> {
    file: &'a FontFile,
    face: Face<'a>,
    scale: f32,
    cache: HashMap<char, Glyph>,
    used: BTreeMap<u16, Glyph>,
}

impl<'a> FontFace<'a> {
    pub fn new(file: &'a FontFile) -> Result<Self, RenderError> {
        let face = Face::parse(&file.data, 0)
            .map_err(|e| RenderError::Font(format!("{}: {}", file.path.display(), e)))?;
        let scale = 1000.0 / f32::from(face.units_per_em().max(1));
        Ok(Self {
            file,
            face,
            scale,
            cache: HashMap::new(),
            used: BTreeMap::new(),
        })
    }

    pub fn file(&self) -> &FontFile {
        self.file
    }

    /// Glyphs referenced by the text shaped so far, by id
    pub fn used(&self) -> &BTreeMap<u16, Glyph> {
        &self.used
    }

    /// Glyph for `c`. Characters the font lacks map to glyph 0.
    pub fn glyph(&mut self, c: char) -> Glyph {
        let c = if c.is_whitespace() || c.is_control() {
            ' '
        } else {
            c
        };
        if let Some(glyph) = self.cache.get(&c) {
            return *glyph;
        }

        let id = self.face.glyph_index(c).unwrap_or(GlyphId(0));
        if id.0 == 0 {
            debug!("{} has no glyph for {:?}", self.file.name, c);
        }
        let advance = self.face.glyph_hor_advance(id).unwrap_or(0);
        let glyph = Glyph {
            ch: c,
            id: id.0,
            width: f32::from(advance) * self.scale,
        };

        self.cache.insert(c, glyph);
        if id.0 != 0 {
            self.used.entry(id.0).or_insert(glyph);
        }
        glyph
    }

    pub fn glyphs(&mut self, text: &str) -> Vec<Glyph> {
        text.chars().map(|c| self.glyph(c)).collect()
    }

    pub fn metrics(&self) -> FontMetrics {
        let scaled = |v: i16| (f32::from(v) * self.scale).round() as i64;
        let bbox = self.face.global_bounding_box();
        let default_width = self
            .face
            .glyph_hor_advance(GlyphId(0))
            .map(|w| (f32::from(w) * self.scale).round() as i64)
            .unwrap_or(1000);

        FontMetrics {
            ascent: scaled(self.face.ascender()),
            descent: scaled(self.face.descender()),
            cap_height: scaled(self.face.capital_height().unwrap_or(self.face.ascender())),
            bbox: [
                scaled(bbox.x_min),
                scaled(bbox.y_min),
                scaled(bbox.x_max),
                scaled(bbox.y_max),
            ],
            default_width,
        }
    }
}

/// The two faces a report is set in
pub(crate) struct Fonts<'a> {
    pub regular: FontFace<'a>,
    pub bold: FontFace<'a>,
}

impl<'a> Fonts<'a> {
    pub fn new(files: &'a FontFiles) -> Result<Self, RenderError> {
        Ok(Self {
            regular: FontFace::new(&files.regular)?,
            bold: FontFace::new(&files.bold)?,
        })
    }

    pub fn face(&mut self, bold: bool) -> &mut FontFace<'a> {
        if bold { &mut self.bold } else { &mut self.regular }
    }
}

/// Width of shaped text in points
pub(crate) fn text_width(glyphs: &[Glyph], font_size: f32) -> f32 {
    glyphs.iter().map(|g| g.width).sum::<f32>() * font_size / 1000.0
}

/// Glyph ids as a 2-byte big-endian `Identity-H` string
pub(crate) fn glyph_bytes(glyphs: &[Glyph]) -> Vec<u8> {
    glyphs.iter().flat_map(|g| g.id.to_be_bytes()).collect()
}

/// `ToUnicode` CMap mapping each used glyph back to its character
pub(crate) fn to_unicode_cmap(used: &BTreeMap<u16, Glyph>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<&Glyph> = used.values().collect();
    // bfchar sections are limited to 100 entries each
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for glyph in chunk {
            let mut units = [0u16; 2];
            let unicode: String = glyph
                .ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", glyph.id, unicode));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMapResource defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}

/// PDF text string: plain for ASCII, UTF-16BE with a byte order mark otherwise
pub(crate) fn pdf_text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    bytes
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn bundled_fonts() -> FontFiles {
        FontFiles::load_from(&Path::new(env!("CARGO_MANIFEST_DIR")).join("assets")).unwrap()
    }

    #[test]
    fn test_non_latin_text_maps_to_real_glyphs() {
        let files = bundled_fonts();
        let mut fonts = Fonts::new(&files).unwrap();
        let glyphs = fonts.regular.glyphs("Привет мир ağşıİ Ωμέγα");

        for glyph in glyphs.iter().filter(|g| !g.is_space()) {
            assert_ne!(glyph.id, 0, "{:?} has no glyph", glyph.ch);
            assert!(glyph.width > 0.0);
        }
        let text: String = glyphs.iter().map(|g| g.ch).collect();
        assert_eq!(text, "Привет мир ağşıİ Ωμέγα");
    }

    #[test]
    fn test_whitespace_is_normalized_to_space() {
        let files = bundled_fonts();
        let mut fonts = Fonts::new(&files).unwrap();
        let glyphs = fonts.regular.glyphs("a\tb\nc");
        assert!(glyphs[1].is_space());
        assert!(glyphs[3].is_space());
        assert_eq!(glyphs[1], fonts.regular.glyph(' '));
    }

    #[test]
    fn test_bold_is_wider() {
        let files = bundled_fonts();
        let mut fonts = Fonts::new(&files).unwrap();
        let regular = fonts.face(false).glyphs("Report");
        let bold = fonts.face(true).glyphs("Report");
        assert!(text_width(&bold, 10.0) > text_width(&regular, 10.0));
    }

    #[test]
    fn test_to_unicode_lists_used_glyphs() {
        let files = bundled_fonts();
        let mut fonts = Fonts::new(&files).unwrap();
        let glyphs = fonts.regular.glyphs("ğ😀");
        let cmap = to_unicode_cmap(fonts.regular.used());

        assert!(cmap.contains(&format!("<{:04X}> <011F>", glyphs[0].id)));
        assert!(cmap.contains("beginbfchar"));
        assert_eq!(glyph_bytes(&glyphs[..1]), glyphs[0].id.to_be_bytes().to_vec());
    }

    #[test]
    fn test_missing_font_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let result = FontFiles::locate(Some(dir.path()));
        assert!(matches!(result, Err(RenderError::Font(_))));
    }

    #[test]
    fn test_invalid_font_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(REGULAR_FILE), b"not a font").unwrap();
        std::fs::write(dir.path().join(BOLD_FILE), b"not a font").unwrap();
        assert!(matches!(
            FontFiles::load_from(dir.path()),
            Err(RenderError::Font(_))
        ));
    }

    #[test]
    fn test_pdf_text_string() {
        assert_eq!(pdf_text_string("Report"), b"Report".to_vec());
        assert_eq!(pdf_text_string("ğ"), vec![0xFE, 0xFF, 0x01, 0x1F]);
    }
}
