use core::fmt;

use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
    !*b
}

/// An ARGB color, serialized as a `#AARRGGBB` hex string.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub argb: u32,
}

impl Color {
    pub const fn new_argb(argb: u32) -> Self {
        Self { argb }
    }

    fn to_hex(self) -> String {
        format!("#{:08X}", self.argb)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;
        let s = String::deserialize(deserializer)?;
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| D::Error::custom("color must be a #AARRGGBB hex string"))?;
        if hex.len() != 8 {
            return Err(D::Error::custom("color must have 8 hex digits"));
        }
        let argb = u32::from_str_radix(hex, 16).map_err(|_| D::Error::custom("invalid hex"))?;
        Ok(Color { argb })
    }
}

/// Font formatting (subset).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Font size in 1/100 points (e.g. 1100 = 11pt).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_100pt: Option<u16>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// Fill pattern kind (subset).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillPattern {
    #[default]
    None,
    Solid,
    Gray125,
}

/// Fill (background) formatting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Fill {
    #[serde(default)]
    pub pattern: FillPattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Color>,
}

/// Border line style (subset).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
}

/// Border formatting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Border {
    #[serde(default)]
    pub top: BorderStyle,
    #[serde(default)]
    pub bottom: BorderStyle,
    #[serde(default)]
    pub left: BorderStyle,
    #[serde(default)]
    pub right: BorderStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// A custom number format (ids below [`FIRST_CUSTOM_NUMBER_FORMAT`] are
/// built in and never stored).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumberFormat {
    pub id: u32,
    pub code: String,
}

/// First id available for custom number formats.
pub const FIRST_CUSTOM_NUMBER_FORMAT: u32 = 164;

/// Built-in number formats (the commonly encountered subset).
const BUILTIN_NUMBER_FORMATS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

/// Built-in number format id used for freshly created date cells.
pub const DEFAULT_DATE_FORMAT_ID: u32 = 14;

/// Look up a built-in number format code by id.
pub fn builtin_number_format(id: u32) -> Option<&'static str> {
    BUILTIN_NUMBER_FORMATS
        .iter()
        .find(|(fid, _)| *fid == id)
        .map(|(_, code)| *code)
}

/// Find the id of a built-in number format by its format code.
pub fn find_builtin_number_format(code: &str) -> Option<u32> {
    BUILTIN_NUMBER_FORMATS
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(id, _)| *id)
}

/// An indexed cell format record.
///
/// Sub-records (number format, font, fill, border, parent style format) are
/// referenced by integer id into the owning [`Stylesheet`]'s tables.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CellFormat {
    /// Number format id; 0 is `General`.
    #[serde(default)]
    pub number_format_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_id: Option<u32>,
    /// Index into the stylesheet's cell-style (parent) formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub apply_number_format: bool,
}

/// Shared style tables for a workbook.
///
/// Cell format 0 is always the default format; fonts, fills and borders each
/// keep a default record at index 0 so imported formats never alias the
/// defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stylesheet {
    #[serde(default)]
    pub number_formats: Vec<NumberFormat>,
    #[serde(default)]
    pub fonts: Vec<Font>,
    #[serde(default)]
    pub fills: Vec<Fill>,
    #[serde(default)]
    pub borders: Vec<Border>,
    #[serde(default)]
    pub cell_style_formats: Vec<CellFormat>,
    #[serde(default)]
    pub cell_formats: Vec<CellFormat>,
}

impl Default for Stylesheet {
    fn default() -> Self {
        Self {
            number_formats: Vec::new(),
            fonts: vec![Font::default()],
            fills: vec![Fill::default()],
            borders: vec![Border::default()],
            cell_style_formats: Vec::new(),
            cell_formats: vec![CellFormat::default()],
        }
    }
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cell format by id.
    pub fn cell_format(&self, id: u32) -> Option<&CellFormat> {
        self.cell_formats.get(id as usize)
    }

    /// Resolve a number format code (built-in or custom) by id.
    pub fn number_format_code(&self, id: u32) -> Option<&str> {
        if let Some(code) = builtin_number_format(id) {
            return Some(code);
        }
        self.number_formats
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.code.as_str())
    }

    /// Find or register a number format for `code`, returning its id.
    ///
    /// Number formats are the only style sub-record deduplicated on import:
    /// built-ins match by code, custom formats match by code, and a new
    /// custom id is allocated past the built-in space otherwise.
    pub fn ensure_number_format(&mut self, code: &str) -> u32 {
        if let Some(id) = find_builtin_number_format(code) {
            return id;
        }
        if let Some(existing) = self.number_formats.iter().find(|f| f.code == code) {
            return existing.id;
        }
        let id = self
            .number_formats
            .iter()
            .map(|f| f.id)
            .max()
            .map_or(FIRST_CUSTOM_NUMBER_FORMAT, |m| m + 1);
        self.number_formats.push(NumberFormat {
            id,
            code: code.to_string(),
        });
        id
    }

    /// Find or append a cell format equal to `format`, returning its id.
    pub fn intern_cell_format(&mut self, format: CellFormat) -> u32 {
        if let Some(found) = self.cell_formats.iter().position(|f| *f == format) {
            return found as u32;
        }
        self.cell_formats.push(format);
        (self.cell_formats.len() - 1) as u32
    }

    /// Deep-copy cell format `id` from `src` into this stylesheet.
    ///
    /// The format and every sub-record it references (number format, font,
    /// fill, border, parent style format) are copied and re-indexed; number
    /// formats alone are deduplicated, by format code.
    pub fn import_format(&mut self, src: &Stylesheet, id: u32) -> Result<u32, StyleImportError> {
        let source = src
            .cell_format(id)
            .ok_or(StyleImportError::FormatNotFound(id))?
            .clone();

        let mut imported = self.import_format_details(src, source)?;

        if let Some(parent_id) = imported.parent_id {
            let parent = src
                .cell_style_formats
                .get(parent_id as usize)
                .ok_or(StyleImportError::ParentFormatNotFound(parent_id))?
                .clone();
            let parent = self.import_format_details(src, parent)?;
            self.cell_style_formats.push(parent);
            imported.parent_id = Some((self.cell_style_formats.len() - 1) as u32);
        }

        self.cell_formats.push(imported);
        Ok((self.cell_formats.len() - 1) as u32)
    }

    /// Copy the sub-records referenced by `format` from `src`, rewriting its
    /// ids to point into this stylesheet.
    fn import_format_details(
        &mut self,
        src: &Stylesheet,
        mut format: CellFormat,
    ) -> Result<CellFormat, StyleImportError> {
        if format.number_format_id != 0 {
            if let Some(code) = src.number_format_code(format.number_format_id) {
                let code = code.to_string();
                format.number_format_id = self.ensure_number_format(&code);
            }
        }
        if let Some(font_id) = format.font_id {
            let font = src
                .fonts
                .get(font_id as usize)
                .ok_or(StyleImportError::FontNotFound(font_id))?
                .clone();
            self.fonts.push(font);
            format.font_id = Some((self.fonts.len() - 1) as u32);
        }
        if let Some(fill_id) = format.fill_id {
            let fill = src
                .fills
                .get(fill_id as usize)
                .ok_or(StyleImportError::FillNotFound(fill_id))?
                .clone();
            self.fills.push(fill);
            format.fill_id = Some((self.fills.len() - 1) as u32);
        }
        if let Some(border_id) = format.border_id {
            let border = src
                .borders
                .get(border_id as usize)
                .ok_or(StyleImportError::BorderNotFound(border_id))?
                .clone();
            self.borders.push(border);
            format.border_id = Some((self.borders.len() - 1) as u32);
        }
        Ok(format)
    }
}

/// Errors raised while importing a style between stylesheets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StyleImportError {
    FormatNotFound(u32),
    ParentFormatNotFound(u32),
    FontNotFound(u32),
    FillNotFound(u32),
    BorderNotFound(u32),
}

impl fmt::Display for StyleImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleImportError::FormatNotFound(id) => write!(f, "cell format {id} not found"),
            StyleImportError::ParentFormatNotFound(id) => {
                write!(f, "parent style format {id} not found")
            }
            StyleImportError::FontNotFound(id) => write!(f, "font {id} not found"),
            StyleImportError::FillNotFound(id) => write!(f, "fill {id} not found"),
            StyleImportError::BorderNotFound(id) => write!(f, "border {id} not found"),
        }
    }
}

impl std::error::Error for StyleImportError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_source() -> Stylesheet {
        let mut src = Stylesheet::new();
        src.fonts.push(Font {
            name: Some("Arial".to_string()),
            bold: true,
            ..Font::default()
        });
        src.fills.push(Fill {
            pattern: FillPattern::Solid,
            foreground: Some(Color::new_argb(0xFFFFCC00)),
        });
        src.borders.push(Border {
            bottom: BorderStyle::Thin,
            ..Border::default()
        });
        let fmt_id = src.ensure_number_format("0.000");
        src.cell_formats.push(CellFormat {
            number_format_id: fmt_id,
            font_id: Some(1),
            fill_id: Some(1),
            border_id: Some(1),
            parent_id: None,
            apply_number_format: true,
        });
        src
    }

    #[test]
    fn ensure_number_format_reuses_builtins_and_customs() {
        let mut sheet = Stylesheet::new();
        assert_eq!(sheet.ensure_number_format("General"), 0);
        assert_eq!(sheet.ensure_number_format("mm-dd-yy"), 14);
        let custom = sheet.ensure_number_format("0.000");
        assert_eq!(custom, FIRST_CUSTOM_NUMBER_FORMAT);
        assert_eq!(sheet.ensure_number_format("0.000"), custom);
        assert_eq!(sheet.number_formats.len(), 1);
    }

    #[test]
    fn import_format_deep_copies_sub_records() {
        let src = sample_source();
        let mut dst = Stylesheet::new();
        let new_id = dst.import_format(&src, 1).unwrap();

        let imported = dst.cell_format(new_id).unwrap();
        let font = &dst.fonts[imported.font_id.unwrap() as usize];
        assert_eq!(font.name.as_deref(), Some("Arial"));
        assert!(font.bold);
        assert_eq!(
            dst.fills[imported.fill_id.unwrap() as usize].pattern,
            FillPattern::Solid
        );
        assert_eq!(
            dst.borders[imported.border_id.unwrap() as usize].bottom,
            BorderStyle::Thin
        );
        assert_eq!(
            dst.number_format_code(imported.number_format_id),
            Some("0.000")
        );
    }

    #[test]
    fn import_format_dedupes_only_number_formats() {
        let src = sample_source();
        let mut dst = Stylesheet::new();
        let first = dst.import_format(&src, 1).unwrap();
        let second = dst.import_format(&src, 1).unwrap();
        assert_ne!(first, second);

        // Fonts/fills/borders are copied unconditionally...
        assert_eq!(dst.fonts.len(), 3);
        assert_eq!(dst.fills.len(), 3);
        assert_eq!(dst.borders.len(), 3);
        // ...while the custom number format exists exactly once.
        assert_eq!(dst.number_formats.len(), 1);
    }

    #[test]
    fn import_format_missing_source_is_an_error() {
        let src = Stylesheet::new();
        let mut dst = Stylesheet::new();
        assert_eq!(
            dst.import_format(&src, 99),
            Err(StyleImportError::FormatNotFound(99))
        );
    }
}
