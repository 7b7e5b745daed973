use serde::{Deserialize, Serialize};

/// Declared data type of a stored cell value.
///
/// Mirrors the OOXML `t` attribute: absent means the raw text is interpreted
/// as-is by readers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Boolean,
    Number,
    Date,
    SharedString,
    InlineString,
}

/// A single cell record.
///
/// Cells are stored sparsely; the coordinate is the key of the containing
/// map, not a field of the record. Cross-table references (shared-string
/// index, style id) are stored as integer ids and looked up on demand.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Declared type; `None` leaves the raw value uninterpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<CellType>,

    /// Raw stored text. For formula cells this is the cached computed value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Formula text, if the cell contains a formula.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    /// Index into the workbook stylesheet's cell formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_id: Option<u32>,
}

impl Cell {
    /// A cell holding a raw numeric value.
    pub fn number(value: f64) -> Self {
        Self {
            data_type: Some(CellType::Number),
            value: Some(format_number(value)),
            ..Self::default()
        }
    }

    /// A cell referencing the shared-string table.
    pub fn shared_string(index: u32) -> Self {
        Self {
            data_type: Some(CellType::SharedString),
            value: Some(index.to_string()),
            ..Self::default()
        }
    }

    /// A cell holding inline text.
    pub fn inline_string(text: impl Into<String>) -> Self {
        Self {
            data_type: Some(CellType::InlineString),
            value: Some(text.into()),
            ..Self::default()
        }
    }

    /// A cell holding a formula with no cached result.
    pub fn with_formula(formula: impl Into<String>) -> Self {
        Self {
            formula: Some(formula.into()),
            ..Self::default()
        }
    }

    /// Returns true if this cell has no value, formula or style.
    pub fn is_truly_empty(&self) -> bool {
        self.value.is_none() && self.formula.is_none() && self.style_id.is_none()
    }
}

/// Render a number the way cell storage expects: integral values without a
/// trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
