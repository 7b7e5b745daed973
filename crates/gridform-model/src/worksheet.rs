use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::coord::CellCoord;
use crate::range::RangeRef;

/// Identifier for a worksheet within its workbook.
pub type WorksheetId = u32;

/// A definition applying to a contiguous span of columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// First column of the span (1-based, inclusive).
    pub min: u32,
    /// Last column of the span (1-based, inclusive).
    pub max: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

/// Sheet-level format properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetFormat {
    pub default_row_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_col_width: Option<f64>,
}

impl Default for SheetFormat {
    fn default() -> Self {
        Self {
            default_row_height: 15.0,
            default_col_width: None,
        }
    }
}

/// A sparse row of cells, keyed by 1-based column.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub cells: BTreeMap<u32, Cell>,
}

/// A worksheet: a sparse container of rows plus sheet-level metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    pub id: WorksheetId,
    pub name: String,
    /// Declared bounding dimension, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<RangeRef>,
    #[serde(default)]
    pub format: SheetFormat,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    /// Rows keyed by 1-based row number.
    #[serde(default)]
    pub rows: BTreeMap<u32, Row>,
    #[serde(default)]
    pub merged: Vec<RangeRef>,
}

impl Worksheet {
    pub fn new(id: WorksheetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            dimension: None,
            format: SheetFormat::default(),
            columns: Vec::new(),
            rows: BTreeMap::new(),
            merged: Vec::new(),
        }
    }

    /// Get a cell if it exists.
    pub fn cell(&self, at: &CellCoord) -> Option<&Cell> {
        self.rows.get(&at.row)?.cells.get(&at.col)
    }

    /// Get a mutable cell if it exists.
    pub fn cell_mut(&mut self, at: &CellCoord) -> Option<&mut Cell> {
        self.rows.get_mut(&at.row)?.cells.get_mut(&at.col)
    }

    /// Get or create the cell at `at`, growing the declared dimension to
    /// cover it.
    pub fn ensure_cell(&mut self, at: &CellCoord) -> &mut Cell {
        self.expand_dimension_to(at);
        self.rows
            .entry(at.row)
            .or_default()
            .cells
            .entry(at.col)
            .or_default()
    }

    /// Insert a cell, replacing any existing record at that coordinate.
    pub fn set_cell(&mut self, at: &CellCoord, cell: Cell) {
        self.expand_dimension_to(at);
        self.rows.entry(at.row).or_default().cells.insert(at.col, cell);
    }

    /// Style of the nearest existing cell left of `at` in the same row.
    pub fn style_left_of(&self, at: &CellCoord) -> Option<u32> {
        let row = self.rows.get(&at.row)?;
        row.cells
            .range(..at.col)
            .rev()
            .find_map(|(_, cell)| cell.style_id)
    }

    /// Style of the nearest existing cell above `at` in the same column.
    pub fn style_above(&self, at: &CellCoord) -> Option<u32> {
        self.rows
            .range(..at.row)
            .rev()
            .find_map(|(_, row)| row.cells.get(&at.col).and_then(|cell| cell.style_id))
    }

    /// Grow the declared dimension to include `at`.
    pub fn expand_dimension_to(&mut self, at: &CellCoord) {
        match &mut self.dimension {
            Some(dim) => dim.extend_to(at),
            None => self.dimension = Some(RangeRef::cell(*at)),
        }
    }

    /// The region actually occupied by stored cells, ignoring the declared
    /// dimension. Used as a boundary for open ranges when no dimension was
    /// recorded.
    pub fn used_range(&self) -> Option<RangeRef> {
        let mut bounds: Option<RangeRef> = None;
        for (row, cells) in &self.rows {
            for col in cells.cells.keys() {
                let at = CellCoord::new(*col, *row).ok()?;
                match &mut bounds {
                    Some(b) => b.extend_to(&at),
                    None => bounds = Some(RangeRef::cell(at)),
                }
            }
        }
        bounds
    }

    /// The boundary used to resolve open range references against this
    /// sheet: the declared dimension, or the occupied region as a fallback.
    pub fn bounding_range(&self) -> Option<RangeRef> {
        self.dimension.or_else(|| self.used_range())
    }
}
