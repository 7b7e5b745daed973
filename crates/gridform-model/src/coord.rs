use core::fmt;

use serde::{Deserialize, Serialize};

/// Excel-compatible maximum rows per worksheet (1,048,576).
pub const MAX_ROWS: u32 = 1_048_576;

/// Excel-compatible maximum columns per worksheet (16,384 = `XFD`).
pub const MAX_COLS: u32 = 16_384;

/// Convert a 1-based column index to its letter name (e.g. `1` -> `A`, `27` -> `AA`).
///
/// Columns are bijective base-26: there is no zero digit, so `Z` is followed
/// by `AA`, not `BA`.
pub fn column_name(col: u32) -> String {
    debug_assert!(col >= 1, "column index is 1-based");
    let mut n = col;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).expect("column letters are always valid UTF-8")
}

/// Parse a column letter name (case-insensitive) into its 1-based index.
pub fn column_index(s: &str) -> Result<u32, CoordError> {
    let mut col: u32 = 0;
    for b in s.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(CoordError::InvalidColumn);
        }
        let v = (b.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or(CoordError::InvalidColumn)?;
    }
    if col == 0 || col > MAX_COLS {
        return Err(CoordError::InvalidColumn);
    }
    Ok(col)
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// A reference to a single cell.
///
/// Columns and rows are **1-based** and never fall below 1; operations that
/// would produce a smaller coordinate fail with a [`CoordError`].
///
/// The `abs_col`/`abs_row` markers record leading `$` signs from A1 notation.
/// They only matter when formatting a reference and when applying
/// [`CellCoord::moved_by`] (an absolute axis is pinned instead of offset);
/// plain arithmetic ignores them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCoord {
    /// 1-based column.
    pub col: u32,
    /// 1-based row.
    pub row: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub abs_col: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub abs_row: bool,
}

impl CellCoord {
    /// Construct a coordinate, rejecting columns or rows below 1.
    pub fn new(col: u32, row: u32) -> Result<Self, CoordError> {
        if col < 1 {
            return Err(CoordError::ColumnUnderflow);
        }
        if row < 1 {
            return Err(CoordError::RowUnderflow);
        }
        Ok(Self {
            col,
            row,
            abs_col: false,
            abs_row: false,
        })
    }

    /// Parse an A1-style reference with optional `$` absolute markers
    /// (e.g. `B7`, `$C$2`, `bc32`).
    pub fn parse(a1: &str) -> Result<Self, CoordError> {
        let s = a1.trim();
        if s.is_empty() {
            return Err(CoordError::Empty);
        }

        let bytes = s.as_bytes();
        let mut idx = 0usize;

        let abs_col = bytes.get(idx) == Some(&b'$');
        if abs_col {
            idx += 1;
        }

        let col_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
            idx += 1;
        }
        if idx == col_start {
            return Err(CoordError::MissingColumn);
        }
        let col = column_index(&s[col_start..idx])?;

        let abs_row = bytes.get(idx) == Some(&b'$');
        if abs_row {
            idx += 1;
        }

        let row_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == row_start {
            return Err(CoordError::MissingRow);
        }
        if idx != bytes.len() {
            return Err(CoordError::TrailingCharacters);
        }

        let row: u32 = s[row_start..idx]
            .parse()
            .map_err(|_| CoordError::InvalidRow)?;
        if row == 0 || row > MAX_ROWS {
            return Err(CoordError::InvalidRow);
        }

        Ok(Self {
            col,
            row,
            abs_col,
            abs_row,
        })
    }

    /// Format as A1 notation, preserving absolute markers.
    pub fn to_a1(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.abs_col { "$" } else { "" },
            column_name(self.col),
            if self.abs_row { "$" } else { "" },
            self.row
        )
    }

    /// Format as fully absolute A1 notation (`$B$7`), whatever the markers say.
    pub fn to_absolute_a1(&self) -> String {
        format!("${}${}", column_name(self.col), self.row)
    }

    /// Return a copy moved by `(dx, dy)`.
    ///
    /// The result carries no absolute markers. Moving past column `A` or row
    /// 1 is an error.
    pub fn offset(&self, dx: i64, dy: i64) -> Result<Self, CoordError> {
        let col = self.col as i64 + dx;
        let row = self.row as i64 + dy;
        if col < 1 {
            return Err(CoordError::ColumnUnderflow);
        }
        if row < 1 {
            return Err(CoordError::RowUnderflow);
        }
        Ok(Self {
            col: col as u32,
            row: row as u32,
            abs_col: false,
            abs_row: false,
        })
    }

    /// Apply a relative reference to this coordinate.
    ///
    /// A relative axis offsets from `self` (`rel` column/row 1 meaning "stay
    /// here"), while an absolute axis pins the result to `rel`'s value. So
    /// moving `C5` by `B2` yields `D6`, but moving it by `$B2` yields `B6`.
    pub fn moved_by(&self, rel: &CellCoord) -> Result<Self, CoordError> {
        match (rel.abs_col, rel.abs_row) {
            (false, false) => self.offset(rel.col as i64 - 1, rel.row as i64 - 1),
            (true, false) => Ok(Self {
                col: rel.col,
                ..self.offset(0, rel.row as i64 - 1)?
            }),
            (false, true) => Ok(Self {
                row: rel.row,
                ..self.offset(rel.col as i64 - 1, 0)?
            }),
            (true, true) => CellCoord::new(rel.col, rel.row),
        }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Errors that can occur when parsing or moving a cell coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoordError {
    Empty,
    MissingColumn,
    MissingRow,
    InvalidColumn,
    InvalidRow,
    TrailingCharacters,
    ColumnUnderflow,
    RowUnderflow,
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CoordError::Empty => "empty cell reference",
            CoordError::MissingColumn => "missing column in cell reference",
            CoordError::MissingRow => "missing row in cell reference",
            CoordError::InvalidColumn => "invalid column in cell reference",
            CoordError::InvalidRow => "invalid row in cell reference",
            CoordError::TrailingCharacters => "trailing characters in cell reference",
            CoordError::ColumnUnderflow => "column reference cannot move left of 'A'",
            CoordError::RowUnderflow => "row reference cannot move above row 1",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for CoordError {}
