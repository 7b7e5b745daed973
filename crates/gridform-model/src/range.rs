use core::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::{column_index, CellCoord, CoordError};

/// A rectangular region of cells.
///
/// The region is inclusive and always normalized such that
/// `start.col <= end.col` and `start.row <= end.row`, whatever order the
/// corners were supplied in. Corner coordinates carry no absolute markers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRef {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl RangeRef {
    /// Construct a region from two corners, normalizing as needed.
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        let (left, right) = if a.col <= b.col {
            (a.col, b.col)
        } else {
            (b.col, a.col)
        };
        let (top, bottom) = if a.row <= b.row {
            (a.row, b.row)
        } else {
            (b.row, a.row)
        };
        Self {
            start: plain(left, top),
            end: plain(right, bottom),
        }
    }

    /// Construct a 1x1 region.
    pub fn cell(at: CellCoord) -> Self {
        Self::new(at, at)
    }

    /// Parse a range expression.
    ///
    /// Three forms are accepted:
    /// - a bare cell (`B7`), producing a 1x1 region;
    /// - a full range (`A1:D10`), normalized;
    /// - a partially-open range (`A:C`, `A1:C`, `3:8`), whose missing column
    ///   or row tokens are filled from `boundary` before normalization.
    ///
    /// Parsing an open form without a boundary is an error.
    pub fn parse(reference: &str, boundary: Option<&RangeRef>) -> Result<Self, RangeError> {
        let s = reference.trim();
        if s.is_empty() {
            return Err(RangeError::Empty);
        }

        let Some((lhs, rhs)) = s.split_once(':') else {
            let cell = CellCoord::parse(s).map_err(RangeError::Cell)?;
            return Ok(Self::cell(cell));
        };

        let (col1, row1) = parse_partial(lhs)?;
        let (col2, row2) = parse_partial(rhs)?;

        let fill = |value: Option<u32>, from: Option<u32>| -> Result<u32, RangeError> {
            match value.or(from) {
                Some(v) => Ok(v),
                None => Err(RangeError::OpenWithoutBoundary),
            }
        };

        let start = plain(
            fill(col1, boundary.map(|b| b.start.col))?,
            fill(row1, boundary.map(|b| b.start.row))?,
        );
        let end = plain(
            fill(col2, boundary.map(|b| b.end.col))?,
            fill(row2, boundary.map(|b| b.end.row))?,
        );
        Ok(Self::new(start, end))
    }

    /// Number of columns in the region.
    pub fn width(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    /// Number of rows in the region.
    pub fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Returns true if the region is exactly one cell.
    pub fn is_single_cell(&self) -> bool {
        self.start.col == self.end.col && self.start.row == self.end.row
    }

    /// Returns true if `cell` lies within this region.
    pub fn contains(&self, cell: &CellCoord) -> bool {
        cell.col >= self.start.col
            && cell.col <= self.end.col
            && cell.row >= self.start.row
            && cell.row <= self.end.row
    }

    /// Returns true if the two regions share at least one cell.
    pub fn intersects(&self, other: &RangeRef) -> bool {
        self.start.col <= other.end.col
            && other.start.col <= self.end.col
            && self.start.row <= other.end.row
            && other.start.row <= self.end.row
    }

    /// Grow the region to cover `cell`.
    pub fn extend_to(&mut self, cell: &CellCoord) {
        self.start.col = self.start.col.min(cell.col);
        self.start.row = self.start.row.min(cell.row);
        self.end.col = self.end.col.max(cell.col);
        self.end.row = self.end.row.max(cell.row);
    }

    /// Return a copy moved by `(dx, dy)`; moving past column `A` or row 1
    /// fails.
    pub fn translate(&self, dx: i64, dy: i64) -> Result<Self, CoordError> {
        Ok(Self {
            start: self.start.offset(dx, dy)?,
            end: self.end.offset(dx, dy)?,
        })
    }

    /// Return a copy with its edges pushed outward.
    pub fn expand(&self, left: u32, right: u32, up: u32, down: u32) -> Result<Self, CoordError> {
        Ok(Self {
            start: self.start.offset(-(left as i64), -(up as i64))?,
            end: self.end.offset(right as i64, down as i64)?,
        })
    }

    /// Derive a sub-region from a relative region descriptor.
    ///
    /// `rel`'s coordinates are interpreted with this region's top-left corner
    /// as origin: a relative `A1:B2` is the 2x2 block in the parent's corner.
    /// With `clip` set the result is intersected with the parent — `None`
    /// when disjoint, clamped edges otherwise. Without `clip` the translated
    /// region is returned as-is.
    pub fn sub_range(&self, rel: &RangeRef, clip: bool) -> Option<RangeRef> {
        let top_left = plain(
            self.start.col + rel.start.col - 1,
            self.start.row + rel.start.row - 1,
        );
        let bottom_right = plain(
            top_left.col + rel.width() - 1,
            top_left.row + rel.height() - 1,
        );
        let mut sub = RangeRef {
            start: top_left,
            end: bottom_right,
        };
        if clip {
            if sub.start.col > self.end.col
                || sub.start.row > self.end.row
                || sub.end.col < self.start.col
                || sub.end.row < self.start.row
            {
                return None;
            }
            sub.start.col = sub.start.col.max(self.start.col);
            sub.start.row = sub.start.row.max(self.start.row);
            sub.end.col = sub.end.col.min(self.end.col);
            sub.end.row = sub.end.row.min(self.end.row);
        }
        Some(sub)
    }

    /// Parse `rel` (open tokens filled from this region) and derive the
    /// sub-region, as [`RangeRef::sub_range`].
    pub fn sub_range_from(&self, rel: &str, clip: bool) -> Result<Option<RangeRef>, RangeError> {
        let parsed = RangeRef::parse(rel, Some(self))?;
        Ok(self.sub_range(&parsed, clip))
    }

    /// Format with fully absolute corners (`$A$1:$D$10`), the form used when
    /// rewriting defined names.
    pub fn to_absolute_a1(&self) -> String {
        if self.is_single_cell() {
            self.start.to_absolute_a1()
        } else {
            format!(
                "{}:{}",
                self.start.to_absolute_a1(),
                self.end.to_absolute_a1()
            )
        }
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

fn plain(col: u32, row: u32) -> CellCoord {
    CellCoord {
        col,
        row,
        abs_col: false,
        abs_row: false,
    }
}

/// Parse one side of a partially-open range: optional `$`-prefixed column
/// letters and/or row digits, either of which may be absent.
fn parse_partial(side: &str) -> Result<(Option<u32>, Option<u32>), RangeError> {
    let s = side.trim();
    let bytes = s.as_bytes();
    let mut idx = 0usize;

    if bytes.get(idx) == Some(&b'$') {
        idx += 1;
    }
    let col_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
        idx += 1;
    }
    let col = if idx > col_start {
        Some(column_index(&s[col_start..idx]).map_err(RangeError::Cell)?)
    } else {
        None
    };

    if bytes.get(idx) == Some(&b'$') {
        idx += 1;
    }
    let row_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    let row = if idx > row_start {
        let row: u32 = s[row_start..idx]
            .parse()
            .map_err(|_| RangeError::Cell(CoordError::InvalidRow))?;
        if row == 0 {
            return Err(RangeError::Cell(CoordError::InvalidRow));
        }
        Some(row)
    } else {
        None
    };

    if idx != bytes.len() {
        return Err(RangeError::Cell(CoordError::TrailingCharacters));
    }
    Ok((col, row))
}

/// Errors that can occur when parsing a range expression.
#[derive(Debug, PartialEq, Eq)]
pub enum RangeError {
    Empty,
    Cell(CoordError),
    /// A partially-open range was parsed with no boundary to resolve it
    /// against.
    OpenWithoutBoundary,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::Empty => f.write_str("empty range reference"),
            RangeError::Cell(e) => write!(f, "invalid cell reference in range: {e}"),
            RangeError::OpenWithoutBoundary => {
                f.write_str("open range reference requires a boundary region")
            }
        }
    }
}

impl std::error::Error for RangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RangeError::Cell(e) => Some(e),
            _ => None,
        }
    }
}
