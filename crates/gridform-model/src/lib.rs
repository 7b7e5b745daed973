//! `gridform-model` defines the in-memory spreadsheet data structures the
//! mapping engine operates on.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the template mapping engine (`gridform-engine`)
//! - package import/export layers (out of scope here; they populate and
//!   persist this tree through their own crates)
//! - IPC boundaries via `serde`
//!
//! The model is a sparse tree: worksheets hold `BTreeMap` rows of cells, and
//! cells reference the workbook's shared tables (strings, styles) by integer
//! id only, so reshuffling a table can never dangle a pointer.

mod cell;
mod coord;
mod dates;
mod names;
mod range;
mod shared_strings;
mod style;
mod workbook;
mod worksheet;

pub use cell::{format_number, Cell, CellType};
pub use coord::{column_index, column_name, CellCoord, CoordError, MAX_COLS, MAX_ROWS};
pub use dates::{datetime_to_serial, serial_to_datetime, DateSystem};
pub use names::{parse_sheet_ref, quote_sheet_name, DefinedName, SheetQualifiedRef};
pub use range::{RangeError, RangeRef};
pub use shared_strings::SharedStringTable;
pub use style::{
    builtin_number_format, find_builtin_number_format, Border, BorderStyle, CellFormat, Color,
    Fill, FillPattern, Font, NumberFormat, StyleImportError, Stylesheet, DEFAULT_DATE_FORMAT_ID,
    FIRST_CUSTOM_NUMBER_FORMAT,
};
pub use workbook::{CalcCell, PivotCache, Workbook};
pub use worksheet::{ColumnDef, Row, SheetFormat, Worksheet, WorksheetId};
