use std::sync::OnceLock;

use chrono::NaiveDateTime;
use gridform_model::{
    datetime_to_serial, format_number, parse_sheet_ref, serial_to_datetime, CellCoord, CellFormat,
    CellType, RangeRef, Workbook, Worksheet, DEFAULT_DATE_FORMAT_ID,
};
use regex::Regex;

use crate::convert::FieldValue;
use crate::error::{ConvertError, EngineError};

/// A typed value read out of a cell, interpreted by the cell's declared type.
#[derive(Clone, Debug, PartialEq)]
pub enum CellScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    DateTime(NaiveDateTime),
    Text(String),
}

impl From<CellScalar> for FieldValue {
    fn from(value: CellScalar) -> Self {
        match value {
            CellScalar::Bool(v) => FieldValue::Bool(v),
            CellScalar::Int(v) => FieldValue::Int(v),
            CellScalar::Float(v) => FieldValue::Float(v),
            CellScalar::DateTime(v) => FieldValue::DateTime(v),
            CellScalar::Text(v) => FieldValue::Text(v),
        }
    }
}

fn anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<anchor>.+)#(?P<dx>-?\d+),(?P<dy>-?\d+)$")
            .expect("anchor reference regex is valid")
    })
}

/// Resolve a top-level region reference: `SheetName!Range` or a bare defined
/// name, with open range tokens filled from the sheet's bounding dimension.
///
/// Returns the sheet's index alongside the resolved region.
pub fn resolve_region(book: &Workbook, reference: &str) -> Result<(usize, RangeRef), EngineError> {
    if let Some(q) = parse_sheet_ref(reference) {
        return resolve_on_sheet(book, q.sheet, q.range);
    }
    let Some(defined) = book.defined_name(reference) else {
        return Err(EngineError::InvalidReference(reference.to_string()));
    };
    let Some(q) = parse_sheet_ref(&defined.refers_to) else {
        return Err(EngineError::InvalidReference(defined.refers_to.clone()));
    };
    resolve_on_sheet(book, q.sheet, q.range)
}

fn resolve_on_sheet(
    book: &Workbook,
    sheet_name: &str,
    range_text: &str,
) -> Result<(usize, RangeRef), EngineError> {
    let index = book
        .sheet_index(sheet_name)
        .ok_or_else(|| EngineError::SheetNotFound(sheet_name.to_string()))?;
    let boundary = book.sheets[index].bounding_range();
    let region = RangeRef::parse(range_text, boundary.as_ref())?;
    Ok((index, region))
}

/// Binds a resolved region to a worksheet inside a borrowed workbook and
/// performs typed cell access relative to that region.
///
/// Accessors are cheap and disposable: they are recreated per operation and
/// never survive a structural mutation, which invalidates resolved regions.
pub struct RangeAccessor<'b> {
    book: &'b mut Workbook,
    sheet: usize,
    region: RangeRef,
}

impl<'b> RangeAccessor<'b> {
    pub fn new(book: &'b mut Workbook, sheet: usize, region: RangeRef) -> Self {
        Self {
            book,
            sheet,
            region,
        }
    }

    /// Resolve `reference` (sheet-qualified or a defined name) and bind it.
    pub fn resolve(book: &'b mut Workbook, reference: &str) -> Result<Self, EngineError> {
        let (sheet, region) = resolve_region(book, reference)?;
        Ok(Self::new(book, sheet, region))
    }

    pub fn region(&self) -> RangeRef {
        self.region
    }

    pub fn sheet_index(&self) -> usize {
        self.sheet
    }

    fn sheet(&self) -> &Worksheet {
        &self.book.sheets[self.sheet]
    }

    pub(crate) fn workbook(&mut self) -> &mut Workbook {
        self.book
    }

    /// A new accessor over `region` on the same sheet, reborrowing the
    /// workbook for the child's lifetime.
    pub fn sub_region(&mut self, region: RangeRef) -> RangeAccessor<'_> {
        RangeAccessor {
            book: &mut *self.book,
            sheet: self.sheet,
            region,
        }
    }

    /// Widen the bound region (used after structural growth below or to the
    /// right of it).
    pub(crate) fn grow(&mut self, cols: u32, rows: u32) {
        self.region.end.col += cols;
        self.region.end.row += rows;
    }

    /// Resolve a reference relative to this region's top-left corner.
    ///
    /// Accepts a plain A1 reference (absolute axes pin to sheet coordinates),
    /// a defined-name token (resolved to its absolute position), or an
    /// anchored reference `Anchor#dx,dy`. Plain and named resolutions are
    /// checked against the region; an anchored offset may land outside it.
    pub fn resolve_cell(&self, reference: &str) -> Result<CellCoord, EngineError> {
        let reference = reference.trim();
        if let Some(captures) = anchor_regex().captures(reference) {
            let anchor = captures
                .name("anchor")
                .expect("anchor group always captures")
                .as_str();
            let dx: i64 = captures["dx"]
                .parse()
                .map_err(|_| EngineError::InvalidReference(reference.to_string()))?;
            let dy: i64 = captures["dy"]
                .parse()
                .map_err(|_| EngineError::InvalidReference(reference.to_string()))?;
            let wrap = |source: EngineError| EngineError::Anchor {
                reference: reference.to_string(),
                source: Box::new(source),
            };
            let base = self.resolve_cell(anchor).map_err(wrap)?;
            return base.offset(dx, dy).map_err(|e| wrap(EngineError::Coord(e)));
        }

        let relative = match CellCoord::parse(reference) {
            Ok(coord) => coord,
            Err(_) => self.defined_name_coord(reference)?,
        };
        let cell = self.region.start.moved_by(&relative)?;
        if !self.region.contains(&cell) {
            return Err(EngineError::OutOfRange {
                cell: cell.to_string(),
                range: self.region.to_string(),
            });
        }
        Ok(cell)
    }

    /// Interpret a non-cell token as a defined name; its stored absolute
    /// reference pins the resolution to the named position.
    fn defined_name_coord(&self, name: &str) -> Result<CellCoord, EngineError> {
        let defined = self
            .book
            .defined_name(name)
            .ok_or_else(|| EngineError::NameNotFound(name.to_string()))?;
        let text = parse_sheet_ref(&defined.refers_to)
            .map(|q| q.range)
            .unwrap_or(defined.refers_to.as_str());
        let first_corner = text.split(':').next().unwrap_or(text);
        Ok(CellCoord::parse(first_corner)?)
    }

    /// Read the cell at a reference relative to this region.
    ///
    /// A missing cell yields `Ok(None)`; strict callers use
    /// [`RangeAccessor::require`].
    pub fn value(&self, reference: &str) -> Result<Option<CellScalar>, EngineError> {
        let at = self.resolve_cell(reference)?;
        Ok(self.read_cell(&at))
    }

    /// Read the cell at 1-based (column, row) offsets within the region.
    pub fn value_at(&self, col: u32, row: u32) -> Result<Option<CellScalar>, EngineError> {
        let at = self.region.start.offset(col as i64 - 1, row as i64 - 1)?;
        if !self.region.contains(&at) {
            return Err(EngineError::OutOfRange {
                cell: at.to_string(),
                range: self.region.to_string(),
            });
        }
        Ok(self.read_cell(&at))
    }

    /// Read a cell that must exist.
    pub fn require(&self, reference: &str) -> Result<CellScalar, EngineError> {
        let at = self.resolve_cell(reference)?;
        self.read_cell(&at).ok_or_else(|| EngineError::CellMissing {
            cell: at.to_string(),
        })
    }

    fn read_cell(&self, at: &CellCoord) -> Option<CellScalar> {
        let cell = self.sheet().cell(at)?;
        let raw = cell.value.as_deref()?;
        Some(match cell.data_type {
            Some(CellType::Boolean) => CellScalar::Bool(raw != "0"),
            Some(CellType::Number) => number_scalar(raw),
            Some(CellType::Date) => match raw
                .parse::<f64>()
                .ok()
                .and_then(|serial| serial_to_datetime(serial, self.book.date_system))
            {
                Some(dt) => CellScalar::DateTime(dt),
                None => CellScalar::Text(raw.to_string()),
            },
            Some(CellType::SharedString) => {
                let index: u32 = raw.parse().ok()?;
                CellScalar::Text(self.book.shared_strings.get(index)?.to_string())
            }
            Some(CellType::InlineString) | None => CellScalar::Text(raw.to_string()),
        })
    }

    /// Write a value to the cell at a reference relative to this region.
    ///
    /// Missing cells are created with the style of the nearest preceding
    /// cell in the same row (or, failing that, the same column). The cell
    /// type is inferred from the value's kind unless the cell already
    /// declares one; string values go through the shared-string table.
    pub fn set_value(&mut self, reference: &str, value: &FieldValue) -> Result<(), EngineError> {
        let at = self.resolve_cell(reference)?;
        self.set_cell_value(&at, value)
    }

    fn set_cell_value(&mut self, at: &CellCoord, value: &FieldValue) -> Result<(), EngineError> {
        if value.is_empty() {
            return Ok(());
        }
        let book = &mut *self.book;
        let date_system = book.date_system;

        let existing = book.sheets[self.sheet].cell(at);
        let exists = existing.is_some();
        let declared = existing.and_then(|c| c.data_type);
        let target = declared.unwrap_or(match value {
            FieldValue::Bool(_) => CellType::Boolean,
            FieldValue::Int(_) | FieldValue::Float(_) => CellType::Number,
            FieldValue::DateTime(_) => CellType::Date,
            FieldValue::Text(_) => CellType::SharedString,
            FieldValue::Empty => unreachable!("empty values are skipped above"),
        });

        let stored = match target {
            CellType::Boolean => {
                encode(value.to_bool().map(|b| (if b { "1" } else { "0" }).to_string()))?
            }
            CellType::Number => encode(value.to_f64().map(format_number))?,
            CellType::Date => encode(
                value
                    .to_datetime()
                    .map(|dt| format_number(datetime_to_serial(&dt, date_system))),
            )?,
            CellType::SharedString => {
                let text = encode(value.to_text())?;
                book.shared_strings.intern(&text).to_string()
            }
            CellType::InlineString => encode(value.to_text())?,
        };

        let inherited = if exists {
            None
        } else {
            let sheet = &book.sheets[self.sheet];
            sheet.style_left_of(at).or_else(|| sheet.style_above(at))
        };

        // Freshly created date cells with no style to inherit still need a
        // date number format, or hosts would render the bare serial.
        let date_style = if target == CellType::Date && !exists && inherited.is_none() {
            Some(book.styles.intern_cell_format(CellFormat {
                number_format_id: DEFAULT_DATE_FORMAT_ID,
                apply_number_format: true,
                ..CellFormat::default()
            }))
        } else {
            None
        };

        let cell = book.sheets[self.sheet].ensure_cell(at);
        if cell.data_type.is_none() {
            cell.data_type = Some(target);
        }
        cell.value = Some(stored);
        if cell.style_id.is_none() {
            cell.style_id = inherited.or(date_style);
        }
        Ok(())
    }
}

fn encode(value: Result<String, ConvertError>) -> Result<String, EngineError> {
    value.map_err(|source| EngineError::Convert {
        field: String::new(),
        source,
    })
}

fn number_scalar(raw: &str) -> CellScalar {
    if let Ok(i) = raw.trim().parse::<i64>() {
        return CellScalar::Int(i);
    }
    match raw.trim().parse::<f64>() {
        Ok(f) => CellScalar::Float(f),
        Err(_) => CellScalar::Text(raw.to_string()),
    }
}
