use std::sync::OnceLock;

use gridform_model::{parse_sheet_ref, quote_sheet_name, CellCoord, RangeRef, Workbook};
use regex::Regex;
use tracing::debug;

use crate::error::EngineError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Axis {
    Rows,
    Columns,
}

/// Insert `count` blank rows before `at_row`, shifting existing rows down
/// and repairing everything that referenced them.
///
/// Sheets are sparse containers: only rows, names and calc-chain entries
/// that exist and are affected are touched, never the whole document. In
/// order:
/// 1. rows at or below the insertion point shift (cell coordinates move
///    with their keys);
/// 2. defined names on the sheet are moved or expanded;
/// 3. calc-chain entries shift, embedded range references in their formulas
///    are expanded, and cached formula results are dropped so the host
///    recomputes them;
/// 4. the declared dimension grows to cover the new rows.
pub fn insert_rows(
    book: &mut Workbook,
    sheet_index: usize,
    at_row: u32,
    count: u32,
) -> Result<(), EngineError> {
    insert_along(book, sheet_index, at_row, count, Axis::Rows)
}

/// Insert `count` blank columns before `at_col`; the mirror of
/// [`insert_rows`].
pub fn insert_columns(
    book: &mut Workbook,
    sheet_index: usize,
    at_col: u32,
    count: u32,
) -> Result<(), EngineError> {
    insert_along(book, sheet_index, at_col, count, Axis::Columns)
}

fn insert_along(
    book: &mut Workbook,
    sheet_index: usize,
    at: u32,
    count: u32,
    axis: Axis,
) -> Result<(), EngineError> {
    if count == 0 {
        return Ok(());
    }
    let (sheet_name, sheet_id) = {
        let sheet = &book.sheets[sheet_index];
        (sheet.name.clone(), sheet.id)
    };
    debug!(sheet = %sheet_name, at, count, ?axis, "inserting blank span");

    {
        let sheet = &mut book.sheets[sheet_index];
        match axis {
            Axis::Rows => {
                let moved: Vec<_> = sheet.rows.split_off(&at).into_iter().collect();
                for (row, data) in moved {
                    sheet.rows.insert(row + count, data);
                }
            }
            Axis::Columns => {
                for row in sheet.rows.values_mut() {
                    let moved: Vec<_> = row.cells.split_off(&at).into_iter().collect();
                    for (col, cell) in moved {
                        row.cells.insert(col + count, cell);
                    }
                }
                for def in &mut sheet.columns {
                    if def.min >= at {
                        def.min += count;
                        def.max += count;
                    } else if def.max >= at {
                        def.max += count;
                    }
                }
            }
        }
        if let Some(dim) = sheet.dimension {
            sheet.dimension = Some(match axis {
                Axis::Rows => dim.expand(0, 0, 0, count)?,
                Axis::Columns => dim.expand(0, count, 0, 0)?,
            });
        }
    }

    for name in &mut book.defined_names {
        if let Some(updated) = shift_name(&name.refers_to, &sheet_name, at, count, axis)? {
            name.refers_to = updated;
        }
    }

    for i in 0..book.calc_chain.len() {
        let entry = book.calc_chain[i];
        if entry.sheet_id != sheet_id {
            continue;
        }
        let affected = match axis {
            Axis::Rows => entry.cell.row >= at,
            Axis::Columns => entry.cell.col >= at,
        };
        if !affected {
            continue;
        }
        let shifted = match axis {
            Axis::Rows => entry.cell.offset(0, count as i64)?,
            Axis::Columns => entry.cell.offset(count as i64, 0)?,
        };
        book.calc_chain[i].cell = shifted;

        let sheet = &mut book.sheets[sheet_index];
        if let Some(cell) = sheet.cell_mut(&shifted) {
            if let Some(formula) = cell.formula.take() {
                cell.formula = Some(expand_formula_ranges(&formula, at, count, axis));
                // Drop the cached result so the host recomputes it on open.
                cell.value = None;
            }
        }
    }
    Ok(())
}

/// Compute the repaired reference for a defined name, or `None` when the
/// name is unaffected (different sheet, unparsable, or entirely before the
/// insertion point).
///
/// A single cell at or after the insertion point moves; a range crossing the
/// point expands its far edge; a range entirely at or after it moves whole.
fn shift_name(
    refers_to: &str,
    sheet_name: &str,
    at: u32,
    count: u32,
    axis: Axis,
) -> Result<Option<String>, EngineError> {
    let Some(q) = parse_sheet_ref(refers_to) else {
        return Ok(None);
    };
    if !q.sheet.eq_ignore_ascii_case(sheet_name) {
        return Ok(None);
    }
    let Ok(range) = RangeRef::parse(q.range, None) else {
        return Ok(None);
    };

    let (start, end, dx, dy) = match axis {
        Axis::Rows => (range.start.row, range.end.row, 0i64, count as i64),
        Axis::Columns => (range.start.col, range.end.col, count as i64, 0i64),
    };
    let updated = if start >= at {
        Some(range.translate(dx, dy)?)
    } else if end >= at {
        Some(match axis {
            Axis::Rows => range.expand(0, 0, 0, count)?,
            Axis::Columns => range.expand(0, count, 0, 0)?,
        })
    } else {
        None
    };

    let sheet_token = quote_sheet_name(q.sheet);
    Ok(updated.map(|range| format!("{}!{}", sheet_token, range.to_absolute_a1())))
}

fn formula_range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\$?[A-Z]{1,3}\$?[1-9][0-9]*:\$?[A-Z]{1,3}\$?[1-9][0-9]*")
            .expect("formula range regex is valid")
    })
}

/// Rewrite every embedded range reference that crosses or touches the
/// insertion point, expanding its far edge by `count`.
///
/// The rewrite is a single left-to-right pass appending untouched slices and
/// rewritten references into a fresh buffer, so a rewrite that changes a
/// reference's text length cannot corrupt the offsets of later matches in
/// the same formula.
fn expand_formula_ranges(formula: &str, at: u32, count: u32, axis: Axis) -> String {
    let mut out = String::with_capacity(formula.len() + 4);
    let mut last = 0usize;
    for m in formula_range_regex().find_iter(formula) {
        out.push_str(&formula[last..m.start()]);
        out.push_str(&rewrite_range_text(m.as_str(), at, count, axis));
        last = m.end();
    }
    out.push_str(&formula[last..]);
    out
}

fn rewrite_range_text(text: &str, at: u32, count: u32, axis: Axis) -> String {
    let Some((a, b)) = text.split_once(':') else {
        return text.to_string();
    };
    let (Ok(mut c1), Ok(mut c2)) = (CellCoord::parse(a), CellCoord::parse(b)) else {
        return text.to_string();
    };

    let (near, far) = match axis {
        Axis::Rows => (c1.row.min(c2.row), c1.row.max(c2.row)),
        Axis::Columns => (c1.col.min(c2.col), c1.col.max(c2.col)),
    };
    // Crossing or directly adjacent ranges grow; everything else is kept.
    if !(near <= at && at <= far + 1) {
        return text.to_string();
    }
    match axis {
        Axis::Rows => {
            if c2.row >= c1.row {
                c2.row += count;
            } else {
                c1.row += count;
            }
        }
        Axis::Columns => {
            if c2.col >= c1.col {
                c2.col += count;
            } else {
                c1.col += count;
            }
        }
    }
    format!("{}:{}", c1.to_a1(), c2.to_a1())
}
