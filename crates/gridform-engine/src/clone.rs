use std::collections::HashMap;

use gridform_model::{
    parse_sheet_ref, CalcCell, CellType, Row, Workbook, Worksheet, WorksheetId,
};
use tracing::debug;

use crate::error::EngineError;

/// Copy a worksheet from one workbook into another, importing every shared
/// resource the sheet references.
///
/// The clone receives a fresh sheet id (one greater than the destination's
/// maximum) and is inserted at `dst_index` (clamped to the sheet count). It
/// carries the source's format properties, dimension, column definitions,
/// rows and cells, merged regions, the defined names that reference the
/// source sheet, and the source sheet's calculation-chain entries rewritten
/// to the new id.
///
/// Shared strings are re-interned content-addressed, so repeated clones
/// never duplicate table entries. Styles are imported as deep unconditional
/// copies (deduplicating only number formats), memoized per clone so one
/// source style is imported at most once.
pub fn copy_sheet(
    src: &Workbook,
    src_sheet: &str,
    dst: &mut Workbook,
    dst_index: usize,
) -> Result<WorksheetId, EngineError> {
    let source = src
        .sheet_by_name(src_sheet)
        .ok_or_else(|| EngineError::SheetNotFound(src_sheet.to_string()))?;
    let new_id = dst.next_sheet_id();
    debug!(sheet = %source.name, new_id, "copying worksheet");

    let mut style_map: HashMap<u32, u32> = HashMap::new();
    let mut sheet = Worksheet::new(new_id, source.name.clone());
    sheet.format = source.format.clone();
    sheet.dimension = source.dimension;
    sheet.merged = source.merged.clone();

    for def in &source.columns {
        let mut copied = def.clone();
        if let Some(style) = copied.style_id {
            copied.style_id = Some(import_style(src, dst, &mut style_map, style)?);
        }
        sheet.columns.push(copied);
    }

    for (row_number, row) in &source.rows {
        let mut copied = Row {
            style_id: None,
            height: row.height,
            cells: Default::default(),
        };
        if let Some(style) = row.style_id {
            copied.style_id = Some(import_style(src, dst, &mut style_map, style)?);
        }
        for (col_number, cell) in &row.cells {
            let mut copied_cell = cell.clone();
            if cell.data_type == Some(CellType::SharedString) {
                if let Some(raw) = &cell.value {
                    let index: u32 = raw.parse().map_err(|_| {
                        EngineError::Document(format!("invalid shared string index {raw:?}"))
                    })?;
                    let text = src
                        .shared_strings
                        .get(index)
                        .ok_or(EngineError::SharedStringMissing(index))?;
                    copied_cell.value = Some(dst.shared_strings.intern(text).to_string());
                }
            }
            if let Some(style) = cell.style_id {
                copied_cell.style_id = Some(import_style(src, dst, &mut style_map, style)?);
            }
            copied.cells.insert(*col_number, copied_cell);
        }
        sheet.rows.insert(*row_number, copied);
    }

    for name in &src.defined_names {
        let references_source = parse_sheet_ref(&name.refers_to)
            .is_some_and(|q| q.sheet.eq_ignore_ascii_case(&source.name));
        if references_source {
            dst.set_defined_name(name.name.clone(), name.refers_to.clone());
        }
    }

    for entry in &src.calc_chain {
        if entry.sheet_id == source.id {
            dst.calc_chain.push(CalcCell {
                sheet_id: new_id,
                cell: entry.cell,
            });
        }
    }

    let index = dst_index.min(dst.sheets.len());
    dst.sheets.insert(index, sheet);
    Ok(new_id)
}

fn import_style(
    src: &Workbook,
    dst: &mut Workbook,
    memo: &mut HashMap<u32, u32>,
    style_id: u32,
) -> Result<u32, EngineError> {
    if let Some(mapped) = memo.get(&style_id) {
        return Ok(*mapped);
    }
    let imported = dst.styles.import_format(&src.styles, style_id)?;
    memo.insert(style_id, imported);
    Ok(imported)
}
