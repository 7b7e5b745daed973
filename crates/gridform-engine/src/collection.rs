use std::marker::PhantomData;

use gridform_model::{CellCoord, RangeRef, Workbook};
use tracing::debug;

use crate::accessor::{resolve_region, RangeAccessor};
use crate::error::EngineError;
use crate::mapper::{read_entity, write_entity};
use crate::mutate::{insert_columns, insert_rows};
use crate::record::Entity;
use crate::template::{CollectionTemplate, EntityTemplate, Orientation};

/// Compute the Nth item's region, relative to the collection's top-left
/// corner (1-based), without clipping.
///
/// The item footprint comes from the template's first-item range, clamped
/// not to exceed the collection. Vertical tiling fills rows first;
/// horizontal fills columns first.
fn item_slot(
    collection: &RangeRef,
    first_item: &RangeRef,
    index: u32,
    orientation: Orientation,
) -> RangeRef {
    let height = first_item.height().min(collection.height());
    let width = first_item.width().min(collection.width());
    let (col_idx, row_idx) = match orientation {
        Orientation::Vertical => {
            let per_row = collection.width() / width;
            (index % per_row, index / per_row)
        }
        Orientation::Horizontal => {
            let per_col = collection.height() / height;
            (index / per_col, index % per_col)
        }
    };
    let top_left = CellCoord::new(col_idx * width + 1, row_idx * height + 1)
        .expect("slot coordinates are positive");
    let bottom_right = CellCoord::new(top_left.col + width - 1, top_left.row + height - 1)
        .expect("slot coordinates are positive");
    RangeRef::new(top_left, bottom_right)
}

/// True when the slot, translated to absolute coordinates, reaches or passes
/// the boundary marker. Checked before any data is read, so a marker always
/// wins over stray leftover data beyond it.
fn past_marker(
    collection: &RangeRef,
    slot: &RangeRef,
    marker: &RangeRef,
    orientation: Orientation,
) -> bool {
    match orientation {
        Orientation::Vertical => collection.start.row + slot.start.row - 1 >= marker.start.row,
        Orientation::Horizontal => collection.start.col + slot.start.col - 1 >= marker.start.col,
    }
}

/// The slot's absolute region inside the collection, or `None` when it no
/// longer fits in full (the end of the tiled area).
fn slot_region(collection: &RangeRef, slot: &RangeRef) -> Option<RangeRef> {
    collection
        .sub_range(slot, true)
        .filter(|r| r.width() == slot.width() && r.height() == slot.height())
}

/// Sequential reader over a tiled collection of records.
///
/// Advancing past the last item is not an error: [`EntityReader::try_next`]
/// returns `Ok(None)` and the reader stays exhausted until [`reset`].
///
/// [`reset`]: EntityReader::reset
pub struct EntityReader<'b, T> {
    book: &'b mut Workbook,
    template: CollectionTemplate,
    index: i64,
    bound: Option<(usize, RangeRef)>,
    marker: Option<RangeRef>,
    marker_resolved: bool,
    done: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<'b, T: Entity> EntityReader<'b, T> {
    pub fn new(book: &'b mut Workbook, template: &CollectionTemplate) -> Self {
        Self {
            book,
            template: template.clone(),
            index: -1,
            bound: None,
            marker: None,
            marker_resolved: false,
            done: false,
            _entity: PhantomData,
        }
    }

    /// Return to before the first item and re-resolve the boundary marker.
    /// Only safe when the document has not been structurally mutated since
    /// the reader was created.
    pub fn reset(&mut self) {
        self.index = -1;
        self.marker = None;
        self.marker_resolved = false;
        self.done = false;
    }

    fn ensure_bound(&mut self) -> Result<(usize, RangeRef), EngineError> {
        if let Some(bound) = self.bound {
            return Ok(bound);
        }
        let bound = resolve_region(self.book, &self.template.range)?;
        self.bound = Some(bound);
        Ok(bound)
    }

    fn ensure_marker(&mut self, sheet: usize) -> Result<Option<RangeRef>, EngineError> {
        if !self.marker_resolved {
            self.marker = match &self.template.end_before {
                Some(reference) => {
                    let (marker_sheet, region) = resolve_region(self.book, reference)?;
                    (marker_sheet == sheet).then_some(region)
                }
                None => None,
            };
            self.marker_resolved = true;
        }
        Ok(self.marker)
    }

    fn current_region(&mut self) -> Result<Option<(usize, RangeRef)>, EngineError> {
        let (sheet, collection) = self.ensure_bound()?;
        let marker = self.ensure_marker(sheet)?;
        let first = RangeRef::parse(&self.template.item_template.range, None)?;
        let index = self.index.max(0) as u32;
        let slot = item_slot(&collection, &first, index, self.template.orientation);
        if let Some(marker) = &marker {
            if past_marker(&collection, &slot, marker, self.template.orientation) {
                return Ok(None);
            }
        }
        Ok(slot_region(&collection, &slot).map(|region| (sheet, region)))
    }

    /// Advance to the next item. `Ok(None)` means the sequence is exhausted —
    /// the slot fell outside the collection, the boundary marker was
    /// reached, or a non-null entity was required and absent.
    pub fn try_next(&mut self) -> Result<Option<T>, EngineError> {
        if self.done {
            return Ok(None);
        }
        self.index += 1;
        let Some((sheet, region)) = self.current_region()? else {
            self.done = true;
            return Ok(None);
        };
        let mut acc = RangeAccessor::new(self.book, sheet, region);
        match read_entity::<T>(&mut acc, &self.template.item_template)? {
            Some(entity) => Ok(Some(entity)),
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// Drain the reader into a vector.
    pub fn read_all(mut self) -> Result<Vec<T>, EngineError> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next()? {
            items.push(item);
        }
        Ok(items)
    }
}

impl<'b, T: Entity> Iterator for EntityReader<'b, T> {
    type Item = Result<T, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.try_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Read every record of a collection template out of a workbook.
pub fn read_records<T: Entity>(
    book: &mut Workbook,
    template: &CollectionTemplate,
) -> Result<Vec<T>, EngineError> {
    EntityReader::new(book, template).read_all()
}

/// Sequential append-only writer over a tiled collection.
///
/// The cursor advances one item footprint per write. When the next item
/// would fall outside the collection region (or collide with the boundary
/// marker), rows or columns matching the footprint are inserted first and
/// the memoized regions are adjusted — previously resolved regions are never
/// reused across the mutation.
pub struct EntityWriter<'b, T> {
    book: &'b mut Workbook,
    template: CollectionTemplate,
    index: u32,
    bound: Option<(usize, RangeRef)>,
    marker: Option<RangeRef>,
    marker_resolved: bool,
    _entity: PhantomData<fn(&T)>,
}

impl<'b, T: Entity> EntityWriter<'b, T> {
    pub fn new(book: &'b mut Workbook, template: &CollectionTemplate) -> Self {
        Self {
            book,
            template: template.clone(),
            index: 0,
            bound: None,
            marker: None,
            marker_resolved: false,
            _entity: PhantomData,
        }
    }

    fn ensure_bound(&mut self) -> Result<(usize, RangeRef), EngineError> {
        if let Some(bound) = self.bound {
            return Ok(bound);
        }
        let bound = resolve_region(self.book, &self.template.range)?;
        self.bound = Some(bound);
        Ok(bound)
    }

    fn ensure_marker(&mut self, sheet: usize) -> Result<Option<RangeRef>, EngineError> {
        if !self.marker_resolved {
            self.marker = match &self.template.end_before {
                Some(reference) => {
                    let (marker_sheet, region) = resolve_region(self.book, reference)?;
                    (marker_sheet == sheet).then_some(region)
                }
                None => None,
            };
            self.marker_resolved = true;
        }
        Ok(self.marker)
    }

    /// Append one record at the cursor.
    pub fn write(&mut self, entity: &T) -> Result<(), EngineError> {
        let (sheet, mut collection) = self.ensure_bound()?;
        let mut marker = self.ensure_marker(sheet)?;
        let first = RangeRef::parse(&self.template.item_template.range, None)?;
        let slot = item_slot(&collection, &first, self.index, self.template.orientation);

        let needs_growth = match self.template.orientation {
            Orientation::Vertical => {
                let bottom = collection.start.row + slot.end.row - 1;
                bottom > collection.end.row
                    || marker.as_ref().map_or(false, |m| {
                        past_marker(&collection, &slot, m, Orientation::Vertical)
                    })
            }
            Orientation::Horizontal => {
                let right = collection.start.col + slot.end.col - 1;
                right > collection.end.col
                    || marker.as_ref().map_or(false, |m| {
                        past_marker(&collection, &slot, m, Orientation::Horizontal)
                    })
            }
        };

        if needs_growth {
            match self.template.orientation {
                Orientation::Vertical => {
                    let at = collection.start.row + slot.start.row - 1;
                    let count = slot.height();
                    insert_rows(self.book, sheet, at, count)?;
                    collection = collection.expand(0, 0, 0, count)?;
                    if let Some(m) = marker.as_mut() {
                        *m = m.translate(0, count as i64)?;
                    }
                }
                Orientation::Horizontal => {
                    let at = collection.start.col + slot.start.col - 1;
                    let count = slot.width();
                    insert_columns(self.book, sheet, at, count)?;
                    collection = collection.expand(0, count, 0, 0)?;
                    if let Some(m) = marker.as_mut() {
                        *m = m.translate(count as i64, 0)?;
                    }
                }
            }
            self.bound = Some((sheet, collection));
            self.marker = marker;
            debug!(index = self.index, collection = %collection, "grew collection for append");
        }

        let region = slot_region(&collection, &slot).ok_or_else(|| EngineError::OutOfRange {
            cell: slot.start.to_string(),
            range: collection.to_string(),
        })?;
        let mut acc = RangeAccessor::new(self.book, sheet, region);
        write_entity(&mut acc, &self.template.item_template, entity)?;
        self.index += 1;
        Ok(())
    }

    /// Append every record in order.
    pub fn write_all<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a T>,
    ) -> Result<(), EngineError>
    where
        T: 'a,
    {
        for item in items {
            self.write(item)?;
        }
        Ok(())
    }
}

/// Write a sequence of records into a workbook through a collection
/// template.
pub fn write_records<T: Entity>(
    book: &mut Workbook,
    template: &CollectionTemplate,
    items: &[T],
) -> Result<(), EngineError> {
    EntityWriter::new(book, template).write_all(items)
}

/// Resolve a nested boundary marker: a plain reference is relative to the
/// parent entity region, anything else goes through defined-name or
/// sheet-qualified resolution (and must land on the same sheet).
fn resolve_scoped_marker(
    book: &Workbook,
    scope: &RangeRef,
    sheet: usize,
    reference: &str,
) -> Result<Option<RangeRef>, EngineError> {
    if let Ok(parsed) = RangeRef::parse(reference, Some(scope)) {
        return Ok(scope.sub_range(&parsed, false));
    }
    let (marker_sheet, region) = resolve_region(book, reference)?;
    Ok((marker_sheet == sheet).then_some(region))
}

/// Nested-collection context handed to [`Entity::read_collections`].
///
/// Ranges resolve relative to the parent entity's region, so a nested
/// template describes its layout within one record's footprint, not within
/// the sheet. The context borrows the parent accessor for the duration of
/// the call and retains nothing.
pub struct NestedReader<'a, 'b> {
    acc: &'a mut RangeAccessor<'b>,
    template: &'a EntityTemplate,
}

impl<'a, 'b> NestedReader<'a, 'b> {
    pub(crate) fn new(acc: &'a mut RangeAccessor<'b>, template: &'a EntityTemplate) -> Self {
        Self { acc, template }
    }

    /// Drain the named nested collection into a typed list.
    pub fn read<T: Entity>(&mut self, name: &str) -> Result<Vec<T>, EngineError> {
        let nested = self.template.collection(name)?.clone();
        let scope = self.acc.region();
        let sheet = self.acc.sheet_index();

        let Some(region) = scope.sub_range_from(&nested.range, true)? else {
            return Ok(Vec::new());
        };
        let marker = match &nested.end_before {
            Some(reference) => {
                resolve_scoped_marker(self.acc.workbook(), &scope, sheet, reference)?
            }
            None => None,
        };
        let first = RangeRef::parse(&nested.item_template.range, None)?;

        let mut items = Vec::new();
        for index in 0.. {
            let slot = item_slot(&region, &first, index, nested.orientation);
            if let Some(marker) = &marker {
                if past_marker(&region, &slot, marker, nested.orientation) {
                    break;
                }
            }
            let Some(item_region) = slot_region(&region, &slot) else {
                break;
            };
            let mut item_acc = self.acc.sub_region(item_region);
            match read_entity::<T>(&mut item_acc, &nested.item_template)? {
                Some(entity) => items.push(entity),
                None => break,
            }
        }
        Ok(items)
    }
}

/// Nested-collection context handed to [`Entity::write_collections`].
pub struct NestedWriter<'a, 'b> {
    acc: &'a mut RangeAccessor<'b>,
    template: &'a EntityTemplate,
}

impl<'a, 'b> NestedWriter<'a, 'b> {
    pub(crate) fn new(acc: &'a mut RangeAccessor<'b>, template: &'a EntityTemplate) -> Self {
        Self { acc, template }
    }

    /// Write a typed list through the named nested collection template.
    ///
    /// Growth past the nested region inserts rows (or columns) at the append
    /// position, which also widens the parent entity's region so later
    /// collections of the same record resolve against the shifted layout.
    pub fn write<T: Entity>(&mut self, name: &str, items: &[T]) -> Result<(), EngineError> {
        let nested = self.template.collection(name)?.clone();
        let scope = self.acc.region();
        let sheet = self.acc.sheet_index();

        let mut region =
            scope
                .sub_range_from(&nested.range, true)?
                .ok_or_else(|| EngineError::OutOfRange {
                    cell: nested.range.clone(),
                    range: scope.to_string(),
                })?;
        let mut marker = match &nested.end_before {
            Some(reference) => {
                resolve_scoped_marker(self.acc.workbook(), &scope, sheet, reference)?
            }
            None => None,
        };
        let first = RangeRef::parse(&nested.item_template.range, None)?;

        for (index, item) in items.iter().enumerate() {
            let slot = item_slot(&region, &first, index as u32, nested.orientation);
            let needs_growth = match nested.orientation {
                Orientation::Vertical => {
                    region.start.row + slot.end.row - 1 > region.end.row
                        || marker.as_ref().map_or(false, |m| {
                            past_marker(&region, &slot, m, Orientation::Vertical)
                        })
                }
                Orientation::Horizontal => {
                    region.start.col + slot.end.col - 1 > region.end.col
                        || marker.as_ref().map_or(false, |m| {
                            past_marker(&region, &slot, m, Orientation::Horizontal)
                        })
                }
            };
            if needs_growth {
                match nested.orientation {
                    Orientation::Vertical => {
                        let at = region.start.row + slot.start.row - 1;
                        let count = slot.height();
                        insert_rows(self.acc.workbook(), sheet, at, count)?;
                        region = region.expand(0, 0, 0, count)?;
                        self.acc.grow(0, count);
                        if let Some(m) = marker.as_mut() {
                            *m = m.translate(0, count as i64)?;
                        }
                    }
                    Orientation::Horizontal => {
                        let at = region.start.col + slot.start.col - 1;
                        let count = slot.width();
                        insert_columns(self.acc.workbook(), sheet, at, count)?;
                        region = region.expand(0, count, 0, 0)?;
                        self.acc.grow(count, 0);
                        if let Some(m) = marker.as_mut() {
                            *m = m.translate(count as i64, 0)?;
                        }
                    }
                }
            }
            let item_region =
                slot_region(&region, &slot).ok_or_else(|| EngineError::OutOfRange {
                    cell: slot.start.to_string(),
                    range: region.to_string(),
                })?;
            let mut item_acc = self.acc.sub_region(item_region);
            write_entity(&mut item_acc, &nested.item_template, item)?;
        }
        Ok(())
    }
}
