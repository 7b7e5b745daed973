use serde::{Deserialize, Serialize};

use crate::coord::CellCoord;
use crate::dates::DateSystem;
use crate::names::{parse_sheet_ref, DefinedName};
use crate::shared_strings::SharedStringTable;
use crate::style::Stylesheet;
use crate::worksheet::{Worksheet, WorksheetId};

/// An entry in the workbook's calculation chain: a formula cell the host
/// application recomputes, in dependency order.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalcCell {
    pub sheet_id: WorksheetId,
    pub cell: CellCoord,
}

/// A pivot-cache part carried as opaque pass-through, keyed by the sheet its
/// data comes from. Only consulted when that sheet is deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PivotCache {
    pub id: u32,
    pub source_sheet: String,
}

/// A workbook: worksheets plus the shared resource tables they reference.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub sheets: Vec<Worksheet>,
    #[serde(default)]
    pub shared_strings: SharedStringTable,
    #[serde(default)]
    pub styles: Stylesheet,
    #[serde(default)]
    pub defined_names: Vec<DefinedName>,
    #[serde(default)]
    pub calc_chain: Vec<CalcCell>,
    #[serde(default)]
    pub pivot_caches: Vec<PivotCache>,
    #[serde(default)]
    pub date_system: DateSystem,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next free worksheet id: one greater than the maximum existing id.
    pub fn next_sheet_id(&self) -> WorksheetId {
        self.sheets.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    /// Add a new empty worksheet and return a handle to it.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut Worksheet {
        let id = self.next_sheet_id();
        self.sheets.push(Worksheet::new(id, name));
        self.sheets.last_mut().expect("sheet was just pushed")
    }

    /// Find a sheet by name (case-insensitive).
    pub fn sheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Find a sheet's position by name (case-insensitive).
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Get a sheet by id.
    pub fn sheet_by_id(&self, id: WorksheetId) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.id == id)
    }

    /// Find a defined name (case-insensitive, as name resolution in hosts).
    pub fn defined_name(&self, name: &str) -> Option<&DefinedName> {
        self.defined_names
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }

    /// Create or replace a defined name.
    pub fn set_defined_name(&mut self, name: impl Into<String>, refers_to: impl Into<String>) {
        let name = name.into();
        let refers_to = refers_to.into();
        match self
            .defined_names
            .iter_mut()
            .find(|n| n.name.eq_ignore_ascii_case(&name))
        {
            Some(existing) => existing.refers_to = refers_to,
            None => self.defined_names.push(DefinedName::new(name, refers_to)),
        }
    }

    /// Delete a worksheet, pruning everything that referenced it: pivot
    /// caches sourced from it, defined names resolving into it, and its
    /// calculation-chain entries. Returns false when no such sheet exists.
    pub fn delete_sheet(&mut self, name: &str) -> bool {
        let Some(index) = self.sheet_index(name) else {
            return false;
        };
        let sheet = self.sheets.remove(index);

        self.pivot_caches
            .retain(|cache| !cache.source_sheet.eq_ignore_ascii_case(&sheet.name));
        self.defined_names.retain(|dn| {
            parse_sheet_ref(&dn.refers_to)
                .map_or(true, |r| !r.sheet.eq_ignore_ascii_case(&sheet.name))
        });
        self.calc_chain.retain(|entry| entry.sheet_id != sheet.id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use pretty_assertions::assert_eq;

    #[test]
    fn workbook_serde_roundtrips() {
        let mut book = Workbook::new();
        book.shared_strings.intern("Total");
        let sheet = book.add_sheet("Data");
        sheet.set_cell(&CellCoord::parse("B2").unwrap(), Cell::number(1.5));
        book.set_defined_name("Grand", "Data!$B$2");

        let json = serde_json::to_string(&book).unwrap();
        let back: Workbook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, book);
        // The rebuilt string index still deduplicates.
        let mut back = back;
        assert_eq!(back.shared_strings.intern("Total"), 0);
    }

    #[test]
    fn sheet_ids_grow_past_the_maximum() {
        let mut book = Workbook::new();
        assert_eq!(book.add_sheet("One").id, 1);
        assert_eq!(book.add_sheet("Two").id, 2);
        book.delete_sheet("One");
        assert_eq!(book.add_sheet("Three").id, 3);
    }

    #[test]
    fn sheet_lookup_is_case_insensitive() {
        let mut book = Workbook::new();
        book.add_sheet("Orders");
        assert!(book.sheet_by_name("orders").is_some());
        assert_eq!(book.sheet_index("ORDERS"), Some(0));
        assert!(book.sheet_by_name("Other").is_none());
    }

    #[test]
    fn delete_sheet_prunes_dependents() {
        let mut book = Workbook::new();
        let id = book.add_sheet("Data").id;
        book.add_sheet("Keep");
        book.set_defined_name("DataRange", "Data!$A$1:$B$5");
        book.set_defined_name("KeepRange", "Keep!$A$1");
        book.pivot_caches.push(PivotCache {
            id: 1,
            source_sheet: "Data".to_string(),
        });
        book.calc_chain.push(CalcCell {
            sheet_id: id,
            cell: CellCoord::parse("B2").unwrap(),
        });

        assert!(book.delete_sheet("Data"));

        assert!(book.sheet_by_name("Data").is_none());
        assert!(book.pivot_caches.is_empty());
        assert!(book.calc_chain.is_empty());
        assert!(book.defined_name("DataRange").is_none());
        assert!(book.defined_name("KeepRange").is_some());
    }
}
