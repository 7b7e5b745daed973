use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Deduplicated pool of text values referenced by index from cells.
///
/// Interning is content-addressed: identical text always resolves to the
/// same index, so repeated imports can never create duplicate entries.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SharedStringTable {
    items: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, u32>,
}

impl PartialEq for SharedStringTable {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl SharedStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or reuse) a string, returning its index.
    pub fn intern(&mut self, text: &str) -> u32 {
        if let Some(id) = self.index.get(text) {
            return *id;
        }
        let id = self.items.len() as u32;
        self.items.push(text.to_string());
        self.index.insert(text.to_string(), id);
        id
    }

    /// Get a string by index.
    pub fn get(&self, index: u32) -> Option<&str> {
        self.items.get(index as usize).map(String::as_str)
    }

    /// Find the index of a string without inserting.
    pub fn find(&self, text: &str) -> Option<u32> {
        self.index.get(text).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, item) in self.items.iter().cloned().enumerate() {
            self.index.entry(item).or_insert(i as u32);
        }
    }
}

impl<'de> Deserialize<'de> for SharedStringTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            #[serde(default)]
            items: Vec<String>,
        }

        let helper = Helper::deserialize(deserializer)?;
        let mut table = SharedStringTable {
            items: helper.items,
            index: HashMap::new(),
        };
        table.rebuild_index();
        Ok(table)
    }
}
