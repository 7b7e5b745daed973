use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gridform_model::Workbook;

use crate::error::{ConfigError, EngineError};

/// The document seam: how the engine reaches a workbook tree without
/// performing any package I/O itself.
///
/// The real OOXML package reader/writer implements this in its own crate;
/// the engine only ever drives the in-memory tree it exposes. A source is
/// single-use and single-threaded: open, map, close.
pub trait DocumentSource: std::fmt::Debug {
    /// Open the document at `path`. `read_only` sources may refuse writes
    /// at save time.
    fn open(&mut self, path: &Path, read_only: bool) -> Result<(), EngineError>;

    /// Flush and release the document.
    fn close(&mut self) -> Result<(), EngineError>;

    /// The in-memory workbook tree, available while the source is open.
    fn workbook(&mut self) -> Option<&mut Workbook>;
}

/// An in-memory document: a workbook staged directly, with no backing file.
/// Useful for fixtures and for callers that assemble workbooks themselves.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    workbook: Option<Workbook>,
    opened: Option<PathBuf>,
    read_only: bool,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workbook(workbook: Workbook) -> Self {
        Self {
            workbook: Some(workbook),
            opened: None,
            read_only: false,
        }
    }

    /// Take the workbook back out, e.g. to inspect the result of a save.
    pub fn into_workbook(self) -> Option<Workbook> {
        self.workbook
    }
}

impl DocumentSource for MemoryDocument {
    fn open(&mut self, path: &Path, read_only: bool) -> Result<(), EngineError> {
        if self.workbook.is_none() {
            return Err(EngineError::Document(format!(
                "no workbook staged for {}",
                path.display()
            )));
        }
        self.opened = Some(path.to_path_buf());
        self.read_only = read_only;
        Ok(())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.opened = None;
        Ok(())
    }

    fn workbook(&mut self) -> Option<&mut Workbook> {
        if self.opened.is_some() {
            self.workbook.as_mut()
        } else {
            None
        }
    }
}

type SourceConstructor = Box<dyn Fn() -> Box<dyn DocumentSource>>;

/// Static registry mapping a parser kind to a constructor, populated at
/// startup.
///
/// This replaces string-configured dynamic type instantiation: anything not
/// registered before use simply does not exist, an explicit scope reduction
/// relative to drop-in plugin loading.
pub struct SourceRegistry {
    constructors: HashMap<String, SourceConstructor>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
        };
        registry.register("memory", || Box::new(MemoryDocument::new()));
        registry
    }
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `kind`, replacing any previous one.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        constructor: impl Fn() -> Box<dyn DocumentSource> + 'static,
    ) {
        self.constructors.insert(kind.into(), Box::new(constructor));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Construct a fresh source for `kind`.
    pub fn create(&self, kind: &str) -> Result<Box<dyn DocumentSource>, ConfigError> {
        self.constructors
            .get(kind)
            .map(|constructor| constructor())
            .ok_or_else(|| ConfigError::ParserNotRegistered(kind.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_constructs_registered_kinds() {
        let registry = SourceRegistry::new();
        assert!(registry.contains("memory"));
        assert!(registry.create("memory").is_ok());
        assert_eq!(
            registry.create("xlsx").unwrap_err(),
            ConfigError::ParserNotRegistered("xlsx".to_string())
        );
    }

    #[test]
    fn memory_document_requires_a_staged_workbook() {
        let mut doc = MemoryDocument::new();
        assert!(doc.open(Path::new("missing.xlsx"), true).is_err());

        let mut doc = MemoryDocument::with_workbook(Workbook::new());
        assert!(doc.workbook().is_none());
        doc.open(Path::new("ok.xlsx"), true).unwrap();
        assert!(doc.workbook().is_some());
        doc.close().unwrap();
        assert!(doc.workbook().is_none());
    }
}
