use gridform_model::{CoordError, RangeError, StyleImportError};
use thiserror::Error;

/// Errors raised by the mapping engine.
///
/// End-of-collection is deliberately *not* represented here: readers signal
/// exhaustion with `Ok(None)`, never through the error channel.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed cell reference text.
    #[error("invalid cell reference: {0}")]
    Coord(#[from] CoordError),

    /// Malformed range reference text.
    #[error("invalid range reference: {0}")]
    Range(#[from] RangeError),

    /// A reference was syntactically valid but cannot be used where it
    /// appeared (e.g. a defined name resolving to unqualified text).
    #[error("invalid reference '{0}'")]
    InvalidReference(String),

    /// A required cell does not exist.
    #[error("cell {cell} does not exist")]
    CellMissing { cell: String },

    /// A computed cell or sub-range fell outside its declared parent region.
    #[error("cell {cell} is outside the range {range}")]
    OutOfRange { cell: String, range: String },

    /// A defined name was referenced but is not present in the workbook.
    #[error("defined name '{0}' does not exist")]
    NameNotFound(String),

    /// An anchored reference could not be resolved.
    #[error("cannot resolve anchored reference '{reference}'")]
    Anchor {
        reference: String,
        #[source]
        source: Box<EngineError>,
    },

    /// A cell value could not be converted for a bound field.
    #[error("field '{field}': {source}")]
    Convert {
        field: String,
        #[source]
        source: ConvertError,
    },

    /// A worksheet named by a reference does not exist.
    #[error("sheet '{0}' does not exist")]
    SheetNotFound(String),

    /// A shared-string index points past the end of the source table.
    #[error("shared string {0} does not exist in the source document")]
    SharedStringMissing(u32),

    /// Style import between documents failed.
    #[error("style import failed: {0}")]
    Style(#[from] StyleImportError),

    /// Missing or inconsistent template/parser configuration. Surfaced
    /// before any document I/O is attempted.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The document source could not open, close or expose a workbook.
    #[error("document error: {0}")]
    Document(String),
}

/// Configuration lookup failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("template '{0}' is not configured")]
    TemplateNotFound(String),
    #[error("parser '{0}' is not configured")]
    ParserNotFound(String),
    #[error("parser kind '{0}' is not registered")]
    ParserNotRegistered(String),
    #[error("template '{0}' defines no collections")]
    NoCollections(String),
    #[error("collection '{0}' is not configured for this entity")]
    CollectionNotFound(String),
}

/// A raw value could not be coerced to a field's target type.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot convert {raw:?} to {target}")]
pub struct ConvertError {
    pub raw: String,
    pub target: &'static str,
}

impl ConvertError {
    pub fn new(raw: impl Into<String>, target: &'static str) -> Self {
        Self {
            raw: raw.into(),
            target,
        }
    }
}
