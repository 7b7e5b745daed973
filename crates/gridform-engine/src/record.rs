use crate::collection::{NestedReader, NestedWriter};
use crate::convert::FieldValue;
use crate::error::{ConvertError, EngineError};

/// A record type that can be mapped onto a spreadsheet region.
///
/// Field lookup by configured name is resolved through this compile-time
/// accessor table instead of runtime type introspection: each record type
/// implements the two scalar accessors by matching on its field names, and
/// optionally the two collection hooks for nested record lists.
///
/// Conventions:
/// - `put_field` ignores names the record does not know (templates may bind
///   more columns than a given record consumes) and fails only when a known
///   field rejects the value's conversion.
/// - `get_field` returns [`FieldValue::Empty`] for unknown or unset fields;
///   empty values are not written.
pub trait Entity: Default {
    /// Bind one scalar field read from the document.
    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), ConvertError>;

    /// Produce one scalar field for writing to the document.
    fn get_field(&self, field: &str) -> FieldValue;

    /// Load nested collections through `nested`, once scalar fields are
    /// bound. The default does nothing.
    fn read_collections(&mut self, nested: &mut NestedReader<'_, '_>) -> Result<(), EngineError> {
        let _ = nested;
        Ok(())
    }

    /// Store nested collections through `nested`, once scalar fields are
    /// written. The default does nothing.
    fn write_collections(&self, nested: &mut NestedWriter<'_, '_>) -> Result<(), EngineError> {
        let _ = nested;
        Ok(())
    }
}
