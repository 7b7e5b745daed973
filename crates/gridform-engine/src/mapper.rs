use crate::accessor::RangeAccessor;
use crate::collection::{NestedReader, NestedWriter};
use crate::error::EngineError;
use crate::record::Entity;
use crate::template::EntityTemplate;

/// Read one record from the accessor's region.
///
/// Missing cells leave their fields default. Reference failures — a bad
/// anchor, an unknown defined name, a cell outside the region — abort the
/// read, as does any field conversion failure. When no scalar field produced
/// a value and the template forbids null entities, `Ok(None)` is returned:
/// the signal collection readers use to detect the end of data.
pub fn read_entity<T: Entity>(
    acc: &mut RangeAccessor<'_>,
    template: &EntityTemplate,
) -> Result<Option<T>, EngineError> {
    let mut entity = T::default();
    let mut present = false;

    for field in &template.fields {
        if let Some(scalar) = acc.value(&field.range)? {
            entity
                .put_field(&field.name, scalar.into())
                .map_err(|source| EngineError::Convert {
                    field: field.name.clone(),
                    source,
                })?;
            present = true;
        }
    }

    if !present && !template.allow_null {
        return Ok(None);
    }

    if !template.collections.is_empty() {
        let mut nested = NestedReader::new(acc, template);
        entity.read_collections(&mut nested)?;
    }
    Ok(Some(entity))
}

/// Write one record into the accessor's region: the mirror of
/// [`read_entity`]. Empty field values are skipped rather than written.
pub fn write_entity<T: Entity>(
    acc: &mut RangeAccessor<'_>,
    template: &EntityTemplate,
    entity: &T,
) -> Result<(), EngineError> {
    for field in &template.fields {
        let value = entity.get_field(&field.name);
        if value.is_empty() {
            continue;
        }
        acc.set_value(&field.range, &value).map_err(|err| match err {
            EngineError::Convert { source, .. } => EngineError::Convert {
                field: field.name.clone(),
                source,
            },
            other => other,
        })?;
    }

    if !template.collections.is_empty() {
        let mut nested = NestedWriter::new(acc, template);
        entity.write_collections(&mut nested)?;
    }
    Ok(())
}
