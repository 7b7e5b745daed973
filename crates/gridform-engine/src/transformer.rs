use std::path::Path;

use tracing::debug;

use crate::collection::{EntityReader, EntityWriter};
use crate::error::EngineError;
use crate::record::Entity;
use crate::source::{DocumentSource, SourceRegistry};
use crate::template::{TemplateConfig, TransformerConfig};

/// Facade tying configuration, document sources and the mapping engine
/// together.
///
/// All configuration lookups happen before a source is opened, so a missing
/// template or parser never touches the document.
pub struct Transformer {
    config: TransformerConfig,
    registry: SourceRegistry,
}

impl Transformer {
    pub fn new(config: TransformerConfig) -> Self {
        Self {
            config,
            registry: SourceRegistry::new(),
        }
    }

    pub fn with_registry(config: TransformerConfig, registry: SourceRegistry) -> Self {
        Self { config, registry }
    }

    pub fn registry_mut(&mut self) -> &mut SourceRegistry {
        &mut self.registry
    }

    fn prepare(
        &self,
        template_name: &str,
    ) -> Result<(&TemplateConfig, Box<dyn DocumentSource>), EngineError> {
        let template = self.config.template(template_name)?;
        template.primary_collection()?;
        let parser = self.config.parser(&template.parser)?;
        let source = self.registry.create(&parser.kind)?;
        Ok((template, source))
    }

    /// Load every record a template's collection describes.
    pub fn load<T: Entity>(&self, path: &Path, template_name: &str) -> Result<Vec<T>, EngineError> {
        let (template, mut source) = self.prepare(template_name)?;
        debug!(path = %path.display(), template = template_name, "loading records");
        source.open(path, true)?;
        let result = read_all(source.as_mut(), template);
        finish(source.as_mut(), result)
    }

    /// Load only the first record, the usual way to read form-shaped data.
    pub fn load_one<T: Entity>(
        &self,
        path: &Path,
        template_name: &str,
    ) -> Result<Option<T>, EngineError> {
        let (template, mut source) = self.prepare(template_name)?;
        debug!(path = %path.display(), template = template_name, "loading first record");
        source.open(path, true)?;
        let result = read_first(source.as_mut(), template);
        finish(source.as_mut(), result)
    }

    /// Write one record through a template.
    pub fn save<T: Entity>(
        &self,
        path: &Path,
        template_name: &str,
        record: &T,
    ) -> Result<(), EngineError> {
        self.save_all(path, template_name, std::slice::from_ref(record))
    }

    /// Write a sequence of records through a template.
    pub fn save_all<T: Entity>(
        &self,
        path: &Path,
        template_name: &str,
        records: &[T],
    ) -> Result<(), EngineError> {
        let (template, mut source) = self.prepare(template_name)?;
        debug!(path = %path.display(), template = template_name, count = records.len(), "saving records");
        source.open(path, false)?;
        let result = write_all(source.as_mut(), template, records);
        finish(source.as_mut(), result)
    }

    /// Load through a caller-supplied source instead of the registry.
    pub fn load_with<T: Entity>(
        &self,
        source: &mut dyn DocumentSource,
        path: &Path,
        template_name: &str,
    ) -> Result<Vec<T>, EngineError> {
        let template = self.config.template(template_name)?;
        template.primary_collection()?;
        source.open(path, true)?;
        let result = read_all(source, template);
        finish(source, result)
    }

    /// Save through a caller-supplied source instead of the registry.
    pub fn save_with<T: Entity>(
        &self,
        source: &mut dyn DocumentSource,
        path: &Path,
        template_name: &str,
        records: &[T],
    ) -> Result<(), EngineError> {
        let template = self.config.template(template_name)?;
        template.primary_collection()?;
        source.open(path, false)?;
        let result = write_all(source, template, records);
        finish(source, result)
    }
}

fn read_all<T: Entity>(
    source: &mut dyn DocumentSource,
    template: &TemplateConfig,
) -> Result<Vec<T>, EngineError> {
    let collection = template.primary_collection()?.clone();
    let book = source
        .workbook()
        .ok_or_else(|| EngineError::Document("source exposed no workbook".to_string()))?;
    EntityReader::new(book, &collection).read_all()
}

fn read_first<T: Entity>(
    source: &mut dyn DocumentSource,
    template: &TemplateConfig,
) -> Result<Option<T>, EngineError> {
    let collection = template.primary_collection()?.clone();
    let book = source
        .workbook()
        .ok_or_else(|| EngineError::Document("source exposed no workbook".to_string()))?;
    EntityReader::new(book, &collection).try_next()
}

fn write_all<T: Entity>(
    source: &mut dyn DocumentSource,
    template: &TemplateConfig,
    records: &[T],
) -> Result<(), EngineError> {
    let collection = template.primary_collection()?.clone();
    let book = source
        .workbook()
        .ok_or_else(|| EngineError::Document("source exposed no workbook".to_string()))?;
    EntityWriter::new(book, &collection).write_all(records)
}

/// Close the source, preferring the operation's error over the close error.
fn finish<R>(source: &mut dyn DocumentSource, result: Result<R, EngineError>) -> Result<R, EngineError> {
    match result {
        Ok(value) => {
            source.close()?;
            Ok(value)
        }
        Err(err) => {
            let _ = source.close();
            Err(err)
        }
    }
}
