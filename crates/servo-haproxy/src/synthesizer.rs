use std::fs;
use std::path::{Path, PathBuf};

use servo_schemas::{LoadBalancer, ServoError};
use tracing::debug;

use crate::document::Document;
use crate::mapping::{ListenerMapping, SectionMapper};

/// Source of the structural template text.
pub trait TemplateSupplier: Send + Sync {
    fn template(&self) -> Result<String, ServoError>;
}

impl<F> TemplateSupplier for F
where
    F: Fn() -> Result<String, ServoError> + Send + Sync,
{
    fn template(&self) -> Result<String, ServoError> {
        self()
    }
}

/// Template read from disk on every synthesis.
#[derive(Debug, Clone)]
pub struct FileTemplate {
    path: PathBuf,
}

impl FileTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemplateSupplier for FileTemplate {
    fn template(&self) -> Result<String, ServoError> {
        fs::read_to_string(&self.path)
            .map_err(|e| ServoError::TemplateSource(format!("{}: {e}", self.path.display())))
    }
}

#[derive(Debug, Clone)]
pub struct StaticTemplate(pub String);

impl TemplateSupplier for StaticTemplate {
    fn template(&self) -> Result<String, ServoError> {
        Ok(self.0.clone())
    }
}

/// Template + mapping → configuration text.
///
/// Stateless between calls: each `apply` starts from a fresh parse of the
/// template, so the same inputs always give byte-identical output.
pub struct ConfigSynthesizer {
    template: Box<dyn TemplateSupplier>,
    mapper: Box<dyn SectionMapper>,
}

impl ConfigSynthesizer {
    /// Synthesizer with the default listener mapping.
    pub fn new(template: impl TemplateSupplier + 'static) -> Self {
        Self {
            template: Box::new(template),
            mapper: Box::new(ListenerMapping::default()),
        }
    }

    pub fn with_mapper(mut self, mapper: impl SectionMapper + 'static) -> Self {
        self.mapper = Box::new(mapper);
        self
    }

    pub fn apply(&self, lb: &LoadBalancer) -> Result<String, ServoError> {
        let text = self.template.template()?;
        let mut doc = Document::parse(&text)?;
        for update in self.mapper.sections(lb)? {
            debug!(
                section = %format!("{} {}", update.kind.as_str(), update.name),
                keys = update.attributes.len(),
                "writing section"
            );
            doc.create_or_replace_section(update.kind, &update.name, &update.attributes)?;
        }
        Ok(doc.serialize())
    }
}

impl std::fmt::Debug for ConfigSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSynthesizer").finish_non_exhaustive()
    }
}
