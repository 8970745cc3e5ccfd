//! Reference importer definitions compiled into the binary.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::importer::{DefaultMapping, FieldMapping};
use crate::store::TableSchema;

const BUNDLED: &str = include_str!("../../assets/reference_importers.yaml");

/// Importer shipped as a template.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceImporter {
    /// Display name.
    pub name: String,
    /// What the importer is for.
    #[serde(default)]
    pub description: Option<String>,
    /// Fetcher capability.
    #[serde(default)]
    pub fetcher: Option<String>,
    /// Parser capability.
    pub parser: String,
    /// Processor capability.
    pub processor: String,
    /// Field mappings.
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
}

/// Every bundled importer and table template.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceDefinitions {
    /// Importers by id.
    #[serde(default)]
    pub importers: IndexMap<String, ReferenceImporter>,
    /// Table templates by name.
    #[serde(default)]
    pub tables: IndexMap<String, TableSchema>,
}

impl ReferenceDefinitions {
    /// Parses the definitions shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_yaml(BUNDLED)
    }

    /// Parses definitions from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Mapping of a reference importer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralConfig`] if the importer is missing or its
    /// mapping is empty.
    pub fn mapping(&self, importer: &str) -> Result<DefaultMapping> {
        let reference = self.importers.get(importer).ok_or_else(|| {
            Error::StructuralConfig(format!("reference importer '{importer}' is not defined"))
        })?;
        DefaultMapping::new(reference.mappings.clone())
    }

    /// A table template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralConfig`] if the template is missing.
    pub fn table(&self, name: &str) -> Result<&TableSchema> {
        self.tables.get(name).ok_or_else(|| {
            Error::StructuralConfig(format!("reference table '{name}' is not defined"))
        })
    }
}
