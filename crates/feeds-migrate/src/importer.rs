//! Importer entities, field mappings and the Importer Registry interface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fetcher every new importer starts with.
pub const DEFAULT_FETCHER: &str = "FeedsHTTPFetcher";
/// Parser every new importer starts with.
pub const DEFAULT_PARSER: &str = "FeedsSyndicationParser";
/// Processor every new importer starts with.
pub const DEFAULT_PROCESSOR: &str = "FeedsNodeProcessor";
/// Fetcher bound to importers whose legacy category used file uploads.
pub const FILE_FETCHER: &str = "FeedsFileFetcher";

/// A rule copying one parsed field into one target field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Parser field.
    pub source: String,
    /// Processor field.
    pub target: String,
    /// Values of this target must not repeat inside one feed.
    pub unique: bool,
}

impl FieldMapping {
    /// Creates a mapping.
    pub fn new(source: impl Into<String>, target: impl Into<String>, unique: bool) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            unique,
        }
    }
}

/// A validated, ordered default mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultMapping(Vec<FieldMapping>);

impl Default for DefaultMapping {
    /// The node oriented built-in mapping.
    fn default() -> Self {
        Self(vec![
            FieldMapping::new("title", "title", false),
            FieldMapping::new("description", "body", false),
            FieldMapping::new("timestamp", "created", false),
            FieldMapping::new("url", "url", true),
            FieldMapping::new("guid", "guid", true),
        ])
    }
}

impl DefaultMapping {
    /// Wraps typed entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralConfig`] if `entries` is empty or an entry
    /// has a blank source or target.
    pub fn new(entries: Vec<FieldMapping>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::StructuralConfig(
                "mapping must have at least one entry".to_string(),
            ));
        }
        if let Some((index, _)) = entries
            .iter()
            .enumerate()
            .find(|(_, m)| m.source.is_empty() || m.target.is_empty())
        {
            return Err(Error::StructuralConfig(format!(
                "mapping entry {index} has an empty source or target"
            )));
        }
        Ok(Self(entries))
    }

    /// Validates a loosely typed mapping.
    ///
    /// Accepts an array, or an object whose keys are all numeric (entries
    /// are then ordered by key). Every entry must carry `source`, `target`
    /// and `unique`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralConfig`] describing the first violation.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let entries: Vec<(String, &serde_json::Value)> = match value {
            serde_json::Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            serde_json::Value::Object(map) => {
                let mut keyed = Vec::with_capacity(map.len());
                for (key, entry) in map {
                    let index: u64 = key.parse().map_err(|_| {
                        Error::StructuralConfig(format!("mapping key '{key}' is not numeric"))
                    })?;
                    keyed.push((index, key.clone(), entry));
                }
                keyed.sort_by_key(|(index, _, _)| *index);
                keyed.into_iter().map(|(_, k, v)| (k, v)).collect()
            }
            _ => {
                return Err(Error::StructuralConfig(
                    "mapping must be a list of entries".to_string(),
                ))
            }
        };

        let mut mappings = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            let source = entry.get("source").and_then(serde_json::Value::as_str);
            let target = entry.get("target").and_then(serde_json::Value::as_str);
            let unique = entry.get("unique").and_then(|u| match u {
                serde_json::Value::Bool(b) => Some(*b),
                serde_json::Value::Number(n) => n.as_i64().map(|n| n != 0),
                _ => None,
            });
            match (source, target, unique) {
                (Some(source), Some(target), Some(unique)) => {
                    mappings.push(FieldMapping::new(source, target, unique));
                }
                _ => {
                    return Err(Error::StructuralConfig(format!(
                        "mapping entry {key} must have source, target and unique properties"
                    )))
                }
            }
        }
        Self::new(mappings)
    }

    /// Entries in order.
    #[must_use]
    pub fn entries(&self) -> &[FieldMapping] {
        &self.0
    }
}

/// Role a capability plays inside an importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityRole {
    /// Retrieves raw feed data.
    Fetcher,
    /// Turns raw data into items.
    Parser,
    /// Stores parsed items.
    Processor,
}

/// A capability known to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityInfo {
    /// Capability id (e.g. `FeedsNodeProcessor`).
    pub id: String,
    /// Role.
    pub role: CapabilityRole,
    /// Mapping sources for parsers, mapping targets for processors.
    pub vocabulary: Vec<String>,
}

type CatalogEntry = (&'static str, CapabilityRole, &'static [&'static str]);

const SYNDICATION_SOURCES: &[&str] = &[
    "title",
    "description",
    "author_name",
    "timestamp",
    "url",
    "guid",
    "tags",
];

const CATALOG: &[CatalogEntry] = &[
    (DEFAULT_FETCHER, CapabilityRole::Fetcher, &[]),
    (FILE_FETCHER, CapabilityRole::Fetcher, &[]),
    (DEFAULT_PARSER, CapabilityRole::Parser, SYNDICATION_SOURCES),
    (
        "FeedsSimplePieParser",
        CapabilityRole::Parser,
        &[
            "title",
            "description",
            "author_name",
            "timestamp",
            "url",
            "guid",
            "tags",
            "domains",
            "location_latitude",
            "location_longitude",
            "enclosures",
        ],
    ),
    (
        "FeedsIcalDateParser",
        CapabilityRole::Parser,
        &[
            "title",
            "description",
            "timestamp",
            "url",
            "guid",
            "ical_date",
            "ical_location",
        ],
    ),
    (
        DEFAULT_PROCESSOR,
        CapabilityRole::Processor,
        &["title", "status", "created", "url", "guid", "body", "taxonomy"],
    ),
    (
        "FeedsDataProcessor",
        CapabilityRole::Processor,
        &["title", "description", "timestamp", "url", "guid"],
    ),
];

/// Looks a capability up in the built-in catalog.
#[must_use]
pub fn catalog_lookup(id: &str) -> Option<CapabilityInfo> {
    CATALOG
        .iter()
        .find(|(entry_id, _, _)| *entry_id == id)
        .map(|(entry_id, role, vocabulary)| CapabilityInfo {
            id: (*entry_id).to_string(),
            role: *role,
            vocabulary: vocabulary.iter().map(|v| (*v).to_string()).collect(),
        })
}

/// Current-model importer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImporterEntity {
    /// Unique id within the registry.
    pub id: String,
    /// Category the importer is attached to.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Bound fetcher capability.
    #[serde(default)]
    pub fetcher: Option<String>,
    /// Bound parser capability.
    pub parser: String,
    /// Bound processor capability.
    pub processor: String,
    /// Opaque importer configuration.
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    /// Field mappings, in application order.
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
    /// Legacy processor the importer was migrated from.
    #[serde(default)]
    pub provenance: Option<String>,
}

impl ImporterEntity {
    /// Creates an importer with the default capabilities.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_type: None,
            fetcher: Some(DEFAULT_FETCHER.to_string()),
            parser: DEFAULT_PARSER.to_string(),
            processor: DEFAULT_PROCESSOR.to_string(),
            config: BTreeMap::new(),
            mappings: Vec::new(),
            provenance: None,
        }
    }

    /// Sets a configuration value.
    pub fn add_config(&mut self, key: &str, value: serde_json::Value) {
        self.config.insert(key.to_string(), value);
    }

    /// Appends a mapping unless the same source/target pair is present.
    ///
    /// Returns whether the mapping was added.
    pub fn add_mapping(&mut self, mapping: FieldMapping) -> bool {
        let present = self
            .mappings
            .iter()
            .any(|m| m.source == mapping.source && m.target == mapping.target);
        if !present {
            self.mappings.push(mapping);
        }
        !present
    }

    /// Puts a capability into the slot matching its role.
    pub fn bind(&mut self, capability: &CapabilityInfo) {
        let id = capability.id.clone();
        match capability.role {
            CapabilityRole::Fetcher => self.fetcher = Some(id),
            CapabilityRole::Parser => self.parser = id,
            CapabilityRole::Processor => self.processor = id,
        }
    }

    /// Whether the importer is attached to `category`.
    #[must_use]
    pub fn is_bound_to(&self, category: &str) -> bool {
        self.content_type.as_deref() == Some(category)
    }
}

/// Creates, loads and saves importer entities.
pub trait ImporterRegistry {
    /// Creates and registers a new importer under `name`.
    ///
    /// Fails with [`Error::RegistryUnavailable`] when the registry cannot
    /// create importers at all.
    fn create_entity(&self, name: &str) -> Result<ImporterEntity>;

    /// Every registered importer.
    fn load_all(&self) -> Result<Vec<ImporterEntity>>;

    /// One importer by id.
    fn load_by_id(&self, id: &str) -> Result<Option<ImporterEntity>>;

    /// Persists an importer.
    fn save(&self, entity: &ImporterEntity) -> Result<()>;

    /// Capability description.
    fn capability(&self, id: &str) -> Option<CapabilityInfo> {
        catalog_lookup(id)
    }

    /// Binds a capability to the slot matching its role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCapability`] if the registry does not know
    /// the capability.
    fn bind_capability(&self, entity: &mut ImporterEntity, capability: &str) -> Result<()> {
        let info = self
            .capability(capability)
            .ok_or_else(|| Error::UnknownCapability(capability.to_string()))?;
        entity.bind(&info);
        Ok(())
    }

    /// Fields the bound parser produces.
    fn mapping_sources(&self, entity: &ImporterEntity) -> Result<Vec<String>> {
        Ok(self
            .capability(&entity.parser)
            .map(|c| c.vocabulary)
            .unwrap_or_default())
    }

    /// Fields the bound processor accepts.
    fn mapping_targets(&self, entity: &ImporterEntity) -> Result<Vec<String>> {
        Ok(self
            .capability(&entity.processor)
            .map(|c| c.vocabulary)
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "importer_tests.rs"]
mod tests;
