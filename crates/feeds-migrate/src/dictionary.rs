//! Legacy plugin id to importer capability dictionary.

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Legacy processors that get the default field mapping appended.
pub const DEFAULT_MAPPING_PROCESSORS: [&str; 2] = ["feedapi_node", "feedapi_fast"];

const BUILTIN_ENTRIES: [(&str, &str); 5] = [
    ("parser_simplepie", "FeedsSimplePieParser"),
    ("parser_common_syndication", "FeedsSyndicationParser"),
    ("parser_ical", "FeedsIcalDateParser"),
    ("feedapi_node", "FeedsNodeProcessor"),
    ("feedapi_fast", "FeedsDataProcessor"),
];

/// Maps legacy plugin ids to current capability ids.
///
/// Lookups are exact; there is no fallback for unknown plugins.
#[derive(Debug, Clone)]
pub struct PluginDictionary {
    entries: IndexMap<String, String>,
}

impl Default for PluginDictionary {
    fn default() -> Self {
        Self {
            entries: BUILTIN_ENTRIES
                .iter()
                .map(|(legacy, capability)| ((*legacy).to_string(), (*capability).to_string()))
                .collect(),
        }
    }
}

impl PluginDictionary {
    /// Creates a dictionary without any entry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Resolves a legacy plugin id.
    #[must_use]
    pub fn resolve(&self, legacy_plugin: &str) -> Option<&str> {
        self.entries.get(legacy_plugin).map(String::as_str)
    }

    /// Adds or overwrites an entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either argument is blank.
    pub fn extend(&mut self, legacy_plugin: &str, capability: &str) -> Result<()> {
        if legacy_plugin.trim().is_empty() || capability.trim().is_empty() {
            return Err(Error::Config(format!(
                "dictionary entry needs a legacy plugin and a capability, got '{legacy_plugin}' => '{capability}'"
            )));
        }
        self.entries
            .insert(legacy_plugin.to_string(), capability.to_string());
        Ok(())
    }

    /// Finds the first legacy plugin id mapped to `capability`.
    ///
    /// Several legacy plugins may share a capability, so this is a best
    /// effort recovery only.
    #[must_use]
    pub fn reverse_lookup(&self, capability: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, c)| c.as_str() == capability)
            .map(|(legacy, _)| legacy.as_str())
    }

    /// Whether the default mapping applies to this legacy processor.
    #[must_use]
    pub fn is_default_mapping_processor(legacy_processor: &str) -> bool {
        DEFAULT_MAPPING_PROCESSORS.contains(&legacy_processor)
    }

    /// Iterates over `(legacy plugin, capability)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
