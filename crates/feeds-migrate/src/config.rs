//! Configuration types for feeds-migrate.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::importer::{CapabilityRole, DefaultMapping};

/// Configuration written by `feeds-migrate init`.
pub const EXAMPLE_CONFIG: &str = r#"# feeds-migrate configuration
database: ./site.sqlite

# Importer capabilities beyond the built-in ones, with the fields they
# produce (parsers) or accept (processors).
capabilities:
  FeedsCSVParser:
    role: parser
    vocabulary: [title, description, url, guid]

# Extra legacy plugin id -> importer capability entries.
dictionary:
  parser_ical: FeedsIcalDateParser
  parser_csv: FeedsCSVParser

# Exact legacy field key -> current field overrides, checked before the
# substring heuristic.
field_lookup:
  'a:2:{i:0;s:7:"options";i:1;s:4:"tags";}': taxonomy

# Replaces the built-in default mapping when set.
# default_mapping:
#   - {source: title, target: title, unique: false}
#   - {source: url, target: url, unique: true}

options:
  # Restrict the run to these categories (empty = every candidate).
  categories: []
  progress: true
"#;

/// Main migration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// SQLite database holding the legacy and current tables.
    pub database: PathBuf,
    /// Extra importer capabilities by id.
    #[serde(default)]
    pub capabilities: IndexMap<String, CapabilitySpec>,
    /// Plugin dictionary additions.
    #[serde(default)]
    pub dictionary: IndexMap<String, String>,
    /// Field lookup overrides.
    #[serde(default)]
    pub field_lookup: IndexMap<String, String>,
    /// Replacement default mapping, validated structurally.
    #[serde(default)]
    pub default_mapping: Option<serde_json::Value>,
    /// Run options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// An importer capability declared in the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySpec {
    /// Slot the capability fills.
    pub role: CapabilityRole,
    /// Mapping sources for parsers, mapping targets for processors.
    #[serde(default)]
    pub vocabulary: Vec<String>,
}

/// Migration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Only migrate these categories.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Show a progress bar.
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            progress: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl MigrationConfig {
    /// Configuration with defaults for `database`.
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            capabilities: IndexMap::new(),
            dictionary: IndexMap::new(),
            field_lookup: IndexMap::new(),
            default_mapping: None,
            options: MigrationOptions::default(),
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_yaml(content: &str) -> crate::error::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// The validated replacement default mapping, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the mapping is malformed.
    pub fn default_mapping(&self) -> crate::error::Result<Option<DefaultMapping>> {
        self.default_mapping
            .as_ref()
            .map(DefaultMapping::from_value)
            .transpose()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.database.as_os_str().is_empty() {
            return Err(crate::error::Error::Config(
                "database path cannot be empty".to_string(),
            ));
        }
        if self.capabilities.keys().any(|id| id.trim().is_empty()) {
            return Err(crate::error::Error::Config(
                "capability ids cannot be empty".to_string(),
            ));
        }
        for (legacy, capability) in &self.dictionary {
            if legacy.trim().is_empty() || capability.trim().is_empty() {
                return Err(crate::error::Error::Config(format!(
                    "dictionary entry '{legacy}' => '{capability}' has an empty side"
                )));
            }
        }
        for (legacy, current) in &self.field_lookup {
            if legacy.is_empty() || current.is_empty() {
                return Err(crate::error::Error::Config(format!(
                    "field lookup entry '{legacy}' => '{current}' has an empty side"
                )));
            }
        }
        if self.options.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(crate::error::Error::Config(
                "category names cannot be empty".to_string(),
            ));
        }
        self.default_mapping()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_config_defaults() {
        let options = MigrationOptions::default();
        assert!(options.categories.is_empty());
        assert!(options.progress);
    }

    #[test]
    fn test_config_yaml_parse() {
        let yaml = r#"
database: /var/lib/site.sqlite
dictionary:
  parser_csv: FeedsCSVParser
field_lookup:
  tags: taxonomy
default_mapping:
  "0": {source: title, target: title, unique: 0}
  "1": {source: guid, target: guid, unique: 1}
options:
  categories: [article, blog]
"#;
        let config = MigrationConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.dictionary["parser_csv"], "FeedsCSVParser");
        assert_eq!(config.options.categories, vec!["article", "blog"]);
        assert!(config.options.progress);

        let mapping = config.default_mapping().unwrap().unwrap();
        assert_eq!(mapping.entries().len(), 2);
        assert!(mapping.entries()[1].unique);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = MigrationConfig::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.default_mapping.is_none());
        assert_eq!(config.field_lookup.len(), 1);
        let csv = &config.capabilities["FeedsCSVParser"];
        assert_eq!(csv.role, CapabilityRole::Parser);
        assert_eq!(csv.vocabulary.len(), 4);
    }

    #[test]
    fn test_config_validate_rejects_blank_capability_id() {
        let mut config = MigrationConfig::new("./site.sqlite");
        config.capabilities.insert(
            " ".to_string(),
            CapabilitySpec {
                role: CapabilityRole::Processor,
                vocabulary: Vec::new(),
            },
        );

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_validate_rejects_blank_dictionary_entries() {
        let mut config = MigrationConfig::new("./site.sqlite");
        config
            .dictionary
            .insert("parser_csv".to_string(), "  ".to_string());

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_validate_rejects_malformed_mapping() {
        let mut config = MigrationConfig::new("./site.sqlite");
        config.default_mapping = Some(serde_json::json!([{"source": "title"}]));

        assert!(matches!(
            config.validate(),
            Err(Error::StructuralConfig(_))
        ));
    }

    #[test]
    fn test_config_validate_rejects_empty_database() {
        let config = MigrationConfig::new("");
        assert!(config.validate().is_err());
    }
}
