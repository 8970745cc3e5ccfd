//! Legacy per-category settings and the interfaces that read and archive them.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// Prefix of the key the legacy settings of a category are archived under.
pub const BACKUP_KEY_PREFIX: &str = "_backup_feedapi_settings_";

/// Archive key for a category.
#[must_use]
pub fn backup_key(category: &str) -> String {
    format!("{BACKUP_KEY_PREFIX}{category}")
}

/// Settings of one legacy parser or processor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Whether the plugin is enabled for the category.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub enabled: bool,
    /// Ordering weight (unused by the migration, kept for the archive).
    #[serde(default, deserialize_with = "deserialize_int")]
    pub weight: i64,
    /// Plugin specific settings.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl PluginSettings {
    /// All setting keys, structural ones included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        ["enabled", "weight"]
            .into_iter()
            .chain(self.extra.keys().map(String::as_str))
    }

    /// A plugin specific setting as a string, if it is one.
    #[must_use]
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(serde_json::Value::as_str)
    }
}

/// How feed content reaches the legacy importer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMethod {
    /// Feed documents are uploaded files.
    Upload,
    /// Anything else (remote URLs).
    #[default]
    #[serde(other)]
    Other,
}

/// Legacy item deletion policy.
///
/// Stored as an integer: `0` never deletes, any other value is the age in
/// seconds after which items are removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(into = "i64")]
pub enum ItemsDelete {
    /// Never delete old items.
    #[default]
    Never,
    /// Delete items older than this many seconds.
    OlderThan(i64),
}

impl From<i64> for ItemsDelete {
    fn from(value: i64) -> Self {
        if value == 0 {
            Self::Never
        } else {
            Self::OlderThan(value)
        }
    }
}

impl<'de> Deserialize<'de> for ItemsDelete {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_int(deserializer).map(Self::from)
    }
}

impl From<ItemsDelete> for i64 {
    fn from(value: ItemsDelete) -> Self {
        match value {
            ItemsDelete::Never => 0,
            ItemsDelete::OlderThan(seconds) => seconds,
        }
    }
}

/// Pre-migration configuration of one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacySettings {
    /// Parsers in the provider's native order.
    #[serde(default)]
    pub parsers: IndexMap<String, PluginSettings>,
    /// Processors in the provider's native order.
    #[serde(default)]
    pub processors: IndexMap<String, PluginSettings>,
    /// Whether the legacy importer is enabled for the category.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub enabled: bool,
    /// Upload method.
    #[serde(default)]
    pub upload_method: UploadMethod,
    /// Item deletion policy.
    #[serde(default)]
    pub items_delete: ItemsDelete,
    /// Whether existing items are updated on refresh.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub update_existing: bool,
    /// Hand authored mapping, legacy source key to legacy target key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_mapping: Option<IndexMap<String, String>>,
}

impl LegacySettings {
    /// First enabled parser, in native order.
    #[must_use]
    pub fn active_parser(&self) -> Option<&str> {
        first_enabled(&self.parsers)
    }

    /// First enabled processor, in native order.
    #[must_use]
    pub fn active_processor(&self) -> Option<&str> {
        first_enabled(&self.processors)
    }

    /// Whether the category qualifies for migration.
    #[must_use]
    pub fn is_migratable(&self) -> bool {
        self.enabled && self.active_parser().is_some() && self.active_processor().is_some()
    }

    /// Settings of a plugin, parser or processor.
    #[must_use]
    pub fn plugin(&self, plugin: &str) -> Option<&PluginSettings> {
        self.processors
            .get(plugin)
            .or_else(|| self.parsers.get(plugin))
    }
}

fn first_enabled(plugins: &IndexMap<String, PluginSettings>) -> Option<&str> {
    plugins
        .iter()
        .find(|(_, settings)| settings.enabled)
        .map(|(id, _)| id.as_str())
}

/// Accepts `true`/`false`, `0`/`1` and `"0"`/`"1"`, all of which show up
/// in legacy exports.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !(s.is_empty() || s == "0"),
        _ => false,
    })
}

/// Accepts integers, integral floats, numeric strings (`"3600"`), booleans
/// and null (as `0`).
fn deserialize_int<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Null => Some(0),
        serde_json::Value::Bool(b) => Some(i64::from(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        serde_json::Value::String(s) if s.trim().is_empty() => Some(0),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| D::Error::custom(format!("expected an integer, got {value}")))
}

/// Supplies legacy settings per category.
pub trait LegacySettingsProvider {
    /// Every category known to the legacy system.
    fn categories(&self) -> Result<Vec<String>>;

    /// Settings of a category, if any are stored.
    fn get_settings(&self, category: &str) -> Result<Option<LegacySettings>>;

    /// Removes the live settings of a category.
    fn remove_settings(&self, category: &str) -> Result<()>;
}

/// Keeps a copy of the legacy settings of migrated categories.
pub trait SettingsArchive {
    /// Stores `settings` under `key`, replacing any previous copy.
    fn archive(&self, key: &str, settings: &LegacySettings) -> Result<()>;

    /// Reads an archived copy back.
    fn archived(&self, key: &str) -> Result<Option<LegacySettings>>;
}
