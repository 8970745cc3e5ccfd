//! Relational store interface and the row shapes read from and written to it.

pub mod schema;
pub mod sqlite;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use sqlite::SqliteBackend;

/// Legacy feed table.
pub const LEGACY_FEED_TABLE: &str = "feedapi";
/// Legacy per-feed custom mapping table.
pub const LEGACY_MAPPER_TABLE: &str = "feedapi_mapper";
/// Legacy node item table.
pub const LEGACY_NODE_ITEM_TABLE: &str = "feedapi_node_item";
/// Legacy fast item table.
pub const LEGACY_FAST_ITEM_TABLE: &str = "feedapi_fast_item";

/// Name of the data table backing a data processor importer.
#[must_use]
pub fn data_table_name(importer_id: &str) -> String {
    format!("feeds_data_{importer_id}")
}

/// A legacy feed: one per content entity of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFeedRow {
    /// Content entity holding the feed.
    pub entity_id: i64,
    /// Feed URL; empty when the legacy row has none.
    pub url: String,
}

/// Current-model feed source configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSourceRecord {
    /// Owning importer.
    pub importer_id: String,
    /// Content entity the feed is attached to.
    pub entity_id: i64,
    /// Source configuration.
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl FeedSourceRecord {
    /// Creates an empty source.
    pub fn new(importer_id: impl Into<String>, entity_id: i64) -> Self {
        Self {
            importer_id: importer_id.into(),
            entity_id,
            config: serde_json::Map::new(),
        }
    }

    /// Stores `url` in the generic slot and in the fetcher's own slot.
    pub fn set_source(&mut self, url: &str, fetcher: Option<&str>) {
        self.config
            .insert("source".to_string(), serde_json::Value::from(url));
        if let Some(fetcher) = fetcher {
            let slot = self
                .config
                .entry(fetcher.to_string())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if !slot.is_object() {
                *slot = serde_json::Value::Object(serde_json::Map::new());
            }
            if let serde_json::Value::Object(fetcher_config) = slot {
                fetcher_config.insert("source".to_string(), serde_json::Value::from(url));
            }
        }
    }

    /// Generic source URL.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.config.get("source").and_then(serde_json::Value::as_str)
    }

    /// Source URL stored for a fetcher.
    #[must_use]
    pub fn fetcher_source(&self, fetcher: &str) -> Option<&str> {
        self.config
            .get(fetcher)
            .and_then(|c| c.get("source"))
            .and_then(serde_json::Value::as_str)
    }
}

/// Legacy item created by the node processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyNodeItemRow {
    /// Item content entity.
    pub item_entity_id: i64,
    /// Feed content entity.
    pub feed_entity_id: i64,
    /// Item URL.
    pub url: String,
    /// Publication time.
    pub timestamp: i64,
    /// Time the item was imported.
    pub arrived: i64,
    /// Item guid.
    pub guid: String,
}

/// Current-model imported item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    /// Owning importer.
    pub importer_id: String,
    /// Feed content entity.
    pub feed_entity_id: i64,
    /// Item content entity.
    pub item_entity_id: i64,
    /// Item URL.
    pub url: String,
    /// Item guid.
    pub guid: String,
    /// Import time.
    pub imported: i64,
    /// Content hash; migration leaves it empty for the next sync to fill.
    pub hash: String,
}

/// Legacy item created by the fast processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFastItemRow {
    /// Feed content entity.
    pub feed_entity_id: i64,
    /// Publication time.
    pub published: i64,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Item URL.
    pub url: String,
    /// Item guid.
    pub guid: String,
}

/// Row of a data processor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItemRecord {
    /// Feed content entity.
    pub feed_entity_id: i64,
    /// Publication time.
    pub timestamp: i64,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Item URL.
    pub url: String,
    /// Item guid.
    pub guid: String,
}

/// Column type of a provisioned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Auto-incrementing primary key.
    Serial,
    /// Integer.
    Int,
    /// Bounded string.
    Varchar,
    /// Unbounded string.
    Text,
}

/// Column of a provisioned table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    /// Length for varchar columns.
    #[serde(default)]
    pub length: Option<u32>,
    /// Whether NULL is rejected.
    #[serde(default)]
    pub not_null: bool,
}

/// Template for a table the migration provisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Human readable purpose.
    #[serde(default)]
    pub description: Option<String>,
    /// Columns in order.
    pub fields: Vec<ColumnSpec>,
    /// Columns forming a uniqueness constraint.
    #[serde(default)]
    pub unique: Vec<String>,
}

/// Read/write access to legacy and current tables.
pub trait RelationalStore {
    /// Whether a table exists.
    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Legacy feeds of a category.
    fn legacy_feeds(&self, category: &str) -> Result<Vec<LegacyFeedRow>>;

    /// Legacy per-feed custom mapping rows of a category.
    fn count_abandoned_mappings(&self, category: &str) -> Result<u64>;

    /// Existing feed source, if any.
    fn load_feed_source(&self, importer_id: &str, entity_id: i64)
        -> Result<Option<FeedSourceRecord>>;

    /// Writes or overwrites a feed source.
    fn save_feed_source(&self, record: &FeedSourceRecord) -> Result<()>;

    /// Legacy node processor items of a category.
    fn legacy_node_items(&self, category: &str) -> Result<Vec<LegacyNodeItemRow>>;

    /// Writes or overwrites an imported item.
    fn save_item(&self, item: &ItemRecord) -> Result<()>;

    /// Legacy fast processor items of a category.
    fn legacy_fast_items(&self, category: &str) -> Result<Vec<LegacyFastItemRow>>;

    /// Provisions a table from a template; existing tables are kept.
    fn create_data_table(&self, table: &str, schema: &TableSchema) -> Result<()>;

    /// Inserts a data row. Returns `false` when an identical row exists.
    fn insert_data_item(&self, table: &str, row: &DataItemRecord) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_source_url_is_stored_twice() {
        let mut record = FeedSourceRecord::new("article", 12);

        record.set_source("http://example.com/rss", Some("FeedsHTTPFetcher"));

        assert_eq!(record.source(), Some("http://example.com/rss"));
        assert_eq!(
            record.fetcher_source("FeedsHTTPFetcher"),
            Some("http://example.com/rss")
        );
    }

    #[test]
    fn test_feed_source_keeps_other_fetcher_settings() {
        let mut record = FeedSourceRecord::new("article", 12);
        record.config.insert(
            "FeedsHTTPFetcher".to_string(),
            serde_json::json!({"source": "http://old", "auth": "basic"}),
        );

        record.set_source("http://new", Some("FeedsHTTPFetcher"));

        assert_eq!(record.config["FeedsHTTPFetcher"]["auth"], "basic");
        assert_eq!(record.fetcher_source("FeedsHTTPFetcher"), Some("http://new"));
    }

    #[test]
    fn test_feed_source_without_fetcher_only_sets_generic_slot() {
        let mut record = FeedSourceRecord::new("article", 3);
        record.set_source("http://example.com", None);
        assert_eq!(record.config.len(), 1);
    }

    #[test]
    fn test_table_schema_yaml() {
        let yaml = r#"
description: Items
fields:
  - {name: id, type: serial}
  - {name: title, type: varchar, length: 255}
  - {name: url, type: text}
unique: [url]
"#;
        let schema: TableSchema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields[1].kind, ColumnKind::Varchar);
        assert_eq!(schema.fields[1].length, Some(255));
        assert_eq!(schema.unique, vec!["url".to_string()]);
    }

    #[test]
    fn test_data_table_name() {
        assert_eq!(data_table_name("news_0"), "feeds_data_news_0");
    }
}
