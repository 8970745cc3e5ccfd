//! SQLite backend implementing every external interface of the migration.
//!
//! One database holds the legacy tables, the settings variables and the
//! current importer tables, so a single [`SqliteBackend`] serves as Legacy
//! Settings Provider, settings archive, Importer Registry and relational
//! store at once.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::schema::{CURRENT_SCHEMA, LEGACY_SCHEMA};
use super::{
    ColumnKind, DataItemRecord, FeedSourceRecord, ItemRecord, LegacyFastItemRow, LegacyFeedRow,
    LegacyNodeItemRow, RelationalStore, TableSchema, LEGACY_FAST_ITEM_TABLE, LEGACY_FEED_TABLE,
    LEGACY_MAPPER_TABLE, LEGACY_NODE_ITEM_TABLE,
};
use crate::error::{Error, Result};
use crate::importer::{ImporterEntity, ImporterRegistry, DEFAULT_PROCESSOR};
use crate::settings::{LegacySettings, LegacySettingsProvider, SettingsArchive};

const SETTINGS_PREFIX: &str = "feedapi_settings_";
const MAPPER_PREFIX: &str = "feedapi_mapper_mapping_";
const IMPORTER_TABLE: &str = "feeds_importer";
const FIELD_INSTANCE_TABLE: &str = "content_node_field_instance";

/// SQLite-backed legacy and current storage.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens (or creates) a database file.
    ///
    /// No table is created; see [`Self::install_current_schema`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA synchronous=NORMAL;")?;
        debug!("Opened database {}", path.display());
        Ok(Self { conn })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Creates the current importer tables if missing.
    pub fn install_current_schema(&self) -> Result<()> {
        self.conn.execute_batch(CURRENT_SCHEMA)?;
        Ok(())
    }

    /// Creates the legacy tables if missing.
    pub fn install_legacy_schema(&self) -> Result<()> {
        self.conn.execute_batch(LEGACY_SCHEMA)?;
        Ok(())
    }

    /// Raw connection, for seeding and inspection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Reads a JSON encoded variable.
    pub fn variable_get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        if !self.table_exists("variable")? {
            return Ok(None);
        }
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM variable WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|value| serde_json::from_str(&value).map_err(Error::from))
            .transpose()
    }

    /// Writes a JSON encoded variable.
    pub fn variable_set<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO variable (name, value) VALUES (?1, ?2)",
            params![name, encoded],
        )?;
        Ok(())
    }

    /// Deletes a variable.
    pub fn variable_del(&self, name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM variable WHERE name = ?1", params![name])?;
        Ok(())
    }

    fn field_instances(&self, content_type: &str) -> Result<Vec<String>> {
        if !self.table_exists(FIELD_INSTANCE_TABLE)? {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT field_name FROM content_node_field_instance
             WHERE type_name = ?1 ORDER BY weight, field_name",
        )?;
        let fields = stmt
            .query_map(params![content_type], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(fields)
    }
}

/// Validates a table or column name before it is spliced into SQL.
fn identifier(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(Error::Store(format!("invalid SQL identifier '{name}'")))
    }
}

fn column_sql(column: &super::ColumnSpec) -> Result<String> {
    let name = identifier(&column.name)?;
    let kind = match column.kind {
        ColumnKind::Serial => return Ok(format!("{name} INTEGER PRIMARY KEY AUTOINCREMENT")),
        ColumnKind::Int => "INTEGER".to_string(),
        ColumnKind::Varchar => format!("VARCHAR({})", column.length.unwrap_or(255)),
        ColumnKind::Text => "TEXT".to_string(),
    };
    let null = if column.not_null { " NOT NULL" } else { "" };
    Ok(format!("{name} {kind}{null}"))
}

impl LegacySettingsProvider for SqliteBackend {
    fn categories(&self) -> Result<Vec<String>> {
        if self.table_exists("node_type")? {
            let mut stmt = self.conn.prepare("SELECT type FROM node_type ORDER BY type")?;
            let types = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            return Ok(types);
        }
        if !self.table_exists("variable")? {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT substr(name, ?1) FROM variable WHERE name LIKE ?2 ORDER BY name",
        )?;
        let start = i64::try_from(SETTINGS_PREFIX.len() + 1)
            .map_err(|e| Error::Store(e.to_string()))?;
        let types = stmt
            .query_map(params![start, format!("{SETTINGS_PREFIX}%")], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(types)
    }

    fn get_settings(&self, category: &str) -> Result<Option<LegacySettings>> {
        let settings: Option<LegacySettings> =
            self.variable_get(&format!("{SETTINGS_PREFIX}{category}"))?;
        let Some(mut settings) = settings else {
            return Ok(None);
        };
        if settings.custom_mapping.is_none() {
            settings.custom_mapping = self
                .variable_get(&format!("{MAPPER_PREFIX}{category}"))?
                .filter(|m: &indexmap::IndexMap<String, String>| !m.is_empty());
        }
        Ok(Some(settings))
    }

    fn remove_settings(&self, category: &str) -> Result<()> {
        self.variable_del(&format!("{SETTINGS_PREFIX}{category}"))
    }
}

impl SettingsArchive for SqliteBackend {
    fn archive(&self, key: &str, settings: &LegacySettings) -> Result<()> {
        self.variable_set(key, settings)
    }

    fn archived(&self, key: &str) -> Result<Option<LegacySettings>> {
        self.variable_get(key)
    }
}

impl ImporterRegistry for SqliteBackend {
    fn create_entity(&self, name: &str) -> Result<ImporterEntity> {
        if !self.table_exists(IMPORTER_TABLE)? {
            return Err(Error::RegistryUnavailable(
                "the importer tables are not installed, install the current schema before migrating"
                    .to_string(),
            ));
        }
        if self.load_by_id(name)?.is_some() {
            return Err(Error::Store(format!("importer '{name}' already exists")));
        }
        let entity = ImporterEntity::new(name);
        self.save(&entity)?;
        debug!("Created importer {}", name);
        Ok(entity)
    }

    fn load_all(&self) -> Result<Vec<ImporterEntity>> {
        if !self.table_exists(IMPORTER_TABLE)? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare("SELECT config FROM feeds_importer ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        rows.iter()
            .map(|raw| serde_json::from_str(raw).map_err(Error::from))
            .collect()
    }

    fn load_by_id(&self, id: &str) -> Result<Option<ImporterEntity>> {
        if !self.table_exists(IMPORTER_TABLE)? {
            return Ok(None);
        }
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT config FROM feeds_importer WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|value| serde_json::from_str(&value).map_err(Error::from))
            .transpose()
    }

    fn save(&self, entity: &ImporterEntity) -> Result<()> {
        let encoded = serde_json::to_string(entity)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO feeds_importer (id, config) VALUES (?1, ?2)",
            params![entity.id, encoded],
        )?;
        Ok(())
    }

    fn mapping_targets(&self, entity: &ImporterEntity) -> Result<Vec<String>> {
        let mut targets = self
            .capability(&entity.processor)
            .map(|c| c.vocabulary)
            .unwrap_or_default();
        if entity.processor == DEFAULT_PROCESSOR {
            let content_type = entity
                .config
                .get("content_type")
                .and_then(serde_json::Value::as_str)
                .or(entity.content_type.as_deref());
            if let Some(content_type) = content_type {
                for field in self.field_instances(content_type)? {
                    if !targets.contains(&field) {
                        targets.push(field);
                    }
                }
            }
        }
        Ok(targets)
    }
}

impl RelationalStore for SqliteBackend {
    fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn legacy_feeds(&self, category: &str) -> Result<Vec<LegacyFeedRow>> {
        if !self.table_exists(LEGACY_FEED_TABLE)? {
            return Ok(Vec::new());
        }
        // Joined on vid because feeds are revisioned with their node.
        let mut stmt = self.conn.prepare(
            "SELECT f.nid, COALESCE(f.url, '') FROM feedapi f
             LEFT JOIN node n ON f.vid = n.vid
             WHERE n.type = ?1 ORDER BY f.nid",
        )?;
        let rows = stmt
            .query_map(params![category], |row| {
                Ok(LegacyFeedRow {
                    entity_id: row.get(0)?,
                    url: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn count_abandoned_mappings(&self, category: &str) -> Result<u64> {
        if !self.table_exists(LEGACY_MAPPER_TABLE)? {
            return Ok(0);
        }
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM feedapi_mapper m
             LEFT JOIN node n ON m.nid = n.nid WHERE n.type = ?1",
            params![category],
            |row| row.get(0),
        )?;
        u64::try_from(count).map_err(|e| Error::Store(e.to_string()))
    }

    fn load_feed_source(
        &self,
        importer_id: &str,
        entity_id: i64,
    ) -> Result<Option<FeedSourceRecord>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT config FROM feeds_source WHERE id = ?1 AND feed_nid = ?2",
                params![importer_id, entity_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let config = match serde_json::from_str(&raw)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Ok(Some(FeedSourceRecord {
            importer_id: importer_id.to_string(),
            entity_id,
            config,
        }))
    }

    fn save_feed_source(&self, record: &FeedSourceRecord) -> Result<()> {
        let encoded = serde_json::to_string(&record.config)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO feeds_source (id, feed_nid, config) VALUES (?1, ?2, ?3)",
            params![record.importer_id, record.entity_id, encoded],
        )?;
        Ok(())
    }

    fn legacy_node_items(&self, category: &str) -> Result<Vec<LegacyNodeItemRow>> {
        if !self.table_exists(LEGACY_NODE_ITEM_TABLE)? {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT ni.nid, n.nid, COALESCE(ni.url, ''), ni.timestamp, ni.arrived,
                    COALESCE(ni.guid, '')
             FROM feedapi_node_item ni
             LEFT JOIN feedapi_node_item_feed nif ON ni.nid = nif.feed_item_nid
             LEFT JOIN node n ON nif.feed_nid = n.nid
             WHERE n.type = ?1 ORDER BY ni.nid, n.nid",
        )?;
        let rows = stmt
            .query_map(params![category], |row| {
                Ok(LegacyNodeItemRow {
                    item_entity_id: row.get(0)?,
                    feed_entity_id: row.get(1)?,
                    url: row.get(2)?,
                    timestamp: row.get(3)?,
                    arrived: row.get(4)?,
                    guid: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn save_item(&self, item: &ItemRecord) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO feeds_node_item (nid, id, feed_nid, imported, url, guid, hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.item_entity_id,
                item.importer_id,
                item.feed_entity_id,
                item.imported,
                item.url,
                item.guid,
                item.hash
            ],
        )?;
        Ok(())
    }

    fn legacy_fast_items(&self, category: &str) -> Result<Vec<LegacyFastItemRow>> {
        if !self.table_exists(LEGACY_FAST_ITEM_TABLE)? {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT fi.feed_nid, f.published, COALESCE(f.title, ''),
                    COALESCE(f.description, ''), COALESCE(f.url, ''), COALESCE(f.guid, '')
             FROM feedapi_fast_item f
             LEFT JOIN feedapi_fast_item_feed fi ON f.fid = fi.feed_item_fid
             LEFT JOIN node n ON fi.feed_nid = n.nid
             WHERE n.type = ?1 ORDER BY f.fid",
        )?;
        let rows = stmt
            .query_map(params![category], |row| {
                Ok(LegacyFastItemRow {
                    feed_entity_id: row.get(0)?,
                    published: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    url: row.get(4)?,
                    guid: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn create_data_table(&self, table: &str, schema: &TableSchema) -> Result<()> {
        let table = identifier(table)?;
        if schema.fields.is_empty() {
            return Err(Error::Store(format!("table '{table}' needs at least one column")));
        }
        let mut columns = schema
            .fields
            .iter()
            .map(column_sql)
            .collect::<Result<Vec<_>>>()?;
        if !schema.unique.is_empty() {
            let unique = schema
                .unique
                .iter()
                .map(|c| identifier(c))
                .collect::<Result<Vec<_>>>()?;
            columns.push(format!("UNIQUE ({})", unique.join(", ")));
        }
        let sql = format!("CREATE TABLE IF NOT EXISTS {table} (\n    {}\n)", columns.join(",\n    "));
        self.conn.execute_batch(&sql)?;
        debug!(
            "Provisioned table {} ({})",
            table,
            schema.description.as_deref().unwrap_or("no description")
        );
        Ok(())
    }

    fn insert_data_item(&self, table: &str, row: &DataItemRecord) -> Result<bool> {
        let table = identifier(table)?;
        let changed = self.conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {table} (feed_nid, timestamp, title, description, url, guid)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            params![
                row.feed_entity_id,
                row.timestamp,
                row.title,
                row.description,
                row.url,
                row.guid
            ],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
