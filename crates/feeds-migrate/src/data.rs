//! Copying of legacy feed and item rows into the current tables.
//!
//! Feed sources are migrated for every importer. Items depend on the legacy
//! processor, so item copying goes through an [`ItemMigrator`] looked up by
//! legacy processor id in an [`ItemMigratorRegistry`].

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::Result;
use crate::importer::ImporterEntity;
use crate::pipeline::MigrationMessage;
use crate::store::{
    data_table_name, DataItemRecord, FeedSourceRecord, ItemRecord, RelationalStore,
    LEGACY_FAST_ITEM_TABLE, LEGACY_FEED_TABLE,
};

/// Rows handled by one copy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ItemStats {
    /// Rows written.
    pub copied: u64,
    /// Rows left behind (duplicates, or rows after a malformed one).
    pub skipped: u64,
}

impl fmt::Display for ItemStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} copied, {} skipped", self.copied, self.skipped)
    }
}

/// What a data copy operates on.
pub struct DataContext<'a> {
    /// Category being migrated.
    pub category: &'a str,
    /// Importer receiving the rows.
    pub entity: &'a ImporterEntity,
    /// Legacy and current tables.
    pub store: &'a dyn RelationalStore,
    /// Message sink.
    pub messages: &'a mut Vec<MigrationMessage>,
}

impl DataContext<'_> {
    fn warn(&mut self, text: String) {
        warn!(category = self.category, "{}", text);
        self.messages
            .push(MigrationMessage::warning(self.category, text));
    }
}

fn remaining(total: usize, index: usize) -> u64 {
    u64::try_from(total.saturating_sub(index)).unwrap_or(u64::MAX)
}

/// Moves legacy feed URLs into feed sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedSourceMigrator;

impl FeedSourceMigrator {
    /// Writes one feed source per legacy feed of the category.
    ///
    /// Stops at the first feed without a URL.
    pub fn migrate(&self, ctx: &mut DataContext<'_>) -> Result<ItemStats> {
        let mut stats = ItemStats::default();
        if !ctx.store.table_exists(LEGACY_FEED_TABLE)? {
            debug!("No legacy feed table, skipping feed sources");
            return Ok(stats);
        }

        let feeds = ctx.store.legacy_feeds(ctx.category)?;
        for (index, feed) in feeds.iter().enumerate() {
            if feed.url.is_empty() {
                stats.skipped = remaining(feeds.len(), index);
                ctx.warn(format!(
                    "Feed {} of {} has no URL, the remaining {} feeds were not migrated.",
                    feed.entity_id, ctx.category, stats.skipped
                ));
                break;
            }
            let mut source = ctx
                .store
                .load_feed_source(&ctx.entity.id, feed.entity_id)?
                .unwrap_or_else(|| FeedSourceRecord::new(ctx.entity.id.clone(), feed.entity_id));
            source.set_source(&feed.url, ctx.entity.fetcher.as_deref());
            ctx.store.save_feed_source(&source)?;
            stats.copied += 1;
        }

        debug!("Feed sources of {}: {}", ctx.category, stats);
        Ok(stats)
    }
}

/// Copies the items of one legacy processor kind.
pub trait ItemMigrator {
    /// Copies every legacy item of the category into the importer.
    fn migrate(&self, ctx: &mut DataContext<'_>) -> Result<ItemStats>;
}

/// Items the legacy node processor created as content entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeItemMigrator;

impl ItemMigrator for NodeItemMigrator {
    fn migrate(&self, ctx: &mut DataContext<'_>) -> Result<ItemStats> {
        let mut stats = ItemStats::default();
        let items = ctx.store.legacy_node_items(ctx.category)?;

        for (index, item) in items.iter().enumerate() {
            if item.url.is_empty() {
                stats.skipped = remaining(items.len(), index);
                ctx.warn(format!(
                    "Item {} of {} has no URL, the remaining {} items were not migrated.",
                    item.item_entity_id, ctx.category, stats.skipped
                ));
                break;
            }
            ctx.store.save_item(&ItemRecord {
                importer_id: ctx.entity.id.clone(),
                feed_entity_id: item.feed_entity_id,
                item_entity_id: item.item_entity_id,
                url: item.url.clone(),
                guid: item.guid.clone(),
                imported: item.arrived,
                hash: String::new(),
            })?;
            stats.copied += 1;
        }
        Ok(stats)
    }
}

/// Items the legacy fast processor kept in its own table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataItemMigrator;

impl ItemMigrator for DataItemMigrator {
    fn migrate(&self, ctx: &mut DataContext<'_>) -> Result<ItemStats> {
        let mut stats = ItemStats::default();
        if !ctx.store.table_exists(LEGACY_FAST_ITEM_TABLE)? {
            return Ok(stats);
        }
        let table = data_table_name(&ctx.entity.id);
        if !ctx.store.table_exists(&table)? {
            ctx.warn(format!(
                "The {table} table of {} importer does not exist, items were not migrated.",
                ctx.entity.id
            ));
            return Ok(stats);
        }

        let items = ctx.store.legacy_fast_items(ctx.category)?;
        for (index, item) in items.iter().enumerate() {
            if item.url.is_empty() {
                let left = remaining(items.len(), index);
                stats.skipped += left;
                ctx.warn(format!(
                    "An item of feed {} ({}) has no URL, the remaining {} items were not migrated.",
                    item.feed_entity_id, ctx.category, left
                ));
                break;
            }
            let inserted = ctx.store.insert_data_item(
                &table,
                &DataItemRecord {
                    feed_entity_id: item.feed_entity_id,
                    timestamp: item.published,
                    title: item.title.clone(),
                    description: item.description.clone(),
                    url: item.url.clone(),
                    guid: item.guid.clone(),
                },
            )?;
            if inserted {
                stats.copied += 1;
            } else {
                stats.skipped += 1;
            }
        }
        Ok(stats)
    }
}

/// Item migrators by legacy processor id.
pub struct ItemMigratorRegistry {
    migrators: HashMap<String, Box<dyn ItemMigrator>>,
}

impl Default for ItemMigratorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("feedapi_node", Box::new(NodeItemMigrator));
        registry.register("feedapi_fast", Box::new(DataItemMigrator));
        registry
    }
}

impl ItemMigratorRegistry {
    /// Registry without any migrator.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            migrators: HashMap::new(),
        }
    }

    /// Adds or replaces the migrator of a processor.
    pub fn register(&mut self, processor: impl Into<String>, migrator: Box<dyn ItemMigrator>) {
        self.migrators.insert(processor.into(), migrator);
    }

    /// Migrator of a processor.
    #[must_use]
    pub fn get(&self, processor: &str) -> Option<&dyn ItemMigrator> {
        self.migrators.get(processor).map(|boxed| &**boxed)
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
