//! Tests for `data` module

use super::*;
use crate::pipeline::MessageKind;
use crate::store::SqliteBackend;
use crate::transform::ReferenceDefinitions;

fn backend() -> SqliteBackend {
    let backend = SqliteBackend::open_in_memory().unwrap();
    backend.install_legacy_schema().unwrap();
    backend.install_current_schema().unwrap();
    backend
        .connection()
        .execute_batch(
            "INSERT INTO node (nid, vid, type, title) VALUES
                 (1, 11, 'article', 'Planet'), (2, 12, 'article', 'Blog'),
                 (3, 13, 'page', 'Other'),
                 (100, 110, 'story', 'a'), (101, 111, 'story', 'b');
             INSERT INTO feedapi (nid, vid, url) VALUES
                 (1, 11, 'http://planet.example/rss'),
                 (2, 12, 'http://blog.example/atom'),
                 (3, 13, 'http://other.example/rss');",
        )
        .unwrap();
    backend
}

fn entity(id: &str) -> ImporterEntity {
    let mut entity = ImporterEntity::new(id);
    entity.content_type = Some("article".to_string());
    entity
}

#[test]
fn test_feed_sources_are_written_under_importer() {
    // Arrange
    let backend = backend();
    let entity = entity("article");
    let mut messages = Vec::new();

    // Act
    let stats = FeedSourceMigrator
        .migrate(&mut DataContext {
            category: "article",
            entity: &entity,
            store: &backend,
            messages: &mut messages,
        })
        .unwrap();

    // Assert
    assert_eq!(stats, ItemStats { copied: 2, skipped: 0 });
    let source = backend.load_feed_source("article", 2).unwrap().unwrap();
    assert_eq!(source.source(), Some("http://blog.example/atom"));
    assert_eq!(
        source.fetcher_source("FeedsHTTPFetcher"),
        Some("http://blog.example/atom")
    );
    assert!(backend.load_feed_source("article", 3).unwrap().is_none());
    assert!(messages.is_empty());
}

#[test]
fn test_feed_sources_stop_at_first_empty_url() {
    let backend = backend();
    backend
        .connection()
        .execute("UPDATE feedapi SET url = NULL WHERE nid = 1", [])
        .unwrap();
    let entity = entity("article");
    let mut messages = Vec::new();

    let stats = FeedSourceMigrator
        .migrate(&mut DataContext {
            category: "article",
            entity: &entity,
            store: &backend,
            messages: &mut messages,
        })
        .unwrap();

    assert_eq!(stats, ItemStats { copied: 0, skipped: 2 });
    assert!(backend.load_feed_source("article", 2).unwrap().is_none());
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::Warning);
    assert!(messages[0].text.contains("Feed 1 of article has no URL"));
}

#[test]
fn test_existing_feed_source_keeps_other_settings() {
    let backend = backend();
    let mut existing = FeedSourceRecord::new("article", 1);
    existing
        .config
        .insert("refresh".to_string(), serde_json::json!(3600));
    backend.save_feed_source(&existing).unwrap();
    let entity = entity("article");
    let mut messages = Vec::new();

    FeedSourceMigrator
        .migrate(&mut DataContext {
            category: "article",
            entity: &entity,
            store: &backend,
            messages: &mut messages,
        })
        .unwrap();

    let source = backend.load_feed_source("article", 1).unwrap().unwrap();
    assert_eq!(source.config["refresh"], serde_json::json!(3600));
    assert_eq!(source.source(), Some("http://planet.example/rss"));
}

#[test]
fn test_node_items_are_copied_and_rerun_safe() {
    // Arrange
    let backend = backend();
    backend
        .connection()
        .execute_batch(
            "INSERT INTO feedapi_node_item (nid, url, timestamp, arrived, guid) VALUES
                 (100, 'http://planet.example/a', 10, 20, 'a'),
                 (101, 'http://planet.example/b', 11, 21, 'b');
             INSERT INTO feedapi_node_item_feed (feed_nid, feed_item_nid) VALUES (1, 100), (1, 101);",
        )
        .unwrap();
    let entity = entity("article");
    let mut messages = Vec::new();

    // Act
    for _ in 0..2 {
        NodeItemMigrator
            .migrate(&mut DataContext {
                category: "article",
                entity: &entity,
                store: &backend,
                messages: &mut messages,
            })
            .unwrap();
    }

    // Assert
    let (count, imported, hash): (i64, i64, String) = backend
        .connection()
        .query_row(
            "SELECT COUNT(*), MAX(imported), MAX(hash) FROM feeds_node_item WHERE id = 'article'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(imported, 21);
    assert_eq!(hash, "");
}

#[test]
fn test_node_items_stop_at_first_empty_url() {
    let backend = backend();
    backend
        .connection()
        .execute_batch(
            "INSERT INTO feedapi_node_item (nid, url, timestamp, arrived, guid) VALUES
                 (100, 'http://planet.example/a', 10, 20, 'a'),
                 (101, '', 11, 21, 'b');
             INSERT INTO feedapi_node_item_feed (feed_nid, feed_item_nid) VALUES (1, 100), (2, 101);",
        )
        .unwrap();
    let entity = entity("article");
    let mut messages = Vec::new();

    let stats = NodeItemMigrator
        .migrate(&mut DataContext {
            category: "article",
            entity: &entity,
            store: &backend,
            messages: &mut messages,
        })
        .unwrap();

    assert_eq!(stats, ItemStats { copied: 1, skipped: 1 });
    assert_eq!(messages.len(), 1);
}

#[test]
fn test_fast_items_land_in_data_table_once() {
    // Arrange
    let backend = backend();
    let definitions = ReferenceDefinitions::bundled().unwrap();
    backend
        .create_data_table(
            &data_table_name("article"),
            definitions.table("feeds_data_feed_fast").unwrap(),
        )
        .unwrap();
    backend
        .connection()
        .execute_batch(
            "INSERT INTO feedapi_fast_item (fid, title, description, url, guid, published) VALUES
                 (1, 'One', 'First', 'http://planet.example/1', 'g1', 100),
                 (2, 'Two', NULL, 'http://planet.example/2', 'g2', 200),
                 (3, 'Elsewhere', '', 'http://other.example/3', 'g3', 300);
             INSERT INTO feedapi_fast_item_feed (feed_nid, feed_item_fid) VALUES (1, 1), (2, 2), (3, 3);",
        )
        .unwrap();
    let entity = entity("article");
    let mut messages = Vec::new();
    let mut ctx = DataContext {
        category: "article",
        entity: &entity,
        store: &backend,
        messages: &mut messages,
    };

    // Act
    let first = DataItemMigrator.migrate(&mut ctx).unwrap();
    let second = DataItemMigrator.migrate(&mut ctx).unwrap();

    // Assert
    assert_eq!(first, ItemStats { copied: 2, skipped: 0 });
    assert_eq!(second, ItemStats { copied: 0, skipped: 2 });
    let description: String = backend
        .connection()
        .query_row(
            "SELECT description FROM feeds_data_article WHERE guid = 'g2'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(description, "");
}

#[test]
fn test_fast_items_need_the_data_table() {
    let backend = backend();
    let entity = entity("article");
    let mut messages = Vec::new();

    let stats = DataItemMigrator
        .migrate(&mut DataContext {
            category: "article",
            entity: &entity,
            store: &backend,
            messages: &mut messages,
        })
        .unwrap();

    assert_eq!(stats, ItemStats::default());
    assert!(messages[0].text.contains("feeds_data_article"));
}

#[test]
fn test_registry_lookup() {
    let registry = ItemMigratorRegistry::default();
    assert!(registry.get("feedapi_node").is_some());
    assert!(registry.get("feedapi_fast").is_some());
    assert!(registry.get("feedapi_aggregator").is_none());
    assert!(ItemMigratorRegistry::empty().get("feedapi_node").is_none());
}
