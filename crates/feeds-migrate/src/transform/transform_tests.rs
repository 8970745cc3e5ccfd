//! Tests for `transform` module

use super::*;
use crate::pipeline::MessageKind;
use crate::store::{data_table_name, SqliteBackend};
use serde_json::json;

fn settings(value: serde_json::Value) -> LegacySettings {
    serde_json::from_value(value).unwrap()
}

fn run(
    transformer: &dyn ConfigTransformer,
    plugin: &str,
    settings: &LegacySettings,
    entity: &mut ImporterEntity,
    store: &dyn RelationalStore,
) -> (Option<DefaultMapping>, Vec<MigrationMessage>) {
    let mut messages = Vec::new();
    let mut ctx = TransformContext {
        category: "article",
        plugin,
        settings,
        entity,
        store,
        messages: &mut messages,
    };
    let mapping = transformer.transform(&mut ctx).unwrap();
    (mapping, messages)
}

#[test]
fn test_node_transformer_copies_settings() {
    // Arrange
    let store = SqliteBackend::open_in_memory().unwrap();
    let legacy = settings(json!({
        "processors": {"feedapi_node": {"enabled": 1, "weight": 0, "content_type": "story"}},
        "items_delete": 0,
        "update_existing": 1
    }));
    let mut entity = ImporterEntity::new("article");

    // Act
    let (mapping, messages) = run(
        &NodeProcessorTransformer,
        "feedapi_node",
        &legacy,
        &mut entity,
        &store,
    );

    // Assert
    assert!(mapping.is_none());
    assert!(messages.is_empty());
    assert_eq!(entity.config["content_type"], json!("story"));
    assert_eq!(entity.config["update_existing"], json!(true));
    assert_eq!(entity.config["expire"], json!(EXPIRE_NEVER));
}

#[test]
fn test_node_transformer_reports_unknown_settings() {
    let store = SqliteBackend::open_in_memory().unwrap();
    let legacy = settings(json!({
        "processors": {"feedapi_node": {"enabled": 1, "promote": 3, "x_dedupe": 1}},
        "items_delete": 3600
    }));
    let mut entity = ImporterEntity::new("article_0");

    let (_, messages) = run(
        &NodeProcessorTransformer,
        "feedapi_node",
        &legacy,
        &mut entity,
        &store,
    );

    let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "promote old setting was not migrated to article_0 importer.",
            "x_dedupe old setting was not migrated to article_0 importer.",
        ]
    );
    assert!(messages.iter().all(|m| m.kind == MessageKind::Warning));
    assert_eq!(entity.config["expire"], json!(3600));
    assert!(!entity.config.contains_key("content_type"));
}

#[test]
fn test_data_transformer_provisions_table_and_returns_mapping() {
    // Arrange
    let store = SqliteBackend::open_in_memory().unwrap();
    let legacy = settings(json!({
        "processors": {
            "feedapi_node": {"enabled": 0, "content_type": "story"},
            "feedapi_fast": {"enabled": 1, "weight": 2, "content_type": "ignored"}
        },
        "update_existing": 0
    }));
    let mut entity = ImporterEntity::new("news");

    // Act
    let (mapping, messages) = run(
        &DataProcessorTransformer::default(),
        "feedapi_fast",
        &legacy,
        &mut entity,
        &store,
    );

    // Assert
    let mapping = mapping.unwrap();
    assert_eq!(mapping.entries()[1].target, "description");
    assert!(store.table_exists(&data_table_name("news")).unwrap());
    assert_eq!(entity.config["update_existing"], json!(false));
    assert_eq!(entity.config["expire"], json!(-1));
    // Only the fast processor's own settings are inspected.
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.starts_with("content_type old setting"));
}

#[test]
fn test_expire_seconds() {
    assert_eq!(expire_seconds(ItemsDelete::Never), EXPIRE_NEVER);
    assert_eq!(expire_seconds(ItemsDelete::OlderThan(60)), 60);
}

#[test]
fn test_registry_builtins_and_overrides() {
    struct Nothing;
    impl ConfigTransformer for Nothing {
        fn transform(&self, _ctx: &mut TransformContext<'_>) -> Result<Option<DefaultMapping>> {
            Ok(None)
        }
    }

    let mut registry = TransformerRegistry::default();
    assert!(registry.contains("feedapi_node"));
    assert!(registry.contains("feedapi_fast"));
    assert!(registry.get("parser_simplepie").is_none());

    registry.register("parser_simplepie", Box::new(Nothing));
    assert!(registry.get("parser_simplepie").is_some());
    assert!(TransformerRegistry::empty().get("feedapi_node").is_none());
}
