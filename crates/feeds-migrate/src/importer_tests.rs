//! Tests for `importer` module

use super::*;
use serde_json::json;

/// Registry that only knows the built-in catalog.
struct CatalogRegistry;

impl ImporterRegistry for CatalogRegistry {
    fn create_entity(&self, name: &str) -> Result<ImporterEntity> {
        Ok(ImporterEntity::new(name))
    }

    fn load_all(&self) -> Result<Vec<ImporterEntity>> {
        Ok(Vec::new())
    }

    fn load_by_id(&self, _id: &str) -> Result<Option<ImporterEntity>> {
        Ok(None)
    }

    fn save(&self, _entity: &ImporterEntity) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_default_mapping_entries() {
    let mapping = DefaultMapping::default();
    let pairs: Vec<(&str, &str, bool)> = mapping
        .entries()
        .iter()
        .map(|m| (m.source.as_str(), m.target.as_str(), m.unique))
        .collect();

    assert_eq!(
        pairs,
        vec![
            ("title", "title", false),
            ("description", "body", false),
            ("timestamp", "created", false),
            ("url", "url", true),
            ("guid", "guid", true),
        ]
    );
}

#[test]
fn test_mapping_from_array() {
    let value = json!([
        {"source": "title", "target": "title", "unique": false},
        {"source": "guid", "target": "guid", "unique": 1}
    ]);

    let mapping = DefaultMapping::from_value(&value).unwrap();

    assert_eq!(mapping.entries().len(), 2);
    assert!(mapping.entries()[1].unique);
}

#[test]
fn test_mapping_from_numeric_object_is_ordered_by_index() {
    let value = json!({
        "10": {"source": "guid", "target": "guid", "unique": true},
        "2": {"source": "title", "target": "title", "unique": false}
    });

    let mapping = DefaultMapping::from_value(&value).unwrap();

    assert_eq!(mapping.entries()[0].source, "title");
    assert_eq!(mapping.entries()[1].source, "guid");
}

#[test]
fn test_mapping_rejects_non_numeric_keys() {
    let value = json!({"first": {"source": "a", "target": "b", "unique": false}});

    let err = DefaultMapping::from_value(&value).unwrap_err();

    assert!(matches!(err, Error::StructuralConfig(_)));
    assert!(err.to_string().contains("not numeric"));
}

#[test]
fn test_mapping_rejects_missing_properties() {
    let value = json!([{"source": "title", "target": "title"}]);

    let err = DefaultMapping::from_value(&value).unwrap_err();

    assert!(err.to_string().contains("source, target and unique"));
}

#[test]
fn test_mapping_rejects_empty_and_scalars() {
    assert!(DefaultMapping::from_value(&json!([])).is_err());
    assert!(DefaultMapping::from_value(&json!("title")).is_err());
}

#[test]
fn test_add_mapping_skips_duplicate_pairs() {
    let mut entity = ImporterEntity::new("article");

    assert!(entity.add_mapping(FieldMapping::new("url", "url", true)));
    assert!(!entity.add_mapping(FieldMapping::new("url", "url", false)));
    assert!(entity.add_mapping(FieldMapping::new("url", "guid", false)));

    assert_eq!(entity.mappings.len(), 2);
    assert!(entity.mappings[0].unique);
}

#[test]
fn test_new_entity_uses_default_capabilities() {
    let entity = ImporterEntity::new("article");
    assert_eq!(entity.fetcher.as_deref(), Some(DEFAULT_FETCHER));
    assert_eq!(entity.parser, DEFAULT_PARSER);
    assert_eq!(entity.processor, DEFAULT_PROCESSOR);
    assert!(entity.content_type.is_none());
}

#[test]
fn test_bind_capability_fills_role_slot() {
    let registry = CatalogRegistry;
    let mut entity = ImporterEntity::new("podcast");

    registry
        .bind_capability(&mut entity, "FeedsSimplePieParser")
        .unwrap();
    registry
        .bind_capability(&mut entity, "FeedsDataProcessor")
        .unwrap();
    registry.bind_capability(&mut entity, FILE_FETCHER).unwrap();

    assert_eq!(entity.parser, "FeedsSimplePieParser");
    assert_eq!(entity.processor, "FeedsDataProcessor");
    assert_eq!(entity.fetcher.as_deref(), Some(FILE_FETCHER));
}

#[test]
fn test_bind_unknown_capability_fails() {
    let registry = CatalogRegistry;
    let mut entity = ImporterEntity::new("podcast");

    let err = registry
        .bind_capability(&mut entity, "FeedsMagicParser")
        .unwrap_err();

    assert!(matches!(err, Error::UnknownCapability(ref id) if id == "FeedsMagicParser"));
}

#[test]
fn test_default_vocabularies_follow_bound_capabilities() {
    let registry = CatalogRegistry;
    let entity = ImporterEntity::new("article");

    let sources = registry.mapping_sources(&entity).unwrap();
    let targets = registry.mapping_targets(&entity).unwrap();

    assert!(sources.contains(&"tags".to_string()));
    assert!(targets.contains(&"body".to_string()));
}

#[test]
fn test_entity_round_trips_through_json_with_defaults() {
    let entity: ImporterEntity = serde_json::from_value(json!({
        "id": "blog",
        "parser": "FeedsSyndicationParser",
        "processor": "FeedsNodeProcessor"
    }))
    .unwrap();

    assert_eq!(entity.id, "blog");
    assert!(entity.fetcher.is_none());
    assert!(entity.mappings.is_empty());
    assert!(entity.provenance.is_none());
}
