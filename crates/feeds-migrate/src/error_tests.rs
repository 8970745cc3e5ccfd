//! Tests for `error` module

use super::*;

#[test]
fn test_error_codes_are_unique() {
    // Arrange
    let errors: Vec<Error> = vec![
        Error::NoActivePlugin {
            category: "article".into(),
        },
        Error::UnsupportedPlugin {
            kind: "parser",
            plugin: "parser_x".into(),
            category: "article".into(),
        },
        Error::StructuralConfig("test".into()),
        Error::RegistryUnavailable("test".into()),
        Error::UnknownCapability("test".into()),
        Error::Config("test".into()),
        Error::Store("test".into()),
        Error::Database(rusqlite::Error::InvalidQuery),
        Error::Io(std::io::Error::other("test")),
    ];

    // Act
    let codes: Vec<&str> = errors.iter().map(Error::code).collect();

    // Assert
    let mut unique_codes = codes.clone();
    unique_codes.sort_unstable();
    unique_codes.dedup();
    assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    for code in &codes {
        assert!(code.starts_with("MIGR-"), "Code {code} should start with MIGR-");
    }
}

#[test]
fn test_error_display_includes_code_and_category() {
    let err = Error::NoActivePlugin {
        category: "story".into(),
    };

    let display = err.to_string();

    assert!(display.contains("[MIGR-001]"));
    assert!(display.contains("story"));
}

#[test]
fn test_unsupported_plugin_names_plugin_kind() {
    let err = Error::UnsupportedPlugin {
        kind: "processor",
        plugin: "feedapi_inherit".into(),
        category: "blog".into(),
    };

    let display = err.to_string();

    assert!(display.contains("feedapi_inherit processor"));
    assert!(display.contains("skipping blog"));
}

#[test]
fn test_category_fatal_classification() {
    assert!(Error::NoActivePlugin {
        category: "a".into()
    }
    .is_category_fatal());
    assert!(Error::StructuralConfig("x".into()).is_category_fatal());
    assert!(!Error::Io(std::io::Error::other("disk")).is_category_fatal());
    assert!(!Error::RegistryUnavailable("ui".into()).is_category_fatal());
    let undecodable = serde_json::from_str::<i64>("\"soon\"").unwrap_err();
    assert!(Error::Json(undecodable).is_category_fatal());
}
