// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # FeedAPI to Feeds migration
//!
//! `feeds-migrate` is a CLI tool and library that moves content categories
//! from the legacy FeedAPI module (one parser and one processor per content
//! type) to Feeds importers (an importer entity binding a fetcher, a parser,
//! a processor and explicit field mappings).
//!
//! For every candidate category the [`Migrator`]:
//!
//! | Step | What happens |
//! |------|--------------|
//! | Importer | an importer bound to the category is adopted, or one is created from the legacy settings |
//! | Settings | per plugin settings are translated by a registered transformer |
//! | Mappings | custom mappings are matched against the new vocabularies, the default mapping is appended |
//! | Archive | legacy settings are archived, then removed |
//! | Data | feed URLs and imported items are copied into the new tables |
//!
//! Failures stop a single category; [`Migrator::migrate_all`] reports them
//! and carries on.
//!
//! ## Quick Start
//!
//! ```bash
//! feeds-migrate init --output feeds-migrate.yaml
//! feeds-migrate list --config feeds-migrate.yaml
//! feeds-migrate run --config feeds-migrate.yaml --install-schema
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! database: ./site.sqlite
//! dictionary:
//!   parser_csv: FeedsSyndicationParser
//! field_lookup:
//!   tags: taxonomy
//! options:
//!   categories: [article]
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod data;
pub mod dictionary;
pub mod discovery;
pub mod error;
pub mod importer;
pub mod matcher;
pub mod pipeline;
pub mod settings;
pub mod store;
pub mod transform;
pub mod ui;

pub use config::{MigrationConfig, MigrationOptions};
pub use data::{ItemMigrator, ItemStats};
pub use dictionary::PluginDictionary;
pub use error::{Error, Result};
pub use importer::{
    CapabilityInfo, CapabilityRole, DefaultMapping, FieldMapping, ImporterEntity, ImporterRegistry,
};
pub use matcher::{FieldMatcher, FieldPath};
pub use pipeline::{MessageKind, MigrationBackend, MigrationMessage, MigrationReport, Migrator};
pub use settings::{LegacySettings, LegacySettingsProvider, SettingsArchive};
pub use store::{RelationalStore, SqliteBackend};
pub use transform::ConfigTransformer;
