//! Error types for feeds-migrate.
//!
//! Fatal conditions end the migration of a single category (or reject a
//! single extension call). Everything recoverable is reported as a
//! [`MigrationMessage`](crate::pipeline::MigrationMessage) instead.

use thiserror::Error;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while migrating.
///
/// Error codes follow the pattern `MIGR-XXX` so operators can grep logs.
#[derive(Error, Debug)]
pub enum Error {
    /// No enabled parser or processor for the category (MIGR-001).
    #[error("[MIGR-001] {category} content-type cannot be migrated because there is no enabled parser or processor for it")]
    NoActivePlugin {
        /// Category being migrated.
        category: String,
    },

    /// Selected plugin has no dictionary entry (MIGR-002).
    #[error("[MIGR-002] {plugin} {kind} is not supported by the migration, skipping {category}")]
    UnsupportedPlugin {
        /// `parser` or `processor`.
        kind: &'static str,
        /// Legacy plugin id.
        plugin: String,
        /// Category being migrated.
        category: String,
    },

    /// Malformed replacement mapping or other structural problem (MIGR-003).
    #[error("[MIGR-003] Structural configuration error: {0}")]
    StructuralConfig(String),

    /// The importer registry cannot create importers (MIGR-004).
    #[error("[MIGR-004] Importer registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Capability id not known to the registry (MIGR-005).
    #[error("[MIGR-005] Unknown capability '{0}'")]
    UnknownCapability(String),

    /// Configuration error (MIGR-006).
    #[error("[MIGR-006] Configuration error: {0}")]
    Config(String),

    /// Store level failure that is not a driver error (MIGR-007).
    #[error("[MIGR-007] Store error: {0}")]
    Store(String),

    /// SQLite driver error (MIGR-008).
    #[error("[MIGR-008] Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (MIGR-009).
    #[error("[MIGR-009] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error (MIGR-010).
    #[error("[MIGR-010] YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error (MIGR-011).
    #[error("[MIGR-011] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code (e.g., "MIGR-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoActivePlugin { .. } => "MIGR-001",
            Self::UnsupportedPlugin { .. } => "MIGR-002",
            Self::StructuralConfig(_) => "MIGR-003",
            Self::RegistryUnavailable(_) => "MIGR-004",
            Self::UnknownCapability(_) => "MIGR-005",
            Self::Config(_) => "MIGR-006",
            Self::Store(_) => "MIGR-007",
            Self::Database(_) => "MIGR-008",
            Self::Io(_) => "MIGR-009",
            Self::Yaml(_) => "MIGR-010",
            Self::Json(_) => "MIGR-011",
        }
    }

    /// Returns true if the error is tied to the category being migrated
    /// rather than to the environment.
    ///
    /// Environment errors (database, IO, a missing registry) will most
    /// likely hit every other category of the batch as well. Undecodable
    /// stored settings belong to one category.
    #[must_use]
    pub const fn is_category_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoActivePlugin { .. }
                | Self::UnsupportedPlugin { .. }
                | Self::StructuralConfig(_)
                | Self::UnknownCapability(_)
                | Self::Json(_)
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
