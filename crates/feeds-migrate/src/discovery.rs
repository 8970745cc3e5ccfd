//! Discovery of the categories a migration run has to visit.

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::error::Result;
use crate::importer::ImporterRegistry;
use crate::settings::LegacySettingsProvider;

/// Lists candidate categories from the legacy settings and the registry.
pub struct TypeDiscoverer<'a> {
    settings: &'a dyn LegacySettingsProvider,
    registry: &'a dyn ImporterRegistry,
}

impl<'a> TypeDiscoverer<'a> {
    /// Creates a discoverer over both sources.
    pub fn new(
        settings: &'a dyn LegacySettingsProvider,
        registry: &'a dyn ImporterRegistry,
    ) -> Self {
        Self { settings, registry }
    }

    /// Categories that still need (or may need) migration.
    ///
    /// Legacy categories come first, in provider order, followed by
    /// categories already bound to an importer so a partial run can be
    /// resumed. Each category appears once.
    ///
    /// A category whose settings cannot be read is still listed; migrating
    /// it then fails on its own and is reported with the other failures.
    pub fn list_candidate_categories(&self) -> Result<Vec<String>> {
        let mut candidates = IndexSet::new();

        for category in self.settings.categories()? {
            let migratable = match self.settings.get_settings(&category) {
                Ok(settings) => settings.is_some_and(|s| s.is_migratable()),
                Err(e) => {
                    warn!(category = category.as_str(), code = e.code(), "Unreadable settings: {}", e);
                    true
                }
            };
            if migratable {
                candidates.insert(category);
            }
        }
        let legacy = candidates.len();

        for entity in self.registry.load_all()? {
            if let Some(category) = entity.content_type {
                candidates.insert(category);
            }
        }

        debug!(
            "Discovered {} candidate categories ({} from legacy settings)",
            candidates.len(),
            legacy
        );
        Ok(candidates.into_iter().collect())
    }
}
