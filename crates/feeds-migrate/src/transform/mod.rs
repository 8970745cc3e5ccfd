//! Translation of legacy plugin settings into importer configuration.
//!
//! Transformers are registered by legacy plugin id in a
//! [`TransformerRegistry`]. A plugin without a transformer keeps its
//! settings unmigrated, which the orchestrator reports.

mod data;
mod node;
pub mod reference;

use std::collections::HashMap;

use tracing::warn;

use crate::error::Result;
use crate::importer::{DefaultMapping, ImporterEntity};
use crate::pipeline::MigrationMessage;
use crate::settings::{ItemsDelete, LegacySettings, PluginSettings};
use crate::store::RelationalStore;

pub use data::DataProcessorTransformer;
pub use node::NodeProcessorTransformer;
pub use reference::{ReferenceDefinitions, ReferenceImporter};

/// `expire` value meaning items never expire.
pub const EXPIRE_NEVER: i64 = -1;

/// Everything a transformer may read or change.
pub struct TransformContext<'a> {
    /// Category being migrated.
    pub category: &'a str,
    /// Legacy plugin id the transformer was selected for.
    pub plugin: &'a str,
    /// Legacy settings of the category.
    pub settings: &'a LegacySettings,
    /// Importer under construction.
    pub entity: &'a mut ImporterEntity,
    /// Store, for provisioning tables.
    pub store: &'a dyn RelationalStore,
    /// Message sink.
    pub messages: &'a mut Vec<MigrationMessage>,
}

impl TransformContext<'_> {
    /// The plugin's own settings, if the category carries any.
    #[must_use]
    pub fn own_settings(&self) -> Option<&PluginSettings> {
        self.settings.plugin(self.plugin)
    }

    /// Records a warning for the category.
    pub fn warn(&mut self, text: String) {
        warn!(category = self.category, "{}", text);
        self.messages
            .push(MigrationMessage::warning(self.category, text));
    }

    /// Warns about every own setting that is not in `handled`.
    pub fn report_unhandled(&mut self, handled: &[&str]) {
        let unhandled: Vec<String> = self
            .own_settings()
            .map(|own| {
                own.keys()
                    .filter(|key| !handled.contains(key))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        for setting in unhandled {
            let text = format!(
                "{setting} old setting was not migrated to {} importer.",
                self.entity.id
            );
            self.warn(text);
        }
    }

    /// Copies the settings every processor shares.
    pub fn copy_common_settings(&mut self) {
        self.entity.add_config(
            "update_existing",
            serde_json::Value::Bool(self.settings.update_existing),
        );
        self.entity.add_config(
            "expire",
            serde_json::Value::from(expire_seconds(self.settings.items_delete)),
        );
    }
}

/// Current `expire` value for a legacy deletion policy.
#[must_use]
pub const fn expire_seconds(policy: ItemsDelete) -> i64 {
    match policy {
        ItemsDelete::Never => EXPIRE_NEVER,
        ItemsDelete::OlderThan(seconds) => seconds,
    }
}

/// Translates one legacy plugin's settings.
pub trait ConfigTransformer {
    /// Mutates the importer configuration.
    ///
    /// May return a mapping that replaces the default mapping for the
    /// category being migrated.
    fn transform(&self, ctx: &mut TransformContext<'_>) -> Result<Option<DefaultMapping>>;
}

/// Transformers by legacy plugin id.
pub struct TransformerRegistry {
    transformers: HashMap<String, Box<dyn ConfigTransformer>>,
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("feedapi_node", Box::new(NodeProcessorTransformer));
        registry.register("feedapi_fast", Box::new(DataProcessorTransformer::default()));
        registry
    }
}

impl TransformerRegistry {
    /// Registry without any transformer.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            transformers: HashMap::new(),
        }
    }

    /// Adds or replaces the transformer of a plugin.
    pub fn register(&mut self, plugin: impl Into<String>, transformer: Box<dyn ConfigTransformer>) {
        self.transformers.insert(plugin.into(), transformer);
    }

    /// Transformer of a plugin.
    #[must_use]
    pub fn get(&self, plugin: &str) -> Option<&dyn ConfigTransformer> {
        self.transformers.get(plugin).map(|boxed| &**boxed)
    }

    /// Whether a plugin has a transformer.
    #[must_use]
    pub fn contains(&self, plugin: &str) -> bool {
        self.transformers.contains_key(plugin)
    }
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
