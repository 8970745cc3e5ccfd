//! Migration orchestration.
//!
//! [`Migrator`] drives one category at a time through importer resolution,
//! settings translation, mapping derivation and data copy. Fatal errors end
//! the category they occur in; [`Migrator::migrate_all`] collects them into a
//! [`MigrationReport`] and carries on with the next category.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::config::MigrationConfig;
use crate::data::{DataContext, FeedSourceMigrator, ItemMigrator, ItemMigratorRegistry};
use crate::dictionary::PluginDictionary;
use crate::discovery::TypeDiscoverer;
use crate::error::{Error, Result};
use crate::importer::{
    CapabilityInfo, DefaultMapping, FieldMapping, ImporterEntity, ImporterRegistry, FILE_FETCHER,
};
use crate::matcher::FieldMatcher;
use crate::settings::{backup_key, LegacySettingsProvider, SettingsArchive, UploadMethod};
use crate::store::RelationalStore;
use crate::transform::{ConfigTransformer, TransformContext, TransformerRegistry};

/// Everything the migration reads from and writes to.
pub trait MigrationBackend:
    LegacySettingsProvider + SettingsArchive + ImporterRegistry + RelationalStore
{
}

impl<T> MigrationBackend for T where
    T: LegacySettingsProvider + SettingsArchive + ImporterRegistry + RelationalStore
{
}

/// Severity of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// The category was not migrated.
    Failure,
    /// The category was migrated with a caveat.
    Warning,
}

/// Something the operator should know after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationMessage {
    /// Category the message is about.
    pub category: String,
    /// Severity.
    pub kind: MessageKind,
    /// Human readable text.
    pub text: String,
}

impl MigrationMessage {
    /// A caveat of a migrated category.
    pub fn warning(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            kind: MessageKind::Warning,
            text: text.into(),
        }
    }

    /// A category that failed.
    pub fn failure(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            kind: MessageKind::Failure,
            text: text.into(),
        }
    }
}

impl fmt::Display for MigrationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.text)
    }
}

/// Outcome of a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Categories migrated, in processing order.
    pub migrated: Vec<String>,
    /// Failure message by category.
    pub failures: BTreeMap<String, String>,
    /// Failed categories whose error came from the environment (database,
    /// IO, registry) rather than from the category itself.
    pub environment_failures: Vec<String>,
}

impl MigrationReport {
    /// Whether every category migrated.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether a failure points at the environment rather than a category.
    #[must_use]
    pub fn has_environment_failures(&self) -> bool {
        !self.environment_failures.is_empty()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} categories migrated, {} failed",
            self.migrated.len(),
            self.failures.len()
        )
    }
}

fn record(messages: &mut Vec<MigrationMessage>, category: &str, text: String) {
    warn!(category, "{}", text);
    messages.push(MigrationMessage::warning(category, text));
}

/// Migration orchestrator.
pub struct Migrator<B> {
    backend: B,
    dictionary: PluginDictionary,
    capabilities: IndexMap<String, CapabilityInfo>,
    matcher: FieldMatcher,
    default_mapping: DefaultMapping,
    transformers: TransformerRegistry,
    item_migrators: ItemMigratorRegistry,
    feed_sources: FeedSourceMigrator,
    messages: Vec<MigrationMessage>,
    show_progress: bool,
}

impl<B: MigrationBackend> Migrator<B> {
    /// Create a migrator with the built-in dictionary, mapping and registries.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            dictionary: PluginDictionary::default(),
            capabilities: IndexMap::new(),
            matcher: FieldMatcher::new(),
            default_mapping: DefaultMapping::default(),
            transformers: TransformerRegistry::default(),
            item_migrators: ItemMigratorRegistry::default(),
            feed_sources: FeedSourceMigrator,
            messages: Vec::new(),
            show_progress: false,
        }
    }

    /// Create a migrator and apply the extensions of a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an extension is rejected.
    pub fn from_config(backend: B, config: &MigrationConfig) -> Result<Self> {
        let mut migrator = Self::new(backend);
        for (id, spec) in &config.capabilities {
            migrator.register_capability(CapabilityInfo {
                id: id.clone(),
                role: spec.role,
                vocabulary: spec.vocabulary.clone(),
            })?;
        }
        for (legacy, capability) in &config.dictionary {
            migrator.extend_plugin_dictionary(legacy, capability)?;
        }
        for (legacy, current) in &config.field_lookup {
            migrator.extend_field_lookup(legacy, current)?;
        }
        if let Some(mapping) = config.default_mapping()? {
            migrator.set_default_mapping(mapping);
        }
        migrator.show_progress = config.options.progress;
        Ok(migrator)
    }

    /// Toggle the progress bar of batch runs.
    pub fn set_progress(&mut self, enabled: bool) {
        self.show_progress = enabled;
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The plugin dictionary in use.
    pub fn dictionary(&self) -> &PluginDictionary {
        &self.dictionary
    }

    /// The active default mapping.
    pub fn default_mapping(&self) -> &DefaultMapping {
        &self.default_mapping
    }

    /// Messages recorded so far, oldest first.
    pub fn messages(&self) -> &[MigrationMessage] {
        &self.messages
    }

    /// Adds an exact field lookup override.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either key is empty.
    pub fn extend_field_lookup(&mut self, legacy_key: &str, current_key: &str) -> Result<()> {
        self.matcher.extend(legacy_key, current_key)
    }

    /// Replaces the default mapping with a loosely typed one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralConfig`] if the mapping is malformed; the
    /// active mapping is then left untouched.
    pub fn replace_default_mapping(&mut self, mapping: &serde_json::Value) -> Result<()> {
        self.default_mapping = DefaultMapping::from_value(mapping)?;
        Ok(())
    }

    /// Replaces the default mapping.
    pub fn set_default_mapping(&mut self, mapping: DefaultMapping) {
        self.default_mapping = mapping;
    }

    /// Adds or overwrites a plugin dictionary entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either id is blank.
    pub fn extend_plugin_dictionary(&mut self, legacy_plugin: &str, capability: &str) -> Result<()> {
        self.dictionary.extend(legacy_plugin, capability)
    }

    /// Registers an importer capability the registry does not describe, or
    /// replaces the description of one it does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the id is blank.
    pub fn register_capability(&mut self, capability: CapabilityInfo) -> Result<()> {
        if capability.id.trim().is_empty() {
            return Err(Error::Config("capability id cannot be empty".to_string()));
        }
        debug!(
            "Registered {:?} capability {} ({} fields)",
            capability.role,
            capability.id,
            capability.vocabulary.len()
        );
        self.capabilities.insert(capability.id.clone(), capability);
        Ok(())
    }

    /// Description of a capability, registered ones first.
    pub fn capability(&self, id: &str) -> Option<CapabilityInfo> {
        self.capabilities
            .get(id)
            .cloned()
            .or_else(|| self.backend.capability(id))
    }

    /// Adds or replaces the settings transformer of a legacy plugin.
    pub fn register_transformer(
        &mut self,
        plugin: impl Into<String>,
        transformer: Box<dyn ConfigTransformer>,
    ) {
        self.transformers.register(plugin, transformer);
    }

    /// Adds or replaces the item migrator of a legacy processor.
    pub fn register_item_migrator(
        &mut self,
        processor: impl Into<String>,
        migrator: Box<dyn ItemMigrator>,
    ) {
        self.item_migrators.register(processor, migrator);
    }

    /// Categories a run would visit.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings or the registry cannot be read.
    pub fn list_candidate_categories(&self) -> Result<Vec<String>> {
        TypeDiscoverer::new(&self.backend, &self.backend).list_candidate_categories()
    }

    /// Migrate every candidate category.
    ///
    /// # Errors
    ///
    /// Only discovery errors are returned; category failures end up in the
    /// report.
    pub fn migrate_all(&mut self) -> Result<MigrationReport> {
        let categories = self.list_candidate_categories()?;
        Ok(self.migrate_categories(&categories))
    }

    /// Migrate the given categories in order, isolating failures.
    pub fn migrate_categories(&mut self, categories: &[String]) -> MigrationReport {
        let mut report = MigrationReport::default();
        let progress = self
            .show_progress
            .then(|| create_progress_bar(categories.len() as u64));

        info!("Starting migration of {} categories", categories.len());
        for category in categories {
            if let Some(pb) = &progress {
                pb.set_message(category.clone());
            }
            match self.migrate_category(category) {
                Ok(()) => report.migrated.push(category.clone()),
                Err(e) => {
                    error!(category = category.as_str(), code = e.code(), "{}", e);
                    if !e.is_category_fatal() {
                        report.environment_failures.push(category.clone());
                    }
                    let text = e.to_string();
                    self.messages
                        .push(MigrationMessage::failure(category.as_str(), text.clone()));
                    report.failures.insert(category.clone(), text);
                }
            }
            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }
        if let Some(pb) = progress {
            pb.finish_with_message("Migration complete");
        }

        info!("Migration complete: {}", report);
        report
    }

    /// Migrate one category.
    ///
    /// An importer already bound to the category is adopted as is;
    /// otherwise one is created from the legacy settings. Feed sources and
    /// items are copied in both cases.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the category. Steps completed before
    /// the error are not rolled back.
    pub fn migrate_category(&mut self, category: &str) -> Result<()> {
        info!("Migrating {}", category);

        let (entity, processor) = match self.find_bound_entity(category)? {
            Some(entity) => {
                let processor = entity.provenance.clone().or_else(|| {
                    self.dictionary
                        .reverse_lookup(&entity.processor)
                        .map(str::to_string)
                });
                debug!(
                    "Adopted importer {} (legacy processor {:?})",
                    entity.id, processor
                );
                (entity, processor)
            }
            None => {
                let (entity, processor) = self.configure_importer(category)?;
                (entity, Some(processor))
            }
        };

        let mut ctx = DataContext {
            category,
            entity: &entity,
            store: &self.backend,
            messages: &mut self.messages,
        };
        let feeds = self.feed_sources.migrate(&mut ctx)?;
        debug!("Feed sources of {}: {}", category, feeds);

        match processor
            .as_deref()
            .and_then(|p| self.item_migrators.get(p))
        {
            Some(migrator) => {
                let items = migrator.migrate(&mut ctx)?;
                debug!("Items of {}: {}", category, items);
            }
            None => debug!("No item migrator for {:?}", processor),
        }

        info!("Migrated {} into importer {}", category, entity.id);
        Ok(())
    }

    fn find_bound_entity(&self, category: &str) -> Result<Option<ImporterEntity>> {
        Ok(self
            .backend
            .load_all()?
            .into_iter()
            .find(|e| e.is_bound_to(category)))
    }

    /// First free id among `category`, `category_0`, `category_1`, ...
    fn unique_importer_id(&self, category: &str) -> Result<String> {
        let mut candidate = category.to_string();
        let mut suffix = 0_u32;
        while self.backend.load_by_id(&candidate)?.is_some() {
            candidate = format!("{category}_{suffix}");
            suffix += 1;
        }
        Ok(candidate)
    }

    /// Creates, configures and saves a new importer for the category.
    ///
    /// Returns the importer and the legacy processor id it replaces.
    fn configure_importer(&mut self, category: &str) -> Result<(ImporterEntity, String)> {
        let no_plugin = || Error::NoActivePlugin {
            category: category.to_string(),
        };
        let settings = self.backend.get_settings(category)?.ok_or_else(no_plugin)?;
        let (Some(parser), Some(processor)) = (settings.active_parser(), settings.active_processor())
        else {
            return Err(no_plugin());
        };

        let parser_capability = self.resolve_plugin("parser", parser, category)?;
        let processor_capability = self.resolve_plugin("processor", processor, category)?;
        debug!(
            "{} resolved to {} / {}",
            category, parser_capability.id, processor_capability.id
        );

        let id = self.unique_importer_id(category)?;
        let mut entity = self.backend.create_entity(&id)?;
        entity.bind(&parser_capability);
        entity.bind(&processor_capability);
        if settings.upload_method == UploadMethod::Upload {
            self.backend.bind_capability(&mut entity, FILE_FETCHER)?;
        }
        entity.provenance = Some(processor.to_string());

        let mut default_mapping = self.default_mapping.clone();
        for plugin in [parser, processor] {
            let Some(transformer) = self.transformers.get(plugin) else {
                record(
                    &mut self.messages,
                    category,
                    format!("The settings at {category} for {plugin} were not migrated."),
                );
                continue;
            };
            let mut ctx = TransformContext {
                category,
                plugin,
                settings: &settings,
                entity: &mut entity,
                store: &self.backend,
                messages: &mut self.messages,
            };
            if let Some(mapping) = transformer.transform(&mut ctx)? {
                debug!("{} replaces the default mapping of {}", plugin, category);
                default_mapping = mapping;
            }
        }

        if let Some(custom) = settings.custom_mapping.as_ref().filter(|m| !m.is_empty()) {
            let sources = match self.capabilities.get(&entity.parser) {
                Some(registered) => registered.vocabulary.clone(),
                None => self.backend.mapping_sources(&entity)?,
            };
            let targets = match self.capabilities.get(&entity.processor) {
                Some(registered) => registered.vocabulary.clone(),
                None => self.backend.mapping_targets(&entity)?,
            };
            for (source, target) in custom {
                let matched = (
                    self.matcher.match_field(source, &sources),
                    self.matcher.match_field(target, &targets),
                );
                if let (Some(source), Some(target)) = matched {
                    entity.add_mapping(FieldMapping::new(source, target, false));
                } else {
                    record(
                        &mut self.messages,
                        category,
                        format!("Failed to migrate this mapping ({category}): {source} - {target}"),
                    );
                }
            }
        }

        let abandoned = self.backend.count_abandoned_mappings(category)?;
        if abandoned > 0 {
            record(
                &mut self.messages,
                category,
                format!(
                    "{abandoned} feed nodes were detected with custom mapping ({category}), these mappings were skipped, you need to manually migrate them!"
                ),
            );
        }

        if PluginDictionary::is_default_mapping_processor(processor) {
            for mapping in default_mapping.entries() {
                entity.add_mapping(mapping.clone());
            }
        }

        entity.content_type = Some(category.to_string());
        self.backend.save(&entity)?;
        self.backend.archive(&backup_key(category), &settings)?;
        self.backend.remove_settings(category)?;
        debug!("Legacy settings of {} archived", category);

        Ok((entity, processor.to_string()))
    }

    /// Dictionary lookup that also checks the capability is known, so
    /// nothing is created for a category that cannot be bound.
    fn resolve_plugin(
        &self,
        kind: &'static str,
        plugin: &str,
        category: &str,
    ) -> Result<CapabilityInfo> {
        let capability = self
            .dictionary
            .resolve(plugin)
            .ok_or_else(|| Error::UnsupportedPlugin {
                kind,
                plugin: plugin.to_string(),
                category: category.to_string(),
            })?;
        self.capability(capability)
            .ok_or_else(|| Error::UnknownCapability(capability.to_string()))
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = if total > 0 {
        ProgressBar::new(total)
    } else {
        ProgressBar::new_spinner()
    };

    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    pb
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
