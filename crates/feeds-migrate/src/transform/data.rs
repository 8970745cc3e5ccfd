use tracing::debug;

use super::reference::ReferenceDefinitions;
use super::{ConfigTransformer, TransformContext};
use crate::error::Result;
use crate::importer::DefaultMapping;
use crate::store::data_table_name;

const HANDLED: &[&str] = &["enabled", "weight"];

/// Settings of the legacy fast processor, which stored items in its own
/// table instead of content entities.
#[derive(Debug, Clone)]
pub struct DataProcessorTransformer {
    reference_importer: String,
    reference_table: String,
}

impl Default for DataProcessorTransformer {
    fn default() -> Self {
        Self {
            reference_importer: "feed_fast".to_string(),
            reference_table: "feeds_data_feed_fast".to_string(),
        }
    }
}

impl ConfigTransformer for DataProcessorTransformer {
    fn transform(&self, ctx: &mut TransformContext<'_>) -> Result<Option<DefaultMapping>> {
        let definitions = ReferenceDefinitions::bundled()?;
        let mapping = definitions.mapping(&self.reference_importer)?;

        let mut schema = definitions.table(&self.reference_table)?.clone();
        schema.description = Some(format!("Table for {}", ctx.entity.id));
        let table = data_table_name(&ctx.entity.id);
        ctx.store.create_data_table(&table, &schema)?;
        debug!("Provisioned {} for {}", table, ctx.entity.id);

        ctx.copy_common_settings();
        ctx.report_unhandled(HANDLED);
        Ok(Some(mapping))
    }
}
