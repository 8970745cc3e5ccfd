use tracing::debug;

use super::{ConfigTransformer, TransformContext};
use crate::error::Result;
use crate::importer::DefaultMapping;

const HANDLED: &[&str] = &["enabled", "weight", "content_type"];

/// Settings of the legacy node processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeProcessorTransformer;

impl ConfigTransformer for NodeProcessorTransformer {
    fn transform(&self, ctx: &mut TransformContext<'_>) -> Result<Option<DefaultMapping>> {
        let content_type = ctx
            .own_settings()
            .and_then(|own| own.extra_str("content_type"))
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        if let Some(content_type) = content_type {
            debug!("Items of {} become {} entities", ctx.entity.id, content_type);
            ctx.entity
                .add_config("content_type", serde_json::Value::String(content_type));
        }

        ctx.copy_common_settings();
        ctx.report_unhandled(HANDLED);
        Ok(None)
    }
}
