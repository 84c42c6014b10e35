use std::path::Path;

use anyhow::Result;

use stepwise_core::config::{BlockDisplay, EvalConfig};
use stepwise_core::templates::embedded::DEMO_TEMPLATE;
use stepwise_core::templates::renderer::IncrementalRenderer;

use crate::output;

/// Render the built-in demo template to stdout.
///
/// Only the display mode is taken from the flags; the demo always uses the
/// default markers and helper name it is written with.
pub async fn run(config_path: &Path, echo: bool) -> Result<()> {
    let loaded = EvalConfig::load_or_default(config_path)?;
    let config = EvalConfig {
        blocks: if echo {
            BlockDisplay::Echo
        } else {
            BlockDisplay::Strip
        },
        undefined: loaded.undefined,
        ..EvalConfig::default()
    };

    let rendered = IncrementalRenderer::new(config).render(DEMO_TEMPLATE, &serde_json::json!({}))?;
    print!("{}", rendered.output);

    output::print_key_value("requests", &rendered.report.requests.to_string());
    output::print_key_value(
        "blocks executed",
        &format!(
            "{}/{}",
            rendered.report.blocks_executed, rendered.report.blocks_total
        ),
    );
    Ok(())
}
