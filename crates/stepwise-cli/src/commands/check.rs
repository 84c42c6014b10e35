use std::path::Path;

use anyhow::{Context, Result};

use stepwise_core::config::EvalConfig;
use stepwise_core::executor::Executor;
use stepwise_core::script::ScriptEngine;
use stepwise_core::segment::{Segmentation, Segmenter};

use crate::output;

/// Segment a template and parse every code block without running anything.
pub async fn run(config_path: &Path, template: &Path) -> Result<()> {
    let config = EvalConfig::load_or_default(config_path)?;
    let text = tokio::fs::read_to_string(template)
        .await
        .with_context(|| format!("failed to read template {}", template.display()))?;

    output::print_header(&format!("stepwise check: {}", template.display()));

    let segmentation = Segmenter::from_config(&config).segment(&text)?;
    print_summary(&segmentation);

    let executor =
        Executor::from_segmentation(segmentation, &config, Box::new(ScriptEngine::new()));
    executor.check_blocks()?;

    output::print_success(&format!(
        "{} code block(s) parse; {} reference(s) expected",
        executor.pending().count(),
        executor.expected_requests()
    ));
    Ok(())
}

fn print_summary(segmentation: &Segmentation) {
    for block in &segmentation.blocks {
        output::print_key_value(
            &format!("block {}", block.index),
            &format!(
                "line {}, runs after reference {}, {} line(s)",
                block.fence_line,
                block.threshold,
                block.source_lines.len()
            ),
        );
    }
    if let Some(last) = segmentation.blocks.back() {
        if last.threshold == segmentation.total_references {
            output::print_warning(&format!(
                "block {} has no reference after it and will never run",
                last.index
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::error::StepwiseError;

    #[tokio::test]
    async fn test_check_valid_template() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("doc.md");
        std::fs::write(&template, "```calc\nx = 1\n```\n{{_ \"x\"}}\n").unwrap();
        run(&dir.path().join("stepwise.config.json"), &template)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_check_reports_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("doc.md");
        std::fs::write(&template, "```calc\nx = (1 +\n```\n{{_ \"x\"}}\n").unwrap();
        let err = run(&dir.path().join("stepwise.config.json"), &template)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StepwiseError>(),
            Some(StepwiseError::BlockExecution { block: 0, line: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_check_unterminated_block() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("doc.md");
        std::fs::write(&template, "text\n```calc\nx = 1\n").unwrap();
        let err = run(&dir.path().join("stepwise.config.json"), &template)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StepwiseError>(),
            Some(StepwiseError::UnterminatedBlock { line: 2 })
        ));
    }
}
