//! Handlebars-based renderers.
//!
//! [`TemplateRenderer`] wraps the [`handlebars::Handlebars`] engine with
//! **strict mode** enabled by default and HTML escaping disabled, since
//! stepwise documents are markdown, not HTML. Strict mode makes any
//! `{{variable}}` missing from the data context an error rather than an empty
//! string, so a typo shows up at render time instead of as a hole in the
//! document.
//!
//! [`IncrementalRenderer`] runs one evaluation session per render on top of it.
//!
//! ## Usage
//!
//! ```ignore
//! use stepwise_core::config::EvalConfig;
//! use stepwise_core::templates::renderer::IncrementalRenderer;
//!
//! let renderer = IncrementalRenderer::new(EvalConfig::default());
//! let rendered = renderer.render(template_text, &serde_json::json!({}))?;
//! println!("{}", rendered.output);
//! ```

use handlebars::{no_escape, Handlebars, HelperDef};
use serde_json::Value;

use crate::config::{BlockDisplay, EvalConfig};
use crate::error::{Result, StepwiseError};
use crate::executor::{BlockEngine, Executor, SessionReport};
use crate::namespace::Namespace;
use crate::script::ScriptEngine;
use crate::segment::Segmenter;

use super::helper::{RequestHelper, SharedSession};

/// Plain Handlebars renderer for markdown output.
pub struct TemplateRenderer {
    hbs: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Create a new renderer with strict mode enabled.
    pub fn new() -> Self {
        Self::with_strict_mode(true)
    }

    pub fn with_strict_mode(strict: bool) -> Self {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(strict);
        hbs.register_escape_fn(no_escape);
        Self { hbs }
    }

    pub fn register_helper(&mut self, name: &str, helper: impl HelperDef + Send + Sync + 'static) {
        self.hbs.register_helper(name, Box::new(helper));
    }

    /// Render a template string with the given data context.
    pub fn render(&self, template: &str, data: &Value) -> Result<String> {
        self.hbs
            .render_template(template, data)
            .map_err(|e| StepwiseError::TemplateRender(e.to_string()))
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Output of one incremental render.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub output: String,
    pub report: SessionReport,
    /// Namespace as the last executed block left it.
    pub namespace: Namespace,
}

/// Renders templates whose `{{_ "name"}}` references are served by an
/// [`Executor`], one fresh session per call.
#[derive(Debug, Clone, Default)]
pub struct IncrementalRenderer {
    config: EvalConfig,
}

impl IncrementalRenderer {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Render `template` with `data` as the Handlebars context, running code
    /// blocks with the default [`ScriptEngine`].
    pub fn render(&self, template: &str, data: &Value) -> Result<Rendered> {
        self.render_with_engine(template, data, Box::new(ScriptEngine::new()))
    }

    /// Render `template`, running code blocks with `engine`.
    ///
    /// A failing block aborts the render with its
    /// [`StepwiseError::BlockExecution`]. With `strict_references` set, a
    /// request count that differs from the references counted in the text is
    /// [`StepwiseError::ReferenceCountMismatch`]; otherwise it is logged.
    pub fn render_with_engine(
        &self,
        template: &str,
        data: &Value,
        engine: Box<dyn BlockEngine>,
    ) -> Result<Rendered> {
        let segmentation = Segmenter::from_config(&self.config).segment(template)?;
        let body = match self.config.blocks {
            BlockDisplay::Echo => template.to_string(),
            BlockDisplay::Strip => segmentation.prose.clone(),
        };
        let executor = Executor::from_segmentation(segmentation, &self.config, engine);
        let session = SharedSession::new(executor);

        let result = {
            let mut renderer = TemplateRenderer::with_strict_mode(self.config.strict_mode);
            renderer.register_helper(&self.config.helper, RequestHelper::new(session.clone()));
            renderer.render(&body, data)
        };

        let mut session = session
            .lock()
            .map_err(|_| anyhow::anyhow!("evaluation session poisoned"))?;
        if let Some(failure) = session.failure.take() {
            return Err(failure);
        }
        let output = result?;

        let report = session.executor.report();
        if !report.is_consistent() {
            if self.config.strict_references {
                return Err(StepwiseError::ReferenceCountMismatch {
                    expected: report.expected_requests,
                    actual: report.requests,
                });
            }
            tracing::warn!(
                expected = report.expected_requests,
                actual = report.requests,
                "value requests differ from references counted in the text; values may be misplaced"
            );
        }
        tracing::info!(
            requests = report.requests,
            executed = report.blocks_executed,
            pending = report.blocks_pending,
            "rendered template"
        );

        Ok(Rendered {
            output,
            report,
            namespace: session.executor.namespace().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{ScriptError, Value as ScriptValue};
    use crate::templates::embedded::DEMO_TEMPLATE;
    use serde_json::json;

    fn strip() -> EvalConfig {
        EvalConfig {
            blocks: BlockDisplay::Strip,
            ..EvalConfig::default()
        }
    }

    struct FailingEngine;

    impl BlockEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn check(&self, _source: &str) -> std::result::Result<(), ScriptError> {
            Ok(())
        }

        fn execute(
            &self,
            _source: &str,
            _namespace: &mut Namespace,
        ) -> std::result::Result<(), ScriptError> {
            Err(ScriptError::UndefinedName("nothing".into()))
        }
    }

    #[test]
    fn test_plain_renderer_strict_mode() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render("{{missing_var}}", &json!({}));
        assert!(matches!(result, Err(StepwiseError::TemplateRender(_))));
    }

    #[test]
    fn test_plain_renderer_does_not_escape() {
        let renderer = TemplateRenderer::new();
        let out = renderer
            .render("{{text}}", &json!({ "text": "a < b & `c`" }))
            .unwrap();
        assert_eq!(out, "a < b & `c`");
    }

    #[test]
    fn test_demo_with_blocks_stripped() {
        let rendered = IncrementalRenderer::new(strip())
            .render(DEMO_TEMPLATE, &json!({}))
            .unwrap();
        assert_eq!(
            rendered.output,
            "`a` is ???, twice ???, thrice ???.\n\
             But now `a` = 9 (9).\n\
             And then `a` is 10.\n\
             Finally a: 32.0 (32.0).\n"
        );
        assert_eq!(rendered.report.requests, 8);
        assert!(rendered.report.is_consistent());
        assert_eq!(rendered.namespace.get("b"), Some(&ScriptValue::Float(3.2)));
    }

    #[test]
    fn test_demo_echoes_blocks_by_default() {
        let rendered = IncrementalRenderer::default()
            .render(DEMO_TEMPLATE, &json!({}))
            .unwrap();
        assert!(rendered.output.contains("```calc\na = 9\nb = 3.2\n```\n"));
        assert!(rendered.output.ends_with("Finally a: 32.0 (32.0).\n"));
        assert_eq!(rendered.report.blocks_executed, 3);
    }

    #[test]
    fn test_data_context_alongside_helper() {
        let template = "# {{title}}\n```calc\nn = 3\n```\n{{title}} has {{_ \"n\"}} parts.";
        let rendered = IncrementalRenderer::new(strip())
            .render(template, &json!({ "title": "Report" }))
            .unwrap();
        assert_eq!(rendered.output, "# Report\nReport has 3 parts.");
    }

    #[test]
    fn test_each_session_starts_fresh() {
        let renderer = IncrementalRenderer::new(strip());
        let template = "{{_ \"x\"}}\n```calc\nx = 1\n```\n{{_ \"x\"}}";
        let first = renderer.render(template, &json!({})).unwrap();
        let second = renderer.render(template, &json!({})).unwrap();
        assert_eq!(first.output, "???\n1");
        assert_eq!(second.output, first.output);
    }

    #[test]
    fn test_custom_sentinel_and_helper_name() {
        let config = EvalConfig {
            helper: "val".into(),
            undefined: "[unset]".into(),
            ..strip()
        };
        let rendered = IncrementalRenderer::new(config)
            .render("{{val \"x\"}} {{val \"y\"}}\n```calc\nx = 'ok'\n```\n{{val \"x\"}}", &json!({}))
            .unwrap();
        assert_eq!(rendered.output, "[unset] [unset]\nok");
    }

    #[test]
    fn test_block_failure_aborts_render_with_typed_error() {
        let err = IncrementalRenderer::new(strip())
            .render("{{_ \"a\"}}\n```calc\na = 1 / 0\n```\n{{_ \"a\"}}", &json!({}))
            .unwrap_err();
        assert!(matches!(
            err,
            StepwiseError::BlockExecution {
                block: 0,
                source: ScriptError::DivisionByZero,
                ..
            }
        ));
    }

    #[test]
    fn test_custom_engine_failure() {
        let err = IncrementalRenderer::new(strip())
            .render_with_engine(
                "```calc\nx = 1\n```\n{{_ \"x\"}}",
                &json!({}),
                Box::new(FailingEngine),
            )
            .unwrap_err();
        assert!(matches!(err, StepwiseError::BlockExecution { .. }));
    }

    #[test]
    fn test_reference_count_mismatch() {
        // `{{#each}}` evaluates the reference twice but the text shows it once
        let template = "{{#each items}}{{_ \"x\"}}{{/each}}\n```calc\nx = 1\n```\n";
        let data = json!({ "items": [1, 2] });

        let lenient = IncrementalRenderer::new(strip()).render(template, &data).unwrap();
        assert_eq!(lenient.report.requests, 2);
        assert_eq!(lenient.report.expected_requests, 1);
        assert!(!lenient.report.is_consistent());

        let strict = EvalConfig {
            strict_references: true,
            ..strip()
        };
        let err = IncrementalRenderer::new(strict).render(template, &data).unwrap_err();
        assert!(matches!(
            err,
            StepwiseError::ReferenceCountMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_malformed_template_is_rejected_before_rendering() {
        let err = IncrementalRenderer::default()
            .render("```calc\nx = 1\n", &json!({}))
            .unwrap_err();
        assert!(matches!(err, StepwiseError::UnterminatedBlock { line: 1 }));
    }

    #[test]
    fn test_missing_helper_argument() {
        let err = IncrementalRenderer::default()
            .render("{{_}}", &json!({}))
            .unwrap_err();
        assert!(matches!(err, StepwiseError::TemplateRender(_)));
    }
}
