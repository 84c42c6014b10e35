use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use stepwise_core::config::{BlockDisplay, EvalConfig};
use stepwise_core::error::StepwiseError;
use stepwise_core::templates::renderer::{IncrementalRenderer, Rendered};

use crate::output;

/// Flags of the `render` subcommand.
#[derive(Debug, Default)]
pub struct RenderOptions {
    pub data: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub strip: bool,
    pub strict: bool,
}

/// Render each template in its own evaluation session.
///
/// Documents go to stdout unless `--output` or `--out-dir` is given. Any
/// failure (malformed template, failing code block) stops the whole run.
pub async fn run(config_path: &Path, templates: &[PathBuf], options: &RenderOptions) -> Result<()> {
    if options.output.is_some() && templates.len() > 1 {
        anyhow::bail!("--output takes a single template; use --out-dir for several");
    }

    let renderer = IncrementalRenderer::new(effective_config(config_path, options)?);
    let data = load_data(options.data.as_deref()).await?;

    if let Some(out_dir) = &options.out_dir {
        tokio::fs::create_dir_all(out_dir).await?;
    }

    let progress = (templates.len() > 1 && options.out_dir.is_some()).then(|| {
        let bar = ProgressBar::new(templates.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30.cyan/dim} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    });

    for template in templates {
        if let Some(bar) = &progress {
            bar.set_message(template.display().to_string());
        }

        let rendered = render_file(&renderer, template, &data).await?;
        report(template, &rendered);

        match destination(template, options) {
            Some(path) => {
                tokio::fs::write(&path, &rendered.output)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                if progress.is_none() {
                    output::print_success(&format!(
                        "{} -> {}",
                        template.display(),
                        path.display()
                    ));
                }
            }
            None => print!("{}", rendered.output),
        }

        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }

    if let Some(bar) = progress {
        bar.finish_and_clear();
        output::print_success(&format!("Rendered {} templates", templates.len()));
    }

    Ok(())
}

/// Config file settings with command-line overrides applied.
fn effective_config(config_path: &Path, options: &RenderOptions) -> Result<EvalConfig> {
    let mut config = EvalConfig::load_or_default(config_path)?;
    if options.strip {
        config.blocks = BlockDisplay::Strip;
    }
    if options.strict {
        config.strict_references = true;
    }
    Ok(config)
}

async fn load_data(path: Option<&Path>) -> Result<serde_json::Value> {
    let Some(path) = path else {
        return Ok(serde_json::json!({}));
    };
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    let value = serde_json::from_str(&contents).map_err(|source| StepwiseError::DataParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(value)
}

async fn render_file(
    renderer: &IncrementalRenderer,
    template: &Path,
    data: &serde_json::Value,
) -> Result<Rendered> {
    let text = tokio::fs::read_to_string(template)
        .await
        .with_context(|| format!("failed to read template {}", template.display()))?;
    renderer
        .render(&text, data)
        .with_context(|| format!("failed to render {}", template.display()))
}

fn destination(template: &Path, options: &RenderOptions) -> Option<PathBuf> {
    if let Some(path) = &options.output {
        return Some(path.clone());
    }
    let out_dir = options.out_dir.as_ref()?;
    let name = template.file_name()?;
    Some(out_dir.join(name))
}

fn report(template: &Path, rendered: &Rendered) {
    let r = &rendered.report;
    tracing::info!(
        template = %template.display(),
        requests = r.requests,
        blocks = r.blocks_total,
        "session finished"
    );
    if r.blocks_pending > 0 {
        output::print_warning(&format!(
            "{}: {} code block(s) never ran; no reference follows them",
            template.display(),
            r.blocks_pending
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_prefers_output() {
        let options = RenderOptions {
            output: Some(PathBuf::from("out.md")),
            ..RenderOptions::default()
        };
        assert_eq!(
            destination(Path::new("docs/a.md"), &options),
            Some(PathBuf::from("out.md"))
        );
    }

    #[test]
    fn test_destination_in_out_dir_keeps_name() {
        let options = RenderOptions {
            out_dir: Some(PathBuf::from("build")),
            ..RenderOptions::default()
        };
        assert_eq!(
            destination(Path::new("docs/a.md"), &options),
            Some(PathBuf::from("build/a.md"))
        );
        assert_eq!(destination(Path::new("a.md"), &RenderOptions::default()), None);
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let options = RenderOptions {
            strip: true,
            strict: true,
            ..RenderOptions::default()
        };
        let config = effective_config(&dir.path().join("missing.json"), &options).unwrap();
        assert_eq!(config.blocks, BlockDisplay::Strip);
        assert!(config.strict_references);
    }

    #[tokio::test]
    async fn test_render_to_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("doc.md");
        std::fs::write(&template, "{{_ \"x\"}}\n```calc\nx = 2 ** 8\n```\n{{_ \"x\"}}\n").unwrap();
        let out_dir = dir.path().join("build");
        let options = RenderOptions {
            out_dir: Some(out_dir.clone()),
            strip: true,
            ..RenderOptions::default()
        };

        run(&dir.path().join("stepwise.config.json"), &[template], &options)
            .await
            .unwrap();

        let rendered = std::fs::read_to_string(out_dir.join("doc.md")).unwrap();
        assert_eq!(rendered, "???\n256\n");
    }

    #[tokio::test]
    async fn test_invalid_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data.json");
        std::fs::write(&data, "[1,").unwrap();
        let err = load_data(Some(&data)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StepwiseError>(),
            Some(StepwiseError::DataParse { .. })
        ));
    }
}
