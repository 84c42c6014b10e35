//! Evaluation settings, loaded from `stepwise.config.json`.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```json
//! { "blocks": "strip", "undefined": "[unset]" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StepwiseError};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "stepwise.config.json";

/// What happens to code blocks in the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockDisplay {
    /// Code blocks stay in the output verbatim, fences included.
    #[default]
    Echo,
    /// Code blocks are removed before the text is rendered.
    Strip,
}

/// Settings for one evaluation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// A line starting with this opens a code block.
    pub open_marker: String,
    /// Inside a code block, a line starting with this closes it.
    pub close_marker: String,
    /// Handlebars helper name used to reference values: `{{_ "a"}}`.
    pub helper: String,
    /// Text rendered for a name no block has assigned yet.
    pub undefined: String,
    pub blocks: BlockDisplay,
    /// Fail the render when the number of value requests differs from the
    /// number of references counted in the text.
    pub strict_references: bool,
    /// Handlebars strict mode: unknown context variables are errors.
    pub strict_mode: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            open_marker: "```calc".into(),
            close_marker: "```".into(),
            helper: "_".into(),
            undefined: "???".into(),
            blocks: BlockDisplay::Echo,
            strict_references: false,
            strict_mode: true,
        }
    }
}

impl EvalConfig {
    /// Load a config file. A missing file is [`StepwiseError::ConfigNotFound`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| {
            StepwiseError::ConfigNotFound {
                path: path.to_path_buf(),
                source,
            }
        })?;
        serde_json::from_str(&contents).map_err(|source| StepwiseError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(anyhow::Error::from)?;
        std::fs::write(path, json + "\n")?;
        Ok(())
    }
}
