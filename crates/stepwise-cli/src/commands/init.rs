use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

use stepwise_core::config::EvalConfig;

use crate::output;

/// Write a default config file.
///
/// An existing file is only replaced with `--force` or after confirming the
/// interactive prompt.
pub async fn run(config_path: &Path, force: bool) -> Result<()> {
    output::print_header("stepwise init");

    if config_path.exists() && !force {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", config_path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            output::print_warning("Left existing config untouched");
            return Ok(());
        }
    }

    let config = EvalConfig::default();
    config.save(config_path)?;

    output::print_success(&format!("Wrote {}", config_path.display()));
    output::print_key_value("open marker", &config.open_marker);
    output::print_key_value("helper", &format!("{{{{{} \"name\"}}}}", config.helper));
    eprintln!();
    eprintln!("  Next steps:");
    eprintln!("    stepwise demo");
    eprintln!("    stepwise check <TEMPLATE>");
    eprintln!("    stepwise render <TEMPLATE> --strip");
    eprintln!();

    Ok(())
}
