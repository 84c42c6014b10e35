//! stepwise CLI: render markdown templates whose values are updated by
//! interleaved code blocks.
//!
//! Provides four commands: `render`, `check`, `demo` and `init`.
//!
//! Each render runs its own evaluation session through
//! [`stepwise_core::templates::renderer::IncrementalRenderer`].

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "Render templates whose values change between code blocks",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to stepwise.config.json (defaults are used if it does not exist)
    #[arg(long, global = true, default_value = "stepwise.config.json")]
    config: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one or more templates
    Render {
        /// Template files; each one is rendered in its own session
        #[arg(required = true)]
        templates: Vec<PathBuf>,

        /// JSON file used as the Handlebars data context
        #[arg(long, short)]
        data: Option<PathBuf>,

        /// Write the rendered document here (single template only)
        #[arg(long, short, conflicts_with = "out_dir")]
        output: Option<PathBuf>,

        /// Write each rendered document into this directory, keeping its file name
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Remove code blocks from the output
        #[arg(long)]
        strip: bool,

        /// Fail if the number of value requests differs from the references in the text
        #[arg(long)]
        strict: bool,
    },

    /// Segment a template and validate its code blocks without rendering
    Check {
        /// Template file
        template: PathBuf,
    },

    /// Render the built-in demo template
    Demo {
        /// Keep the code blocks in the output
        #[arg(long)]
        echo: bool,
    },

    /// Write a default stepwise.config.json
    Init {
        /// Overwrite an existing config without asking
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            templates,
            data,
            output,
            out_dir,
            strip,
            strict,
        } => {
            let options = commands::render::RenderOptions {
                data,
                output,
                out_dir,
                strip,
                strict,
            };
            commands::render::run(&cli.config, &templates, &options).await?;
        }
        Commands::Check { template } => {
            commands::check::run(&cli.config, &template).await?;
        }
        Commands::Demo { echo } => {
            commands::demo::run(&cli.config, echo).await?;
        }
        Commands::Init { force } => {
            commands::init::run(&cli.config, force).await?;
        }
    }

    Ok(())
}
