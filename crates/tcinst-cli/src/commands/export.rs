//! `tcinst export` — Serialize the resource graph for an external engine.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tcinst_graph::graph::ResourceGraph;

use super::InstanceArgs;

/// Serialization format of the exported graph.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

/// Arguments for the `export` command.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Instance parameters.
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Encodes `graph` in `format`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(graph: &ResourceGraph, format: ExportFormat) -> anyhow::Result<String> {
    Ok(match format {
        ExportFormat::Json => {
            let mut text = serde_json::to_string_pretty(graph)?;
            text.push('\n');
            text
        }
        ExportFormat::Yaml => serde_yaml::to_string(graph)?,
    })
}

/// Executes the `export` command.
///
/// # Errors
///
/// Returns an error if compilation, serialization, or writing fails.
pub fn execute(config: Option<&PathBuf>, args: &ExportArgs) -> anyhow::Result<()> {
    let compiled = super::compile_instance(config, &args.instance)?;
    let text = encode(&compiled.graph, args.format)?;

    if let Some(ref out_path) = args.output {
        std::fs::write(out_path, &text)?;
        tracing::info!(path = %out_path.display(), nodes = compiled.graph.len(), "exported graph");
    } else {
        print!("{text}");
    }

    Ok(())
}
