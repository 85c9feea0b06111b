//! CLI command definitions and dispatch.

pub mod converge;
pub mod export;
pub mod plan;
pub mod render;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tcinst_common::config::ProvisionConfig;
use tcinst_common::constants::BIN_NAME;
use tcinst_common::types::{Ensure, PortValue};
use tcinst_graph::params::InstanceParameters;
use tcinst_graph::{CompiledInstance, Compiler};

/// tcinst — compile per-name server instances into resource graphs.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// YAML file overriding the host layout (prefix, roots, template).
    #[arg(long, global = true, env = "TCINST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Format of diagnostic logs written to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Diagnostic log format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the resources of an instance in apply order.
    Plan(plan::PlanArgs),
    /// Print the rendered server descriptor.
    Render(render::RenderArgs),
    /// Serialize the resource graph.
    Export(export::ExportArgs),
    /// Dry-run convergence twice against an empty in-memory host.
    Converge(converge::ConvergeArgs),
}

/// Instance parameters shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct InstanceArgs {
    /// Instance name.
    pub name: Option<String>,

    /// YAML or JSON file with instance parameters; flags override it.
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Account owning the instance home tree.
    #[arg(long)]
    pub account: Option<String>,

    /// AJP connector port.
    #[arg(long)]
    pub ajp_port: Option<String>,

    /// HTTP connector port.
    #[arg(long)]
    pub http_port: Option<String>,

    /// Redirect port of both connectors.
    #[arg(long)]
    pub redirect_port: Option<String>,

    /// Shutdown listener port.
    #[arg(long)]
    pub shutdown_port: Option<String>,

    /// Owner of the instance trees (defaults to the account).
    #[arg(long)]
    pub home_owner: Option<String>,

    /// Group of the instance trees (defaults to the account).
    #[arg(long)]
    pub home_group: Option<String>,

    /// Compile the removal of the instance instead of its creation.
    #[arg(long)]
    pub absent: bool,
}

impl InstanceArgs {
    /// Merges the parameter file (if any) with the command-line flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter file cannot be read or parsed.
    pub fn to_parameters(&self) -> anyhow::Result<InstanceParameters> {
        let mut raw = match &self.params {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading instance parameters");
                let text = std::fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("cannot read parameters {}: {e}", path.display())
                })?;
                serde_yaml::from_str::<InstanceParameters>(&text)?
            }
            None => InstanceParameters::default(),
        };

        if let Some(name) = &self.name {
            raw.name.clone_from(name);
        }
        override_with(&mut raw.account, self.account.as_ref());
        override_with(&mut raw.home_owner, self.home_owner.as_ref());
        override_with(&mut raw.home_group, self.home_group.as_ref());
        override_port(&mut raw.ajp_port, self.ajp_port.as_deref());
        override_port(&mut raw.http_port, self.http_port.as_deref());
        override_port(&mut raw.redirect_port, self.redirect_port.as_deref());
        override_port(&mut raw.shutdown_port, self.shutdown_port.as_deref());
        if self.absent {
            raw.ensure = Ensure::Absent;
        }
        Ok(raw)
    }
}

fn override_with(slot: &mut Option<String>, value: Option<&String>) {
    if let Some(v) = value {
        *slot = Some(v.clone());
    }
}

fn override_port(slot: &mut Option<PortValue>, value: Option<&str>) {
    if let Some(v) = value {
        *slot = Some(PortValue::from(v));
    }
}

/// Builds the compiler from the optional layout file and compiles `args`.
///
/// # Errors
///
/// Returns an error if the layout, template or parameters are invalid.
pub fn compile_instance(
    config: Option<&PathBuf>,
    args: &InstanceArgs,
) -> anyhow::Result<CompiledInstance> {
    let config = match config {
        Some(path) => ProvisionConfig::load(path)?,
        None => ProvisionConfig::default(),
    };
    let compiler = Compiler::new(config)?;
    let raw = args.to_parameters()?;
    Ok(compiler.compile(&raw)?)
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_ref();
    match cli.command {
        Command::Plan(args) => plan::execute(config, &args),
        Command::Render(args) => render::execute(config, &args),
        Command::Export(args) => export::execute(config, &args),
        Command::Converge(args) => converge::execute(config, &args),
    }
}
