//! `tcinst converge` — Dry-run convergence against an in-memory host.
//!
//! Applies the graph twice to a fresh host. The second pass must report
//! no changes; anything else means the graph does not converge.

use std::path::PathBuf;

use clap::Args;
use tcinst_graph::converge::{MemoryHost, converge};

use super::InstanceArgs;
use crate::output;

/// Arguments for the `converge` command.
#[derive(Args, Debug)]
pub struct ConvergeArgs {
    /// Instance parameters.
    #[command(flatten)]
    pub instance: InstanceArgs,
}

/// Executes the `converge` command.
///
/// # Errors
///
/// Returns an error if compilation fails, a pass fails, or the second
/// pass still changes something.
pub fn execute(config: Option<&PathBuf>, args: &ConvergeArgs) -> anyhow::Result<()> {
    let compiled = super::compile_instance(config, &args.instance)?;
    let mut host = MemoryHost::new();

    let first = converge(&compiled.graph, &mut host)?;
    output::print_report("Pass 1", &first);
    let second = converge(&compiled.graph, &mut host)?;
    output::print_report("Pass 2", &second);

    if !second.is_converged() {
        anyhow::bail!(
            "{} did not converge: {} change(s) on re-application",
            compiled.resolved.service_name,
            second.changed().count()
        );
    }
    Ok(())
}
