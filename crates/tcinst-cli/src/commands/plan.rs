//! `tcinst plan` — Show the resources of an instance in apply order.

use std::path::PathBuf;

use clap::Args;

use super::InstanceArgs;
use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Instance parameters.
    #[command(flatten)]
    pub instance: InstanceArgs,
}

/// Executes the `plan` command.
///
/// Compiles the instance, orders its graph for application, and prints
/// every node with its attributes and dependencies.
///
/// # Errors
///
/// Returns an error if validation, rendering, or graph construction fails.
pub fn execute(config: Option<&PathBuf>, args: &PlanArgs) -> anyhow::Result<()> {
    let compiled = super::compile_instance(config, &args.instance)?;
    let order = compiled.graph.apply_order()?;

    println!(
        "Plan for {} ({})",
        compiled.resolved.service_name, compiled.resolved.ensure
    );
    println!("{}", "\u{2550}".repeat(40));
    println!();

    for (i, node) in order.iter().enumerate() {
        output::print_node(i, node);
    }

    println!();
    println!("  {} resource(s).", order.len());
    let external: Vec<String> = compiled.graph.external().map(ToString::to_string).collect();
    if !external.is_empty() {
        println!("  Provided externally: {}", external.join(", "));
    }
    println!("  Fingerprint: {}", compiled.graph.fingerprint()?);

    Ok(())
}
