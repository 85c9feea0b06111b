//! `tcinst render` — Print the rendered server descriptor.

use std::path::PathBuf;

use clap::Args;

use super::InstanceArgs;

/// Arguments for the `render` command.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Instance parameters.
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes the `render` command.
///
/// # Errors
///
/// Returns an error if compilation fails or the output cannot be written.
pub fn execute(config: Option<&PathBuf>, args: &RenderArgs) -> anyhow::Result<()> {
    let compiled = super::compile_instance(config, &args.instance)?;

    if let Some(ref out_path) = args.output {
        std::fs::write(out_path, &compiled.server_xml)?;
        tracing::info!(path = %out_path.display(), "wrote server descriptor");
    } else {
        print!("{}", compiled.server_xml);
    }

    Ok(())
}
