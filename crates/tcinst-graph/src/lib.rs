//! # tcinst-graph
//!
//! Compiles the parameters of one server instance into a resource graph.
//!
//! The pipeline is pure and stateless:
//! - **Params**: validation of the mandatory account and default resolution.
//! - **Paths**: deterministic filesystem layout of the instance.
//! - **Template**: port substitution into the server descriptor.
//! - **Builder**: typed nodes with explicit `requires` edges.
//! - **Graph**: DAG value, topological ordering and fingerprinting.
//! - **Converge**: the contract an external convergence engine fulfils.
//!
//! Compiling different instance names concurrently is safe; their
//! resource sets are disjoint. Applying the same instance concurrently
//! must be serialized by the caller.

pub mod builder;
pub mod converge;
pub mod graph;
pub mod node;
pub mod params;
pub mod paths;
pub mod template;

use tcinst_common::config::ProvisionConfig;
use tcinst_common::error::Result;

use crate::builder::RenderedContent;
use crate::graph::ResourceGraph;
use crate::params::{InstanceParameters, ResolvedInstance};
use crate::paths::PathSet;
use crate::template::ServerTemplate;

/// Everything derived for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstance {
    /// Parameters after defaulting.
    pub resolved: ResolvedInstance,
    /// Filesystem layout.
    pub paths: PathSet,
    /// Rendered server descriptor.
    pub server_xml: String,
    /// Resource graph ready for a convergence engine.
    pub graph: ResourceGraph,
}

/// The instance resource-graph compiler.
#[derive(Debug, Clone)]
pub struct Compiler {
    config: ProvisionConfig,
    template: ServerTemplate,
}

impl Compiler {
    /// Creates a compiler for the given host layout.
    ///
    /// Uses `config.server_template` when set, otherwise the bundled
    /// template.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the template
    /// cannot be loaded or parsed.
    pub fn new(config: ProvisionConfig) -> Result<Self> {
        config.validate()?;
        let template = match &config.server_template {
            Some(path) => ServerTemplate::load(path)?,
            None => ServerTemplate::builtin()?,
        };
        Ok(Self { config, template })
    }

    /// Creates a compiler with an already parsed template.
    #[must_use]
    pub const fn with_template(config: ProvisionConfig, template: ServerTemplate) -> Self {
        Self { config, template }
    }

    /// The host layout this compiler derives paths under.
    #[must_use]
    pub const fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Resolves, derives, renders and builds the graph for `raw`.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Validation` for invalid parameters and
    /// `ProvisionError::Graph` for a graph invariant violation. No partial
    /// graph is ever returned.
    pub fn compile(&self, raw: &InstanceParameters) -> Result<CompiledInstance> {
        tracing::info!(instance = %raw.name, "compiling instance");
        let resolved = params::resolve(raw, &self.config)?;
        let paths = paths::derive_paths(&resolved, &self.config);
        let content = RenderedContent {
            server_xml: self.template.render(&resolved.ports),
            sysconfig: template::render_sysconfig(&resolved, &paths),
        };
        let graph = builder::build(&resolved, &paths, &content, &self.config)?;
        tracing::info!(
            service = %resolved.service_name,
            nodes = graph.len(),
            ensure = %graph.ensure(),
            "instance compiled"
        );
        Ok(CompiledInstance {
            resolved,
            paths,
            server_xml: content.server_xml,
            graph,
        })
    }
}

/// Compiles `raw` with the default host layout and bundled template.
///
/// # Errors
///
/// See [`Compiler::compile`].
pub fn compile(raw: &InstanceParameters) -> Result<CompiledInstance> {
    Compiler::new(ProvisionConfig::default())?.compile(raw)
}
