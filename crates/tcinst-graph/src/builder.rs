//! Assembles the resource graph of one instance.
//!
//! Edges:
//! - every node under `home` requires the `home` directory;
//! - nodes under `home/conf` also require the `conf` tree;
//! - links into managed trees require their target node, links to the
//!   shared binary directory require nothing else;
//! - the init link requires the base package (external);
//! - the service requires the init link.

use std::path::PathBuf;

use tcinst_common::config::ProvisionConfig;
use tcinst_common::constants::{CONFIG_FILE_MODE, DIRECTORY_MODE, ROOT_ACCOUNT, SYSCONFIG_MODE};
use tcinst_common::error::Result;
use tcinst_common::types::Ensure;

use crate::graph::ResourceGraph;
use crate::node::{ResourceNode, ResourceRef};
use crate::params::ResolvedInstance;
use crate::paths::PathSet;

/// Rendered file contents placed into the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    /// The server descriptor written to `home/conf/server.xml`.
    pub server_xml: String,
    /// The per-service environment file.
    pub sysconfig: String,
}

/// Builds and validates the resource graph for `resolved`.
///
/// # Errors
///
/// Returns `ProvisionError::Graph` if two nodes claim the same path with
/// different attributes, a dependency is undeclared, or a cycle exists.
pub fn build(
    resolved: &ResolvedInstance,
    paths: &PathSet,
    content: &RenderedContent,
    config: &ProvisionConfig,
) -> Result<ResourceGraph> {
    let owner = resolved.home_owner.as_str();
    let group = resolved.home_group.as_str();
    let home = ResourceRef::file(&paths.home);
    let conf = ResourceRef::file(&paths.conf_dir);
    let init_link = ResourceRef::file(&paths.init_link);
    let package = ResourceRef::Package(config.base_package.clone());

    let mut graph = ResourceGraph::new(resolved.ensure);
    graph.declare_external(package.clone());

    let managed_dir = |path: &PathBuf| {
        ResourceNode::directory(path)
            .owned_by(owner, group)
            .mode(DIRECTORY_MODE)
    };
    let home_link = |path: &PathBuf, target: &PathBuf| {
        ResourceNode::symlink(path, target)
            .owned_by(owner, group)
            .mode(DIRECTORY_MODE)
            .requires(home.clone())
    };

    let nodes = [
        ResourceNode::templated_file(&paths.sysconfig_file, content.sysconfig.as_str())
            .owned_by(ROOT_ACCOUNT, ROOT_ACCOUNT)
            .mode(SYSCONFIG_MODE)
            .preserve_existing(),
        ResourceNode::symlink(&paths.init_link, &paths.init_target)
            .owned_by(ROOT_ACCOUNT, ROOT_ACCOUNT)
            .requires(package),
        // Home tree.
        managed_dir(&paths.home),
        ResourceNode::directory(&paths.conf_dir)
            .owned_by(owner, group)
            .mode(CONFIG_FILE_MODE)
            .recursive_source(config.conf_source.as_str(), false)
            .preserve_existing()
            .requires(home.clone()),
        managed_dir(&paths.catalina_dir)
            .requires(home.clone())
            .requires(conf.clone()),
        managed_dir(&paths.webapps_dir).requires(home.clone()),
        managed_dir(&paths.lib_dir).requires(home.clone()),
        ResourceNode::templated_file(&paths.config_file, content.server_xml.as_str())
            .owned_by(owner, group)
            .mode(CONFIG_FILE_MODE)
            .preserve_existing()
            .requires(home.clone())
            .requires(conf),
        // Log and cache trees.
        managed_dir(&paths.log_dir),
        managed_dir(&paths.cache_dir),
        managed_dir(&paths.cache_work_dir).requires(ResourceRef::file(&paths.cache_dir)),
        managed_dir(&paths.cache_temp_dir).requires(ResourceRef::file(&paths.cache_dir)),
        // Links from home into the other trees.
        home_link(&paths.logs_link, &paths.log_dir).requires(ResourceRef::file(&paths.log_dir)),
        home_link(&paths.bin_link, &paths.shared_bin_dir),
        home_link(&paths.temp_link, &paths.cache_temp_dir)
            .requires(ResourceRef::file(&paths.cache_temp_dir)),
        home_link(&paths.work_link, &paths.cache_work_dir)
            .requires(ResourceRef::file(&paths.cache_work_dir)),
        ResourceNode::service(resolved.service_name.as_str()).requires(init_link),
    ];

    for mut node in nodes {
        if resolved.ensure == Ensure::Absent {
            node.mark_absent();
        }
        graph.insert(node)?;
    }

    graph.validate()?;
    Ok(graph)
}
