//! The resource graph: typed nodes, explicit dependency edges, and
//! topological ordering via `petgraph`.
//!
//! Nodes are keyed by [`ResourceRef`] in a `BTreeMap`, so iteration,
//! serialization and ordering are identical for identical inputs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tcinst_common::error::{ProvisionError, Result};
use tcinst_common::types::Ensure;

use crate::node::{ResourceNode, ResourceRef};

/// A validated directed acyclic graph of resource nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    ensure: Ensure,
    nodes: BTreeMap<ResourceRef, ResourceNode>,
    /// References satisfied outside this graph (e.g. the base package).
    external: BTreeSet<ResourceRef>,
}

impl ResourceGraph {
    /// Creates an empty graph for an instance that should be `ensure`.
    #[must_use]
    pub fn new(ensure: Ensure) -> Self {
        Self {
            ensure,
            ..Self::default()
        }
    }

    /// Desired presence of the whole instance.
    #[must_use]
    pub const fn ensure(&self) -> Ensure {
        self.ensure
    }

    /// Declares a reference that an external collaborator provides.
    pub fn declare_external(&mut self, reference: ResourceRef) {
        let _ = self.external.insert(reference);
    }

    /// Adds a node.
    ///
    /// Re-adding an identical node is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Graph` if a different node already claims
    /// the same identity.
    pub fn insert(&mut self, node: ResourceNode) -> Result<()> {
        if let Some(existing) = self.nodes.get(&node.id) {
            if *existing == node {
                return Ok(());
            }
            return Err(ProvisionError::graph(
                node.id.title(),
                format!(
                    "conflicting claims: {} already declared as {}",
                    node.id, existing.kind
                ),
            ));
        }
        tracing::debug!(node = %node.id, kind = %node.kind, "adding resource node");
        let _ = self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Looks up a node by identity.
    #[must_use]
    pub fn get(&self, id: &ResourceRef) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    /// Iterates nodes in identity order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    /// References provided by external collaborators.
    pub fn external(&self) -> impl Iterator<Item = &ResourceRef> {
        self.external.iter()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checks that every dependency is known and the graph is acyclic.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Graph` naming the offending node.
    pub fn validate(&self) -> Result<()> {
        for node in self.nodes.values() {
            for dep in &node.requires {
                if dep == &node.id {
                    return Err(ProvisionError::graph(node.id.title(), "node requires itself"));
                }
                if !self.nodes.contains_key(dep) && !self.external.contains(dep) {
                    return Err(ProvisionError::graph(
                        node.id.title(),
                        format!("requires undeclared resource {dep}"),
                    ));
                }
            }
        }
        let _ = self.topological_order()?;
        Ok(())
    }

    /// Returns nodes so that every node follows all of its dependencies.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Graph` if the graph contains a cycle.
    pub fn topological_order(&self) -> Result<Vec<&ResourceNode>> {
        let mut graph: petgraph::Graph<&ResourceRef, ()> = petgraph::Graph::new();
        let mut index: HashMap<&ResourceRef, NodeIndex> = HashMap::new();
        for id in self.nodes.keys() {
            let _ = index.insert(id, graph.add_node(id));
        }
        // Edges point from dependency to dependent so toposort yields
        // dependencies first. External references carry no edge.
        for node in self.nodes.values() {
            for dep in &node.requires {
                if let (Some(&from), Some(&to)) = (index.get(dep), index.get(&node.id)) {
                    let _ = graph.add_edge(from, to, ());
                }
            }
        }

        match petgraph::algo::toposort(&graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| graph.node_weight(idx))
                .filter_map(|id| self.nodes.get(*id))
                .collect()),
            Err(cycle) => {
                let at = graph
                    .node_weight(cycle.node_id())
                    .map_or_else(String::new, |id| id.title());
                Err(ProvisionError::graph(at, "cyclic dependency detected in resource graph"))
            }
        }
    }

    /// Returns nodes in the order they should be removed: dependents first.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Graph` if the graph contains a cycle.
    pub fn removal_order(&self) -> Result<Vec<&ResourceNode>> {
        let mut order = self.topological_order()?;
        order.reverse();
        Ok(order)
    }

    /// The order a convergence engine should apply nodes in, given the
    /// graph's [`ensure`](Self::ensure).
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Graph` if the graph contains a cycle.
    pub fn apply_order(&self) -> Result<Vec<&ResourceNode>> {
        match self.ensure {
            Ensure::Present => self.topological_order(),
            Ensure::Absent => self.removal_order(),
        }
    }

    /// SHA-256 hex digest of the canonical JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Serialization` if the graph cannot be encoded.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}
