//! The contract between the compiler and a convergence engine.
//!
//! [`converge`] walks a [`ResourceGraph`] in apply order and hands each
//! node to a [`Converger`]. The engine owns all I/O. [`MemoryHost`] is a
//! reference engine over an in-memory filesystem and service table, used
//! for dry runs and for checking that re-application is a no-op.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use tcinst_common::error::{ProvisionError, Result};
use tcinst_common::types::{Ensure, Mode, ServiceState};

use crate::graph::ResourceGraph;
use crate::node::{Attributes, ResourceKind, ResourceNode, ResourceRef};

/// Outcome of applying one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Already in the desired state.
    Unchanged,
    /// Did not exist and was created.
    Created,
    /// Existed; the listed properties were corrected.
    Updated(Vec<&'static str>),
    /// Existed and was removed.
    Removed,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => f.pad("unchanged"),
            Self::Created => f.pad("created"),
            Self::Updated(props) => write!(f, "updated ({})", props.join(", ")),
            Self::Removed => f.pad("removed"),
        }
    }
}

/// A convergence engine for individual nodes.
///
/// Implementations must be idempotent: applying an already converged
/// node returns [`Change::Unchanged`]. For nodes with `replace == false`,
/// existing content is never overwritten; ownership and mode are still
/// enforced.
pub trait Converger {
    /// Makes the real state of `node` match its attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be applied.
    fn converge_node(&mut self, node: &ResourceNode) -> Result<Change>;

    /// Called once per pass before any node is applied.
    ///
    /// Engines that copy source trees use it to learn which paths are
    /// owned by their own nodes and must not be seeded from a source.
    fn prepare(&mut self, _graph: &ResourceGraph) {}

    /// Whether an externally provided reference is satisfied.
    fn external_ready(&self, _reference: &ResourceRef) -> bool {
        true
    }
}

/// Result of one convergence pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergeReport {
    /// Every node in the order it was applied, with its outcome.
    pub changes: Vec<(ResourceRef, Change)>,
}

impl ConvergeReport {
    /// Nodes whose state was altered.
    pub fn changed(&self) -> impl Iterator<Item = &(ResourceRef, Change)> {
        self.changes.iter().filter(|(_, c)| *c != Change::Unchanged)
    }

    /// Returns `true` if the pass altered nothing.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.changed().next().is_none()
    }
}

/// Applies `graph` through `converger`, dependencies first (dependents
/// first when the graph is absent).
///
/// # Errors
///
/// Returns `ProvisionError::Graph` if the graph is cyclic or an external
/// dependency is not satisfied, or the first error from `converger`.
pub fn converge<C: Converger + ?Sized>(
    graph: &ResourceGraph,
    converger: &mut C,
) -> Result<ConvergeReport> {
    let order = graph.apply_order()?;
    if graph.ensure() == Ensure::Present {
        if let Some(missing) = graph.external().find(|r| !converger.external_ready(r)) {
            return Err(ProvisionError::graph(
                missing.title(),
                format!("external dependency {missing} is not satisfied"),
            ));
        }
    }

    converger.prepare(graph);
    let mut report = ConvergeReport::default();
    for node in order {
        let change = converger.converge_node(node)?;
        if change != Change::Unchanged {
            tracing::info!(node = %node.id, %change, "converged resource");
        }
        report.changes.push((node.id.clone(), change));
    }
    Ok(report)
}

/// What occupies a path on a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File {
        /// File content.
        content: String,
    },
    /// A directory.
    Directory,
    /// A symbolic link.
    Symlink {
        /// Link target.
        target: PathBuf,
    },
}

/// A filesystem entry on a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry type and payload.
    pub kind: EntryKind,
    /// Owning user.
    pub owner: Option<String>,
    /// Owning group.
    pub group: Option<String>,
    /// Permission bits.
    pub mode: Option<Mode>,
}

/// Run state of a service on a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Whether the service is running.
    pub state: ServiceState,
    /// Whether the service starts at boot.
    pub enabled: bool,
}

/// An in-memory host implementing the convergence contract.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    entries: BTreeMap<PathBuf, Entry>,
    services: BTreeMap<String, ServiceStatus>,
    sources: BTreeMap<String, BTreeMap<PathBuf, String>>,
    packages: Option<BTreeSet<String>>,
    managed: BTreeSet<PathBuf>,
}

impl MemoryHost {
    /// Creates an empty host on which every package counts as installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source tree of `(relative path, content)` files.
    #[must_use]
    pub fn with_source<I, P, S>(mut self, uri: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let tree = files
            .into_iter()
            .map(|(p, s)| (p.into(), s.into()))
            .collect();
        let _ = self.sources.insert(uri.into(), tree);
        self
    }

    /// Tracks installed packages; only those named here count as installed.
    #[must_use]
    pub fn with_package(mut self, name: impl Into<String>) -> Self {
        let _ = self
            .packages
            .get_or_insert_with(BTreeSet::new)
            .insert(name.into());
        self
    }

    /// Returns the entry at `path`.
    #[must_use]
    pub fn entry(&self, path: &Path) -> Option<&Entry> {
        self.entries.get(path)
    }

    /// Returns the status of service `name`.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<ServiceStatus> {
        self.services.get(name).copied()
    }

    /// Overwrites a file's content out of band, as an operator would.
    pub fn write_file(&mut self, path: &Path, content: impl Into<String>) {
        let kind = EntryKind::File {
            content: content.into(),
        };
        match self.entries.get_mut(path) {
            Some(entry) => entry.kind = kind,
            None => {
                let _ = self.entries.insert(
                    path.to_path_buf(),
                    Entry {
                        kind,
                        owner: None,
                        group: None,
                        mode: None,
                    },
                );
            }
        }
    }

    /// Every path present on the host.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    fn ensure_entry(&mut self, path: &Path, node: &ResourceNode) -> Result<Change> {
        let attrs = &node.attributes;
        let desired = desired_kind(node)?;
        let mut changed: Vec<&'static str> = Vec::new();

        let created = match self.entries.get_mut(path) {
            None => {
                let _ = self.entries.insert(
                    path.to_path_buf(),
                    Entry {
                        kind: desired,
                        owner: attrs.owner.clone(),
                        group: attrs.group.clone(),
                        mode: attrs.mode,
                    },
                );
                true
            }
            Some(entry) => {
                if entry.kind != desired && attrs.replace && owns_content(node, &entry.kind) {
                    entry.kind = desired;
                    changed.push(property_name(node.kind));
                }
                enforce_metadata(entry, attrs, &mut changed);
                false
            }
        };

        if attrs.recurse {
            if let Some(source) = attrs.source.as_deref() {
                if self.copy_tree(path, source, attrs) && !created {
                    changed.push("content");
                }
            }
        }

        Ok(if created {
            Change::Created
        } else if changed.is_empty() {
            Change::Unchanged
        } else {
            changed.dedup();
            Change::Updated(changed)
        })
    }

    /// Copies the registered source tree below `root`. Returns `true` if
    /// anything was written or purged.
    fn copy_tree(&mut self, root: &Path, source: &str, attrs: &Attributes) -> bool {
        let Some(files) = self.sources.get(source).cloned() else {
            tracing::warn!(source, "no source tree registered, nothing copied");
            return false;
        };
        let dir_mode = attrs
            .mode
            .map(|m| Mode::new(m.bits() | ((m.bits() & 0o444) >> 2)));
        let mut wrote = false;
        let mut listed: BTreeSet<PathBuf> = BTreeSet::new();

        for (relative, content) in files {
            let dest = root.join(&relative);
            if self.managed.contains(&dest) {
                tracing::debug!(path = %dest.display(), "skipping source entry managed by its own node");
                continue;
            }
            for dir in dest.ancestors().skip(1) {
                if dir == root || !dir.starts_with(root) {
                    break;
                }
                let _ = listed.insert(dir.to_path_buf());
                if !self.managed.contains(dir) && !self.entries.contains_key(dir) {
                    let _ = self.entries.insert(
                        dir.to_path_buf(),
                        Entry {
                            kind: EntryKind::Directory,
                            owner: attrs.owner.clone(),
                            group: attrs.group.clone(),
                            mode: dir_mode,
                        },
                    );
                    wrote = true;
                }
            }

            let kind = EntryKind::File { content };
            match self.entries.get_mut(&dest) {
                None => {
                    let _ = self.entries.insert(
                        dest.clone(),
                        Entry {
                            kind,
                            owner: attrs.owner.clone(),
                            group: attrs.group.clone(),
                            mode: attrs.mode,
                        },
                    );
                    wrote = true;
                }
                Some(entry) if attrs.replace && entry.kind != kind => {
                    entry.kind = kind;
                    wrote = true;
                }
                Some(_) => {}
            }
            let _ = listed.insert(dest);
        }

        // Purging keeps listed entries and anything another node manages.
        if attrs.purge {
            let before = self.entries.len();
            let managed = &self.managed;
            self.entries.retain(|p, _| {
                !p.starts_with(root)
                    || p == root
                    || listed.contains(p)
                    || managed.iter().any(|m| p.starts_with(m))
            });
            wrote |= self.entries.len() != before;
        }
        wrote
    }

    fn remove(&mut self, path: &Path) -> Change {
        let before = self.entries.len();
        self.entries.retain(|p, _| !p.starts_with(path));
        if self.entries.len() == before {
            Change::Unchanged
        } else {
            Change::Removed
        }
    }

    fn ensure_service(&mut self, name: &str, attrs: &Attributes) -> Change {
        if attrs.ensure == Ensure::Absent {
            return if self.services.remove(name).is_some() {
                Change::Removed
            } else {
                Change::Unchanged
            };
        }
        let desired = ServiceStatus {
            state: attrs.service_state.unwrap_or(ServiceState::Running),
            enabled: attrs.enable.unwrap_or(true),
        };
        match self.services.get_mut(name) {
            None => {
                let _ = self.services.insert(name.to_string(), desired);
                Change::Created
            }
            Some(status) if *status == desired => Change::Unchanged,
            Some(status) => {
                let mut changed = Vec::new();
                if status.state != desired.state {
                    changed.push("state");
                }
                if status.enabled != desired.enabled {
                    changed.push("enable");
                }
                *status = desired;
                Change::Updated(changed)
            }
        }
    }
}

impl Converger for MemoryHost {
    fn prepare(&mut self, graph: &ResourceGraph) {
        self.managed = graph
            .nodes()
            .filter_map(|node| match &node.id {
                ResourceRef::File(path) => Some(path.clone()),
                ResourceRef::Service(_) | ResourceRef::Package(_) => None,
            })
            .collect();
    }

    fn converge_node(&mut self, node: &ResourceNode) -> Result<Change> {
        match &node.id {
            ResourceRef::File(path) => match node.attributes.ensure {
                Ensure::Absent => Ok(self.remove(path)),
                Ensure::Present => self.ensure_entry(path, node),
            },
            ResourceRef::Service(name) => Ok(self.ensure_service(name, &node.attributes)),
            ResourceRef::Package(name) => Err(ProvisionError::graph(
                name.as_str(),
                "packages are provided by an external collaborator",
            )),
        }
    }

    fn external_ready(&self, reference: &ResourceRef) -> bool {
        match (reference, &self.packages) {
            (ResourceRef::Package(name), Some(installed)) => installed.contains(name),
            _ => true,
        }
    }
}

fn desired_kind(node: &ResourceNode) -> Result<EntryKind> {
    match node.kind {
        ResourceKind::Directory => Ok(EntryKind::Directory),
        ResourceKind::Symlink => node
            .attributes
            .target
            .clone()
            .map(|target| EntryKind::Symlink { target })
            .ok_or_else(|| ProvisionError::graph(node.id.title(), "symlink has no target")),
        ResourceKind::File | ResourceKind::TemplatedFile => Ok(EntryKind::File {
            content: node.attributes.content.clone().unwrap_or_default(),
        }),
        ResourceKind::Service => Err(ProvisionError::graph(
            node.id.title(),
            "service node carries a path identity",
        )),
    }
}

/// A plain file node without `content` only manages metadata once the file
/// exists.
fn owns_content(node: &ResourceNode, existing: &EntryKind) -> bool {
    !(node.kind == ResourceKind::File
        && node.attributes.content.is_none()
        && matches!(existing, EntryKind::File { .. }))
}

const fn property_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Symlink => "target",
        ResourceKind::Directory => "type",
        ResourceKind::File | ResourceKind::TemplatedFile | ResourceKind::Service => "content",
    }
}

fn enforce_metadata(entry: &mut Entry, attrs: &Attributes, changed: &mut Vec<&'static str>) {
    if attrs.owner.is_some() && entry.owner != attrs.owner {
        entry.owner.clone_from(&attrs.owner);
        changed.push("owner");
    }
    if attrs.group.is_some() && entry.group != attrs.group {
        entry.group.clone_from(&attrs.group);
        changed.push("group");
    }
    if attrs.mode.is_some() && entry.mode != attrs.mode {
        entry.mode = attrs.mode;
        changed.push("mode");
    }
}
