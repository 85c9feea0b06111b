//! Declarative resource nodes and their identities.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tcinst_common::error::ProvisionError;
use tcinst_common::types::{Ensure, Mode, ServiceState};

/// Identity of a resource, rendered as `Kind[title]`.
///
/// `File` covers every filesystem entry (file, directory or link) so that
/// two claims on one path collide regardless of their kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceRef {
    /// A filesystem path.
    File(PathBuf),
    /// A managed service, by logical name.
    Service(String),
    /// A package installed by an external collaborator.
    Package(String),
}

impl ResourceRef {
    /// Reference to the filesystem entry at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Returns the path of a `File` reference.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(p) => Some(p),
            Self::Service(_) | Self::Package(_) => None,
        }
    }

    /// The path or logical name, without the kind.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::File(p) => p.display().to_string(),
            Self::Service(n) | Self::Package(n) => n.clone(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "File[{}]", p.display()),
            Self::Service(n) => write!(f, "Service[{n}]"),
            Self::Package(n) => write!(f, "Package[{n}]"),
        }
    }
}

impl FromStr for ResourceRef {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProvisionError::graph(s, "malformed resource reference");
        let (kind, rest) = s.split_once('[').ok_or_else(invalid)?;
        let title = rest.strip_suffix(']').ok_or_else(invalid)?;
        if title.is_empty() {
            return Err(invalid());
        }
        match kind {
            "File" => Ok(Self::File(PathBuf::from(title))),
            "Service" => Ok(Self::Service(title.to_string())),
            "Package" => Ok(Self::Package(title.to_string())),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for ResourceRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// What sort of entry a node manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A plain file whose content belongs to the host once it exists.
    File,
    /// A directory, optionally populated recursively from a source.
    Directory,
    /// A symbolic link.
    Symlink,
    /// A file whose content is rendered by the compiler.
    TemplatedFile,
    /// A managed system service.
    Service,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::TemplatedFile => "templated file",
            Self::Service => "service",
        };
        f.write_str(s)
    }
}

/// Desired state attributes of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attributes {
    /// Whether the entry should exist.
    pub ensure: Ensure,
    /// Owning user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Owning group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Permission bits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Link target, for symlinks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    /// Literal content, for templated files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Source URI the content is copied from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Whether existing content may be overwritten.
    pub replace: bool,
    /// Whether unmanaged entries below a directory are removed.
    pub purge: bool,
    /// Whether the source is copied recursively.
    pub recurse: bool,
    /// Desired run state, for services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_state: Option<ServiceState>,
    /// Start at boot, for services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            ensure: Ensure::Present,
            owner: None,
            group: None,
            mode: None,
            target: None,
            content: None,
            source: None,
            replace: true,
            purge: false,
            recurse: false,
            service_state: None,
            enable: None,
        }
    }
}

/// One declarative unit of desired state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Unique identity.
    pub id: ResourceRef,
    /// Entry kind.
    pub kind: ResourceKind,
    /// Desired attributes.
    pub attributes: Attributes,
    /// Resources that must converge before this one.
    pub requires: BTreeSet<ResourceRef>,
}

impl ResourceNode {
    fn new(id: ResourceRef, kind: ResourceKind) -> Self {
        Self {
            id,
            kind,
            attributes: Attributes::default(),
            requires: BTreeSet::new(),
        }
    }

    /// A directory at `path`.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new(ResourceRef::file(path), ResourceKind::Directory)
    }

    /// A symlink at `path` pointing to `target`.
    pub fn symlink(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        let mut node = Self::new(ResourceRef::file(path), ResourceKind::Symlink);
        node.attributes.target = Some(target.into());
        node
    }

    /// A plain file at `path`. It is created empty when missing; only its
    /// metadata is enforced afterwards.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(ResourceRef::file(path), ResourceKind::File)
    }

    /// A file at `path` with compiler-rendered `content`.
    pub fn templated_file(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let mut node = Self::new(ResourceRef::file(path), ResourceKind::TemplatedFile);
        node.attributes.content = Some(content.into());
        node
    }

    /// A service named `name`, running and enabled.
    pub fn service(name: impl Into<String>) -> Self {
        let mut node = Self::new(ResourceRef::Service(name.into()), ResourceKind::Service);
        node.attributes.service_state = Some(ServiceState::Running);
        node.attributes.enable = Some(true);
        node
    }

    /// Sets owner and group.
    #[must_use]
    pub fn owned_by(mut self, owner: impl Into<String>, group: impl Into<String>) -> Self {
        self.attributes.owner = Some(owner.into());
        self.attributes.group = Some(group.into());
        self
    }

    /// Sets permission bits.
    #[must_use]
    pub const fn mode(mut self, bits: u32) -> Self {
        self.attributes.mode = Some(Mode::new(bits));
        self
    }

    /// Marks existing content as operator-owned: created once, never overwritten.
    #[must_use]
    pub const fn preserve_existing(mut self) -> Self {
        self.attributes.replace = false;
        self
    }

    /// Populates the entry by a recursive copy from `source`.
    #[must_use]
    pub fn recursive_source(mut self, source: impl Into<String>, purge: bool) -> Self {
        self.attributes.source = Some(source.into());
        self.attributes.recurse = true;
        self.attributes.purge = purge;
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn requires(mut self, dependency: ResourceRef) -> Self {
        let _ = self.requires.insert(dependency);
        self
    }

    /// Returns `true` if this node manages a path at or below `root`.
    #[must_use]
    pub fn is_under(&self, root: &Path) -> bool {
        self.id.path().is_some_and(|p| p.starts_with(root))
    }

    /// Flips the node to removal: absent entries, stopped and disabled services.
    pub(crate) fn mark_absent(&mut self) {
        self.attributes.ensure = Ensure::Absent;
        if self.kind == ResourceKind::Service {
            self.attributes.service_state = Some(ServiceState::Stopped);
            self.attributes.enable = Some(false);
        }
    }
}
