//! Server descriptor and sysconfig rendering.
//!
//! A [`ServerTemplate`] is parsed once into literal text and typed
//! [`Slot`]s. Parsing rejects templates that lack one of the four port
//! slots or name an unknown one, so [`ServerTemplate::render`] itself
//! cannot fail.

use std::fmt;
use std::path::Path;

use tcinst_common::error::{ProvisionError, Result};

use crate::params::{Ports, ResolvedInstance};
use crate::paths::PathSet;

const BUILTIN_SERVER_XML: &str = include_str!("../templates/server.xml");

const SLOT_OPEN: &str = "{{";
const SLOT_CLOSE: &str = "}}";

/// A substitution point in the server descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `<Server port=...>` shutdown listener.
    ShutdownPort,
    /// Primary HTTP connector port.
    HttpPort,
    /// Redirect port of both connectors.
    RedirectPort,
    /// Secondary AJP connector port.
    AjpPort,
}

impl Slot {
    /// Every slot a template must contain.
    pub const ALL: [Self; 4] = [
        Self::ShutdownPort,
        Self::HttpPort,
        Self::RedirectPort,
        Self::AjpPort,
    ];

    /// Placeholder name as written between `{{` and `}}`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ShutdownPort => "shutdown_port",
            Self::HttpPort => "http_port",
            Self::RedirectPort => "redirect_port",
            Self::AjpPort => "ajp_port",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    const fn value(self, ports: &Ports) -> tcinst_common::types::Port {
        match self {
            Self::ShutdownPort => ports.shutdown,
            Self::HttpPort => ports.http,
            Self::RedirectPort => ports.redirect,
            Self::AjpPort => ports.ajp,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// A parsed server descriptor template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTemplate {
    segments: Vec<Segment>,
}

impl ServerTemplate {
    /// Parses the template shipped with this crate.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Render` if the bundled template is malformed.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_SERVER_XML)
    }

    /// Reads and parses a template file.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Io` if the file cannot be read, or
    /// `ProvisionError::Render` if it is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading server template");
        let text = std::fs::read_to_string(path).map_err(|source| ProvisionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses template text containing `{{slot}}` placeholders.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Render` if a placeholder is unterminated or
    /// unknown, or if any of the four port slots never appears.
    pub fn parse(text: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find(SLOT_OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + SLOT_OPEN.len()..];
            let end = after_open.find(SLOT_CLOSE).ok_or_else(|| {
                ProvisionError::render(
                    after_open.lines().next().unwrap_or_default().trim(),
                    "unterminated placeholder",
                )
            })?;
            let name = after_open[..end].trim();
            let slot = Slot::from_name(name)
                .ok_or_else(|| ProvisionError::render(name, "unknown placeholder"))?;
            segments.push(Segment::Slot(slot));
            rest = &after_open[end + SLOT_CLOSE.len()..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        for slot in Slot::ALL {
            if !segments.contains(&Segment::Slot(slot)) {
                return Err(ProvisionError::render(
                    slot.name(),
                    "slot missing from template",
                ));
            }
        }
        Ok(Self { segments })
    }

    /// Substitutes `ports` into every slot.
    #[must_use]
    pub fn render(&self, ports: &Ports) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(&slot.value(ports).to_string()),
            }
        }
        out
    }
}

/// Renders the per-service environment file read by the shared init script.
#[must_use]
pub fn render_sysconfig(resolved: &ResolvedInstance, paths: &PathSet) -> String {
    format!(
        "# Service-specific configuration for {service}\n\
         CATALINA_BASE=\"{base}\"\n\
         CATALINA_HOME=\"{home}\"\n\
         CATALINA_TMPDIR=\"{tmp}\"\n\
         CATALINA_PID=\"{pid}\"\n\
         TOMCAT_USER=\"{user}\"\n\
         TOMCAT_LOG=\"{log}\"\n",
        service = resolved.service_name,
        base = paths.home.display(),
        home = paths.catalina_home.display(),
        tmp = paths.cache_temp_dir.display(),
        pid = paths.pid_file.display(),
        user = resolved.account,
        log = paths.log_dir.join("catalina.out").display(),
    )
}
