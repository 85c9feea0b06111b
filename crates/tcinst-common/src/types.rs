//! Domain primitive types used across the tcinst workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

/// A validated TCP port in `1..=65535`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16")]
pub struct Port(u16);

impl Port {
    /// Creates a port from a raw number.
    ///
    /// Returns `None` for port zero.
    #[must_use]
    pub const fn new(port: u16) -> Option<Self> {
        if port == 0 { None } else { Some(Self(port)) }
    }

    /// Returns the numeric port.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Port {
    type Error = ProvisionError;

    fn try_from(port: u16) -> Result<Self> {
        Self::new(port).ok_or_else(|| ProvisionError::validation("port", "port must not be 0"))
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A port as supplied by a caller: either a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    /// Integer form, e.g. `8080`.
    Number(i64),
    /// String form, e.g. `"8080"`.
    Text(String),
}

impl PortValue {
    /// Validates the raw value into a [`Port`].
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Validation` naming `parameter` if the value
    /// is not an integer in `1..=65535`.
    pub fn to_port(&self, parameter: &'static str) -> Result<Port> {
        let number = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                ProvisionError::validation(
                    parameter,
                    format!("{parameter} must be a positive integer, got \"{s}\""),
                )
            })?,
        };
        u16::try_from(number)
            .ok()
            .and_then(Port::new)
            .ok_or_else(|| {
                ProvisionError::validation(
                    parameter,
                    format!("{parameter} must be between 1 and 65535, got {number}"),
                )
            })
    }
}

impl From<u16> for PortValue {
    fn from(port: u16) -> Self {
        Self::Number(i64::from(port))
    }
}

impl From<&str> for PortValue {
    fn from(port: &str) -> Self {
        Self::Text(port.to_string())
    }
}

/// Unix permission bits, displayed as four octal digits (`2775`, `0444`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mode(u32);

impl Mode {
    /// Creates a mode from raw permission bits.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits & 0o7777)
    }

    /// Returns the raw permission bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl Serialize for Mode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        u32::from_str_radix(&text, 8)
            .map(Self::new)
            .map_err(serde::de::Error::custom)
    }
}

/// Whether a resource should exist after convergence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// The resource must exist.
    #[default]
    Present,
    /// The resource must be removed.
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Desired run state of a managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// The service is started.
    Running,
    /// The service is stopped.
    Stopped,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
