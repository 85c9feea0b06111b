//! Instance parameter validation and default resolution.
//!
//! Callers describe an instance with [`InstanceParameters`]; [`resolve`]
//! checks the one mandatory field (`account`), validates identifiers and
//! ports, and fills every optional field from the defaults table.

use serde::{Deserialize, Serialize};
use tcinst_common::config::ProvisionConfig;
use tcinst_common::constants;
use tcinst_common::error::{ProvisionError, Result};
use tcinst_common::types::{Ensure, Port, PortValue};

/// Raw, caller-supplied description of one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceParameters {
    /// Instance name; every path and the service name derive from it.
    pub name: String,
    /// Account owning the instance home tree. Required.
    pub account: Option<String>,
    /// AJP connector port.
    pub ajp_port: Option<PortValue>,
    /// HTTP connector port.
    pub http_port: Option<PortValue>,
    /// Redirect port shared by both connectors.
    pub redirect_port: Option<PortValue>,
    /// Shutdown listener port.
    pub shutdown_port: Option<PortValue>,
    /// Owner of the home, log and cache trees. Defaults to `account`.
    pub home_owner: Option<String>,
    /// Group of the home, log and cache trees. Defaults to `account`.
    pub home_group: Option<String>,
    /// Whether the instance should exist at all.
    pub ensure: Ensure,
}

impl InstanceParameters {
    /// Creates parameters for the named instance with nothing else set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the owning account.
    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Overrides the AJP port.
    #[must_use]
    pub fn ajp_port(mut self, port: impl Into<PortValue>) -> Self {
        self.ajp_port = Some(port.into());
        self
    }

    /// Overrides the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: impl Into<PortValue>) -> Self {
        self.http_port = Some(port.into());
        self
    }

    /// Overrides the redirect port.
    #[must_use]
    pub fn redirect_port(mut self, port: impl Into<PortValue>) -> Self {
        self.redirect_port = Some(port.into());
        self
    }

    /// Overrides the shutdown port.
    #[must_use]
    pub fn shutdown_port(mut self, port: impl Into<PortValue>) -> Self {
        self.shutdown_port = Some(port.into());
        self
    }

    /// Overrides the owner of the instance trees.
    #[must_use]
    pub fn home_owner(mut self, owner: impl Into<String>) -> Self {
        self.home_owner = Some(owner.into());
        self
    }

    /// Overrides the group of the instance trees.
    #[must_use]
    pub fn home_group(mut self, group: impl Into<String>) -> Self {
        self.home_group = Some(group.into());
        self
    }

    /// Sets the desired presence of the instance.
    #[must_use]
    pub const fn ensure(mut self, ensure: Ensure) -> Self {
        self.ensure = ensure;
        self
    }
}

/// The four network ports written into the server descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ports {
    /// AJP 1.3 connector port.
    pub ajp: Port,
    /// HTTP/1.1 connector port.
    pub http: Port,
    /// Port both connectors redirect confidential traffic to.
    pub redirect: Port,
    /// Shutdown command listener port.
    pub shutdown: Port,
}

const DEFAULT_PORTS: Ports = Ports {
    ajp: default_port(constants::DEFAULT_AJP_PORT),
    http: default_port(constants::DEFAULT_HTTP_PORT),
    redirect: default_port(constants::DEFAULT_REDIRECT_PORT),
    shutdown: default_port(constants::DEFAULT_SHUTDOWN_PORT),
};

impl Default for Ports {
    fn default() -> Self {
        DEFAULT_PORTS
    }
}

// Only evaluated in const context, so a zero default fails the build.
#[allow(clippy::panic)]
const fn default_port(port: u16) -> Port {
    match Port::new(port) {
        Some(p) => p,
        None => panic!("default ports are non-zero"),
    }
}

/// Instance parameters after validation and defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedInstance {
    /// Instance name.
    pub name: String,
    /// Account that determines the home path prefix.
    pub account: String,
    /// `<app_prefix>-<name>`: service name and per-instance directory name.
    pub service_name: String,
    /// Resolved connector ports.
    pub ports: Ports,
    /// Owner of every path under home, cache and the log directory.
    pub home_owner: String,
    /// Group of every path under home, cache and the log directory.
    pub home_group: String,
    /// Desired presence of the instance.
    pub ensure: Ensure,
}

/// Validates `raw` and applies defaults.
///
/// # Errors
///
/// Returns `ProvisionError::Validation` when `account` is unset or empty,
/// when an identifier contains `/` or whitespace, or when a port is not
/// an integer in `1..=65535`. No partial result is produced.
pub fn resolve(raw: &InstanceParameters, config: &ProvisionConfig) -> Result<ResolvedInstance> {
    let account = raw
        .account
        .as_deref()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ProvisionError::validation("account", "account must be set"))?;

    check_identifier("name", &raw.name)?;
    check_identifier("account", account)?;

    let home_owner = raw.home_owner.as_deref().unwrap_or(account);
    let home_group = raw.home_group.as_deref().unwrap_or(account);
    check_identifier("home_owner", home_owner)?;
    check_identifier("home_group", home_group)?;

    let defaults = Ports::default();
    let ports = Ports {
        ajp: port_or("ajp_port", raw.ajp_port.as_ref(), defaults.ajp)?,
        http: port_or("http_port", raw.http_port.as_ref(), defaults.http)?,
        redirect: port_or("redirect_port", raw.redirect_port.as_ref(), defaults.redirect)?,
        shutdown: port_or("shutdown_port", raw.shutdown_port.as_ref(), defaults.shutdown)?,
    };
    warn_on_collisions(&raw.name, &ports);

    let resolved = ResolvedInstance {
        name: raw.name.clone(),
        account: account.to_string(),
        service_name: format!("{}-{}", config.app_prefix, raw.name),
        ports,
        home_owner: home_owner.to_string(),
        home_group: home_group.to_string(),
        ensure: raw.ensure,
    };
    tracing::debug!(
        service = %resolved.service_name,
        owner = %resolved.home_owner,
        group = %resolved.home_group,
        "resolved instance parameters"
    );
    Ok(resolved)
}

fn check_identifier(parameter: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ProvisionError::validation(
            parameter,
            format!("{parameter} must be set"),
        ));
    }
    if value == "." || value == ".." {
        return Err(ProvisionError::validation(
            parameter,
            format!("{parameter} must not be \"{value}\""),
        ));
    }
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(ProvisionError::validation(
            parameter,
            format!("{parameter} \"{value}\" must not contain '/' or whitespace"),
        ));
    }
    Ok(())
}

fn port_or(parameter: &'static str, value: Option<&PortValue>, default: Port) -> Result<Port> {
    value.map_or(Ok(default), |v| v.to_port(parameter))
}

fn warn_on_collisions(name: &str, ports: &Ports) {
    let named = [
        ("ajp_port", ports.ajp),
        ("http_port", ports.http),
        ("redirect_port", ports.redirect),
        ("shutdown_port", ports.shutdown),
    ];
    for (i, (first, a)) in named.iter().enumerate() {
        for (second, b) in &named[i + 1..] {
            if a == b {
                tracing::warn!(instance = name, port = %a, first, second, "port collision");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProvisionConfig {
        ProvisionConfig::default()
    }

    #[test]
    fn missing_account_fails() {
        let err = resolve(&InstanceParameters::new("someapp"), &config()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("account must be set"), "got: {msg}");
    }

    #[test]
    fn empty_account_fails() {
        let raw = InstanceParameters::new("someapp").account("");
        let err = resolve(&raw, &config()).unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Validation { parameter: "account", .. }
        ));
    }

    #[test]
    fn defaults_are_applied() {
        let raw = InstanceParameters::new("someapp").account("someapp_account");
        let resolved = resolve(&raw, &config()).expect("should resolve");
        assert_eq!(resolved.service_name, "tomcat6-someapp");
        assert_eq!(resolved.ports, Ports::default());
        assert_eq!(resolved.ports.ajp.get(), 8011);
        assert_eq!(resolved.ports.http.get(), 8080);
        assert_eq!(resolved.ports.redirect.get(), 8443);
        assert_eq!(resolved.ports.shutdown.get(), 8005);
        assert_eq!(resolved.home_owner, "someapp_account");
        assert_eq!(resolved.home_group, "someapp_account");
        assert_eq!(resolved.ensure, Ensure::Present);
    }

    #[test]
    fn string_port_overrides_are_parsed() {
        let raw = InstanceParameters::new("someapp")
            .account("someapp_acct")
            .ajp_port("1111")
            .http_port("2222")
            .redirect_port("3333")
            .shutdown_port("4444");
        let resolved = resolve(&raw, &config()).expect("should resolve");
        assert_eq!(resolved.ports.ajp.get(), 1111);
        assert_eq!(resolved.ports.http.get(), 2222);
        assert_eq!(resolved.ports.redirect.get(), 3333);
        assert_eq!(resolved.ports.shutdown.get(), 4444);
    }

    #[test]
    fn owner_and_group_default_independently() {
        let raw = InstanceParameters::new("someapp")
            .account("someapp_acct")
            .home_owner("content_acct");
        let resolved = resolve(&raw, &config()).expect("should resolve");
        assert_eq!(resolved.home_owner, "content_acct");
        assert_eq!(resolved.home_group, "someapp_acct");

        let raw = InstanceParameters::new("someapp")
            .account("someapp_acct")
            .home_group("content_group");
        let resolved = resolve(&raw, &config()).expect("should resolve");
        assert_eq!(resolved.home_owner, "someapp_acct");
        assert_eq!(resolved.home_group, "content_group");
    }

    #[test]
    fn invalid_port_names_parameter() {
        let raw = InstanceParameters::new("someapp")
            .account("acct")
            .shutdown_port("0");
        let msg = resolve(&raw, &config()).unwrap_err().to_string();
        assert!(msg.contains("shutdown_port"), "got: {msg}");
    }

    #[test]
    fn name_with_slash_is_rejected() {
        let raw = InstanceParameters::new("../etc").account("acct");
        let msg = resolve(&raw, &config()).unwrap_err().to_string();
        assert!(msg.contains("`name`"), "got: {msg}");
    }

    #[test]
    fn empty_name_is_rejected() {
        let raw = InstanceParameters::new("").account("acct");
        assert!(resolve(&raw, &config()).is_err());
    }

    #[test]
    fn colliding_ports_are_accepted() {
        let raw = InstanceParameters::new("someapp")
            .account("acct")
            .ajp_port(8080);
        let resolved = resolve(&raw, &config()).expect("collision is not an error");
        assert_eq!(resolved.ports.ajp, resolved.ports.http);
    }

    #[test]
    fn prefix_comes_from_config() {
        let config = ProvisionConfig {
            app_prefix: "tomcat7".into(),
            ..ProvisionConfig::default()
        };
        let raw = InstanceParameters::new("shop").account("acct");
        let resolved = resolve(&raw, &config).expect("should resolve");
        assert_eq!(resolved.service_name, "tomcat7-shop");
    }

    #[test]
    fn parameters_deserialize_from_yaml() {
        let yaml = "name: someapp\naccount: acct\nhttp_port: 2222\najp_port: \"1111\"\n";
        let raw: InstanceParameters = serde_yaml::from_str(yaml).expect("parse");
        let resolved = resolve(&raw, &config()).expect("should resolve");
        assert_eq!(resolved.ports.http.get(), 2222);
        assert_eq!(resolved.ports.ajp.get(), 1111);
    }
}
