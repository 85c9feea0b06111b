//! Host layout configuration for the resource-graph compiler.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{ProvisionError, Result};

/// Fixed roots and shared locations every instance is derived under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Prefix joined to the instance name: `<app_prefix>-<name>`.
    pub app_prefix: String,
    /// Root of account home directories.
    pub home_root: PathBuf,
    /// Root of per-instance log directories.
    pub log_root: PathBuf,
    /// Root of per-instance cache directories.
    pub cache_root: PathBuf,
    /// Directory of per-service environment files.
    pub sysconfig_dir: PathBuf,
    /// Directory of init scripts.
    pub init_dir: PathBuf,
    /// Base installation of the server software.
    pub catalina_home: PathBuf,
    /// Shared binary directory linked into every instance home.
    pub shared_bin_dir: PathBuf,
    /// Directory of service pid files.
    pub run_dir: PathBuf,
    /// Source URI of the initial `conf` tree.
    pub conf_source: String,
    /// Package that installs the base server; the init link requires it.
    pub base_package: String,
    /// Optional replacement for the built-in server descriptor template.
    pub server_template: Option<PathBuf>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            app_prefix: constants::DEFAULT_APP_PREFIX.to_string(),
            home_root: PathBuf::from(constants::DEFAULT_HOME_ROOT),
            log_root: PathBuf::from(constants::DEFAULT_LOG_ROOT),
            cache_root: PathBuf::from(constants::DEFAULT_CACHE_ROOT),
            sysconfig_dir: PathBuf::from(constants::DEFAULT_SYSCONFIG_DIR),
            init_dir: PathBuf::from(constants::DEFAULT_INIT_DIR),
            catalina_home: PathBuf::from(constants::DEFAULT_CATALINA_HOME),
            shared_bin_dir: PathBuf::from(constants::DEFAULT_SHARED_BIN_DIR),
            run_dir: PathBuf::from(constants::DEFAULT_RUN_DIR),
            conf_source: constants::DEFAULT_CONF_SOURCE.to_string(),
            base_package: constants::DEFAULT_BASE_PACKAGE.to_string(),
            server_template: None,
        }
    }
}

impl ProvisionConfig {
    /// Loads a YAML configuration file; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`ProvisionConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading provision config");
        let text = std::fs::read_to_string(path).map_err(|source| ProvisionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the prefix is usable and every root is absolute.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Validation` naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.app_prefix.is_empty() || self.app_prefix.contains('/') {
            return Err(ProvisionError::validation(
                "app_prefix",
                "app_prefix must be non-empty and contain no '/'",
            ));
        }
        let roots: [(&'static str, &Path); 8] = [
            ("home_root", &self.home_root),
            ("log_root", &self.log_root),
            ("cache_root", &self.cache_root),
            ("sysconfig_dir", &self.sysconfig_dir),
            ("init_dir", &self.init_dir),
            ("catalina_home", &self.catalina_home),
            ("shared_bin_dir", &self.shared_bin_dir),
            ("run_dir", &self.run_dir),
        ];
        for (key, root) in roots {
            if !root.is_absolute() {
                return Err(ProvisionError::validation(
                    key,
                    format!("{key} must be an absolute path, got {}", root.display()),
                ));
            }
        }
        Ok(())
    }
}
