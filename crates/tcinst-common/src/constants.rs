//! Defaults table and fixed filesystem roots.

/// Application prefix joined to the instance name to form the service name.
pub const DEFAULT_APP_PREFIX: &str = "tomcat6";

/// Root under which account home directories live.
pub const DEFAULT_HOME_ROOT: &str = "/home";
/// Root for per-instance log directories.
pub const DEFAULT_LOG_ROOT: &str = "/var/log";
/// Root for per-instance cache directories.
pub const DEFAULT_CACHE_ROOT: &str = "/var/cache";
/// Directory holding per-service environment files.
pub const DEFAULT_SYSCONFIG_DIR: &str = "/etc/sysconfig";
/// Directory holding init scripts.
pub const DEFAULT_INIT_DIR: &str = "/etc/init.d";
/// Base installation of the server software.
pub const DEFAULT_CATALINA_HOME: &str = "/usr/share/tomcat6";
/// Shared binary directory of the base installation.
pub const DEFAULT_SHARED_BIN_DIR: &str = "/usr/share/tomcat6/bin";
/// Source the initial `conf` tree is copied from.
pub const DEFAULT_CONF_SOURCE: &str = "puppet:///modules/tomcat6/app-home/";
/// Package that installs the base server and the shared init script.
pub const DEFAULT_BASE_PACKAGE: &str = "tomcat6";
/// Directory holding service pid files.
pub const DEFAULT_RUN_DIR: &str = "/var/run";

/// Default AJP connector port.
pub const DEFAULT_AJP_PORT: u16 = 8011;
/// Default HTTP connector port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;
/// Default redirect (TLS) port.
pub const DEFAULT_REDIRECT_PORT: u16 = 8443;
/// Default shutdown listener port.
pub const DEFAULT_SHUTDOWN_PORT: u16 = 8005;

/// Mode of every managed directory and home link (setgid, group-writable).
pub const DIRECTORY_MODE: u32 = 0o2775;
/// Mode of the read-only sysconfig file.
pub const SYSCONFIG_MODE: u32 = 0o444;
/// Mode of the rendered server descriptor and the `conf` tree.
pub const CONFIG_FILE_MODE: u32 = 0o644;

/// Owner and group of system-level files (sysconfig, init link).
pub const ROOT_ACCOUNT: &str = "root";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "tcinst";
