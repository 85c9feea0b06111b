//! Filesystem layout of one instance.
//!
//! Every path is a pure function of the instance name, the account, and
//! the fixed roots in [`ProvisionConfig`]. Ownership is not decided here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tcinst_common::config::ProvisionConfig;

use crate::params::ResolvedInstance;

/// All paths managed or referenced for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSet {
    /// `<sysconfig_dir>/<service>`
    pub sysconfig_file: PathBuf,
    /// `<init_dir>/<service>`
    pub init_link: PathBuf,
    /// `<init_dir>/<prefix>`, the shared init script.
    pub init_target: PathBuf,
    /// `<home_root>/<account>/<service>`
    pub home: PathBuf,
    /// `home/conf`, seeded from the shared template tree.
    pub conf_dir: PathBuf,
    /// `home/conf/Catalina`
    pub catalina_dir: PathBuf,
    /// `home/conf/server.xml`
    pub config_file: PathBuf,
    /// `home/webapps`
    pub webapps_dir: PathBuf,
    /// `home/lib`
    pub lib_dir: PathBuf,
    /// `home/logs`, linked to [`PathSet::log_dir`].
    pub logs_link: PathBuf,
    /// `home/bin`, linked to [`PathSet::shared_bin_dir`].
    pub bin_link: PathBuf,
    /// `home/temp`, linked to [`PathSet::cache_temp_dir`].
    pub temp_link: PathBuf,
    /// `home/work`, linked to [`PathSet::cache_work_dir`].
    pub work_link: PathBuf,
    /// `<log_root>/<service>`
    pub log_dir: PathBuf,
    /// `<cache_root>/<service>`
    pub cache_dir: PathBuf,
    /// `cache/work`
    pub cache_work_dir: PathBuf,
    /// `cache/temp`
    pub cache_temp_dir: PathBuf,
    /// Shared binary directory of the base installation. Not managed.
    pub shared_bin_dir: PathBuf,
    /// Base installation directory. Not managed.
    pub catalina_home: PathBuf,
    /// `<run_dir>/<service>.pid`. Not managed.
    pub pid_file: PathBuf,
}

/// Derives the layout of `resolved` under the roots of `config`.
#[must_use]
pub fn derive_paths(resolved: &ResolvedInstance, config: &ProvisionConfig) -> PathSet {
    let service = resolved.service_name.as_str();
    let home = config.home_root.join(&resolved.account).join(service);
    let conf_dir = home.join("conf");
    let log_dir = config.log_root.join(service);
    let cache_dir = config.cache_root.join(service);

    PathSet {
        sysconfig_file: config.sysconfig_dir.join(service),
        init_link: config.init_dir.join(service),
        init_target: config.init_dir.join(&config.app_prefix),
        catalina_dir: conf_dir.join("Catalina"),
        config_file: conf_dir.join("server.xml"),
        conf_dir,
        webapps_dir: home.join("webapps"),
        lib_dir: home.join("lib"),
        logs_link: home.join("logs"),
        bin_link: home.join("bin"),
        temp_link: home.join("temp"),
        work_link: home.join("work"),
        cache_work_dir: cache_dir.join("work"),
        cache_temp_dir: cache_dir.join("temp"),
        shared_bin_dir: config.shared_bin_dir.clone(),
        catalina_home: config.catalina_home.clone(),
        pid_file: config.run_dir.join(format!("{service}.pid")),
        home,
        log_dir,
        cache_dir,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::params::{InstanceParameters, resolve};

    fn paths_for(name: &str, account: &str) -> PathSet {
        let config = ProvisionConfig::default();
        let raw = InstanceParameters::new(name).account(account);
        let resolved = resolve(&raw, &config).expect("should resolve");
        derive_paths(&resolved, &config)
    }

    #[test]
    fn layout_matches_fixed_rules() {
        let p = paths_for("someapp", "someapp_account");
        assert_eq!(p.sysconfig_file, Path::new("/etc/sysconfig/tomcat6-someapp"));
        assert_eq!(p.init_link, Path::new("/etc/init.d/tomcat6-someapp"));
        assert_eq!(p.init_target, Path::new("/etc/init.d/tomcat6"));
        assert_eq!(p.home, Path::new("/home/someapp_account/tomcat6-someapp"));
        assert_eq!(
            p.catalina_dir,
            Path::new("/home/someapp_account/tomcat6-someapp/conf/Catalina")
        );
        assert_eq!(
            p.config_file,
            Path::new("/home/someapp_account/tomcat6-someapp/conf/server.xml")
        );
        assert_eq!(p.webapps_dir, Path::new("/home/someapp_account/tomcat6-someapp/webapps"));
        assert_eq!(p.lib_dir, Path::new("/home/someapp_account/tomcat6-someapp/lib"));
        assert_eq!(p.log_dir, Path::new("/var/log/tomcat6-someapp"));
        assert_eq!(p.cache_dir, Path::new("/var/cache/tomcat6-someapp"));
        assert_eq!(p.cache_work_dir, Path::new("/var/cache/tomcat6-someapp/work"));
        assert_eq!(p.cache_temp_dir, Path::new("/var/cache/tomcat6-someapp/temp"));
        assert_eq!(p.bin_link, Path::new("/home/someapp_account/tomcat6-someapp/bin"));
        assert_eq!(p.shared_bin_dir, Path::new("/usr/share/tomcat6/bin"));
    }

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(paths_for("someapp", "acct"), paths_for("someapp", "acct"));
    }

    #[test]
    fn distinct_names_produce_disjoint_instance_trees() {
        let a = paths_for("alpha", "acct");
        let b = paths_for("beta", "acct");
        assert!(!a.home.starts_with(&b.home));
        assert_ne!(a.log_dir, b.log_dir);
        assert_ne!(a.cache_dir, b.cache_dir);
        assert_ne!(a.sysconfig_file, b.sysconfig_file);
    }

    #[test]
    fn home_owner_does_not_move_home() {
        let config = ProvisionConfig::default();
        let raw = InstanceParameters::new("someapp")
            .account("someapp_acct")
            .home_owner("content_acct");
        let resolved = resolve(&raw, &config).expect("should resolve");
        let p = derive_paths(&resolved, &config);
        assert_eq!(p.home, Path::new("/home/someapp_acct/tomcat6-someapp"));
    }
}
