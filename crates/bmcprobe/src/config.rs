//! Configuration loading
//!
//! Settings come from three layers, lowest precedence first: a TOML file,
//! environment variables and command-line flags. Clap already merges the last
//! two (every global flag has an `env` fallback), so this module only has to
//! lay the file underneath.
//!
//! ```toml
//! debug = true
//!
//! [controller]
//! host = "10.0.0.5"
//! user = "root"
//! password = "calvin"
//! port = 443
//! scheme = "https"
//! timeout = 30
//!
//! [store]
//! path = "inventory.db"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bmcprobe_core::model::{Controller, DEFAULT_PORT, DEFAULT_SCHEME};
use serde::Deserialize;

use crate::prelude::*;

/// Config file read when `--config` is not given. Its absence is not an error.
pub const DEFAULT_CONFIG_FILE: &str = "bmcprobe.toml";

/// Inventory database used when none is configured.
pub const DEFAULT_DB_FILE: &str = "bmcprobe.db";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub debug: bool,
    pub controller: ControllerSection,
    pub store: StoreSection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerSection {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<String>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub path: Option<PathBuf>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| eyre!("Invalid configuration: {}", e))
    }

    /// Load `path`, or the default file when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(path)
            .with_context(|| f!("Can't open {} for reading", path.display()))?;

        Self::parse(&text).with_context(|| f!("Failed to load {}", path.display()))
    }
}

/// Effective settings after merging every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub debug: bool,
    pub verbose: bool,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: u16,
    pub scheme: String,
    pub timeout: Option<Duration>,
    pub db_path: PathBuf,
}

impl Settings {
    /// Read the config file named by `global` (if any) and merge it.
    pub fn load(global: &crate::Global) -> Result<Self> {
        let file = FileConfig::load(global.config.as_deref())?;
        Ok(Self::merge(file, global))
    }

    /// Merge a parsed file with flags and environment, the latter winning.
    pub fn merge(file: FileConfig, global: &crate::Global) -> Self {
        let FileConfig {
            debug,
            controller,
            store,
        } = file;

        Self {
            debug,
            verbose: global.verbose,
            host: global.host.clone().or(controller.host),
            user: global.user.clone().or(controller.user),
            password: global.password.clone().or(controller.password),
            port: global.port.or(controller.port).unwrap_or(DEFAULT_PORT),
            scheme: global
                .scheme
                .clone()
                .or(controller.scheme)
                .unwrap_or_else(|| DEFAULT_SCHEME.to_string()),
            timeout: global
                .timeout
                .or(controller.timeout)
                .map(Duration::from_secs),
            db_path: global
                .db
                .clone()
                .or(store.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE)),
        }
    }

    /// Build the controller handle, failing when a connection detail is missing.
    pub fn controller(&self) -> Result<Controller> {
        let host = required(&self.host, "host", "BMC_HOST")?;
        let user = required(&self.user, "user", "BMC_USER")?;
        let password = required(&self.password, "password", "BMC_PASSWORD")?;

        Ok(Controller::new(host, user, password)
            .with_port(self.port)
            .with_scheme(self.scheme.clone()))
    }
}

fn required(value: &Option<String>, name: &str, env: &str) -> Result<String> {
    match value.as_deref() {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(Error::Config(f!(
            "controller {name} not set (use --{name}, {env} or [controller] {name})"
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn global() -> crate::Global {
        crate::Global {
            config: None,
            host: None,
            user: None,
            password: None,
            port: None,
            scheme: None,
            timeout: None,
            db: None,
            verbose: false,
        }
    }

    const FULL: &str = r#"
debug = true

[controller]
host = "10.0.0.5"
user = "root"
password = "calvin"
port = 8443
scheme = "http"
timeout = 30

[store]
path = "/var/lib/bmcprobe/inventory.db"
"#;

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::parse(FULL).unwrap();

        assert!(config.debug);
        assert_eq!(config.controller.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.controller.port, Some(8443));
        assert_eq!(config.controller.timeout, Some(30));
        assert_eq!(
            config.store.path,
            Some(PathBuf::from("/var/lib/bmcprobe/inventory.db"))
        );
    }

    #[test]
    fn test_parse_empty_file() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(FileConfig::parse("[controller]\nhostname = \"x\"\n").is_err());
    }

    #[test]
    fn test_merge_defaults() {
        let settings = Settings::merge(FileConfig::default(), &global());

        assert!(!settings.debug);
        assert_eq!(settings.port, 443);
        assert_eq!(settings.scheme, "https");
        assert_eq!(settings.timeout, None);
        assert_eq!(settings.db_path, PathBuf::from(DEFAULT_DB_FILE));
    }

    #[test]
    fn test_merge_flags_override_file() {
        // Arrange
        let file = FileConfig::parse(FULL).unwrap();
        let mut global = global();
        global.host = Some("bmc.example.com".to_string());
        global.port = Some(443);
        global.verbose = true;

        // Act
        let settings = Settings::merge(file, &global);

        // Assert: flags win, the file fills the rest
        assert_eq!(settings.host.as_deref(), Some("bmc.example.com"));
        assert_eq!(settings.port, 443);
        assert_eq!(settings.user.as_deref(), Some("root"));
        assert_eq!(settings.scheme, "http");
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
        assert!(settings.verbose);
        assert!(settings.debug);
    }

    #[test]
    fn test_controller_from_settings() {
        let settings = Settings::merge(FileConfig::parse(FULL).unwrap(), &global());

        let controller = settings.controller().unwrap();

        assert_eq!(controller.base_url(), "http://10.0.0.5:8443/redfish/v1/");
        assert_eq!(controller.to_string(), "root@10.0.0.5:8443/c****n");
    }

    #[test]
    fn test_controller_requires_credentials() {
        let mut global = global();
        global.host = Some("10.0.0.5".to_string());
        global.user = Some("root".to_string());
        let settings = Settings::merge(FileConfig::default(), &global);

        let err = settings.controller().unwrap_err();

        assert!(err.to_string().contains("BMC_PASSWORD"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[controller]\nhost = \"192.168.0.120\"\n").unwrap();

        let config = FileConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.controller.host.as_deref(), Some("192.168.0.120"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        let err = FileConfig::load(Some(&missing)).unwrap_err();

        assert!(err.to_string().contains("Can't open"));
    }
}
