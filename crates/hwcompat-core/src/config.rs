//! Run configuration: what to check against and where the data lives.
//!
//! Defaults mirror the classic tool layout (database and exception list in
//! the working directory, kmod indexes under `./kmod-idx`). A YAML file may
//! override any field and `HWCOMPAT_*` environment variables override both.

use crate::error::ConfigError;
use crate::version::OsVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TARGET_VERSION: OsVersion = OsVersion::major(9);
pub const DEFAULT_DATABASE_PATH: &str = "device_driver_deprecation_data.json";
pub const DEFAULT_EXCEPTIONS_PATH: &str = "device_driver_exceptions.json";
pub const DEFAULT_KMOD_INDEX_DIR: &str = "./kmod-idx";

pub const ENV_TARGET_VERSION: &str = "HWCOMPAT_TARGET_VERSION";
pub const ENV_DATABASE: &str = "HWCOMPAT_DATABASE";
pub const ENV_EXCEPTIONS: &str = "HWCOMPAT_EXCEPTIONS";
pub const ENV_KMOD_INDEX: &str = "HWCOMPAT_KMOD_INDEX";
pub const ENV_SKIP_KMOD: &str = "HWCOMPAT_SKIP_KMOD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// OS version the host is being upgraded to (`-t`)
    pub target_version: OsVersion,
    /// Dump all database entries in the report (`-e`)
    pub show_entries: bool,
    /// Drop reason text from verdicts (`-R`)
    pub hide_reason: bool,
    /// Do not consult kernel module indexes (`-K`)
    pub skip_kmod: bool,
    pub database_path: PathBuf,
    /// Optional glob exception list; a missing file means no exceptions
    pub exceptions_path: Option<PathBuf>,
    pub kmod_index_dir: PathBuf,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            target_version: DEFAULT_TARGET_VERSION,
            show_entries: false,
            hide_reason: false,
            skip_kmod: false,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            exceptions_path: Some(PathBuf::from(DEFAULT_EXCEPTIONS_PATH)),
            kmod_index_dir: PathBuf::from(DEFAULT_KMOD_INDEX_DIR),
        }
    }
}

impl CheckConfig {
    pub fn new(target_version: OsVersion) -> Self {
        Self {
            target_version,
            ..Default::default()
        }
    }

    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(source = %path.display(), target = %config.target_version, "loaded check config");
        Ok(config)
    }

    /// Parse from YAML text; absent keys keep their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(format!("invalid config YAML: {}", e)))
    }

    /// Apply `HWCOMPAT_*` overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TARGET_VERSION) {
            self.target_version = raw.parse().map_err(|e: crate::version::VersionParseError| {
                ConfigError::InvalidValue {
                    key: ENV_TARGET_VERSION.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }
            })?;
        }
        if let Some(raw) = lookup(ENV_DATABASE) {
            self.database_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup(ENV_EXCEPTIONS) {
            // An empty value disables the exception list
            self.exceptions_path = if raw.trim().is_empty() { None } else { Some(PathBuf::from(raw)) };
        }
        if let Some(raw) = lookup(ENV_KMOD_INDEX) {
            self.kmod_index_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup(ENV_SKIP_KMOD) {
            self.skip_kmod = parse_flag(ENV_SKIP_KMOD, &raw)?;
        }
        Ok(self)
    }

    pub fn target(mut self, version: OsVersion) -> Self {
        self.target_version = version;
        self
    }

    pub fn show_entries(mut self, show: bool) -> Self {
        self.show_entries = show;
        self
    }

    pub fn hide_reason(mut self, hide: bool) -> Self {
        self.hide_reason = hide;
        self
    }

    pub fn skip_kmod(mut self, skip: bool) -> Self {
        self.skip_kmod = skip;
        self
    }

    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn exceptions(mut self, path: Option<PathBuf>) -> Self {
        self.exceptions_path = path;
        self
    }

    pub fn kmod_index(mut self, dir: impl Into<PathBuf>) -> Self {
        self.kmod_index_dir = dir.into();
        self
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            message: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = CheckConfig::default();
        assert_eq!(config.target_version, OsVersion::major(9));
        assert!(!config.skip_kmod);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(config.kmod_index_dir, PathBuf::from("./kmod-idx"));
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = CheckConfig::from_yaml(
            r#"
target_version: "8.6"
skip_kmod: true
database_path: /usr/share/hwcompat/db.json
exceptions_path: null
"#,
        )
        .unwrap();

        assert_eq!(config.target_version, OsVersion::new(8, 6));
        assert!(config.skip_kmod);
        assert!(config.exceptions_path.is_none());
        assert_eq!(config.kmod_index_dir, PathBuf::from(DEFAULT_KMOD_INDEX_DIR));
    }

    #[test]
    fn test_from_yaml_rejects_bad_version() {
        assert!(matches!(
            CheckConfig::from_yaml("target_version: nine"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_TARGET_VERSION, "10"),
            (ENV_SKIP_KMOD, "yes"),
            (ENV_EXCEPTIONS, ""),
            (ENV_KMOD_INDEX, "/var/lib/kmod-idx"),
        ]
        .into_iter()
        .collect();

        let config = CheckConfig::default()
            .with_overrides_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.target_version, OsVersion::major(10));
        assert!(config.skip_kmod);
        assert!(config.exceptions_path.is_none());
        assert_eq!(config.kmod_index_dir, PathBuf::from("/var/lib/kmod-idx"));
    }

    #[test]
    fn test_env_override_invalid() {
        let err = CheckConfig::default()
            .with_overrides_from(|k| (k == ENV_SKIP_KMOD).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_builder() {
        let config = CheckConfig::new(OsVersion::major(8))
            .show_entries(true)
            .hide_reason(true)
            .database("db.json");
        assert!(config.show_entries && config.hide_reason);
        assert_eq!(config.database_path, PathBuf::from("db.json"));
    }
}
