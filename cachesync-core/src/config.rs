//! YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.cachesync/
//!   config.yaml   (mode 0600, written by `cachesync init`)
//! ```
//!
//! # API pattern
//!
//! Every function touching disk has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! A missing config file is not an error: [`load_at`] returns
//! [`Config::default`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{default_regions, Catalog};
use crate::error::ConfigError;
use crate::types::{Coordinates, RegionId, SearchCriteria};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Retry/backoff settings for remote store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub max_backoff_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            max_backoff_secs: 60,
        }
    }
}

impl RetrySettings {
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spreadsheet document the local store adapter reads and writes.
    pub store_path: PathBuf,
    /// Record export the local fetcher reads.
    pub records_path: PathBuf,
    /// Prefix for the hyperlink formula written into the code column.
    pub link_prefix: String,
    /// Point distances are measured from.
    pub origin: Coordinates,
    /// Rows per append / update call.
    pub batch_size: usize,
    pub retry: RetrySettings,
    /// Region id → tab name.
    pub regions: BTreeMap<RegionId, String>,
    /// Search template; the region is filled in per run.
    pub criteria: SearchCriteria,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("cachesync-sheet.json"),
            records_path: PathBuf::from("cachesync-records.json"),
            link_prefix: "https://coord.info/".to_string(),
            origin: Coordinates::new(-27.4705, 153.0260),
            batch_size: 1000,
            retry: RetrySettings::default(),
            regions: default_regions(),
            criteria: SearchCriteria::default(),
        }
    }
}

impl Config {
    /// Lookup tables with this config's region names.
    pub fn catalog(&self) -> Catalog {
        Catalog::standard().with_regions(self.regions.clone())
    }

    /// Name of the region (and of its store tab).
    pub fn region_name(&self, id: &RegionId) -> Result<&str, ConfigError> {
        self.regions
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnknownRegion(id.0.clone()))
    }

    /// The search template anchored to `region`.
    pub fn criteria_for(&self, region: &RegionId) -> SearchCriteria {
        self.criteria.clone().with_region(region.clone())
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.cachesync/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".cachesync").join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load the config under `home`, or the defaults if none has been written.
///
/// Returns `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    let config: Config =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

/// Atomically save `config` to `<home>/.cachesync/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    let path = config_path_at(home);
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

/// Write the default config unless one already exists.
///
/// Idempotent: an existing file is loaded and returned unchanged.
pub fn init_at(home: &Path) -> Result<Config, ConfigError> {
    if config_path_at(home).exists() {
        return load_at(home);
    }
    let config = Config::default();
    save_at(home, &config)?;
    Ok(config)
}

/// `init_at` convenience wrapper.
pub fn init() -> Result<Config, ConfigError> {
    init_at(&home()?)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        assert!(config_path_at(home.path()).ends_with(".cachesync/config.yaml"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().expect("tempdir");
        let config = load_at(home.path()).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let home = TempDir::new().expect("tempdir");
        let mut config = Config::default();
        config.batch_size = 25;
        config.link_prefix = "https://example.test/".to_string();
        save_at(home.path(), &config).expect("save");
        let loaded = load_at(home.path()).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let home = TempDir::new().expect("tempdir");
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "batch_size: 10\n").unwrap();

        let config = load_at(home.path()).expect("load");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.regions.len(), 10);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let home = TempDir::new().expect("tempdir");
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "batch_size: 0\n").unwrap();

        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "batch_size", .. }));
    }

    #[test]
    fn unknown_region_is_an_error() {
        let config = Config::default();
        assert_eq!(config.region_name(&RegionId::from("54")).unwrap(), "Queensland");
        let err = config.region_name(&RegionId::from("999")).unwrap_err();
        assert!(err.to_string().contains("unknown region ID: 999"));
    }

    #[test]
    fn criteria_for_sets_region() {
        let config = Config::default();
        let criteria = config.criteria_for(&RegionId::from("57"));
        assert_eq!(criteria.region, Some(RegionId::from("57")));
        assert_eq!(config.criteria.region, None);
    }

    #[test]
    fn init_is_idempotent() {
        let home = TempDir::new().expect("tempdir");
        init_at(home.path()).expect("first init");
        let mut edited = load_at(home.path()).unwrap();
        edited.batch_size = 7;
        save_at(home.path(), &edited).unwrap();

        let again = init_at(home.path()).expect("second init");
        assert_eq!(again.batch_size, 7, "init must not overwrite an existing config");
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(ConfigError::HomeNotFound.to_string().contains("home directory"));
    }
}
