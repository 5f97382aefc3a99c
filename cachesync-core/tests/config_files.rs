//! Config persistence and lookup integration tests.

use std::fs;

use assert_fs::prelude::*;
use cachesync_core::{
    config::{self, config_path_at},
    Catalog, Config, ConfigError, RegionId,
};
use predicates::prelude::predicate;
use rstest::rstest;

// ---------------------------------------------------------------------------
// 1. Init / save
// ---------------------------------------------------------------------------

#[test]
fn init_writes_config_under_home() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::init_at(home.path()).expect("init");

    home.child(".cachesync/config.yaml")
        .assert(predicate::path::exists());
    home.child(".cachesync/config.yaml")
        .assert(predicate::str::contains("batch_size: 1000"));
    home.child(".cachesync/config.yaml")
        .assert(predicate::str::contains("https://coord.info/"));
    home.child(".cachesync/config.yaml.tmp")
        .assert(predicate::path::missing());
}

#[cfg(unix)]
#[test]
fn saved_config_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &Config::default()).expect("save");

    let mode = fs::metadata(config_path_at(home.path()))
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

// ---------------------------------------------------------------------------
// 2. Load errors
// ---------------------------------------------------------------------------

#[test]
fn corrupt_yaml_reports_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".cachesync/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn wrong_shape_is_a_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".cachesync/config.yaml")
        .write_str("- this is a list, not a mapping\n")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn zero_retry_attempts_rejected() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".cachesync/config.yaml")
        .write_str("retry:\n  max_attempts: 0\n  max_backoff_secs: 60\n")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "retry.max_attempts",
            ..
        }
    ));
}

// ---------------------------------------------------------------------------
// 3. Regions and criteria
// ---------------------------------------------------------------------------

#[rstest]
#[case("52", "New South Wales")]
#[case("54", "Queensland")]
#[case("59", "Australian Capital Territory")]
#[case("82", "North Island NZ")]
#[case("86", "South Island NZ")]
fn default_regions_resolve(#[case] id: &str, #[case] name: &str) {
    let config = Config::default();
    assert_eq!(config.region_name(&RegionId::from(id)).unwrap(), name);
    assert_eq!(config.catalog().region_name(&RegionId::from(id)), Some(name));
}

#[test]
fn custom_regions_replace_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".cachesync/config.yaml")
        .write_str("regions:\n  \"99\": Test Region\n")
        .expect("write");

    let config = config::load_at(home.path()).expect("load");
    assert_eq!(config.regions.len(), 1);
    assert!(config.region_name(&RegionId::from("54")).is_err());
    assert_eq!(config.catalog().regions().count(), 1);
    assert_eq!(Catalog::standard().regions().count(), 10);
}

#[test]
fn criteria_template_survives_roundtrip() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut config = Config::default();
    config.criteria.cache_types = vec![8];
    config.criteria.hide_owned = None;
    config::save_at(home.path(), &config).expect("save");

    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded.criteria.cache_types, vec![8]);
    assert_eq!(loaded.criteria.hide_owned, None);
    assert_eq!(loaded.criteria.corrected, Some(true));
}
