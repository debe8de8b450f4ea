/*!
 * Tests for application configuration functionality
 */

use std::path::PathBuf;

use pronouns::app_config::{Config, LogLevel};

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.storage.database_path, PathBuf::from("pronouns.db"));
    assert_eq!(config.storage.pool_size, 4);
    assert!(config.catalog.sync_enabled);
    assert_eq!(config.catalog.endpoint, "https://pn.lucypoulton.net/api/");
    assert_eq!(config.catalog.cache_file, PathBuf::from("cloud.json"));
    assert_eq!(config.catalog.timeout_secs, 3);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_sourceTag_shouldCombineNameVersionAndPlatform() {
    let dir = common::create_temp_dir().unwrap();
    let catalog = common::catalog_config(dir.path());

    assert_eq!(catalog.source_tag(), "pronouns-tests 1.2.3 (test)");
}

#[test]
fn test_validate_withBadValues_shouldFail() {
    let mut config = Config::default();
    config.storage.pool_size = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.catalog.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.catalog.timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.storage.database_path = PathBuf::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("pronouns.json");

    let config = Config::load(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config.storage.pool_size, 4);
    let reloaded = Config::load(&path).unwrap();
    assert_eq!(reloaded.catalog.endpoint, config.catalog.endpoint);
}

#[test]
fn test_load_withPartialFile_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "pronouns.json",
        r#"{ "catalog": { "sync_enabled": false }, "log_level": "debug" }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert!(!config.catalog.sync_enabled);
    assert_eq!(config.catalog.timeout_secs, 3);
    assert_eq!(config.storage.pool_size, 4);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
}

#[test]
fn test_load_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "pronouns.json", "{ nope").unwrap();

    assert!(Config::load(&path).is_err());
}
