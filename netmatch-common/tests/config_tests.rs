//! Unit tests for configuration loading and data folder resolution
//!
//! Note: Uses serial_test to prevent environment variable races. Tests that
//! touch NETMATCH_DATA_FOLDER or NETMATCH_CONFIG are marked #[serial].

use netmatch_common::config::{
    default_data_folder, load_toml_config, resolve_config_path, resolve_data_folder,
    LoggingConfig, TomlConfig, CONFIG_FILE_ENV, DATA_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.logging, LoggingConfig::default());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_full_config_file_parses() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
data_folder = "/srv/netmatch"
bind_address = "0.0.0.0"
port = 8080

[logging]
level = "debug"

[scorer]
program = "python3"
args = ["Agents/main.py"]
working_dir = "/srv/agents"
timeout_secs = 30
max_concurrent = 4
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.data_folder, Some(PathBuf::from("/srv/netmatch")));
    assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0"));
    assert_eq!(config.port, Some(8080));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.scorer.program.as_deref(), Some("python3"));
    assert_eq!(config.scorer.args, Some(vec!["Agents/main.py".to_string()]));
    assert_eq!(config.scorer.timeout_secs, Some(30));
    assert_eq!(config.scorer.max_concurrent, Some(4));
}

#[test]
fn test_partial_config_file_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "port = 9000\n").unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.port, Some(9000));
    assert_eq!(config.logging.level, "info");
    assert!(config.scorer.program.is_none());
}

#[test]
fn test_unparsable_config_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"\n[[[").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
#[serial]
fn test_data_folder_cli_beats_env_and_toml() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/netmatch-env");
    let toml = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/netmatch-toml")),
        ..Default::default()
    };

    let resolved = resolve_data_folder(Some(Path::new("/tmp/netmatch-cli")), &toml);
    env::remove_var(DATA_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/tmp/netmatch-cli"));
}

#[test]
#[serial]
fn test_data_folder_env_beats_toml() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/netmatch-env");
    let toml = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/netmatch-toml")),
        ..Default::default()
    };

    let resolved = resolve_data_folder(None, &toml);
    env::remove_var(DATA_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/tmp/netmatch-env"));
}

#[test]
#[serial]
fn test_data_folder_toml_then_default() {
    env::remove_var(DATA_FOLDER_ENV);
    let toml = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/netmatch-toml")),
        ..Default::default()
    };

    assert_eq!(resolve_data_folder(None, &toml), PathBuf::from("/tmp/netmatch-toml"));
    assert_eq!(resolve_data_folder(None, &TomlConfig::default()), default_data_folder());
}

#[test]
#[serial]
fn test_config_path_env_override() {
    env::set_var(CONFIG_FILE_ENV, "/tmp/netmatch-custom.toml");
    let resolved = resolve_config_path(None);
    env::remove_var(CONFIG_FILE_ENV);

    assert_eq!(resolved, Some(PathBuf::from("/tmp/netmatch-custom.toml")));
    assert_eq!(
        resolve_config_path(Some(Path::new("/etc/netmatch.toml"))),
        Some(PathBuf::from("/etc/netmatch.toml"))
    );
}

#[test]
fn test_default_data_folder_not_empty() {
    let folder = default_data_folder();
    assert!(!folder.as_os_str().is_empty());
    assert!(folder.to_string_lossy().contains("netmatch"));
}
