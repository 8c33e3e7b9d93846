//! Unit tests for configuration resolution and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate LOFAI_ROOT_FOLDER or FAL_KEY are marked with #[serial].

use lofai_common::config::{
    default_root_folder, resolve_api_key, RootFolderResolver, TomlConfig, FAL_KEY_ENV,
    ROOT_FOLDER_ENV,
};
use lofai_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(ROOT_FOLDER_ENV);
    assert_eq!(resolver.resolve(), default_root_folder());
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/lofai-test-env-folder");

    let resolver = RootFolderResolver::new(ROOT_FOLDER_ENV)
        .with_toml_value(Some(PathBuf::from("/tmp/lofai-test-toml-folder")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/lofai-test-env-folder"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_beats_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(ROOT_FOLDER_ENV)
        .with_toml_value(Some(PathBuf::from("/tmp/lofai-test-toml-folder")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/lofai-test-toml-folder"));
}

#[test]
#[serial]
fn test_api_key_env_beats_toml() {
    env::set_var(FAL_KEY_ENV, "env-key");

    let key = resolve_api_key(FAL_KEY_ENV, Some("toml-key")).unwrap();
    assert_eq!(key, "env-key");

    env::remove_var(FAL_KEY_ENV);
}

#[test]
#[serial]
fn test_api_key_falls_back_to_toml() {
    env::remove_var(FAL_KEY_ENV);

    let key = resolve_api_key(FAL_KEY_ENV, Some("  toml-key  ")).unwrap();
    assert_eq!(key, "toml-key");
}

#[test]
#[serial]
fn test_blank_api_keys_are_a_config_error() {
    env::set_var(FAL_KEY_ENV, "   ");

    let result = resolve_api_key(FAL_KEY_ENV, Some(""));
    assert!(matches!(result, Err(Error::Config(_))));

    env::remove_var(FAL_KEY_ENV);
}

#[test]
fn test_load_full_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
root_folder = "/srv/lofai"
port = 9000
advance_interval_secs = 0
rotation_size = 6
fal_key = "from-file"
cors_origins = ["http://radio.local"]

[logging]
level = "debug"

[synthesis]
duration_secs = 30
"#
    )
    .unwrap();

    let config = TomlConfig::load(file.path()).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/lofai")));
    assert_eq!(config.port, Some(9000));
    assert_eq!(config.advance_interval_secs, Some(0));
    assert_eq!(config.rotation_size, Some(6));
    assert_eq!(config.fal_key.as_deref(), Some("from-file"));
    assert_eq!(config.cors_origins, Some(vec!["http://radio.local".to_string()]));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.synthesis.duration_secs, 30);
    // Unset synthesis fields keep their defaults
    assert_eq!(config.synthesis.model_version, "large");
}

#[test]
fn test_explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = TomlConfig::load_or_default(Some(&missing));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_malformed_toml_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number\"").unwrap();

    let result = TomlConfig::load(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}
