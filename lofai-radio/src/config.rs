//! Runtime configuration for lofai-radio
//!
//! Merges command-line/environment overrides (parsed by clap in `main`) with
//! the TOML bootstrap file and built-in defaults:
//!
//! 1. Command-line arguments / environment variables
//! 2. TOML configuration file
//! 3. Built-in defaults

use lofai_common::config::{
    resolve_api_key, RootFolderResolver, SynthesisSettings, TomlConfig, FAL_KEY_ENV,
    ROOT_FOLDER_ENV,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::rotation::DEFAULT_ROTATION_SIZE;
use crate::scheduler::DEFAULT_ADVANCE_INTERVAL_SECS;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Overrides taken from the command line or environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub root_folder: Option<PathBuf>,
    pub audio_dir: Option<PathBuf>,
    pub advance_interval_secs: Option<u64>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct RadioConfig {
    pub port: u16,
    pub bind_address: String,
    pub root_folder: PathBuf,
    pub audio_dir: PathBuf,
    pub rotation_size: usize,
    /// `None` when automatic advancement is disabled
    pub advance_interval: Option<Duration>,
    /// `None` disables generation
    pub fal_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub synthesis: SynthesisSettings,
}

impl RadioConfig {
    pub fn resolve(cli: CliOverrides, toml: TomlConfig) -> Self {
        let root_folder = RootFolderResolver::new(ROOT_FOLDER_ENV)
            .with_cli_arg(cli.root_folder)
            .with_toml_value(toml.root_folder.clone())
            .resolve();

        let audio_dir = cli
            .audio_dir
            .or(toml.audio_dir.clone())
            .unwrap_or_else(|| root_folder.join("audio"));

        let rotation_size = match toml.rotation_size {
            Some(0) => {
                warn!("rotation_size = 0 is invalid, using {}", DEFAULT_ROTATION_SIZE);
                DEFAULT_ROTATION_SIZE
            }
            Some(size) => size,
            None => DEFAULT_ROTATION_SIZE,
        };

        let interval_secs = cli
            .advance_interval_secs
            .or(toml.advance_interval_secs)
            .unwrap_or(DEFAULT_ADVANCE_INTERVAL_SECS);
        let advance_interval = (interval_secs > 0).then(|| Duration::from_secs(interval_secs));

        // Missing credential disables generation; reported once here
        let fal_key = match resolve_api_key(FAL_KEY_ENV, toml.fal_key.as_deref()) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("{}", e);
                warn!("Music generation is disabled; previously generated tracks will still be served");
                None
            }
        };

        let cors_origins = toml.cors_origins.clone().unwrap_or_else(default_cors_origins);

        Self {
            port: cli.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            bind_address: cli
                .bind_address
                .or(toml.bind_address.clone())
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            root_folder,
            audio_dir,
            rotation_size,
            advance_interval,
            fal_key,
            cors_origins,
            synthesis: toml.synthesis,
        }
    }
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}
