//! Configuration loading and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the synthesis provider credential
pub const FAL_KEY_ENV: &str = "FAL_KEY";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LOFAI_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; anything absent falls back to a built-in default
/// or to a higher-priority source (CLI, environment).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for generated audio and runtime data
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Directory holding the rotation's audio files (default: `<root_folder>/audio`)
    #[serde(default)]
    pub audio_dir: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Address the HTTP server binds to
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Seconds between automatic track advances (0 disables the timer)
    #[serde(default)]
    pub advance_interval_secs: Option<u64>,

    /// Number of slots in the rotation
    #[serde(default)]
    pub rotation_size: Option<usize>,

    /// fal.ai API key (lower priority than the FAL_KEY environment variable)
    #[serde(default)]
    pub fal_key: Option<String>,

    /// Origins allowed by the CORS layer
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Synthesis provider tuning
    #[serde(default)]
    pub synthesis: SynthesisSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Synthesis provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSettings {
    /// Provider endpoint receiving the generation request
    #[serde(default = "default_synthesis_endpoint")]
    pub endpoint: String,

    /// MusicGen model variant
    #[serde(default = "default_model_version")]
    pub model_version: String,

    /// Requested clip length in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,

    /// Timeout for the generation request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for downloading the generated audio
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            endpoint: default_synthesis_endpoint(),
            model_version: default_model_version(),
            duration_secs: default_duration_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

fn default_synthesis_endpoint() -> String {
    "https://fal.run/fal-ai/musicgen".to_string()
}

fn default_model_version() -> String {
    "large".to_string()
}

fn default_duration_secs() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_download_timeout_secs() -> u64 {
    120
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
    }

    /// Load config from an explicit path or the platform search path
    ///
    /// An explicit path that cannot be read or parsed is an error. When no
    /// path is given and no file exists on the search path, defaults are used.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = Self::load(path)?;
            info!("Loaded config from {}", path.display());
            return Ok(config);
        }

        for candidate in default_config_paths() {
            if candidate.exists() {
                match Self::load(&candidate) {
                    Ok(config) => {
                        info!("Loaded config from {}", candidate.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!("Ignoring unreadable config {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        warn!("No config file found, using built-in defaults");
        Ok(Self::default())
    }
}

/// Config file search path for the platform
///
/// Linux: `~/.config/lofai/config.toml`, then `/etc/lofai/config.toml`.
/// Other platforms: the user config directory only.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("lofai").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/lofai/config.toml"));
    }
    paths
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lofai"))
        .unwrap_or_else(|| PathBuf::from("./lofai_data"))
}

/// Root folder resolution following CLI > ENV > TOML > default priority
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    env_var_name: String,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(env_var_name: impl Into<String>) -> Self {
        Self {
            cli_arg: None,
            env_var_name: env_var_name.into(),
            toml_value: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml_value(mut self, path: Option<PathBuf>) -> Self {
        self.toml_value = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        default_root_folder()
    }
}

/// Resolve an API key from the environment, then the TOML config
///
/// Blank keys are treated as absent. Returns `Error::Config` when neither
/// source holds a usable key.
pub fn resolve_api_key(env_var_name: &str, toml_key: Option<&str>) -> Result<String> {
    let env_key = std::env::var(env_var_name).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} found in both environment and TOML config. Using environment (highest priority).",
            env_var_name
        );
    }

    if let Some(key) = env_key {
        info!("{} loaded from environment variable", env_var_name);
        return Ok(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("{} loaded from TOML config", env_var_name);
        return Ok(key.trim().to_string());
    }

    Err(Error::Config(format!(
        "{} not configured. Set the {} environment variable or `fal_key` in config.toml",
        env_var_name, env_var_name
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   \t"));
    }

    #[test]
    fn test_synthesis_defaults() {
        let settings = SynthesisSettings::default();
        assert_eq!(settings.endpoint, "https://fal.run/fal-ai/musicgen");
        assert_eq!(settings.model_version, "large");
        assert_eq!(settings.duration_secs, 10);
        assert_eq!(settings.download_timeout_secs, 120);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert!(config.port.is_none());
        assert!(config.fal_key.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.synthesis.duration_secs, 10);
    }

    #[test]
    fn test_resolver_cli_wins() {
        let resolver = RootFolderResolver::new("LOFAI_TEST_UNUSED_ROOT")
            .with_cli_arg(Some(PathBuf::from("/tmp/cli")))
            .with_toml_value(Some(PathBuf::from("/tmp/toml")));
        assert_eq!(resolver.resolve(), PathBuf::from("/tmp/cli"));
    }
}
