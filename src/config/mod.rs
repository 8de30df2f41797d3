//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`RUNWATCH_BASE_URL`, `RUNWATCH_API_KEY`,
//!    `RUNWATCH_API_TIMEOUT_SECS`)
//! 2. TOML file specified via --config CLI flag
//! 3. ./runwatch.toml in the current directory
//! 4. $XDG_CONFIG_HOME/runwatch/runwatch.toml (or ~/.config/runwatch/runwatch.toml)
//! 5. Built-in defaults

use crate::error::ConfigError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

mod defaults;
mod types;

use defaults::DEFAULT_RUNWATCH_CONFIG_TEMPLATE;
pub use types::{ApiConfig, Config, DisplayConfig, GlobalConfigInitResult, LiveConfig};
use types::FileConfig;

const CONFIG_FILE_NAME: &str = "runwatch.toml";

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<Config, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let config_text = read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let parsed: FileConfig = toml::from_str(&config_text)?;
    let mut config = resolve_config_from_file_config(parsed, &env_lookup)?;
    apply_runtime_env_overrides(&mut config, &env_lookup)?;
    validate_config(&config)?;
    Ok(config)
}

fn read_config_text_with_sources<FRead, FRoot>(
    path_override: Option<&str>,
    read_file: &FRead,
    config_root: &FRoot,
) -> Result<String, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FRoot: Fn() -> Option<PathBuf>,
{
    if let Some(p) = path_override {
        return Ok(read_file(Path::new(p))?);
    }

    if let Ok(text) = read_file(Path::new(CONFIG_FILE_NAME)) {
        return Ok(text);
    }
    if let Some(dir) = config_root() {
        let global = dir.join("runwatch").join(CONFIG_FILE_NAME);
        if let Ok(text) = read_file(&global) {
            return Ok(text);
        }
    }

    Ok(String::new())
}

fn resolve_config_from_file_config<FEnv>(
    parsed: FileConfig,
    env_lookup: &FEnv,
) -> Result<Config, ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    let api_key = match normalized_option(&parsed.api.api_key_env) {
        Some(var) => {
            if normalized_string(&parsed.api.api_key).is_some() {
                return Err(ConfigError::Invalid(
                    "api.api_key and api.api_key_env are mutually exclusive".to_string(),
                ));
            }
            env_lookup(&var).unwrap_or_default()
        }
        None => parsed.api.api_key,
    };

    Ok(Config {
        api: ApiConfig {
            base_url: parsed.api.base_url.trim().to_string(),
            api_key: api_key.trim().to_string(),
            timeout_secs: parsed.api.timeout_secs,
        },
        live: parsed.live,
        display: parsed.display,
    })
}

fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(url) = env_value(env_lookup, "RUNWATCH_BASE_URL") {
        config.api.base_url = url;
    }
    if let Some(key) = env_value(env_lookup, "RUNWATCH_API_KEY") {
        config.api.api_key = key;
    }
    if let Some(timeout) = env_value(env_lookup, "RUNWATCH_API_TIMEOUT_SECS") {
        let parsed = timeout.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid RUNWATCH_API_TIMEOUT_SECS value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        config.api.timeout_secs = parsed.max(1);
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.api.base_url.is_empty() {
        return Err(ConfigError::Invalid(
            "api.base_url must not be empty".to_string(),
        ));
    }
    if config.api.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "api.timeout_secs must be at least 1".to_string(),
        ));
    }
    if config.live.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "live.poll_interval_ms must be at least 1".to_string(),
        ));
    }
    if config.live.poll_ceiling_secs == 0 {
        return Err(ConfigError::Invalid(
            "live.poll_ceiling_secs must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn env_value<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name).and_then(|value| normalized_string(&value))
}

fn normalized_option(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(normalized_string)
}

fn normalized_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Global config file
// ---------------------------------------------------------------------------

/// Return the default per-user config path (`~/.config/runwatch/runwatch.toml`).
pub fn default_global_config_path() -> Option<PathBuf> {
    config_root_dir().map(|dir| dir.join("runwatch").join(CONFIG_FILE_NAME))
}

/// Initialize `~/.config/runwatch/runwatch.toml`.
///
/// - Without `force`, returns `AlreadyInitialized` if the file exists.
/// - With `force`, backs up the existing file in the same directory using a
///   timestamped name, then rewrites it from the compiled template.
pub fn initialize_default_global_config(
    force: bool,
) -> Result<GlobalConfigInitResult, ConfigError> {
    let path = default_global_config_path().ok_or_else(|| {
        ConfigError::Invalid(
            "unable to resolve default config path for ~/.config/runwatch/runwatch.toml"
                .to_string(),
        )
    })?;
    initialize_default_global_config_at_path(&path, force)
}

fn initialize_default_global_config_at_path(
    path: &Path,
    force: bool,
) -> Result<GlobalConfigInitResult, ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if path.exists() {
        if !force {
            return Ok(GlobalConfigInitResult::AlreadyInitialized {
                path: path.to_path_buf(),
            });
        }
        let backup_path = timestamped_backup_path(path);
        std::fs::copy(path, &backup_path)?;
        std::fs::write(path, DEFAULT_RUNWATCH_CONFIG_TEMPLATE)?;
        return Ok(GlobalConfigInitResult::Overwritten {
            path: path.to_path_buf(),
            backup_path,
        });
    }

    // create_new avoids clobbering if another process wins a race to create.
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(DEFAULT_RUNWATCH_CONFIG_TEMPLATE.as_bytes())?;
            Ok(GlobalConfigInitResult::Created {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Ok(GlobalConfigInitResult::AlreadyInitialized {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(ConfigError::Io(e)),
    }
}

fn timestamped_backup_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE_NAME.to_string());
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    for suffix in 0..1000usize {
        let candidate_name = if suffix == 0 {
            format!("{file_name}.{timestamp}.bak")
        } else {
            format!("{file_name}.{timestamp}.{suffix}.bak")
        };
        let candidate = path.with_file_name(candidate_name);
        if !candidate.exists() {
            return candidate;
        }
    }

    path.with_file_name(format!(
        "{file_name}.{timestamp}.{}.bak",
        std::process::id()
    ))
}

/// Root of per-user config directories.
pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
