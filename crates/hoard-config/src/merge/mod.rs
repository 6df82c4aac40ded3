//! Configuration layering, fallback logic, and environment overrides

use camino::{Utf8Path, Utf8PathBuf};
use hoard_core::error::HoardError;
use std::collections::HashMap;
use tracing::debug;

use crate::toml::{validate_config, HoardToml, RecordsBackend};
use crate::ConfigResult;

/// Project configuration file name
pub const CONFIG_FILE: &str = "hoard.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "HOARD_";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project hoard.toml file
    Project(Utf8PathBuf),
    /// Explicit `--config` path
    Explicit(Utf8PathBuf),
    /// No file found
    Defaults,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }

    /// Load the nearest hoard.toml, if any
    pub async fn load_project_config(&self) -> ConfigResult<Option<(HoardToml, Utf8PathBuf)>> {
        match self.resolve_config_path(CONFIG_FILE) {
            Some(path) => {
                let config = load_resolved(&path).await?;
                Ok(Some((config, path)))
            }
            None => Ok(None),
        }
    }

    /// Path of the per-user config file
    pub fn global_config_path() -> ConfigResult<Utf8PathBuf> {
        let home_dir = dirs::home_dir().ok_or_else(|| HoardError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: "Could not determine home directory".to_string(),
        })?;

        Ok(Utf8PathBuf::try_from(home_dir)
            .map_err(|e| HoardError::ConfigValidation {
                field: "home_dir".to_string(),
                reason: format!("Invalid home directory path: {}", e),
            })?
            .join(".hoard")
            .join("config.toml"))
    }

    /// Load global configuration
    pub async fn load_global_config(&self) -> ConfigResult<Option<(HoardToml, Utf8PathBuf)>> {
        let path = match Self::global_config_path() {
            Ok(path) => path,
            // No home directory means no global layer
            Err(_) => return Ok(None),
        };

        if path.is_file() {
            let config = load_resolved(&path).await?;
            Ok(Some((config, path)))
        } else {
            Ok(None)
        }
    }

    /// Resolve the effective file configuration.
    ///
    /// An explicit path must exist. Otherwise the nearest project hoard.toml
    /// is used, then `~/.hoard/config.toml`, then built-in defaults (with
    /// relative paths anchored at the working directory).
    pub async fn load(&self, explicit: Option<&Utf8Path>) -> ConfigResult<(HoardToml, ConfigSource)> {
        if let Some(path) = explicit {
            let path = if path.is_relative() {
                self.cwd.join(path)
            } else {
                path.to_path_buf()
            };
            let config = load_resolved(&path).await?;
            return Ok((config, ConfigSource::Explicit(path)));
        }

        if let Some((config, path)) = self.load_project_config().await? {
            debug!(%path, "using project configuration");
            return Ok((config, ConfigSource::Project(path)));
        }

        if let Some((config, path)) = self.load_global_config().await? {
            debug!(%path, "using global configuration");
            return Ok((config, ConfigSource::Global(path)));
        }

        let mut config = HoardToml::default();
        config.resolve_paths(&self.cwd);
        Ok((config, ConfigSource::Defaults))
    }
}

/// Load a file and anchor its relative paths at the file's directory
async fn load_resolved(path: &Utf8Path) -> ConfigResult<HoardToml> {
    let mut config = crate::toml::load_from_file(path).await?;
    if let Some(dir) = path.parent() {
        config.resolve_paths(dir);
    }
    Ok(config)
}

impl ConfigLayering {
    /// Apply environment then CLI overrides on top of the file configuration
    pub fn merge_configs(
        base: HoardToml,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<HoardToml> {
        let mut merged = base;

        Self::apply_env_overrides(&mut merged, &env_overrides)?;

        // CLI flags have the highest priority
        Self::apply_cli_overrides(&mut merged, &cli_overrides)?;

        validate_config(&merged)?;
        Ok(merged)
    }

    /// Apply `HOARD_*` environment variable overrides
    pub fn apply_env_overrides(
        config: &mut HoardToml,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            if let Some(setting) = key.strip_prefix(ENV_PREFIX) {
                // Unknown HOARD_ variables (HOARD_LOG and friends) are not config
                if let Some(field) = env_field(setting) {
                    apply_setting(config, field, value, key)?;
                }
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides keyed by field name (`blob_dir`, `error_rate`, ...)
    pub fn apply_cli_overrides(
        config: &mut HoardToml,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            apply_setting(config, key, value, key)?;
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn env_field(setting: &str) -> Option<&'static str> {
    match setting {
        "BLOB_DIR" => Some("blob_dir"),
        "RECORDS_PATH" => Some("records_path"),
        "FILTER_PATH" => Some("filter_path"),
        "RECORDS_BACKEND" => Some("records_backend"),
        "EXPECTED_ITEMS" => Some("expected_items"),
        "ERROR_RATE" => Some("error_rate"),
        "RETENTION_DAYS" => Some("retention_days"),
        "SCAN_BATCH" => Some("scan_batch"),
        "ARCHIVE_ROOT" => Some("archive_root"),
        _ => None,
    }
}

fn apply_setting(config: &mut HoardToml, field: &str, value: &str, origin: &str) -> ConfigResult<()> {
    fn parse<T: std::str::FromStr>(value: &str, origin: &str) -> ConfigResult<T>
    where
        T::Err: std::fmt::Display,
    {
        value.trim().parse().map_err(|e| HoardError::ConfigValidation {
            field: origin.to_string(),
            reason: format!("Invalid value '{}': {}", value, e),
        })
    }

    match field {
        "blob_dir" => config.storage.blob_dir = Utf8PathBuf::from(value),
        "records_path" => config.storage.records_path = Utf8PathBuf::from(value),
        "filter_path" => config.storage.filter_path = Utf8PathBuf::from(value),
        "records_backend" => {
            config.records.backend = match value.trim().to_ascii_lowercase().as_str() {
                "file" => RecordsBackend::File,
                "memory" => RecordsBackend::Memory,
                other => {
                    return Err(HoardError::ConfigValidation {
                        field: origin.to_string(),
                        reason: format!("Unknown records backend '{}'", other),
                    })
                }
            }
        }
        "expected_items" => config.dedup.expected_items = parse(value, origin)?,
        "error_rate" => config.dedup.error_rate = parse(value, origin)?,
        "retention_days" => config.records.retention_days = parse(value, origin)?,
        "scan_batch" => config.records.scan_batch = parse(value, origin)?,
        "archive_root" => config.archive.root = Utf8PathBuf::from(value),
        other => {
            return Err(HoardError::ConfigValidation {
                field: other.to_string(),
                reason: "Unknown configuration override".to_string(),
            })
        }
    }

    Ok(())
}
