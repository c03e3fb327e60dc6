use crate::error::ImportError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional user-level configuration. Every field has a CLI override;
/// resolution order is CLI flag, then config file, then built-in default.
#[derive(Debug, Clone, Default)]
pub struct UserConfig {
    pub archive_base_url: Option<String>,
    pub import_batch_size: Option<usize>,
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawUserConfig {
    version: Option<u32>,
    archive: Option<RawArchiveConfig>,
    import: Option<RawImportConfig>,
    database: Option<RawDatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawArchiveConfig {
    base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawImportConfig {
    batch_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDatabaseConfig {
    path: Option<String>,
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("gharvest").join("config.toml");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("gharvest")
            .join("config.toml");
    }
    PathBuf::from("gharvest.toml")
}

pub fn load_user_config() -> Result<Option<UserConfig>> {
    load_from(&config_path())
}

pub fn load_from(path: &Path) -> Result<Option<UserConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let parsed: RawUserConfig =
        toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(validate(parsed, path)?))
}

fn validate(raw: RawUserConfig, path: &Path) -> Result<UserConfig> {
    let version = raw.version.ok_or_else(|| {
        ImportError::Config(format!("{} missing required `version`", path.display()))
    })?;
    if version != 1 {
        return Err(ImportError::Config(format!(
            "{} has unsupported version {version}; expected version = 1",
            path.display()
        ))
        .into());
    }

    let import_batch_size = raw.import.and_then(|i| i.batch_size);
    if import_batch_size == Some(0) {
        return Err(ImportError::Config(format!(
            "{} has `[import].batch_size = 0`; expected a positive integer",
            path.display()
        ))
        .into());
    }

    Ok(UserConfig {
        archive_base_url: raw.archive.and_then(|a| sanitize_optional(a.base_url)),
        import_batch_size,
        database_path: raw
            .database
            .and_then(|d| sanitize_optional(d.path))
            .map(PathBuf::from),
    })
}

fn sanitize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
