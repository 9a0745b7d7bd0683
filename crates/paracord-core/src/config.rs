use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TASKS_DIR: &str = "tasks";
pub const DEFAULT_PROJECTS_DIR: &str = "projects";
pub const DEFAULT_AREAS_DIR: &str = "areas";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Vault-level settings. Directory names are relative to the vault root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParacordConfig {
    pub tasks_dir: Option<String>,
    pub projects_dir: Option<String>,
    pub areas_dir: Option<String>,
}

pub fn config_filename_candidates() -> [&'static str; 2] {
    [".paracord.toml", ".paracordrc"]
}

pub fn config_path(vault_root: &Path) -> PathBuf {
    vault_root.join(".paracord.toml")
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_paracord_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("PARACORD_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".paracord"))
}

pub fn global_config_path() -> Option<PathBuf> {
    resolve_paracord_home_dir().map(|home| home.join("config.toml"))
}

pub fn find_config_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    for candidate in start.ancestors() {
        for name in config_filename_candidates() {
            if candidate.join(name).is_file() {
                return Some(candidate.to_path_buf());
            }
        }
    }
    None
}

pub fn load_config(vault_root: &Path) -> Option<ParacordConfig> {
    for name in config_filename_candidates() {
        let path = vault_root.join(name);
        if path.is_file() {
            if let Ok(text) = fs::read_to_string(&path) {
                if let Ok(config) = toml::from_str::<ParacordConfig>(&text) {
                    return Some(config);
                }
            }
        }
    }
    None
}

pub fn load_global_config() -> Option<ParacordConfig> {
    let path = global_config_path()?;
    if !path.is_file() {
        return None;
    }
    let text = fs::read_to_string(path).ok()?;
    toml::from_str::<ParacordConfig>(&text).ok()
}

pub fn resolve_tasks_dir_with_source(vault_root: &Path) -> (String, &'static str) {
    resolve_dir_with_source(vault_root, |config| config.tasks_dir.clone(), DEFAULT_TASKS_DIR)
}

pub fn resolve_tasks_dir(vault_root: &Path) -> String {
    resolve_tasks_dir_with_source(vault_root).0
}

pub fn resolve_projects_dir_with_source(vault_root: &Path) -> (String, &'static str) {
    resolve_dir_with_source(
        vault_root,
        |config| config.projects_dir.clone(),
        DEFAULT_PROJECTS_DIR,
    )
}

pub fn resolve_projects_dir(vault_root: &Path) -> String {
    resolve_projects_dir_with_source(vault_root).0
}

pub fn resolve_areas_dir_with_source(vault_root: &Path) -> (String, &'static str) {
    resolve_dir_with_source(vault_root, |config| config.areas_dir.clone(), DEFAULT_AREAS_DIR)
}

pub fn resolve_areas_dir(vault_root: &Path) -> String {
    resolve_areas_dir_with_source(vault_root).0
}

fn resolve_dir_with_source(
    vault_root: &Path,
    pick: impl Fn(&ParacordConfig) -> Option<String>,
    default: &'static str,
) -> (String, &'static str) {
    let nonempty = |value: String| {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    };
    if let Some(value) = load_config(vault_root)
        .and_then(|config| pick(&config))
        .and_then(nonempty)
    {
        return (value, "project");
    }
    if let Some(value) = load_global_config()
        .and_then(|config| pick(&config))
        .and_then(nonempty)
    {
        return (value, "global");
    }
    (default.to_string(), "default")
}

pub fn write_config(vault_root: &Path, config: &ParacordConfig) -> Result<PathBuf, ConfigError> {
    let path = config_path(vault_root);
    let body = toml::to_string_pretty(config)?;
    fs::write(&path, body)?;
    Ok(path)
}
