use crate::naming::{NameLayout, RenameOptions};
use crate::planner::CollisionPolicy;
use crate::source::{compute_source_id, DEFAULT_GVFS_ROOT, DEFAULT_STORAGE_NAME};
use anyhow::{Context, Result};
use chrono::NaiveTime;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    #[default]
    Flat,
    Archive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_time: String,
    pub layout: LayoutKind,
    pub source_identifier: String,
    pub extensions: Vec<String>,
    pub recursive_default: bool,
    pub include_hidden_default: bool,
    pub on_collision: CollisionPolicy,
    pub device_storage_name: String,
    pub gvfs_root: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_time: "000000".to_string(),
            layout: LayoutKind::Flat,
            source_identifier: String::new(),
            extensions: vec!["jpg".to_string(), "jpeg".to_string(), "mp4".to_string()],
            recursive_default: false,
            include_hidden_default: false,
            on_collision: CollisionPolicy::Skip,
            device_storage_name: DEFAULT_STORAGE_NAME.to_string(),
            gvfs_root: PathBuf::from(DEFAULT_GVFS_ROOT),
        }
    }
}

impl AppConfig {
    pub fn rename_options(&self) -> Result<RenameOptions> {
        Ok(RenameOptions {
            default_time: parse_default_time(&self.default_time)?,
            layout: layout_for(self.layout, &self.source_identifier),
        })
    }
}

/// Parses a `HHMMSS` time of day.
pub fn parse_default_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H%M%S")
        .with_context(|| format!("default time must be HHMMSS: {raw}"))
}

pub fn layout_for(kind: LayoutKind, source_identifier: &str) -> NameLayout {
    match kind {
        LayoutKind::Flat => NameLayout::Flat,
        LayoutKind::Archive => NameLayout::Archive {
            source_id: compute_source_id(source_identifier),
        },
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub undo_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "media-renamer", "media-renamer")
        .context("could not determine the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        undo_path: config_dir.join("undo-last.json"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    if !paths.config_path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(&paths.config_path).with_context(|| {
        format!(
            "failed to read config file: {}",
            paths.config_path.display()
        )
    })?;

    parse_config(&raw)
}

fn parse_config(raw: &str) -> Result<AppConfig> {
    let config = toml::from_str::<AppConfig>(raw).context("failed to parse config file")?;
    parse_default_time(&config.default_time)?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    fs::create_dir_all(&paths.config_dir).with_context(|| {
        format!(
            "failed to create config directory: {}",
            paths.config_dir.display()
        )
    })?;
    let body = toml::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(&paths.config_path, body).with_context(|| {
        format!(
            "failed to write config file: {}",
            paths.config_path.display()
        )
    })?;
    Ok(())
}
