use crate::model::Kind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Directory holding the store and config, relative to the project root.
pub const STORE_DIR: &str = ".stackboard";
pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "stackboard.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Output mode used when neither `--json` nor `STACKBOARD_FORMAT` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub backlog: BacklogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_board_kind")]
    pub default_kind: Kind,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            default_kind: default_board_kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogConfig {
    #[serde(default = "default_backlog_kind")]
    pub default_kind: Kind,
    #[serde(default)]
    pub include_in_progress: bool,
    #[serde(default)]
    pub show_completed_children: bool,
}

impl Default for BacklogConfig {
    fn default() -> Self {
        Self {
            default_kind: default_backlog_kind(),
            include_in_progress: false,
            show_completed_children: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub resolved_output: String,
}

#[must_use]
pub fn store_dir(project_root: &Path) -> PathBuf {
    project_root.join(STORE_DIR)
}

#[must_use]
pub fn db_path(project_root: &Path) -> PathBuf {
    store_dir(project_root).join(DB_FILE)
}

#[must_use]
pub fn config_path(project_root: &Path) -> PathBuf {
    store_dir(project_root).join(CONFIG_FILE)
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// The config file `sb init` writes: every default spelled out.
pub fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&ProjectConfig::default()).context("Failed to render default config")
}

pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;

    let env_format = env::var("STACKBOARD_FORMAT").ok();
    let resolved_output = resolve_output(cli_json, project.output.clone(), env_format);

    Ok(EffectiveConfig {
        project,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    config_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = config_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_board_kind() -> Kind {
    Kind::Issue
}

const fn default_backlog_kind() -> Kind {
    Kind::Epic
}
