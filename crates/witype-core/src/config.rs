use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Name of the per-project configuration directory.
pub const PROJECT_DIR: &str = ".witype";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Project catalog, relative to the project root.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Layer the project catalog on top of the built-in system catalog.
    #[serde(default = "default_true")]
    pub include_system: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            include_system: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Catalog used when the project does not name one.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
    /// Absolute (or caller-relative) catalog path, project before user.
    pub catalog_path: Option<PathBuf>,
}

/// Walk up from `start` to the nearest directory holding [`PROJECT_DIR`].
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(PROJECT_DIR).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Read `<project_root>/.witype/config.toml`, or defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Read `<config_dir>/witype/config.toml`, or defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("witype/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config and environment.
///
/// # Errors
///
/// Fails when either config file is unreadable or malformed.
pub fn resolve_config(project_root: Option<&Path>, cli_json: bool) -> Result<EffectiveConfig> {
    let project = match project_root {
        Some(root) => load_project_config(root)?,
        None => ProjectConfig::default(),
    };
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    let catalog_path = resolve_catalog_path(project_root, &project, &user);

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
        catalog_path,
    })
}

fn resolve_catalog_path(
    project_root: Option<&Path>,
    project: &ProjectConfig,
    user: &UserConfig,
) -> Option<PathBuf> {
    match (project_root, &project.catalog.path) {
        (Some(root), Some(path)) => Some(root.join(path)),
        (None, Some(path)) => Some(path.clone()),
        (_, None) => user.catalog.clone(),
    }
}

fn resolve_output(cli_json: bool, user_output: Option<&str>, env_format: Option<&str>) -> String {
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

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_true() -> bool {
    true
}
