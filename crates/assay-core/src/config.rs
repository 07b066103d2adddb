use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, CatalogError};

pub const DEFAULT_APP_ID: &str = "default-app-id";
pub const DEFAULT_LOCAL_PATH: &str = "product_analysis_reports.json";
pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Where reports live and how to reach the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Prefer the remote document store when credentials allow it.
    #[serde(default)]
    pub remote: bool,
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
    /// Service-account descriptor (JSON).
    #[serde(default)]
    pub credentials: Option<PathBuf>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            remote: false,
            app_id: default_app_id(),
            user_id: String::new(),
            local_path: default_local_path(),
            credentials: None,
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StorageConfig {
    /// Anchor relative paths at `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        if self.local_path.is_relative() {
            self.local_path = root.join(&self.local_path);
        }
        if let Some(creds) = self.credentials.as_mut() {
            if creds.is_relative() {
                *creds = root.join(&*creds);
            }
        }
    }

    /// Apply `ASSAY_*` environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("ASSAY_REMOTE") {
            self.remote = is_truthy(&raw);
        }
        if let Some(app_id) = lookup("ASSAY_APP_ID") {
            self.app_id = app_id;
        }
        if let Some(user_id) = lookup("ASSAY_USER_ID") {
            self.user_id = user_id;
        }
        if let Some(path) = lookup("ASSAY_CREDENTIALS") {
            self.credentials = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("ASSAY_DATA") {
            self.local_path = PathBuf::from(path);
        }
    }

    /// App id with surrounding whitespace removed; blank means the default.
    #[must_use]
    pub fn normalized_app_id(&self) -> &str {
        match self.app_id.trim() {
            "" => DEFAULT_APP_ID,
            trimmed => trimmed,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Optional TOML catalog replacing the built-in products.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CatalogConfig {
    /// Load the configured catalog, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the configured file cannot be loaded.
    pub fn load(&self, root: &Path) -> Result<Catalog, CatalogError> {
        match &self.path {
            Some(path) => Catalog::load(&root.join(path)),
            None => Ok(Catalog::builtin()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Default analyst name for new reports.
    #[serde(default)]
    pub analyst: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".assay/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("assay/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Project file, then user file, then `ASSAY_*` env. Relative paths are
/// anchored at `project_root`.
pub fn resolve_config(project_root: &Path) -> Result<EffectiveConfig> {
    let mut project = load_project_config(project_root)?;
    let user = load_user_config()?;

    project
        .storage
        .apply_env(|key| env::var(key).ok().filter(|v| !v.is_empty()));
    project.storage.resolve_paths(project_root);

    Ok(EffectiveConfig { project, user })
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

fn default_local_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOCAL_PATH)
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}
