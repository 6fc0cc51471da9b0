//! Configuration for eoap-tools.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (EOAP_TOOLS_HTTP_TIMEOUT)
//! 2. Config file (.eoap-tools/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - `EOAP_TOOLS_CONFIG` points at an explicit file
//! - Otherwise searches current directory and parents for .eoap-tools/config.yaml
//! - Falls back to the user config directory (~/.config/eoap-tools/config.yaml)
//! - Paths in config file are relative to the project root (parent of .eoap-tools/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Directory name searched for in the current directory and its parents
const CONFIG_DIR: &str = ".eoap-tools";

/// Default HTTP timeout (connect and read) in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub dvc: Option<DvcConfig>,
}

fn default_version() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Prefix of generated catalog ids
    pub id_prefix: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Default output of `stac prepare-assets` (relative to project root)
    pub assets_dir: Option<String>,
    /// Default output of `stac generate-catalog` (relative to project root)
    pub catalog_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DvcConfig {
    pub binary: Option<String>,
}

/// HTTP client settings used for remote STAC documents and asset downloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Settings for generated catalogs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub id_prefix: String,
    pub description: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            id_prefix: "eoap".to_string(),
            description: "Processing output STAC catalog.".to_string(),
        }
    }
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub http: HttpSettings,
    pub catalog: CatalogSettings,
    /// Default output directory for prepared assets
    pub assets_dir: PathBuf,
    /// Default output directory for generated catalogs
    pub catalog_dir: PathBuf,
    /// dvc executable
    pub dvc_binary: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            catalog: CatalogSettings::default(),
            assets_dir: PathBuf::from("./stac-assets"),
            catalog_dir: PathBuf::from("./stac-catalog"),
            dvc_binary: "dvc".to_string(),
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    /// Apply a parsed config file found at `config_path`
    fn with_file(mut self, config_path: &Path, config: ConfigFile) -> Self {
        // Base directory is the parent of .eoap-tools/ when the file lives there
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        let base_dir = if config_dir.file_name().is_some_and(|n| n == CONFIG_DIR) {
            config_dir.parent().unwrap_or(Path::new("."))
        } else {
            config_dir
        };

        if let Some(timeout) = config.http.timeout_seconds {
            self.http.timeout_seconds = timeout;
        }
        if let Some(agent) = config.http.user_agent {
            self.http.user_agent = agent;
        }
        if let Some(prefix) = config.catalog.id_prefix {
            self.catalog.id_prefix = prefix;
        }
        if let Some(description) = config.catalog.description {
            self.catalog.description = description;
        }
        if let Some(ref dir) = config.output.assets_dir {
            self.assets_dir = resolve_path(base_dir, dir);
        }
        if let Some(ref dir) = config.output.catalog_dir {
            self.catalog_dir = resolve_path(base_dir, dir);
        }
        if let Some(binary) = config.dvc.and_then(|d| d.binary) {
            self.dvc_binary = binary;
        }

        self.config_file = Some(config_path.to_path_buf());
        self
    }

    /// Apply environment overrides
    fn with_env(mut self, timeout: Option<String>) -> Result<Self> {
        if let Some(value) = timeout {
            self.http.timeout_seconds = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid EOAP_TOOLS_HTTP_TIMEOUT: {}", value))?;
        }
        Ok(self)
    }
}

/// Find config file from env, current directory and parents, then user config dir
fn find_config_file() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("EOAP_TOOLS_CONFIG") {
        return Some(PathBuf::from(explicit));
    }

    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(CONFIG_DIR).join("config.yaml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    dirs::config_dir()
        .map(|d| d.join("eoap-tools").join("config.yaml"))
        .filter(|p| p.exists())
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        crate::utils::normalize_path(&base.join(path))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let mut config = ResolvedConfig::default();

    if let Some(config_path) = find_config_file() {
        let file = load_config_file(&config_path)?;
        config = config.with_file(&config_path, file);
    }

    config.with_env(std::env::var("EOAP_TOOLS_HTTP_TIMEOUT").ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
