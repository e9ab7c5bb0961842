//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from an optional TOML file. A missing or broken
//! file is never fatal: a warning is logged and compiled defaults apply.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `BACKSTAGE_ROOT`
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_ENV_VAR: &str = "BACKSTAGE_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "backstage.db";

/// File store directory inside the root folder
pub const STORAGE_DIR: &str = "storage";

/// Bootstrap configuration loaded from TOML
///
/// Every section is optional; absent keys take compiled defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder holding the database and the file store
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub inbox: InboxConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Externally visible base URL, used to build public attachment URLs
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// Message inbox settings
#[derive(Debug, Clone, Deserialize)]
pub struct InboxConfig {
    /// Submissions per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self { page_size: default_page_size() }
    }
}

/// Attachment file store settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Bucket holding message attachments
    #[serde(default = "default_attachment_bucket")]
    pub attachment_bucket: String,

    /// Largest accepted upload before resizing
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Uploaded images are scaled down to fit a square of this size
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            attachment_bucket: default_attachment_bucket(),
            max_upload_bytes: default_max_upload_bytes(),
            max_image_dimension: default_max_image_dimension(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:5740".to_string()
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:5740".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_attachment_bucket() -> String {
    "message-attachments".to_string()
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_max_image_dimension() -> u32 {
    1200
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config file if one exists, falling back to defaults
    ///
    /// Never fails: problems are logged as warnings.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(config_file_path) {
            Some(path) => path,
            None => {
                info!("No config file found, using compiled defaults");
                return Self::default();
            }
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.inbox.page_size == 0 {
            return Err(Error::Config("inbox.page_size must be positive".to_string()));
        }
        if self.storage.attachment_bucket.trim().is_empty() {
            return Err(Error::Config("storage.attachment_bucket must not be empty".to_string()));
        }
        if self.storage.max_image_dimension == 0 {
            return Err(Error::Config("storage.max_image_dimension must be positive".to_string()));
        }
        Ok(())
    }
}

/// Locate the config file for the platform
///
/// Linux checks `~/.config/backstage/config.toml`, then
/// `/etc/backstage/config.toml`. Returns the first that exists.
pub fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("backstage").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/backstage/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/backstage (or /var/lib/backstage for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("backstage"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/backstage"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/backstage
        dirs::data_dir()
            .map(|d| d.join("backstage"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/backstage"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\backstage
        dirs::data_local_dir()
            .map(|d| d.join("backstage"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\backstage"))
    } else {
        PathBuf::from("./backstage_data")
    }
}

/// Resolves the root folder following the priority order above
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    config_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root folder passed on the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Root folder read from the config file
    pub fn with_config_root(mut self, path: Option<PathBuf>) -> Self {
        self.config_root = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.config_root {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        default_root_folder()
    }
}

/// Creates the root folder layout on first run
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create root and storage directories (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.storage_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn storage_path(&self) -> PathBuf {
        self.root.join(STORAGE_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.inbox.page_size, 10);
        assert_eq!(config.storage.attachment_bucket, "message-attachments");
        assert_eq!(config.storage.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.storage.max_image_dimension, 1200);
        assert_eq!(config.logging.level, "info");
        assert!(config.root_folder.is_none());
    }

    #[test]
    fn test_partial_sections_fill_in_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            root_folder = "/srv/backstage"

            [server]
            public_base_url = "https://example.org"

            [inbox]
            page_size = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/backstage")));
        assert_eq!(config.server.public_base_url, "https://example.org");
        assert_eq!(config.server.bind_address, "127.0.0.1:5740");
        assert_eq!(config.inbox.page_size, 25);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let config: TomlConfig = toml::from_str("[inbox]\npage_size = 0").unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_cli_arg_wins_over_config_root() {
        let resolver = RootFolderResolver::new()
            .with_cli_arg(Some(PathBuf::from("/tmp/from-cli")))
            .with_config_root(Some(PathBuf::from("/tmp/from-config")));
        assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-cli"));
    }
}
