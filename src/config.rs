//! Layered server configuration.
//!
//! Settings come from `shopfloor.toml`, with environment variables and CLI
//! flags layered on top (file → environment → CLI).
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:8080"
//!
//! [database]
//! path = "shopfloor.db"
//!
//! [uploads]
//! dir = "uploads"
//!
//! [auth]
//! token_secret = "change-me"
//! access_token_minutes = 60
//! refresh_token_days = 7
//!
//! [notifications]
//! channel_capacity = 256
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `[auth] token_secret`.
pub const TOKEN_SECRET_ENV: &str = "SHOPFLOOR_TOKEN_SECRET";

const DEV_TOKEN_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("shopfloor.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsSection {
    #[serde(default = "default_uploads_dir")]
    pub dir: PathBuf,
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

impl Default for UploadsSection {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    /// HS256 signing secret. Override with `SHOPFLOOR_TOKEN_SECRET`.
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
}

fn default_token_secret() -> String {
    DEV_TOKEN_SECRET.to_string()
}

fn default_access_token_minutes() -> i64 {
    60
}

fn default_refresh_token_days() -> i64 {
    7
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsSection {
    /// Broadcast channel capacity; slow sockets lag past this many events.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for NotificationsSection {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// The complete `shopfloor.toml` structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub uploads: UploadsSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub notifications: NotificationsSection,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse shopfloor.toml")
    }

    /// Load from the given path, or defaults when the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize shopfloor.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

/// Resolved auth parameters handed to the HTTP layer.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub token_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

/// File configuration plus CLI overrides.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub file: ConfigFile,
    pub cli_listen: Option<String>,
    pub cli_db_path: Option<PathBuf>,
    pub cli_uploads_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn new(config_path: &Path) -> Result<Self> {
        Ok(Self {
            file: ConfigFile::load_or_default(config_path)?,
            cli_listen: None,
            cli_db_path: None,
            cli_uploads_dir: None,
        })
    }

    pub fn with_cli_args(
        config_path: &Path,
        listen: Option<String>,
        db_path: Option<PathBuf>,
        uploads_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = Self::new(config_path)?;
        config.cli_listen = listen;
        config.cli_db_path = db_path;
        config.cli_uploads_dir = uploads_dir;
        Ok(config)
    }

    /// Bind address (CLI → file → default).
    pub fn listen(&self) -> String {
        self.cli_listen
            .clone()
            .unwrap_or_else(|| self.file.server.listen.clone())
    }

    /// SQLite database path (CLI → file → default).
    pub fn db_path(&self) -> PathBuf {
        self.cli_db_path
            .clone()
            .unwrap_or_else(|| self.file.database.path.clone())
    }

    /// Workbook uploads directory (CLI → file → default).
    pub fn uploads_dir(&self) -> PathBuf {
        self.cli_uploads_dir
            .clone()
            .unwrap_or_else(|| self.file.uploads.dir.clone())
    }

    /// Token secret (env → file → built-in development default).
    pub fn token_secret(&self) -> String {
        std::env::var(TOKEN_SECRET_ENV).unwrap_or_else(|_| self.file.auth.token_secret.clone())
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            token_secret: self.token_secret(),
            access_token_minutes: self.file.auth.access_token_minutes,
            refresh_token_days: self.file.auth.refresh_token_days,
        }
    }

    pub fn channel_capacity(&self) -> usize {
        self.file.notifications.channel_capacity
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.token_secret() == DEV_TOKEN_SECRET {
            warnings.push(format!(
                "Using the built-in development token secret; set {} or [auth] token_secret",
                TOKEN_SECRET_ENV
            ));
        }
        if self.file.auth.access_token_minutes <= 0 {
            warnings.push(format!(
                "access_token_minutes = {} issues already-expired tokens",
                self.file.auth.access_token_minutes
            ));
        }
        warnings
    }
}
