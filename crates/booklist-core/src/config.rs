use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BooklistError, Result};

/// Root application configuration, loaded from `~/.config/booklist/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the whole collection.
    pub data_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the browser UI, served for any non-API path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("booklist");

        Self {
            data_file: data_dir.join("books.json").to_string_lossy().to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            static_dir: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/booklist/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("BOOKLIST_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("booklist")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| BooklistError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let io_err = |e: std::io::Error| BooklistError::Config(format!("{}: {e}", path.display()));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str).map_err(io_err)?;
        Ok(())
    }

    /// Apply `BOOKLIST_DATA_FILE` and `BOOKLIST_PORT` overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(file) = std::env::var("BOOKLIST_DATA_FILE") {
            self.storage.data_file = file;
        }
        if let Ok(port) = std::env::var("BOOKLIST_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| BooklistError::Config(format!("invalid BOOKLIST_PORT: {port}")))?;
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn data_file(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_file)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
