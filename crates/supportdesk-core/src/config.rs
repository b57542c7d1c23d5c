//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Uploads larger than this are rejected.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TOKEN_TTL_HOURS: u64 = 168;

/// Paths to all SupportDesk data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db: PathBuf,
    /// Uploaded documents (`data/uploads/`), also served at `/uploads`.
    pub uploads: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            uploads: root.join("uploads"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.db)?;
        std::fs::create_dir_all(&self.uploads)?;
        Ok(())
    }
}

/// Top-level SupportDesk configuration.
#[derive(Debug, Clone)]
pub struct SupportDeskConfig {
    /// HTTP server port.
    pub port: u16,
    /// Public base URL used to build links to uploaded files.
    pub base_url: String,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// HS256 signing secret for access tokens.
    pub jwt_secret: Vec<u8>,
    /// Lifetime of issued access tokens.
    pub token_ttl: Duration,
}

impl SupportDeskConfig {
    /// Create configuration from environment and defaults.
    ///
    /// `JWT_SECRET` is required; everything else has a default.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let base_url = std::env::var("BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::Config("JWT_SECRET must be set".into()))?;

        let ttl_hours = std::env::var("JWT_EXPIRES_IN_HOURS")
            .ok()
            .and_then(|h| h.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);

        Self::new(data_dir, port, base_url, jwt_secret.into_bytes(), Duration::from_secs(ttl_hours * 3600))
    }

    /// Build a configuration from explicit values (used by tests and embedding).
    pub fn new(
        data_dir: impl AsRef<Path>,
        port: u16,
        base_url: impl Into<String>,
        jwt_secret: Vec<u8>,
        token_ttl: Duration,
    ) -> Result<Self> {
        let data_paths = DataPaths::new(data_dir)?;
        Ok(Self {
            port,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            data_paths,
            jwt_secret,
            token_ttl,
        })
    }

    /// Public URL of an uploaded file.
    pub fn upload_url(&self, filename: &str) -> String {
        format!("{}/uploads/{}", self.base_url, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_data_paths_created() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path().join("data")).unwrap();
        assert!(paths.db.is_dir());
        assert!(paths.uploads.is_dir());
        assert_eq!(paths.llm_config_file.file_name().unwrap(), "llm-config.json");
    }

    #[test]
    fn test_upload_url_strips_trailing_slash() {
        let dir = TempDir::new().unwrap();
        let config = SupportDeskConfig::new(
            dir.path(),
            5000,
            "https://support.example.com/",
            b"secret".to_vec(),
            Duration::from_secs(60),
        )
        .unwrap();
        assert_eq!(
            config.upload_url("123-abc.pdf"),
            "https://support.example.com/uploads/123-abc.pdf"
        );
    }
}
