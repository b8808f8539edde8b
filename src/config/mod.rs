// ingesttool/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_DATABASE_URL: &str = "sqlite://filelist.sqlite3";
const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 300;

// Structs for deserializing config.json
#[derive(Debug, Clone, Deserialize)]
pub struct JsonBackupConfig {
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub client_binary_path: Option<PathBuf>,
    pub client_work_dir: Option<PathBuf>,
    pub client_timeout_secs: Option<u64>,
    pub database_url: Option<String>,
    pub backup: Option<JsonBackupConfig>,
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Path to the storage client binary. When None, the binary is
    /// discovered on PATH at upload time.
    pub binary_path: Option<PathBuf>,
    /// Directory where per-invocation client logs are created. When None,
    /// the system temp directory is used.
    pub work_dir: Option<PathBuf>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackupConfig {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub destination_root: String,
}

impl BackupConfig {
    /// Remote copy target for a logical path: `user@host:root/path`.
    pub fn remote_target(&self, logical_path: &str) -> String {
        let remote = match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        };
        format!(
            "{}:{}/{}",
            remote,
            self.destination_root,
            logical_path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub database_url: String,
    pub backup: Option<BackupConfig>,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let raw_json_config: RawJsonConfig = if config_path.exists() {
            let config_content = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
            serde_json::from_str(&config_content).with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?
        } else {
            RawJsonConfig::default()
        };

        let env_database_url = env::var("DATABASE_URL").ok();
        Self::from_raw(raw_json_config, env_database_url)
    }

    fn from_raw(raw: RawJsonConfig, env_database_url: Option<String>) -> Result<Self> {
        let database_url = env_database_url
            .filter(|s| !s.is_empty())
            .or_else(|| raw.database_url.clone().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let backup = match raw
            .backup
            .as_ref()
            .and_then(|b| b.destination.as_ref())
            .filter(|s| !s.is_empty())
        {
            Some(destination) => Some(parse_backup_destination(destination)?),
            None => {
                if raw.backup.is_some() {
                    println!("Backup configuration is present in config.json but 'destination' is missing or empty. Backup replication will be disabled.");
                }
                None
            }
        };

        let timeout_secs = raw.client_timeout_secs.unwrap_or(DEFAULT_CLIENT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "client_timeout_secs must be greater than zero in config.json."
            ));
        }

        Ok(AppConfig {
            client: ClientConfig {
                binary_path: raw.client_binary_path,
                work_dir: raw.client_work_dir,
                timeout: Duration::from_secs(timeout_secs),
            },
            database_url,
            backup,
        })
    }
}

/// Parses a backup destination URI of the form `ssh://[user@]host[:port]/root`
/// into its transport components.
pub fn parse_backup_destination(destination: &str) -> Result<BackupConfig> {
    let uri = Url::parse(destination)
        .with_context(|| format!("Invalid backup destination URI: {}", destination))?;
    if uri.scheme() != "ssh" {
        return Err(anyhow::anyhow!(
            "Backup destination must be an ssh:// URI, got scheme '{}'",
            uri.scheme()
        ));
    }
    let host = uri
        .host_str()
        .context("Backup destination URI is missing a host")?
        .to_string();
    let destination_root = uri.path().trim_end_matches('/').to_string();
    if destination_root.is_empty() {
        return Err(anyhow::anyhow!(
            "Backup destination URI is missing a destination root path"
        ));
    }
    let user = match uri.username() {
        "" => None,
        user => Some(user.to_string()),
    };

    Ok(BackupConfig {
        user,
        host,
        port: uri.port(),
        destination_root,
    })
}
