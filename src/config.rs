use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::CuratorError;

pub const DEFAULT_CONFIG_FILE: &str = "pride-curator.json";
pub const DEFAULT_REST_BASE_URL: &str = "https://www.ebi.ac.uk/pride/ws/archive/v2";
pub const DEFAULT_FTP_HOST: &str = "ftp.pride.ebi.ac.uk";
pub const DEFAULT_FTP_ROOT: &str = "/pride/data/archive/";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub rest_base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    #[serde(default)]
    pub ftp_host: Option<String>,
    #[serde(default)]
    pub ftp_port: Option<u16>,
    #[serde(default)]
    pub ftp_root: Option<String>,
    #[serde(default)]
    pub years: Vec<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RestSettings {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub host: String,
    pub port: u16,
    pub root: String,
    /// Year directories to walk; empty walks every year under the root.
    pub years: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub rest: RestSettings,
    pub archive: ArchiveSettings,
    pub output_dir: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `pride-curator.json` in the current directory when it exists.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CuratorError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CuratorError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CuratorError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CuratorError> {
        let timeout_secs = config.timeout_secs.unwrap_or(10.0);
        if !timeout_secs.is_finite() || timeout_secs <= 0.0 {
            return Err(CuratorError::ConfigParse(format!(
                "timeout_secs must be positive, got {timeout_secs}"
            )));
        }

        let base_url = config
            .rest_base_url
            .unwrap_or_else(|| DEFAULT_REST_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let mut root = config
            .ftp_root
            .unwrap_or_else(|| DEFAULT_FTP_ROOT.to_string());
        if !root.ends_with('/') {
            root.push('/');
        }

        Ok(ResolvedConfig {
            rest: RestSettings {
                base_url,
                timeout: Duration::from_secs_f64(timeout_secs),
            },
            archive: ArchiveSettings {
                host: config
                    .ftp_host
                    .unwrap_or_else(|| DEFAULT_FTP_HOST.to_string()),
                port: config.ftp_port.unwrap_or(21),
                root,
                years: config.years,
            },
            output_dir: Utf8PathBuf::from(config.output_dir.unwrap_or_else(|| ".".to_string())),
        })
    }
}
