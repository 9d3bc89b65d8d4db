use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub counter: CounterConfig,
    pub downstream: DownstreamConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String, // e.g. 127.0.0.1:8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: Backend,
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Fs,
    S3,
    Memory,
    Url,
}

/// Capacity counter record location and the bounds used when seeding it.
#[derive(Debug, Deserialize, Clone)]
pub struct CounterConfig {
    #[serde(default = "default_counter_key")]
    pub key: String,
    #[serde(default = "default_capacity_max")]
    pub max: i64,
    #[serde(default)]
    pub min: i64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            key: default_counter_key(),
            max: default_capacity_max(),
            min: 0,
        }
    }
}

fn default_counter_key() -> String {
    "counter".to_string()
}

fn default_capacity_max() -> i64 {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownstreamConfig {
    /// Base URL of the analysis service, e.g. https://analysis.internal
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            page_size: default_page_size(),
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_page_size() -> usize {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl AppConfig {
    /// Load configuration from a TOML file. Required sections that are
    /// missing fail here, before any store access.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let data = fs::read_to_string(p)?;
                let cfg: Self = toml::from_str(&data)?;
                Ok(cfg)
            }
            None => Ok(Self {
                server: ServerConfig::default(),
                store: StoreConfig {
                    backend: Backend::Memory,
                    path: "sluice".to_string(),
                },
                counter: CounterConfig::default(),
                downstream: DownstreamConfig {
                    endpoint: "http://127.0.0.1:9000".to_string(),
                },
                scheduler: SchedulerConfig::default(),
                log: LogConfig::default(),
            }),
        }
    }
}
