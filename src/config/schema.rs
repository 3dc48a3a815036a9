//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub nginx: NginxPaths,

    #[serde(default)]
    pub docker: DockerConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Filesystem locations of a native NGINX installation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NginxPaths {
    #[serde(default = "default_sites_available")]
    pub sites_available: PathBuf,

    #[serde(default = "default_sites_enabled")]
    pub sites_enabled: PathBuf,

    /// Flat configuration directory used when there is no sites-available layout
    #[serde(default = "default_conf_d")]
    pub conf_d: PathBuf,

    #[serde(default = "default_main_config")]
    pub main_config: PathBuf,

    #[serde(default = "default_access_log")]
    pub access_log: PathBuf,

    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,

    /// Root of the proc filesystem (process cgroups, net/dev, loadavg, meminfo)
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,

    /// systemd unit reloaded after configuration changes
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_sites_available() -> PathBuf {
    PathBuf::from("/etc/nginx/sites-available")
}

fn default_sites_enabled() -> PathBuf {
    PathBuf::from("/etc/nginx/sites-enabled")
}

fn default_conf_d() -> PathBuf {
    PathBuf::from("/etc/nginx/conf.d")
}

fn default_main_config() -> PathBuf {
    PathBuf::from("/etc/nginx/nginx.conf")
}

fn default_access_log() -> PathBuf {
    PathBuf::from("/var/log/nginx/access.log")
}

fn default_error_log() -> PathBuf {
    PathBuf::from("/var/log/nginx/error.log")
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_service_name() -> String {
    "nginx".to_string()
}

impl Default for NginxPaths {
    fn default() -> Self {
        Self {
            sites_available: default_sites_available(),
            sites_enabled: default_sites_enabled(),
            conf_d: default_conf_d(),
            main_config: default_main_config(),
            access_log: default_access_log(),
            error_log: default_error_log(),
            proc_root: default_proc_root(),
            service_name: default_service_name(),
        }
    }
}

/// Docker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Set to false to always manage NGINX natively
    #[serde(default = "default_docker_enabled")]
    pub enabled: bool,

    #[serde(default = "default_socket")]
    pub socket: String,
}

fn default_docker_enabled() -> bool {
    true
}

fn default_socket() -> String {
    "/var/run/docker.sock".to_string()
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            enabled: default_docker_enabled(),
            socket: default_socket(),
        }
    }
}

/// Container detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// How long a detected container ID is trusted before probing again
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    5
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl ProbeConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Metrics sampling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Number of points kept for each chart series
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_history_size() -> usize {
    50
}

fn default_interval_secs() -> u64 {
    1
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl MetricsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}
