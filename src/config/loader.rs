//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

pub const CONFIG_FILENAME: &str = "ngxdash.toml";

/// Load configuration from ngxdash.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load ngxdash.toml if one exists, otherwise fall back to the conventional NGINX layout
pub fn load_config_or_default() -> Result<Config> {
    match load_config() {
        Ok(config) => Ok(config),
        Err(Error::ConfigNotFound) => {
            tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // Compile-time constant pattern; a failure here is a bug in this file
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# ngxdash configuration
# Every value below is the built-in default; delete what you do not need.

[nginx]
sites_available = "/etc/nginx/sites-available"
sites_enabled = "/etc/nginx/sites-enabled"
conf_d = "/etc/nginx/conf.d"
main_config = "/etc/nginx/nginx.conf"
access_log = "/var/log/nginx/access.log"
error_log = "/var/log/nginx/error.log"
proc_root = "/proc"
service_name = "nginx"

[docker]
# Set to false to never look for a containerized NGINX
enabled = true
socket = "${DOCKER_SOCKET:-/var/run/docker.sock}"

[probe]
# Seconds a detected container ID is reused before probing again
cache_ttl_secs = 5

[metrics]
history_size = 50
interval_secs = 1
"#
}
