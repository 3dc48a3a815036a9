//! Error types for ngxdash

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'ngxdash init' first.")]
    ConfigNotFound,

    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Command '{program}' failed: {message}")]
    Command { program: String, message: String },

    #[error("Cannot read site configurations in {}: {source}", path.display())]
    SitesUnreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open log {}: {source}", path.display())]
    LogUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("NGINX is not running in a container: {0}")]
    NotContainerized(String),

    #[error("Site '{0}' does not exist")]
    SiteNotFound(String),

    #[error("Site '{0}' already exists")]
    SiteExists(String),

    #[error("Invalid site name: {0}")]
    InvalidSiteName(String),

    #[error("Invalid site definition: {}", .0.join("; "))]
    InvalidSiteSpec(Vec<String>),

    #[error("{0} is not supported for containerized NGINX - edit the configuration and restart the container")]
    UnsupportedInContainer(String),

    #[error("Configuration test failed: {0}")]
    ConfigTest(String),

    #[error("Failed to reload NGINX: {0}")]
    Reload(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
