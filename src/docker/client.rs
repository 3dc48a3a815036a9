//! Connection to the Docker Engine API

use bollard::Docker;

use crate::config::DockerConfig;
use crate::error::Result;

/// Seconds before an Engine API request is abandoned
const API_TIMEOUT_SECS: u64 = 120;

/// Engine API client backing the containerized NGINX host
#[derive(Clone)]
pub struct DockerClient {
    inner: Docker,
}

impl DockerClient {
    /// Connecting is lazy; this only fails on a malformed socket address.
    /// A `tcp://` socket selects HTTP, anything else is a unix socket path.
    pub fn new(config: &DockerConfig) -> Result<Self> {
        let inner = if config.socket.starts_with("tcp://") {
            Docker::connect_with_http(&config.socket, API_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)?
        } else {
            Docker::connect_with_unix(&config.socket, API_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)?
        };

        tracing::debug!("Docker client configured for {}", config.socket);
        Ok(Self { inner })
    }

    pub(crate) fn inner(&self) -> &Docker {
        &self.inner
    }
}
