//! Docker client and container operations
//!
//! The core only needs a handful of container-runtime operations; they are
//! collected in [`ContainerRuntime`] so the containerized NGINX host can be
//! exercised against a fake runtime in tests.

mod client;
mod containers;

pub use client::DockerClient;
pub use containers::ports_from_bindings;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::error::Result;
use crate::exec::CommandOutput;

/// Which captured output stream of a container to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Runtime state of a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Execute a command inside a running container and wait for it to exit
    async fn exec(&self, container_id: &str, cmd: &[&str]) -> Result<CommandOutput>;

    /// Last `tail` lines of one of the container's captured output streams
    async fn logs(&self, container_id: &str, tail: usize, stream: LogStream)
        -> Result<Vec<String>>;

    async fn inspect(&self, container_id: &str) -> Result<ContainerInfo>;

    /// Exposed container ports followed by their host-side bindings
    async fn ports(&self, container_id: &str) -> Result<Vec<String>>;

    /// Copy a host file to `target` inside the container
    async fn copy_into(&self, container_id: &str, source: &Path, target: &str) -> Result<()>;
}
