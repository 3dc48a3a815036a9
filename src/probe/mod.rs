//! Native-versus-container environment detection

mod cache;
mod detect;

pub use cache::{Clock, EnvironmentCache, ManualClock, SystemClock};
pub use detect::{container_id_from_cgroup, master_pid, ContainerDetector, ProcessDetector};

use serde::Serialize;
use std::fmt;

/// Where the managed NGINX instance runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "container_id", rename_all = "lowercase")]
pub enum Environment {
    Native,
    Container(String),
}

impl Environment {
    pub fn container_id(&self) -> Option<&str> {
        match self {
            Environment::Native => None,
            Environment::Container(id) => Some(id),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Native => write!(f, "native"),
            Environment::Container(id) => write!(f, "container {}", id),
        }
    }
}
