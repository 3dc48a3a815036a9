//! Container detection from the host process table

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use crate::error::{Error, Result};
use crate::exec::CommandRunner;

/// Length of a short Docker container ID
pub const SHORT_ID_LEN: usize = 12;

// cgroup v2 systemd scope (`docker-<id>.scope`) or cgroup v1 path (`docker/<id>`)
static DOCKER_CGROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"docker-([0-9a-f]{12,})\.scope|docker/([0-9a-f]{12,})")
        .expect("Invalid regex pattern - this is a bug in the codebase")
});

#[async_trait]
pub trait ContainerDetector: Send + Sync {
    /// Short ID of the container NGINX runs in, or `NotContainerized`
    async fn detect(&self) -> Result<String>;
}

/// Finds the NGINX master process and reads its cgroup membership
pub struct ProcessDetector {
    runner: Arc<dyn CommandRunner>,
    proc_root: PathBuf,
}

impl ProcessDetector {
    pub fn new(runner: Arc<dyn CommandRunner>, proc_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            proc_root: proc_root.into(),
        }
    }
}

#[async_trait]
impl ContainerDetector for ProcessDetector {
    async fn detect(&self) -> Result<String> {
        let ps = self.runner.run("ps", &["aux"]).await?;
        if !ps.success {
            return Err(Error::NotContainerized("process list unavailable".to_string()));
        }

        let pid = master_pid(&ps.stdout)
            .ok_or_else(|| Error::NotContainerized("no nginx master process found".to_string()))?;

        let cgroup_path = self.proc_root.join(pid).join("cgroup");
        let cgroup = tokio::fs::read_to_string(&cgroup_path).await.map_err(|e| {
            Error::NotContainerized(format!("cannot read {}: {}", cgroup_path.display(), e))
        })?;

        container_id_from_cgroup(&cgroup).ok_or_else(|| {
            Error::NotContainerized(format!("nginx master (pid {}) is not in a docker cgroup", pid))
        })
    }
}

/// PID of the first `nginx: master process` row in `ps aux` output
pub fn master_pid(ps_output: &str) -> Option<&str> {
    ps_output
        .lines()
        .filter(|line| line.contains("nginx: master process"))
        .find_map(|line| line.split_whitespace().nth(1))
        .filter(|pid| pid.chars().all(|c| c.is_ascii_digit()))
}

/// Extract the short container ID from `/proc/<pid>/cgroup` content
pub fn container_id_from_cgroup(cgroup: &str) -> Option<String> {
    cgroup.lines().find_map(|line| {
        let caps = DOCKER_CGROUP.captures(line)?;
        let id = caps.get(1).or_else(|| caps.get(2))?.as_str();
        Some(id[..SHORT_ID_LEN].to_string())
    })
}
