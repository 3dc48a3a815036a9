//! Container operations backed by the Docker Engine API

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::PortBinding;
use bollard::query_parameters::{InspectContainerOptions, LogsOptions};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::path::Path;

use super::{ContainerInfo, ContainerRuntime, DockerClient, LogStream};
use crate::error::{Error, Result};
use crate::exec::CommandOutput;

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn exec(&self, container_id: &str, cmd: &[&str]) -> Result<CommandOutput> {
        let exec = self
            .inner()
            .create_exec(
                container_id,
                CreateExecOptions {
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    cmd: Some(cmd.to_vec()),
                    ..Default::default()
                },
            )
            .await?;

        let mut result = CommandOutput::default();
        if let StartExecResults::Attached { mut output, .. } = self.inner().start_exec(&exec.id, None).await? {
            while let Some(Ok(msg)) = output.next().await {
                match msg {
                    LogOutput::StdErr { message } => {
                        result.stderr.push_str(&String::from_utf8_lossy(&message))
                    }
                    other => result.stdout.push_str(&other.to_string()),
                }
            }
        }

        let inspect = self.inner().inspect_exec(&exec.id).await?;
        result.success = inspect.exit_code == Some(0);

        tracing::debug!(
            "exec {:?} in {} exited with {:?}",
            cmd,
            container_id,
            inspect.exit_code
        );
        Ok(result)
    }

    async fn logs(
        &self,
        container_id: &str,
        tail: usize,
        stream: LogStream,
    ) -> Result<Vec<String>> {
        let options = LogsOptions {
            follow: false,
            stdout: stream == LogStream::Stdout,
            stderr: stream == LogStream::Stderr,
            timestamps: false,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut lines = Vec::new();
        let mut logs = self.inner().logs(container_id, Some(options));

        while let Some(result) = logs.next().await {
            let message = match result? {
                LogOutput::StdOut { message } => message,
                LogOutput::StdErr { message } => message,
                LogOutput::Console { message } => message,
                LogOutput::StdIn { message } => message,
            };
            lines.extend(
                String::from_utf8_lossy(&message)
                    .lines()
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            );
        }

        Ok(lines)
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerInfo> {
        let details = self
            .inner()
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await?;

        let state = details.state.unwrap_or_default();
        let started_at = state
            .started_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(ContainerInfo {
            running: state.running.unwrap_or(false),
            started_at,
        })
    }

    async fn ports(&self, container_id: &str) -> Result<Vec<String>> {
        let details = self
            .inner()
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await?;

        let bindings = details
            .network_settings
            .and_then(|n| n.ports)
            .unwrap_or_default();

        Ok(ports_from_bindings(&bindings))
    }

    async fn copy_into(&self, container_id: &str, source: &Path, target: &str) -> Result<()> {
        use tokio::process::Command;

        // The Engine API only accepts tar archives for uploads; the CLI packs one for us
        let destination = format!("{}:{}", container_id, target);
        let output = Command::new("docker")
            .arg("cp")
            .arg(source)
            .arg(&destination)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Command {
                program: "docker cp".to_string(),
                message: stderr.trim().to_string(),
            });
        }

        tracing::info!("Copied {:?} to {}", source, destination);
        Ok(())
    }
}

/// Flatten an inspect port map into port numbers: every exposed container port
/// (`"80/tcp"` becomes `"80"`), then every published host port.
pub fn ports_from_bindings(bindings: &HashMap<String, Option<Vec<PortBinding>>>) -> Vec<String> {
    let mut exposed: Vec<&String> = bindings.keys().collect();
    exposed.sort();

    let mut ports: Vec<String> = exposed
        .iter()
        .map(|key| key.split('/').next().unwrap_or(key).to_string())
        .collect();

    for key in exposed {
        for binding in bindings.get(key).into_iter().flatten().flatten() {
            if let Some(host_port) = binding.host_port.as_deref().filter(|p| !p.is_empty()) {
                if !ports.iter().any(|p| p == host_port) {
                    ports.push(host_port.to_string());
                }
            }
        }
    }

    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(host_port: &str) -> PortBinding {
        PortBinding {
            host_ip: Some("0.0.0.0".to_string()),
            host_port: Some(host_port.to_string()),
        }
    }

    #[test]
    fn test_ports_from_bindings_exposed_and_published() {
        let mut bindings = HashMap::new();
        bindings.insert("80/tcp".to_string(), Some(vec![binding("8083")]));
        bindings.insert("443/tcp".to_string(), None);

        assert_eq!(ports_from_bindings(&bindings), vec!["443", "80", "8083"]);
    }

    #[test]
    fn test_ports_from_bindings_skips_duplicate_host_ports() {
        let mut bindings = HashMap::new();
        bindings.insert("80/tcp".to_string(), Some(vec![binding("80"), binding("80")]));

        assert_eq!(ports_from_bindings(&bindings), vec!["80"]);
    }

    #[test]
    fn test_ports_from_empty_map() {
        assert!(ports_from_bindings(&HashMap::new()).is_empty());
    }
}
