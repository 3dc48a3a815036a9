//! NGINX running inside a Docker container, reached only through the container runtime

use async_trait::async_trait;
use chrono::Utc;
use std::io::Write;
use std::sync::Arc;

use super::host::{ControlPlane, LogSource, MetricsSource, NginxHost, SiteSource};
use super::native::DEFAULT_PORTS;
use super::sites::{format_uptime, sites_from_running_config, validate_site_name, Site};
use crate::docker::{ContainerRuntime, LogStream};
use crate::error::{Error, Result};
use crate::exec::CommandOutput;
use crate::probe::Environment;

const ACCESS_LOG: &str = "/var/log/nginx/access.log";
const ERROR_LOG: &str = "/var/log/nginx/error.log";
const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";
const CONF_D: &str = "/etc/nginx/conf.d";

pub struct ContainerHost {
    id: String,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerHost {
    pub fn new(id: impl Into<String>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            id: id.into(),
            runtime,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, cmd: &[&str]) -> Result<CommandOutput> {
        self.runtime.exec(&self.id, cmd).await
    }

    /// Like [`ContainerHost::exec`] but a non-zero exit is an error
    async fn exec_checked(&self, cmd: &[&str]) -> Result<CommandOutput> {
        let output = self.exec(cmd).await?;
        if !output.success {
            return Err(Error::Command {
                program: cmd.join(" "),
                message: output.combined(),
            });
        }
        Ok(output)
    }

    /// True only when the `test` command inside the container succeeds
    async fn path_exists(&self, test: &[&str]) -> bool {
        self.exec(test).await.map(|o| o.success).unwrap_or(false)
    }

    async fn uptime(&self) -> String {
        match self.runtime.inspect(&self.id).await {
            Ok(info) => match (info.running, info.started_at) {
                (true, Some(started)) => (Utc::now() - started)
                    .to_std()
                    .map(format_uptime)
                    .unwrap_or_else(|_| "Running".to_string()),
                _ => "Running".to_string(),
            },
            Err(e) => {
                tracing::debug!("Cannot inspect container {}: {}", self.id, e);
                "Running".to_string()
            }
        }
    }

    /// Captured container stream first, then a tail of the log file inside the
    /// container; empty when neither is available
    async fn stream_or_file(&self, stream: LogStream, file: &str, max: usize) -> Vec<String> {
        match self.runtime.logs(&self.id, max, stream).await {
            Ok(lines) if !lines.is_empty() => return lines,
            Ok(_) => tracing::debug!("Container {} has no {:?} output", self.id, stream),
            Err(e) => tracing::debug!("Container logs unavailable: {}", e),
        }

        let count = max.to_string();
        match self.exec(&["tail", "-n", &count, file]).await {
            Ok(output) if output.success => output.stdout.lines().map(str::to_string).collect(),
            Ok(output) => {
                tracing::debug!("tail {} failed: {}", file, output.combined());
                Vec::new()
            }
            Err(e) => {
                tracing::debug!("tail {} failed: {}", file, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SiteSource for ContainerHost {
    async fn list_sites(&self) -> Result<Vec<Site>> {
        let output = self.exec_checked(&["nginx", "-T"]).await?;
        let uptime = self.uptime().await;
        Ok(sites_from_running_config(&output.stdout, &uptime))
    }
}

#[async_trait]
impl LogSource for ContainerHost {
    async fn access_lines(&self, max: usize) -> Result<Vec<String>> {
        Ok(self.stream_or_file(LogStream::Stdout, ACCESS_LOG, max).await)
    }

    async fn error_lines(&self, max: usize) -> Result<Vec<String>> {
        Ok(self.stream_or_file(LogStream::Stderr, ERROR_LOG, max).await)
    }
}

#[async_trait]
impl MetricsSource for ContainerHost {
    async fn listening_ports(&self) -> Result<Vec<String>> {
        let ports = self.runtime.ports(&self.id).await?;
        if ports.is_empty() {
            return Ok(DEFAULT_PORTS.iter().map(|p| p.to_string()).collect());
        }
        Ok(ports)
    }
}

#[async_trait]
impl ControlPlane for ContainerHost {
    async fn enable_site(&self, name: &str) -> Result<()> {
        validate_site_name(name)?;
        Err(Error::UnsupportedInContainer("Enabling a site".to_string()))
    }

    async fn disable_site(&self, name: &str) -> Result<()> {
        validate_site_name(name)?;
        Err(Error::UnsupportedInContainer("Disabling a site".to_string()))
    }

    async fn test_config(&self) -> Result<()> {
        let output = self.exec(&["nginx", "-t"]).await?;
        if !output.success {
            return Err(Error::ConfigTest(output.combined()));
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let output = self.exec(&["nginx", "-s", "reload"]).await?;
        if !output.success {
            return Err(Error::Reload(output.combined()));
        }
        tracing::info!("Reloaded NGINX in container {}", self.id);
        Ok(())
    }

    async fn create_site(&self, filename: &str, content: &str) -> Result<()> {
        validate_site_name(filename)?;

        let mut staged = tempfile::Builder::new()
            .prefix("ngxdash-")
            .suffix(".conf")
            .tempfile()?;
        staged.write_all(content.as_bytes())?;
        staged.flush()?;

        let sites_layout = self.path_exists(&["test", "-d", SITES_ENABLED]).await;

        let target = if sites_layout {
            format!("{}/{}", SITES_AVAILABLE, filename)
        } else {
            format!("{}/{}", CONF_D, filename)
        };
        let link = sites_layout.then(|| format!("{}/{}", SITES_ENABLED, filename));

        // Existing sites are never replaced
        if self.path_exists(&["test", "-e", &target]).await {
            return Err(Error::SiteExists(filename.to_string()));
        }
        if let Some(link) = &link {
            if self.path_exists(&["test", "-L", link]).await {
                return Err(Error::SiteExists(filename.to_string()));
            }
        }

        self.runtime
            .copy_into(&self.id, staged.path(), &target)
            .await?;
        self.exec_checked(&["chmod", "644", &target]).await?;

        if let Some(link) = &link {
            self.exec_checked(&["ln", "-sf", &target, link]).await?;
        }

        if let Err(e) = self.test_config().await {
            tracing::warn!("Rolling back {} in container {}: {}", target, self.id, e);
            // No link may outlive the file it points to
            for path in link.iter().chain(std::iter::once(&target)) {
                if let Err(rm) = self.exec(&["rm", "-f", path]).await {
                    tracing::warn!("Failed to remove {}: {}", path, rm);
                }
            }
            return Err(e);
        }

        tracing::info!("Created site {} in container {}", target, self.id);
        self.reload().await
    }
}

impl NginxHost for ContainerHost {
    fn environment(&self) -> Environment {
        Environment::Container(self.id.clone())
    }
}
