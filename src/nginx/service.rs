//! Entry point for every read and action against the managed NGINX instance
//!
//! [`NginxService`] resolves the environment through the probe cache and then
//! runs the whole operation against one [`NginxHost`].

use serde::Serialize;
use std::sync::Arc;

use super::access_log::{LogEntry, LogStats};
use super::container::ContainerHost;
use super::history::MetricsHistory;
use super::host::{NginxHost, SiteSource};
use super::metrics::{Metrics, MetricsSampler, SystemMetrics};
use super::native::NativeHost;
use super::sites::{validate_site_name, Site};
use crate::config::Config;
use crate::docker::{ContainerRuntime, DockerClient};
use crate::error::Result;
use crate::exec::{CommandRunner, SystemRunner};
use crate::probe::{Clock, ContainerDetector, Environment, EnvironmentCache, ProcessDetector, SystemClock};

/// A user-triggered change to the NGINX configuration or process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    EnableSite(String),
    DisableSite(String),
    TestConfig,
    Reload,
    CreateSite { filename: String, content: String },
}

/// Everything a dashboard refresh shows, read from a single host
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub environment: Environment,
    pub sites: Vec<Site>,
    pub logs: Vec<LogEntry>,
    pub metrics: Metrics,
}

pub struct NginxService {
    config: Config,
    runner: Arc<dyn CommandRunner>,
    runtime: Option<Arc<dyn ContainerRuntime>>,
    detector: Arc<dyn ContainerDetector>,
    cache: EnvironmentCache,
    sampler: MetricsSampler,
}

impl NginxService {
    /// Service backed by the local system and, when enabled, the Docker daemon
    pub fn new(config: Config) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);

        let runtime: Option<Arc<dyn ContainerRuntime>> = if config.docker.enabled {
            match DockerClient::new(&config.docker) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!("Docker unavailable, managing NGINX natively: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let detector = Arc::new(ProcessDetector::new(
            runner.clone(),
            config.nginx.proc_root.clone(),
        ));

        Self::with_parts(config, runner, runtime, detector, Arc::new(SystemClock))
    }

    /// Service with every external collaborator supplied by the caller
    pub fn with_parts(
        config: Config,
        runner: Arc<dyn CommandRunner>,
        runtime: Option<Arc<dyn ContainerRuntime>>,
        detector: Arc<dyn ContainerDetector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = EnvironmentCache::with_clock(config.probe.cache_ttl(), clock);
        let sampler = MetricsSampler::new(runner.clone(), config.nginx.proc_root.clone());

        Self {
            config,
            runner,
            runtime,
            detector,
            cache,
            sampler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Container when Docker is usable and NGINX is found inside one, native otherwise
    pub async fn environment(&self) -> Environment {
        if self.runtime.is_none() {
            return Environment::Native;
        }

        match self.cache.get_or_detect(self.detector.as_ref()).await {
            Ok(id) => Environment::Container(id),
            Err(e) => {
                tracing::debug!("No containerized NGINX: {}", e);
                Environment::Native
            }
        }
    }

    /// Drop the cached detection result
    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    pub fn native_host(&self) -> NativeHost {
        NativeHost::new(self.config.nginx.clone(), self.runner.clone())
    }

    /// The host serving `environment`
    pub fn host_for(&self, environment: &Environment) -> Box<dyn NginxHost> {
        match (environment, &self.runtime) {
            (Environment::Container(id), Some(runtime)) => {
                Box::new(ContainerHost::new(id.clone(), runtime.clone()))
            }
            _ => Box::new(self.native_host()),
        }
    }

    pub async fn host(&self) -> Box<dyn NginxHost> {
        let environment = self.environment().await;
        self.host_for(&environment)
    }

    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        let environment = self.environment().await;
        self.list_sites_in(&environment).await
    }

    /// Container listing, falling back to the native one when the container
    /// yields nothing
    async fn list_sites_in(&self, environment: &Environment) -> Result<Vec<Site>> {
        if let Environment::Container(id) = environment {
            match self.host_for(environment).list_sites().await {
                Ok(sites) if !sites.is_empty() => return Ok(sites),
                Ok(_) => tracing::warn!("Container {} reported no sites, trying native", id),
                Err(e) => tracing::warn!("Container {} site listing failed, trying native: {}", id, e),
            }
        }
        self.native_host().list_sites().await
    }

    pub async fn access_logs(&self, max_lines: usize) -> Result<Vec<LogEntry>> {
        self.host().await.access_logs(max_lines).await
    }

    pub async fn error_logs(&self, max_lines: usize) -> Result<Vec<String>> {
        self.host().await.error_lines(max_lines).await
    }

    pub async fn log_stats(&self) -> Result<LogStats> {
        self.host().await.log_stats().await
    }

    pub async fn request_rate(&self) -> Result<(f64, u64)> {
        self.host().await.request_rate().await
    }

    pub async fn listening_ports(&self) -> Result<Vec<String>> {
        self.host().await.listening_ports().await
    }

    pub async fn sample_metrics(&self) -> Metrics {
        let host = self.host().await;
        self.sampler.sample(host.as_ref()).await
    }

    pub async fn system_metrics(&self) -> SystemMetrics {
        self.sampler.system_metrics().await
    }

    /// Empty chart history sized from the configuration
    pub fn new_history(&self) -> MetricsHistory {
        MetricsHistory::new(self.config.metrics.history_size, self.config.metrics.interval())
    }

    /// Sites, recent access log entries and one metrics sample from one host
    pub async fn refresh(&self, max_lines: usize) -> Result<Snapshot> {
        let environment = self.environment().await;
        let host = self.host_for(&environment);

        let sites = self.list_sites_in(&environment).await?;
        let logs = host.access_logs(max_lines).await.unwrap_or_else(|e| {
            tracing::warn!("Access log unavailable: {}", e);
            Vec::new()
        });
        let metrics = self.sampler.sample(host.as_ref()).await;

        Ok(Snapshot {
            environment,
            sites,
            logs,
            metrics,
        })
    }

    /// Run `action` and describe the outcome
    pub async fn execute(&self, action: Action) -> Result<String> {
        if let Action::EnableSite(name) | Action::DisableSite(name) = &action {
            validate_site_name(name)?;
        }
        if let Action::CreateSite { filename, .. } = &action {
            validate_site_name(filename)?;
        }

        let host = self.host().await;
        tracing::debug!("Executing {:?} on {}", action, host.environment());

        match action {
            Action::EnableSite(name) => {
                host.enable_site(&name).await?;
                Ok(format!("Site {} enabled", name))
            }
            Action::DisableSite(name) => {
                host.disable_site(&name).await?;
                Ok(format!("Site {} disabled", name))
            }
            Action::TestConfig => {
                host.test_config().await?;
                Ok("Configuration test passed".to_string())
            }
            Action::Reload => {
                host.reload().await?;
                Ok("NGINX reloaded".to_string())
            }
            Action::CreateSite { filename, content } => {
                host.create_site(&filename, &content).await?;
                Ok(format!("Site {} created", filename))
            }
        }
    }
}
