//! NGINX installed directly on this machine, managed through its files and systemd

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::access_log::tail;
use super::directive::{directive_values, parse_server_blocks, Listen};
use super::host::{ControlPlane, LogSource, MetricsSource, NginxHost, SiteSource};
use super::sites::{format_uptime, summarize_site_config, validate_site_name, Site};
use crate::config::NginxPaths;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::probe::Environment;

pub(crate) const DEFAULT_PORTS: [&str; 2] = ["80", "443"];

pub struct NativeHost {
    paths: NginxPaths,
    runner: Arc<dyn CommandRunner>,
}

impl NativeHost {
    pub fn new(paths: NginxPaths, runner: Arc<dyn CommandRunner>) -> Self {
        Self { paths, runner }
    }

    pub fn paths(&self) -> &NginxPaths {
        &self.paths
    }

    async fn read_site(&self, name: &str, path: &Path) -> Site {
        let summary = match fs::read_to_string(path).await {
            Ok(content) => summarize_site_config(&content),
            Err(e) => {
                tracing::debug!("Cannot read site {}: {}", path.display(), e);
                None
            }
        };
        let mut site = match summary {
            Some(summary) => Site {
                name: name.to_string(),
                enabled: false,
                port: summary.port,
                ssl: summary.ssl,
                uptime: String::new(),
            },
            None => Site::placeholder(name),
        };

        // Enabled state comes from the link even when the file is unusable
        let link = self.paths.sites_enabled.join(name);
        match fs::symlink_metadata(&link).await {
            Ok(meta) => {
                site.enabled = true;
                site.uptime = meta
                    .modified()
                    .ok()
                    .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
                    .map(format_uptime)
                    .unwrap_or_else(|| "< 1h".to_string());
            }
            Err(_) => {
                site.enabled = false;
                site.uptime = "Disabled".to_string();
            }
        }

        site
    }

    async fn read_log(path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .map_err(|source| Error::LogUnavailable {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn tail_log(path: &Path, max: usize) -> Result<Vec<String>> {
        let content = Self::read_log(path).await?;
        Ok(tail(content.lines().map(str::to_string).collect(), max))
    }

    /// Every file directly inside `dir`; an unreadable directory yields nothing
    async fn config_files(dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(mut entries) = fs::read_dir(dir).await else {
            return files;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
                files.push(path);
            }
        }
        files
    }

    async fn remove_quietly(path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Ports of every `listen` directive in every server block of `config`
fn collect_listen_ports(config: &str, ports: &mut BTreeSet<String>) {
    for block in parse_server_blocks(config) {
        ports.extend(
            directive_values(&block, "listen")
                .filter_map(Listen::parse)
                .map(|listen| listen.port),
        );
    }
}

#[async_trait]
impl SiteSource for NativeHost {
    async fn list_sites(&self) -> Result<Vec<Site>> {
        let dir = &self.paths.sites_available;
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|source| Error::SitesUnreachable {
                path: dir.clone(),
                source,
            })?;

        let mut sites = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == "default" {
                continue;
            }
            let path = entry.path();
            if fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
                continue;
            }
            sites.push(self.read_site(&name, &path).await);
        }

        sites.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sites)
    }
}

#[async_trait]
impl LogSource for NativeHost {
    async fn access_lines(&self, max: usize) -> Result<Vec<String>> {
        Self::tail_log(&self.paths.access_log, max).await
    }

    async fn error_lines(&self, max: usize) -> Result<Vec<String>> {
        Self::tail_log(&self.paths.error_log, max).await
    }

    async fn access_line_count(&self) -> Result<u64> {
        let content = Self::read_log(&self.paths.access_log).await?;
        Ok(content.lines().count() as u64)
    }
}

#[async_trait]
impl MetricsSource for NativeHost {
    async fn listening_ports(&self) -> Result<Vec<String>> {
        let main = fs::read_to_string(&self.paths.main_config).await?;

        let mut ports = BTreeSet::new();
        collect_listen_ports(&main, &mut ports);

        for dir in [&self.paths.sites_available, &self.paths.conf_d] {
            for file in Self::config_files(dir).await {
                if let Ok(content) = fs::read_to_string(&file).await {
                    collect_listen_ports(&content, &mut ports);
                }
            }
        }

        if ports.is_empty() {
            return Ok(DEFAULT_PORTS.iter().map(|p| p.to_string()).collect());
        }
        Ok(ports.into_iter().collect())
    }
}

#[async_trait]
impl ControlPlane for NativeHost {
    async fn enable_site(&self, name: &str) -> Result<()> {
        validate_site_name(name)?;

        let source = self.paths.sites_available.join(name);
        if !fs::try_exists(&source).await.unwrap_or(false) {
            return Err(Error::SiteNotFound(name.to_string()));
        }

        let link = self.paths.sites_enabled.join(name);
        match fs::symlink(&source, &link).await {
            Ok(()) => tracing::info!("Enabled site {}", name),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("Site {} already enabled", name)
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn disable_site(&self, name: &str) -> Result<()> {
        validate_site_name(name)?;

        let link = self.paths.sites_enabled.join(name);
        match fs::remove_file(&link).await {
            Ok(()) => tracing::info!("Disabled site {}", name),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Site {} already disabled", name)
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn test_config(&self) -> Result<()> {
        let output = self.runner.run("nginx", &["-t"]).await?;
        if !output.success {
            return Err(Error::ConfigTest(output.combined()));
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let service = self.paths.service_name.as_str();
        let output = self.runner.run("systemctl", &["reload", service]).await?;
        if !output.success {
            return Err(Error::Reload(output.combined()));
        }
        tracing::info!("Reloaded {}", service);
        Ok(())
    }

    async fn create_site(&self, filename: &str, content: &str) -> Result<()> {
        validate_site_name(filename)?;

        // Debian layout when sites-available exists, flat conf.d otherwise
        let sites_layout = fs::metadata(&self.paths.sites_available)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        let (config_path, link_path) = if sites_layout {
            fs::create_dir_all(&self.paths.sites_available).await?;
            fs::create_dir_all(&self.paths.sites_enabled).await?;
            (
                self.paths.sites_available.join(filename),
                Some(self.paths.sites_enabled.join(filename)),
            )
        } else {
            fs::create_dir_all(&self.paths.conf_d).await?;
            (self.paths.conf_d.join(filename), None)
        };

        // Existing sites are never replaced
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&config_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::SiteExists(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let written = match file.write_all(content.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        drop(file);
        if let Err(e) = written {
            Self::remove_quietly(&config_path).await;
            return Err(e.into());
        }

        let mut linked = None;
        if let Some(link) = &link_path {
            match fs::symlink(&config_path, link).await {
                Ok(()) => linked = Some(link.as_path()),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => {
                    Self::remove_quietly(&config_path).await;
                    return Err(e.into());
                }
            }
        }

        if let Err(e) = self.test_config().await {
            tracing::warn!("Rolling back {}: {}", config_path.display(), e);
            if let Some(link) = linked {
                Self::remove_quietly(link).await;
            }
            Self::remove_quietly(&config_path).await;
            return Err(e);
        }

        tracing::info!("Created site {}", config_path.display());
        self.reload().await
    }
}

impl NginxHost for NativeHost {
    fn environment(&self) -> Environment {
        Environment::Native
    }
}
