//! Capabilities every NGINX host provides, natively or inside a container
//!
//! A host is picked once per operation from the probe result; all reads and
//! actions of that operation then go through the same host so native and
//! container data are never mixed.

use async_trait::async_trait;
use chrono::Utc;

use super::access_log::{self, parse_lines, LogEntry, LogStats, ANALYSIS_WINDOW};
use super::sites::Site;
use crate::error::Result;
use crate::probe::Environment;

#[async_trait]
pub trait SiteSource: Send + Sync {
    async fn list_sites(&self) -> Result<Vec<Site>>;
}

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Last `max` raw access log lines
    async fn access_lines(&self, max: usize) -> Result<Vec<String>>;

    /// Last `max` raw error log lines
    async fn error_lines(&self, max: usize) -> Result<Vec<String>>;

    /// Approximate number of requests ever logged
    async fn access_line_count(&self) -> Result<u64> {
        Ok(self.access_lines(ANALYSIS_WINDOW).await?.len() as u64)
    }

    /// Last `max` access log lines that parse as combined-format entries
    async fn access_logs(&self, max: usize) -> Result<Vec<LogEntry>> {
        let lines = self.access_lines(max).await?;
        Ok(parse_lines(&lines))
    }

    async fn log_stats(&self) -> Result<LogStats> {
        let entries = self.access_logs(ANALYSIS_WINDOW).await?;
        Ok(LogStats::from_entries(&entries))
    }

    /// Requests per second over the last minute, and lines scanned
    async fn request_rate(&self) -> Result<(f64, u64)> {
        let lines = self.access_lines(ANALYSIS_WINDOW).await?;
        Ok(access_log::request_rate(&lines, Utc::now()))
    }
}

#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Ports NGINX accepts connections on
    async fn listening_ports(&self) -> Result<Vec<String>>;
}

#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn enable_site(&self, name: &str) -> Result<()>;

    async fn disable_site(&self, name: &str) -> Result<()>;

    async fn test_config(&self) -> Result<()>;

    async fn reload(&self) -> Result<()>;

    /// Install a new site file, validate the whole configuration and reload.
    /// A file that fails validation is removed again.
    async fn create_site(&self, filename: &str, content: &str) -> Result<()>;
}

pub trait NginxHost: SiteSource + LogSource + MetricsSource + ControlPlane {
    fn environment(&self) -> Environment;
}
