//! Point-in-time resource metrics for NGINX and the host

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::host::NginxHost;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One sample of NGINX activity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// Summed %CPU of all nginx processes
    pub cpu: f64,
    /// Summed %MEM of all nginx processes
    pub memory: f64,
    /// Cumulative MB received on non-loopback interfaces since boot
    pub network_in: f64,
    /// Cumulative MB transmitted on non-loopback interfaces since boot
    pub network_out: f64,
    pub request_rate: f64,
    pub active_conns: usize,
    /// Access log line count, a stand-in for a lifetime request counter
    pub total_conns: u64,
    pub timestamp: DateTime<Utc>,
}

/// Host-wide load, memory and disk usage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub load_avg_1: f64,
    pub load_avg_5: f64,
    pub load_avg_15: f64,
    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_used_percent: f64,
    /// Root filesystem usage in percent, as printed by `df`
    pub disk_usage: String,
}

/// Collects [`Metrics`] and [`SystemMetrics`]. Sampling never fails: each
/// category falls back to zero on its own when its source is unavailable.
pub struct MetricsSampler {
    runner: Arc<dyn CommandRunner>,
    proc_root: PathBuf,
}

impl MetricsSampler {
    pub fn new(runner: Arc<dyn CommandRunner>, proc_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            proc_root: proc_root.into(),
        }
    }

    pub async fn sample(&self, host: &dyn NginxHost) -> Metrics {
        let mut metrics = Metrics {
            timestamp: Utc::now(),
            ..Default::default()
        };

        match self.process_usage().await {
            Ok((cpu, memory)) => {
                metrics.cpu = cpu;
                metrics.memory = memory;
            }
            Err(e) => tracing::debug!("CPU/memory unavailable: {}", e),
        }

        match self.network_totals().await {
            Ok((rx, tx)) => {
                metrics.network_in = rx as f64 / BYTES_PER_MB;
                metrics.network_out = tx as f64 / BYTES_PER_MB;
            }
            Err(e) => tracing::debug!("Network counters unavailable: {}", e),
        }

        let ports = match host.listening_ports().await {
            Ok(ports) if !ports.is_empty() => ports,
            _ => vec!["80".to_string()],
        };
        match self.established_connections(&ports).await {
            Ok(count) => metrics.active_conns = count,
            Err(e) => tracing::debug!("Connection count unavailable: {}", e),
        }

        metrics.total_conns = host.access_line_count().await.unwrap_or_else(|e| {
            tracing::debug!("Access log line count unavailable: {}", e);
            0
        });

        metrics.request_rate = match host.request_rate().await {
            Ok((rate, _)) => rate,
            Err(e) => {
                tracing::debug!("Request rate unavailable: {}", e);
                0.0
            }
        };

        metrics
    }

    pub async fn system_metrics(&self) -> SystemMetrics {
        let mut system = SystemMetrics::default();

        if let Some((one, five, fifteen)) = self
            .read_proc("loadavg")
            .await
            .ok()
            .and_then(|text| parse_loadavg(&text))
        {
            system.load_avg_1 = one;
            system.load_avg_5 = five;
            system.load_avg_15 = fifteen;
        }

        if let Some((total_kb, available_kb)) = self
            .read_proc("meminfo")
            .await
            .ok()
            .and_then(|text| parse_meminfo(&text))
        {
            let used_kb = total_kb.saturating_sub(available_kb);
            system.memory_total = total_kb * 1024;
            system.memory_used = used_kb * 1024;
            system.memory_used_percent = used_kb as f64 / total_kb as f64 * 100.0;
        }

        match self.runner.run("df", &["-P", "/"]).await {
            Ok(output) if output.success => {
                system.disk_usage = parse_df(&output.stdout).unwrap_or_default();
            }
            Ok(output) => tracing::debug!("df failed: {}", output.combined()),
            Err(e) => tracing::debug!("df unavailable: {}", e),
        }

        system
    }

    async fn process_usage(&self) -> Result<(f64, f64)> {
        let output = self.runner.run("ps", &["aux"]).await?;
        if !output.success {
            return Err(Error::Command {
                program: "ps".to_string(),
                message: output.combined(),
            });
        }
        Ok(nginx_process_usage(&output.stdout))
    }

    async fn network_totals(&self) -> Result<(u64, u64)> {
        let text = self.read_proc("net/dev").await?;
        Ok(parse_net_dev(&text))
    }

    async fn established_connections(&self, ports: &[String]) -> Result<usize> {
        let output = self.runner.run("ss", &["-tn"]).await?;
        if !output.success {
            return Err(Error::Command {
                program: "ss".to_string(),
                message: output.combined(),
            });
        }
        Ok(count_established(&output.stdout, ports))
    }

    async fn read_proc(&self, name: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(self.proc_root.join(name)).await?)
    }
}

/// Sum of %CPU and %MEM over every `ps aux` row whose command mentions nginx
pub fn nginx_process_usage(ps_output: &str) -> (f64, f64) {
    ps_output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 11 {
                return None;
            }
            let command = fields[10..].join(" ");
            if !command.contains("nginx") || command.starts_with("grep") {
                return None;
            }
            let cpu: f64 = fields[2].parse().ok()?;
            let mem: f64 = fields[3].parse().ok()?;
            Some((cpu, mem))
        })
        .fold((0.0, 0.0), |(cpu, mem), (c, m)| (cpu + c, mem + m))
}

/// Received and transmitted bytes summed over all interfaces except `lo`
pub fn parse_net_dev(text: &str) -> (u64, u64) {
    text.lines()
        .filter_map(|line| {
            let (iface, counters) = line.split_once(':')?;
            if iface.trim() == "lo" {
                return None;
            }
            let fields: Vec<&str> = counters.split_whitespace().collect();
            if fields.len() < 9 {
                return None;
            }
            Some((fields[0].parse::<u64>().ok()?, fields[8].parse::<u64>().ok()?))
        })
        .fold((0, 0), |(rx, tx), (r, t)| (rx + r, tx + t))
}

/// Established TCP sockets in `ss -tn` output whose local port is one of `ports`
pub fn count_established(ss_output: &str, ports: &[String]) -> usize {
    ss_output
        .lines()
        .filter(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 || fields[0] != "ESTAB" {
                return false;
            }
            let local_port = fields[3].rsplit(':').next().unwrap_or_default();
            ports.iter().any(|p| p == local_port)
        })
        .count()
}

pub fn parse_loadavg(text: &str) -> Option<(f64, f64, f64)> {
    let mut fields = text.split_whitespace();
    Some((
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
    ))
}

/// `MemTotal` and `MemAvailable` in kB
pub fn parse_meminfo(text: &str) -> Option<(u64, u64)> {
    let field = |name: &str| {
        text.lines()
            .find_map(|line| line.strip_prefix(name)?.strip_prefix(':'))
            .and_then(|rest| rest.split_whitespace().next()?.parse::<u64>().ok())
    };

    let total = field("MemTotal").filter(|t| *t > 0)?;
    Some((total, field("MemAvailable").unwrap_or(0)))
}

/// Capacity percentage (without `%`) of the first filesystem row of `df` output
pub fn parse_df(text: &str) -> Option<String> {
    let row = text.lines().nth(1)?;
    let capacity = row.split_whitespace().nth(4)?;
    Some(capacity.trim_end_matches('%').to_string())
}
