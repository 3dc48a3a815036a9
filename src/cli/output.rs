//! CLI output formatting utilities

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use super::OutputFormat;
use crate::nginx::{LogEntry, LogStats, Metrics, Site, SystemMetrics};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Print `value` as JSON or YAML; returns false for table output
pub fn print_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Table => Ok(false),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(value)?);
            Ok(true)
        }
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

/// Color for an HTTP status class
fn status_color(class: &str) -> Color {
    match class {
        "2xx" => Color::Green,
        "3xx" => Color::Blue,
        "4xx" => Color::Yellow,
        _ => Color::Red,
    }
}

/// Print a table of sites
pub fn print_site_table(sites: &[Site]) {
    if sites.is_empty() {
        info("No sites found");
        return;
    }

    let mut table = new_table(&["Name", "Status", "Port", "SSL", "Uptime"]);

    for site in sites {
        let (status, color) = if site.enabled {
            ("enabled", Color::Green)
        } else {
            ("disabled", Color::Red)
        };

        table.add_row(vec![
            Cell::new(&site.name),
            Cell::new(status).fg(color),
            Cell::new(&site.port),
            Cell::new(if site.ssl { "yes" } else { "no" }),
            Cell::new(&site.uptime),
        ]);
    }

    println!("{table}");
}

/// Print parsed access log entries
pub fn print_log_table(entries: &[LogEntry]) {
    if entries.is_empty() {
        info("No access log entries");
        return;
    }

    let mut table = new_table(&["Time", "Client", "Method", "Path", "Status", "Bytes"]);

    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&entry.ip),
            Cell::new(&entry.method),
            Cell::new(&entry.path),
            Cell::new(entry.status_code).fg(status_color(&entry.status_class)),
            Cell::new(entry.bytes_sent),
        ]);
    }

    println!("{table}");
}

/// Print raw error log lines, highlighting the severity
pub fn print_error_lines(lines: &[String]) {
    if lines.is_empty() {
        info("Error log is empty");
        return;
    }

    for line in lines {
        if line.contains("[emerg]") || line.contains("[crit]") || line.contains("[error]") {
            println!("{}", line.red());
        } else if line.contains("[warn]") {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }
}

/// Print aggregated access log statistics
pub fn print_stats(stats: &LogStats) {
    println!("{}", "Access Log Summary".bold().underline());
    println!();
    println!("  {} {}", "Requests:".bold(), stats.total_requests);
    println!("  {} {}", "Unique IPs:".bold(), stats.unique_ips);
    println!("  {} {}", "Bytes sent:".bold(), stats.total_bytes);
    println!(
        "  {} {}",
        "Avg bytes/request:".bold(),
        stats.avg_bytes_per_request
    );

    println!();
    println!("  {}", "Status classes:".bold());
    for class in ["2xx", "3xx", "4xx", "5xx"] {
        let count = stats.status_counts.get(class).copied().unwrap_or(0);
        println!("    {} {}", class, count);
    }

    let mut methods: Vec<_> = stats.method_counts.iter().collect();
    methods.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    println!();
    println!("  {}", "Methods:".bold());
    for (method, count) in methods {
        println!("    {} {}", method, count);
    }

    println!();
    println!("  {}", "Top paths:".bold());
    let mut table = new_table(&["Path", "Hits"]);
    for (path, hits) in stats.busiest_paths(10) {
        table.add_row(vec![Cell::new(path), Cell::new(hits)]);
    }
    println!("{table}");
}

/// Print one row per metrics sample with its derived network rate
pub fn print_metrics_table(samples: &[(Metrics, f64)]) {
    let mut table = new_table(&[
        "Time", "CPU %", "Mem %", "Net MB/s", "Req/s", "Active", "Total",
    ]);

    for (metrics, network_rate) in samples {
        table.add_row(vec![
            Cell::new(metrics.timestamp.format("%H:%M:%S")),
            Cell::new(format!("{:.1}", metrics.cpu)),
            Cell::new(format!("{:.1}", metrics.memory)),
            Cell::new(format!("{:.2}", network_rate)),
            Cell::new(format!("{:.2}", metrics.request_rate)),
            Cell::new(metrics.active_conns),
            Cell::new(metrics.total_conns),
        ]);
    }

    println!("{table}");
}

/// Print host-wide metrics
pub fn print_system(system: &SystemMetrics) {
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    println!("{}", "System".bold().underline());
    println!();
    println!(
        "  {} {:.2} {:.2} {:.2}",
        "Load average:".bold(),
        system.load_avg_1,
        system.load_avg_5,
        system.load_avg_15
    );
    println!(
        "  {} {:.1} / {:.1} GiB ({:.1}%)",
        "Memory:".bold(),
        system.memory_used as f64 / GIB,
        system.memory_total as f64 / GIB,
        system.memory_used_percent
    );

    let disk = if system.disk_usage.is_empty() {
        "unknown".to_string()
    } else {
        format!("{}%", system.disk_usage)
    };
    println!("  {} {}", "Disk (/):".bold(), disk);
}
