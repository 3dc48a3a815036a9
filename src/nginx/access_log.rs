//! Access log parsing and aggregation for the NGINX "combined" format

use chrono::{DateTime, Duration, FixedOffset, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Lines considered by request-rate and statistics calculations
pub const ANALYSIS_WINDOW: usize = 1000;

/// `$time_local` layout
const TIME_LOCAL_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

// $remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent"
static COMBINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\S+) \S+ \S+ \[([^\]]+)\] "(\S+) ([^"]+) \S+" (\d+) (\d+) "([^"]*)" "([^"]*)""#)
        .expect("Invalid regex pattern - this is a bug in the codebase")
});

/// One parsed access log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub ip: String,
    pub timestamp: DateTime<FixedOffset>,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub bytes_sent: u64,
    pub user_agent: String,
    pub referer: String,
    pub status_class: String,
}

/// Parse one combined-format line. Lines of any other shape yield `None`.
/// An unparsable timestamp is replaced by the current time.
pub fn parse_line(line: &str) -> Option<LogEntry> {
    let caps = COMBINED.captures(line)?;

    let status_code: u16 = caps[5].parse().ok()?;
    let bytes_sent: u64 = caps[6].parse().ok()?;
    let timestamp = parse_time_local(&caps[2]).unwrap_or_else(|| Utc::now().fixed_offset());

    Some(LogEntry {
        ip: caps[1].to_string(),
        timestamp,
        method: caps[3].to_string(),
        path: caps[4].to_string(),
        status_code,
        bytes_sent,
        referer: caps[7].to_string(),
        user_agent: caps[8].to_string(),
        status_class: status_class(status_code).to_string(),
    })
}

/// Parse every line, silently dropping the ones that do not match
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Vec<LogEntry> {
    lines.iter().filter_map(|l| parse_line(l.as_ref())).collect()
}

/// `2xx`, `3xx` or `4xx`; anything else counts as `5xx`
pub fn status_class(code: u16) -> &'static str {
    match code {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

pub fn parse_time_local(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, TIME_LOCAL_FORMAT).ok()
}

/// Last `max` items of `lines`
pub fn tail<T>(mut lines: Vec<T>, max: usize) -> Vec<T> {
    if lines.len() > max {
        lines.drain(..lines.len() - max);
    }
    lines
}

/// Requests per second over the minute before `now`, and the number of lines seen.
/// Every line counts toward the total; only lines with a bracketed timestamp
/// inside the last 60 seconds count toward the rate.
pub fn request_rate<S: AsRef<str>>(lines: &[S], now: DateTime<Utc>) -> (f64, u64) {
    let cutoff = now - Duration::seconds(60);

    let recent = lines
        .iter()
        .filter_map(|line| bracketed_timestamp(line.as_ref()))
        .filter(|ts| ts.with_timezone(&Utc) > cutoff)
        .count();

    (recent as f64 / 60.0, lines.len() as u64)
}

fn bracketed_timestamp(line: &str) -> Option<DateTime<FixedOffset>> {
    let start = line.find('[')? + 1;
    let end = line.find(']')?;
    if end <= start {
        return None;
    }
    parse_time_local(&line[start..end])
}

/// Aggregated view of a batch of access log entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub total_requests: usize,
    pub unique_ips: usize,
    pub status_counts: HashMap<String, usize>,
    pub method_counts: HashMap<String, usize>,
    pub top_paths: HashMap<String, usize>,
    pub total_bytes: u64,
    pub avg_bytes_per_request: u64,
}

impl LogStats {
    pub fn from_entries(entries: &[LogEntry]) -> Self {
        let mut stats = LogStats {
            total_requests: entries.len(),
            ..Default::default()
        };
        let mut ips = HashSet::new();

        for entry in entries {
            *stats.status_counts.entry(entry.status_class.clone()).or_default() += 1;
            *stats.method_counts.entry(entry.method.clone()).or_default() += 1;
            *stats.top_paths.entry(entry.path.clone()).or_default() += 1;
            ips.insert(entry.ip.as_str());
            stats.total_bytes += entry.bytes_sent;
        }

        stats.unique_ips = ips.len();
        if stats.total_requests > 0 {
            stats.avg_bytes_per_request = stats.total_bytes / stats.total_requests as u64;
        }

        stats
    }

    /// The `n` most requested paths, busiest first (ties by path)
    pub fn busiest_paths(&self, n: usize) -> Vec<(&str, usize)> {
        let mut paths: Vec<(&str, usize)> = self
            .top_paths
            .iter()
            .map(|(path, count)| (path.as_str(), *count))
            .collect();
        paths.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        paths.truncate(n);
        paths
    }
}
