//! Site records and the parsing shared by both hosts

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::directive::{extract_directive, parse_server_blocks, Listen};
use crate::error::{Error, Result};

/// One configured virtual host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub enabled: bool,
    pub port: String,
    pub ssl: bool,
    pub uptime: String,
}

impl Site {
    /// Entry for a site file that could not be read or has no server block
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
            port: "unknown".to_string(),
            ssl: false,
            uptime: "N/A".to_string(),
        }
    }
}

/// Port and TLS facts recovered from one site file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSummary {
    pub port: String,
    pub ssl: bool,
}

/// Summarize a site file: port from the first server block that listens
/// anywhere (`80` when none does), SSL if any block listens with `ssl` or
/// carries a certificate. `None` when the file has no server block.
pub fn summarize_site_config(config: &str) -> Option<SiteSummary> {
    let blocks = parse_server_blocks(config);
    if blocks.is_empty() {
        return None;
    }

    let mut port = None;
    let mut ssl = false;

    for block in &blocks {
        let listen = Listen::parse(&extract_directive(block, "listen"));
        if let Some(listen) = &listen {
            port.get_or_insert_with(|| listen.port.clone());
            ssl |= listen.ssl;
        }
        ssl |= !extract_directive(block, "ssl_certificate").is_empty();
    }

    Some(SiteSummary {
        port: port.unwrap_or_else(|| "80".to_string()),
        ssl,
    })
}

/// Sites of a fully resolved running configuration (`nginx -T` output).
/// Every block is enabled; an empty configuration yields a single `default` site.
pub fn sites_from_running_config(config: &str, uptime: &str) -> Vec<Site> {
    let mut sites: Vec<Site> = parse_server_blocks(config)
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let server_name = extract_directive(block, "server_name");
            let listen = Listen::parse(&extract_directive(block, "listen"));

            Site {
                name: if server_name.is_empty() {
                    format!("server-{}", i + 1)
                } else {
                    server_name
                },
                enabled: true,
                port: listen
                    .as_ref()
                    .map(|l| l.port.clone())
                    .unwrap_or_else(|| "80".to_string()),
                ssl: listen.map(|l| l.ssl).unwrap_or(false),
                uptime: uptime.to_string(),
            }
        })
        .collect();

    if sites.is_empty() {
        sites.push(Site {
            name: "default".to_string(),
            enabled: true,
            port: "80".to_string(),
            ssl: false,
            uptime: uptime.to_string(),
        });
    }

    sites
}

/// Reject names that would escape the site directories
pub fn validate_site_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidSiteName("name is empty".to_string()));
    }
    if name.contains('/') || name == "." || name == ".." {
        return Err(Error::InvalidSiteName(name.to_string()));
    }
    Ok(())
}

/// Coarse uptime: `"<d>d <h>h"`, `"<h>h"` or `"< 1h"`
pub fn format_uptime(elapsed: Duration) -> String {
    let hours = elapsed.as_secs() / 3600;
    let days = hours / 24;
    let hours = hours % 24;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        "< 1h".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3600;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(59 * 60)), "< 1h");
        assert_eq!(format_uptime(Duration::from_secs(3 * HOUR + 20)), "3h");
        assert_eq!(format_uptime(Duration::from_secs(53 * HOUR)), "2d 5h");
        assert_eq!(format_uptime(Duration::from_secs(48 * HOUR)), "2d 0h");
    }

    #[test]
    fn test_validate_site_name() {
        assert!(validate_site_name("example.com").is_ok());
        assert!(validate_site_name("my-site.conf").is_ok());
        for bad in ["", "  ", ".", "..", "../etc/passwd", "a/b"] {
            assert!(
                matches!(validate_site_name(bad), Err(Error::InvalidSiteName(_))),
                "{:?} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_summarize_plain_site() {
        let summary = summarize_site_config("server {\n    listen 80;\n}\n").unwrap();
        assert_eq!(summary.port, "80");
        assert!(!summary.ssl);
    }

    #[test]
    fn test_summarize_redirect_and_tls_blocks() {
        let config = "server {\n listen 80;\n return 301 https://$host;\n}\nserver {\n listen 443 ssl;\n}\n";
        let summary = summarize_site_config(config).unwrap();
        assert_eq!(summary.port, "80");
        assert!(summary.ssl);
    }

    #[test]
    fn test_summarize_certificate_implies_ssl() {
        let config = "server {\n listen 8443;\n ssl_certificate /etc/ssl/a.crt;\n}\n";
        assert!(summarize_site_config(config).unwrap().ssl);
    }

    #[test]
    fn test_summarize_block_without_listen() {
        let summary = summarize_site_config("server {\n server_name a;\n}\n").unwrap();
        assert_eq!(summary.port, "80");
    }

    #[test]
    fn test_summarize_without_server_block() {
        assert_eq!(summarize_site_config("upstream a {\n server b;\n}\n"), None);
    }

    #[test]
    fn test_running_config_names() {
        let config = "\
# configuration file /etc/nginx/conf.d/default.conf:
server {
    listen       80;
    server_name  localhost;
}
server {
    listen [::]:8443 ssl;
}
";
        let sites = sites_from_running_config(config, "3h");
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].name, "localhost");
        assert_eq!(sites[1].name, "server-2");
        assert_eq!(sites[1].port, "8443");
        assert!(sites[1].ssl);
        assert!(sites.iter().all(|s| s.enabled && s.uptime == "3h"));
    }

    #[test]
    fn test_running_config_without_blocks() {
        let sites = sites_from_running_config("events {}\n", "Running");
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "default");
        assert_eq!(sites[0].port, "80");
        assert!(sites[0].enabled);
    }
}
