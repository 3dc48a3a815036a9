//! Site configuration templates rendered with minijinja

use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Site template
const SITE_TEMPLATE: &str = r#"
{% if site.ssl and site.force_https %}
# HTTP to HTTPS redirect
server {
    listen 80;
    server_name {{ site.server_name }};
    return 301 https://$server_name$request_uri;
}

{% endif %}
server {
{% if site.ssl %}
    listen {{ site.port }} ssl http2;
    listen [::]:{{ site.port }} ssl http2;
{% else %}
    listen {{ site.port }};
    listen [::]:{{ site.port }};
{% endif %}
    server_name {{ site.server_name }};

{% if site.ssl %}
    ssl_certificate {{ site.ssl_certificate }};
    ssl_certificate_key {{ site.ssl_certificate_key }};
    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_ciphers HIGH:!aNULL:!MD5;
    ssl_prefer_server_ciphers on;

{% endif %}
    access_log {{ site.access_log }};
    error_log {{ site.error_log }};

    client_max_body_size {{ site.client_max_body_size }};

{% if site.gzip %}
    gzip on;
    gzip_vary on;
    gzip_proxied any;
    gzip_comp_level 6;
    gzip_types text/plain text/css text/xml text/javascript application/json application/javascript application/xml+rss image/svg+xml;

{% endif %}
{% if not site.proxy_pass %}
    root {{ site.root }};
    index {{ site.index }};

{% endif %}
    location / {
{% if site.proxy_pass %}
        proxy_pass {{ site.proxy_pass }};
{% if site.proxy_headers %}
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
{% endif %}
{% else %}
        try_files $uri $uri/ {{ fallback }};
{% endif %}
    }
{% if fastcgi_pass %}

    location ~ \.php$ {
        include snippets/fastcgi-php.conf;
        fastcgi_pass {{ fastcgi_pass }};
    }
{% endif %}
{% if custom_lines %}

{% for line in custom_lines %}
    {{ line }}
{% endfor %}
{% endif %}
}
"#;

/// Names accepted by [`SiteSpec::preset`]
pub const PRESETS: [&str; 4] = ["static", "spa", "proxy", "php"];

/// Description of a new virtual host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSpec {
    pub server_name: String,
    pub port: u16,
    /// Document root; ignored for reverse proxies
    pub root: Option<String>,
    pub index: String,
    pub ssl: bool,
    pub ssl_certificate: Option<String>,
    pub ssl_certificate_key: Option<String>,
    /// Add a port 80 block redirecting to HTTPS
    pub force_https: bool,
    /// Upstream URL; makes the site a reverse proxy
    pub proxy_pass: Option<String>,
    pub proxy_headers: bool,
    /// Serve `index.html` for unknown paths (client-side routing)
    pub spa: bool,
    pub gzip: bool,
    pub client_max_body_size: String,
    pub access_log: String,
    pub error_log: String,
    /// PHP-FPM socket path (`/run/php.sock`, `unix:/run/php.sock`) or `host:port`
    pub php_socket: Option<String>,
    /// Extra directives appended to the server block
    pub custom: String,
}

impl Default for SiteSpec {
    fn default() -> Self {
        Self {
            server_name: String::new(),
            port: 80,
            root: Some("/var/www/html".to_string()),
            index: "index.html".to_string(),
            ssl: false,
            ssl_certificate: None,
            ssl_certificate_key: None,
            force_https: false,
            proxy_pass: None,
            proxy_headers: true,
            spa: false,
            gzip: true,
            client_max_body_size: "10M".to_string(),
            access_log: "/var/log/nginx/access.log".to_string(),
            error_log: "/var/log/nginx/error.log".to_string(),
            php_socket: None,
            custom: String::new(),
        }
    }
}

impl SiteSpec {
    /// Built-in starting point for common site kinds
    pub fn preset(name: &str, server_name: &str) -> Option<Self> {
        let base = Self {
            server_name: server_name.to_string(),
            ..Default::default()
        };

        let spec = match name {
            "static" => Self {
                index: "index.html index.htm".to_string(),
                ..base
            },
            "spa" => Self {
                root: Some("/var/www/spa".to_string()),
                spa: true,
                client_max_body_size: "5M".to_string(),
                ..base
            },
            "proxy" => Self {
                root: None,
                proxy_pass: Some("http://localhost:3000".to_string()),
                client_max_body_size: "50M".to_string(),
                ..base
            },
            "php" => Self {
                root: Some("/var/www/php".to_string()),
                index: "index.php index.html".to_string(),
                php_socket: Some("/var/run/php/php-fpm.sock".to_string()),
                client_max_body_size: "100M".to_string(),
                ..base
            },
            _ => return None,
        };
        Some(spec)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Every problem that would make the rendered configuration unusable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());

        if self.server_name.trim().is_empty() {
            problems.push("Server name is required".to_string());
        }
        if self.port == 0 {
            problems.push("Port must be between 1 and 65535".to_string());
        }

        if self.ssl {
            if blank(&self.ssl_certificate) {
                problems.push("SSL certificate path is required when SSL is enabled".to_string());
            }
            if blank(&self.ssl_certificate_key) {
                problems.push("SSL key path is required when SSL is enabled".to_string());
            }
        } else if self.force_https {
            problems.push("Forcing HTTPS requires SSL".to_string());
        }

        match &self.proxy_pass {
            Some(url) if url.trim().is_empty() => {
                problems.push("Proxy pass URL must not be empty".to_string())
            }
            Some(_) => {}
            None if blank(&self.root) => {
                problems.push("Root path is required for static file serving".to_string())
            }
            None => {}
        }

        if self.php_socket.is_some() && blank(&self.php_socket) {
            problems.push("PHP-FPM socket must not be empty".to_string());
        }

        problems
    }

    /// NGINX configuration text for this site
    pub fn render(&self) -> Result<String> {
        let problems = self.validate();
        if !problems.is_empty() {
            return Err(Error::InvalidSiteSpec(problems));
        }

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("site", SITE_TEMPLATE)?;

        let custom_lines: Vec<&str> = self
            .custom
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .collect();

        let template = env.get_template("site")?;
        let rendered = template.render(context! {
            site => self,
            fallback => if self.spa { "/index.html" } else { "=404" },
            fastcgi_pass => self.fastcgi_pass(),
            custom_lines => custom_lines,
        })?;

        Ok(rendered.trim_start().to_string())
    }

    /// File name derived from the server name
    pub fn file_name(&self) -> String {
        let first = self.server_name.split_whitespace().next().unwrap_or_default();
        let name = first.strip_prefix("http://").unwrap_or(first);
        let name = name.strip_prefix("https://").unwrap_or(name);
        name.replace(['.', ':'], "_")
    }

    fn fastcgi_pass(&self) -> Option<String> {
        if self.proxy_pass.is_some() {
            return None;
        }
        let socket = self.php_socket.as_deref()?;
        if socket.starts_with('/') || socket.starts_with("unix:") {
            Some(format!("unix:{}", socket.trim_start_matches("unix:")))
        } else {
            Some(socket.to_string())
        }
    }
}
