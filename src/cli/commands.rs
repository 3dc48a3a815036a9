//! CLI command implementations

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cli::{
    error, info, print_error_lines, print_log_table, print_metrics_table, print_site_table,
    print_stats, print_structured, print_system, success, warn, CreateArgs, OutputFormat,
};
use crate::config::{self, loader::CONFIG_FILENAME};
use crate::nginx::{template::PRESETS, Action, MetricsHistory, NginxService, SiteSpec};

fn service() -> Result<NginxService> {
    let config = config::load_config_or_default()?;
    Ok(NginxService::new(config))
}

/// Run `action` and report its outcome
async fn run_action(action: Action) -> Result<()> {
    let service = service()?;
    match service.execute(action).await {
        Ok(message) => {
            success(&message);
            Ok(())
        }
        Err(e) => {
            error(&e.to_string());
            Err(e.into())
        }
    }
}

/// Initialize a new ngxdash.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Adjust the NGINX paths if your installation uses a non-standard layout");

    Ok(())
}

/// Show the detected environment
pub async fn env(format: OutputFormat) -> Result<()> {
    let service = service()?;
    let environment = service.environment().await;

    if print_structured(&environment, format)? {
        return Ok(());
    }

    match environment.container_id() {
        Some(id) => info(&format!("NGINX runs in container {}", id.cyan())),
        None => info("NGINX runs natively on this host"),
    }
    Ok(())
}

/// List configured sites
pub async fn sites(format: OutputFormat) -> Result<()> {
    let service = service()?;
    let sites = service.list_sites().await?;

    if !print_structured(&sites, format)? {
        print_site_table(&sites);
    }
    Ok(())
}

pub async fn enable(name: &str) -> Result<()> {
    run_action(Action::EnableSite(name.to_string())).await
}

pub async fn disable(name: &str) -> Result<()> {
    run_action(Action::DisableSite(name.to_string())).await
}

pub async fn test() -> Result<()> {
    run_action(Action::TestConfig).await
}

pub async fn reload() -> Result<()> {
    run_action(Action::Reload).await
}

/// Create a site from a file, a site description or a preset
pub async fn create(args: CreateArgs) -> Result<()> {
    let (content, suggested) = if let Some(path) = &args.file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        (content, name)
    } else {
        let spec = if let Some(path) = &args.spec {
            SiteSpec::from_file(path)?
        } else if let Some(preset) = &args.preset {
            let server_name = args.server_name.as_deref().unwrap_or_default();
            match SiteSpec::preset(preset, server_name) {
                Some(spec) => spec,
                None => bail!(
                    "Unknown preset '{}', expected one of: {}",
                    preset,
                    PRESETS.join(", ")
                ),
            }
        } else {
            bail!("One of --file, --spec or --preset is required");
        };
        (spec.render()?, Some(spec.file_name()))
    };

    let Some(filename) = args.filename.or(suggested).filter(|n| !n.is_empty()) else {
        bail!("Cannot derive a file name, pass one explicitly");
    };

    if args.dry_run {
        info(&format!("Would create {}:", filename));
        println!("{}", content);
        return Ok(());
    }

    info(&format!("Creating site {}", filename));
    run_action(Action::CreateSite { filename, content }).await
}

/// Show the tail of the access or error log
pub async fn logs(tail: usize, errors: bool, format: OutputFormat) -> Result<()> {
    let service = service()?;

    if errors {
        let lines = service.error_logs(tail).await?;
        if !print_structured(&lines, format)? {
            print_error_lines(&lines);
        }
        return Ok(());
    }

    let entries = service.access_logs(tail).await?;
    if !print_structured(&entries, format)? {
        print_log_table(&entries);
    }
    Ok(())
}

/// Summarize recent traffic
pub async fn stats(format: OutputFormat) -> Result<()> {
    let service = service()?;
    let stats = service.log_stats().await?;

    if !print_structured(&stats, format)? {
        print_stats(&stats);
    }
    Ok(())
}

/// Take one or more metrics samples
pub async fn metrics(samples: usize, interval: Option<u64>, format: OutputFormat) -> Result<()> {
    let service = service()?;
    let pause = interval
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| service.config().metrics.interval());
    let mut history = MetricsHistory::new(service.config().metrics.history_size, pause);

    let mut rows = Vec::with_capacity(samples);
    for i in 0..samples.max(1) {
        if i > 0 {
            tokio::time::sleep(pause).await;
        }
        let sample = service.sample_metrics().await;
        let rate = history.record(&sample);
        rows.push((sample, rate));
    }

    let samples: Vec<_> = rows.iter().map(|(m, _)| m).collect();
    if !print_structured(&samples, format)? {
        print_metrics_table(&rows);
    }
    Ok(())
}

/// Show host-wide metrics
pub async fn system(format: OutputFormat) -> Result<()> {
    let service = service()?;
    let system = service.system_metrics().await;

    if !print_structured(&system, format)? {
        print_system(&system);
    }
    Ok(())
}
