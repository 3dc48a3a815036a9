//! Stand-ins for the host system and the Docker daemon
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ngxdash::config::{Config, NginxPaths};
use ngxdash::docker::{ContainerInfo, ContainerRuntime, LogStream};
use ngxdash::error::{Error, Result};
use ngxdash::exec::{CommandOutput, CommandRunner};
use ngxdash::probe::ContainerDetector;

/// Returns canned output keyed by the full command line and records every call
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, CommandOutput>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, command: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, command: &str) -> bool {
        self.calls().iter().any(|c| c == command)
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(command.clone());

        self.responses
            .lock()
            .unwrap()
            .get(&command)
            .cloned()
            .ok_or_else(|| Error::Command {
                program: program.to_string(),
                message: "not available in tests".to_string(),
            })
    }
}

/// In-memory container runtime
#[derive(Default)]
pub struct FakeRuntime {
    execs: Mutex<HashMap<String, CommandOutput>>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub info: ContainerInfo,
    pub ports: Vec<String>,
    calls: Mutex<Vec<String>>,
    copied: Mutex<Vec<(String, String)>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned result for `cmd` run inside the container
    pub fn on_exec(self, cmd: &str, output: CommandOutput) -> Self {
        self.execs.lock().unwrap().insert(cmd.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, cmd: &str) -> bool {
        self.calls().iter().any(|c| c == cmd)
    }

    /// `(target, content)` of every file copied into the container
    pub fn copied(&self) -> Vec<(String, String)> {
        self.copied.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn exec(&self, _container_id: &str, cmd: &[&str]) -> Result<CommandOutput> {
        let command = cmd.join(" ");
        self.calls.lock().unwrap().push(command.clone());

        Ok(self
            .execs
            .lock()
            .unwrap()
            .get(&command)
            .cloned()
            .unwrap_or_else(|| CommandOutput::failed(format!("{}: not found", cmd[0]))))
    }

    async fn logs(
        &self,
        _container_id: &str,
        tail: usize,
        stream: LogStream,
    ) -> Result<Vec<String>> {
        let lines = match stream {
            LogStream::Stdout => &self.stdout,
            LogStream::Stderr => &self.stderr,
        };
        let skip = lines.len().saturating_sub(tail);
        Ok(lines[skip..].to_vec())
    }

    async fn inspect(&self, _container_id: &str) -> Result<ContainerInfo> {
        Ok(self.info.clone())
    }

    async fn ports(&self, _container_id: &str) -> Result<Vec<String>> {
        Ok(self.ports.clone())
    }

    async fn copy_into(&self, _container_id: &str, source: &Path, target: &str) -> Result<()> {
        let content = std::fs::read_to_string(source)?;
        self.copied
            .lock()
            .unwrap()
            .push((target.to_string(), content));
        Ok(())
    }
}

/// Detector with a fixed answer that counts how often it is asked
pub struct StubDetector {
    container_id: Option<String>,
    calls: AtomicUsize,
}

impl StubDetector {
    pub fn container(id: &str) -> Self {
        Self {
            container_id: Some(id.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn native() -> Self {
        Self {
            container_id: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerDetector for StubDetector {
    async fn detect(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.container_id
            .clone()
            .ok_or_else(|| Error::NotContainerized("stub".to_string()))
    }
}

/// NGINX layout rooted in a temporary directory
pub struct NginxTree {
    pub root: tempfile::TempDir,
    pub paths: NginxPaths,
}

impl NginxTree {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let base = root.path();

        let paths = NginxPaths {
            sites_available: base.join("sites-available"),
            sites_enabled: base.join("sites-enabled"),
            conf_d: base.join("conf.d"),
            main_config: base.join("nginx.conf"),
            access_log: base.join("log/access.log"),
            error_log: base.join("log/error.log"),
            proc_root: base.join("proc"),
            service_name: "nginx".to_string(),
        };

        std::fs::create_dir_all(&paths.sites_available).unwrap();
        std::fs::create_dir_all(&paths.sites_enabled).unwrap();
        std::fs::create_dir_all(&paths.conf_d).unwrap();
        std::fs::create_dir_all(base.join("log")).unwrap();
        std::fs::create_dir_all(&paths.proc_root).unwrap();
        std::fs::write(
            &paths.main_config,
            "http {\n    include /etc/nginx/sites-enabled/*;\n}\n",
        )
        .unwrap();

        Self { root, paths }
    }

    /// Write a site file into sites-available
    pub fn add_site(&self, name: &str, content: &str) -> PathBuf {
        let path = self.paths.sites_available.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Link a site into sites-enabled
    pub fn enable(&self, name: &str) {
        std::os::unix::fs::symlink(
            self.paths.sites_available.join(name),
            self.paths.sites_enabled.join(name),
        )
        .unwrap();
    }

    pub fn write_access_log(&self, lines: &[String]) {
        std::fs::write(&self.paths.access_log, lines.join("\n") + "\n").unwrap();
    }

    pub fn config(&self) -> Config {
        Config {
            nginx: self.paths.clone(),
            ..Default::default()
        }
    }
}

/// A combined-format access log line stamped `age_secs` before now
pub fn access_line(ip: &str, path: &str, status: u16, age_secs: i64) -> String {
    let at = chrono::Utc::now() - chrono::Duration::seconds(age_secs);
    format!(
        r#"{} - - [{}] "GET {} HTTP/1.1" {} 512 "-" "curl/8.5.0""#,
        ip,
        at.format("%d/%b/%Y:%H:%M:%S %z"),
        path,
        status
    )
}
