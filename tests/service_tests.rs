//! NginxService dispatch tests: environment probing, fallback and actions

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{access_line, FakeRuntime, NginxTree, ScriptedRunner, StubDetector};
use ngxdash::docker::ContainerRuntime;
use ngxdash::error::Error;
use ngxdash::exec::CommandOutput;
use ngxdash::nginx::{Action, NginxService};
use ngxdash::probe::{Environment, ManualClock};

const ID: &str = "9b1f3c5d7e2a";

struct Harness {
    service: NginxService,
    runner: Arc<ScriptedRunner>,
    detector: Arc<StubDetector>,
    clock: Arc<ManualClock>,
}

fn harness(
    tree: &NginxTree,
    runner: ScriptedRunner,
    runtime: Option<FakeRuntime>,
    detector: StubDetector,
) -> Harness {
    let runner = Arc::new(runner);
    let detector = Arc::new(detector);
    let clock = Arc::new(ManualClock::new());
    let runtime = runtime.map(|r| Arc::new(r) as Arc<dyn ContainerRuntime>);

    let service = NginxService::with_parts(
        tree.config(),
        runner.clone(),
        runtime,
        detector.clone(),
        clock.clone(),
    );

    Harness {
        service,
        runner,
        detector,
        clock,
    }
}

fn two_site_tree() -> NginxTree {
    let tree = NginxTree::new();
    tree.add_site("a.com", "server {\n    listen 80;\n}\n");
    tree.add_site("b.com", "server {\n    listen 443 ssl;\n}\n");
    tree.enable("a.com");
    tree
}

#[tokio::test]
async fn test_native_without_docker_runtime() {
    let tree = two_site_tree();
    let h = harness(&tree, ScriptedRunner::new(), None, StubDetector::container(ID));

    assert_eq!(h.service.environment().await, Environment::Native);
    assert_eq!(h.detector.calls(), 0);

    let sites = h.service.list_sites().await.unwrap();
    let names: Vec<_> = sites.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a.com", "b.com"]);
    assert_eq!(sites[1].uptime, "Disabled");
}

#[tokio::test]
async fn test_detection_is_cached_for_ttl() {
    let tree = NginxTree::new();
    let h = harness(
        &tree,
        ScriptedRunner::new(),
        Some(FakeRuntime::new()),
        StubDetector::container(ID),
    );

    assert_eq!(h.service.environment().await, Environment::Container(ID.to_string()));
    h.clock.advance(Duration::from_secs(4));
    assert_eq!(h.service.environment().await, Environment::Container(ID.to_string()));
    assert_eq!(h.detector.calls(), 1);

    h.clock.advance(Duration::from_secs(2));
    h.service.environment().await;
    assert_eq!(h.detector.calls(), 2);

    h.service.invalidate().await;
    h.service.environment().await;
    assert_eq!(h.detector.calls(), 3);
}

#[tokio::test]
async fn test_failed_detection_means_native_and_is_retried() {
    let tree = NginxTree::new();
    let h = harness(
        &tree,
        ScriptedRunner::new(),
        Some(FakeRuntime::new()),
        StubDetector::native(),
    );

    assert_eq!(h.service.environment().await, Environment::Native);
    assert_eq!(h.service.environment().await, Environment::Native);
    assert_eq!(h.detector.calls(), 2);
}

#[tokio::test]
async fn test_container_listing_wins_when_it_has_sites() {
    let tree = two_site_tree();
    let runtime = FakeRuntime::new().on_exec(
        "nginx -T",
        CommandOutput::ok("server {\n    listen 8080;\n    server_name app;\n}\n"),
    );
    let h = harness(&tree, ScriptedRunner::new(), Some(runtime), StubDetector::container(ID));

    let sites = h.service.list_sites().await.unwrap();

    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].name, "app");
    assert_eq!(sites[0].port, "8080");
}

#[tokio::test]
async fn test_failed_container_listing_falls_back_to_native() {
    let tree = two_site_tree();
    let h = harness(
        &tree,
        ScriptedRunner::new(),
        Some(FakeRuntime::new()),
        StubDetector::container(ID),
    );

    let sites = h.service.list_sites().await.unwrap();

    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].name, "a.com");
    println!("✓ Site listing falls back to the native layout");
}

#[tokio::test]
async fn test_execute_messages() {
    let tree = two_site_tree();
    let runner = ScriptedRunner::new()
        .respond("nginx -t", CommandOutput::ok(""))
        .respond("systemctl reload nginx", CommandOutput::ok(""));
    let h = harness(&tree, runner, None, StubDetector::native());

    let message = h
        .service
        .execute(Action::EnableSite("b.com".to_string()))
        .await
        .unwrap();
    assert_eq!(message, "Site b.com enabled");

    let message = h
        .service
        .execute(Action::DisableSite("a.com".to_string()))
        .await
        .unwrap();
    assert_eq!(message, "Site a.com disabled");

    assert_eq!(
        h.service.execute(Action::TestConfig).await.unwrap(),
        "Configuration test passed"
    );
    assert_eq!(h.service.execute(Action::Reload).await.unwrap(), "NGINX reloaded");

    let message = h
        .service
        .execute(Action::CreateSite {
            filename: "c.com".to_string(),
            content: "server {\n    listen 81;\n}\n".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(message, "Site c.com created");

    let sites = h.service.list_sites().await.unwrap();
    let enabled: Vec<_> = sites
        .iter()
        .filter(|s| s.enabled)
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(enabled, vec!["b.com", "c.com"]);
}

#[tokio::test]
async fn test_execute_rejects_bad_names_before_any_work() {
    let tree = NginxTree::new();
    let h = harness(
        &tree,
        ScriptedRunner::new(),
        Some(FakeRuntime::new()),
        StubDetector::container(ID),
    );

    for action in [
        Action::EnableSite(String::new()),
        Action::DisableSite("a/b".to_string()),
        Action::CreateSite {
            filename: "..".to_string(),
            content: String::new(),
        },
    ] {
        assert!(matches!(
            h.service.execute(action).await,
            Err(Error::InvalidSiteName(_))
        ));
    }
    assert_eq!(h.detector.calls(), 0);
}

#[tokio::test]
async fn test_container_actions_go_to_container() {
    let tree = NginxTree::new();
    let runtime = FakeRuntime::new().on_exec("nginx -t", CommandOutput::ok(""));
    let h = harness(&tree, ScriptedRunner::new(), Some(runtime), StubDetector::container(ID));

    assert!(h.service.execute(Action::TestConfig).await.is_ok());
    assert!(matches!(
        h.service.execute(Action::EnableSite("a.com".to_string())).await,
        Err(Error::UnsupportedInContainer(_))
    ));
    assert!(!h.runner.was_called("nginx -t"));
}

#[tokio::test]
async fn test_refresh_reads_one_host() {
    let tree = two_site_tree();
    tree.write_access_log(&[access_line("10.0.0.1", "/native", 200, 1)]);

    let mut runtime = FakeRuntime::new().on_exec(
        "nginx -T",
        CommandOutput::ok("server {\n    listen 80;\n    server_name app;\n}\n"),
    );
    runtime.stdout = vec![
        access_line("172.17.0.1", "/container", 200, 1),
        access_line("172.17.0.1", "/container", 502, 1),
    ];
    runtime.ports = vec!["80".to_string()];

    let runner = ScriptedRunner::new()
        .respond(
            "ss -tn",
            CommandOutput::ok(
                "State Recv-Q Send-Q Local Address:Port Peer Address:Port\n\
                 ESTAB 0 0 172.17.0.2:80 172.17.0.1:40000\n",
            ),
        );
    let h = harness(&tree, runner, Some(runtime), StubDetector::container(ID));

    let snapshot = h.service.refresh(50).await.unwrap();

    assert_eq!(snapshot.environment, Environment::Container(ID.to_string()));
    assert_eq!(snapshot.sites.len(), 1);
    assert_eq!(snapshot.sites[0].name, "app");
    assert_eq!(snapshot.logs.len(), 2);
    assert!(snapshot.logs.iter().all(|e| e.path == "/container"));
    assert_eq!(snapshot.metrics.active_conns, 1);
    assert_eq!(snapshot.metrics.total_conns, 2);
    assert_eq!(snapshot.metrics.cpu, 0.0);
    assert_eq!(h.detector.calls(), 1);
}

#[tokio::test]
async fn test_metrics_degrade_per_category() {
    let tree = NginxTree::new();
    std::fs::create_dir_all(tree.paths.proc_root.join("net")).unwrap();
    std::fs::write(
        tree.paths.proc_root.join("net/dev"),
        "Inter-|   Receive\n face |bytes\n  eth0: 2097152 10 0 0 0 0 0 0 1048576 10 0 0 0 0 0 0\n",
    )
    .unwrap();

    let h = harness(&tree, ScriptedRunner::new(), None, StubDetector::native());
    let metrics = h.service.sample_metrics().await;

    assert_eq!(metrics.network_in, 2.0);
    assert_eq!(metrics.network_out, 1.0);
    assert_eq!(metrics.cpu, 0.0);
    assert_eq!(metrics.active_conns, 0);
    assert_eq!(metrics.total_conns, 0);
    assert_eq!(metrics.request_rate, 0.0);
    assert!(h.runner.was_called("ss -tn"));
}

#[tokio::test]
async fn test_system_metrics_from_proc() {
    let tree = NginxTree::new();
    std::fs::write(tree.paths.proc_root.join("loadavg"), "1.50 1.00 0.50 2/300 999\n").unwrap();
    std::fs::write(
        tree.paths.proc_root.join("meminfo"),
        "MemTotal: 1000 kB\nMemFree: 100 kB\nMemAvailable: 250 kB\n",
    )
    .unwrap();
    let runner = ScriptedRunner::new().respond(
        "df -P /",
        CommandOutput::ok("Filesystem 1024-blocks Used Available Capacity Mounted on\n/dev/sda1 100 42 58 42% /\n"),
    );
    let h = harness(&tree, runner, None, StubDetector::native());

    let system = h.service.system_metrics().await;

    assert_eq!(system.load_avg_1, 1.5);
    assert_eq!(system.load_avg_15, 0.5);
    assert_eq!(system.memory_total, 1000 * 1024);
    assert_eq!(system.memory_used, 750 * 1024);
    assert_eq!(system.memory_used_percent, 75.0);
    assert_eq!(system.disk_usage, "42");
}

#[tokio::test]
async fn test_history_from_config() {
    let tree = NginxTree::new();
    let h = harness(&tree, ScriptedRunner::new(), None, StubDetector::native());

    let history = h.service.new_history();
    assert!(history.is_empty());
    assert_eq!(history.cpu.capacity(), 50);
}
