use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ngxdash::nginx::directive::parse_server_blocks;
use ngxdash::nginx::sites::{sites_from_running_config, summarize_site_config};
use ngxdash::nginx::SiteSpec;
use ngxdash::Config;

const SITE: &str = r#"
server {
    listen 80;
    server_name example.com www.example.com;
    return 301 https://$host$request_uri;
}

server {
    listen 443 ssl http2;
    server_name example.com www.example.com;
    ssl_certificate /etc/letsencrypt/live/example.com/fullchain.pem;
    ssl_certificate_key /etc/letsencrypt/live/example.com/privkey.pem;

    location / {
        proxy_pass http://127.0.0.1:3000;
        proxy_set_header Host $host;
    }
}
"#;

fn bench_config_parsing(c: &mut Criterion) {
    c.bench_function("directive_server_blocks", |b| {
        b.iter(|| parse_server_blocks(black_box(SITE)))
    });

    c.bench_function("site_summary", |b| {
        b.iter(|| summarize_site_config(black_box(SITE)))
    });

    let dump = (0..50)
        .map(|i| SITE.replace("example.com", &format!("site{}.example.com", i)))
        .collect::<Vec<_>>()
        .join("\n");
    c.bench_function("running_config_50_sites", |b| {
        b.iter(|| sites_from_running_config(black_box(&dump), "Running"))
    });
}

fn bench_site_render(c: &mut Criterion) {
    let spec = SiteSpec::preset("proxy", "api.example.com").unwrap();

    c.bench_function("site_spec_render", |b| b.iter(|| black_box(&spec).render()));
}

fn bench_dashboard_config(c: &mut Criterion) {
    let config = Config::default();
    let toml_str = toml::to_string(&config).unwrap();

    c.bench_function("config_from_toml", |b| {
        b.iter(|| toml::from_str::<Config>(black_box(&toml_str)))
    });
}

criterion_group!(
    benches,
    bench_config_parsing,
    bench_site_render,
    bench_dashboard_config
);
criterion_main!(benches);
