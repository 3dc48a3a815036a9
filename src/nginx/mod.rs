//! NGINX site, log and metrics acquisition

pub mod access_log;
mod container;
pub mod directive;
pub mod history;
mod host;
pub mod metrics;
mod native;
mod service;
pub mod sites;
pub mod template;

pub use access_log::{LogEntry, LogStats};
pub use container::ContainerHost;
pub use history::{HistorySnapshot, MetricsHistory, NetworkRate, RingBuffer};
pub use host::{ControlPlane, LogSource, MetricsSource, NginxHost, SiteSource};
pub use metrics::{Metrics, MetricsSampler, SystemMetrics};
pub use native::NativeHost;
pub use service::{Action, NginxService, Snapshot};
pub use sites::Site;
pub use template::SiteSpec;
