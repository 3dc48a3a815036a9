//! ngxdash - inspect and manage NGINX, natively or inside Docker
//!
//! This is the library interface for ngxdash: site discovery, access log
//! analysis, metrics sampling and configuration actions for an NGINX instance
//! that is either installed on the host or running in a container.

pub mod cli;
pub mod config;
pub mod docker;
pub mod error;
pub mod exec;
pub mod nginx;
pub mod probe;

pub use config::Config;
pub use error::Error;
pub use nginx::{Action, NginxService, Site};
