pub mod config;
pub mod error;
pub mod metrics;
pub mod overlay;
pub mod proto;
pub mod result;
pub mod server;

pub use config::Config;
pub use error::Error;
pub use metrics::Metrics;
pub use overlay::{NodeId, Role, Team};
pub use result::Result;
pub use server::Server;

/// Crate version for logging and user-agent strings.
#[must_use]
pub fn version() -> &'static str { env!("CARGO_PKG_VERSION") }
