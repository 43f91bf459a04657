pub mod router;
mod server;

/// Shared handler state: the built service registry.
pub type State = std::sync::Arc<queryfan_service::Services>;
