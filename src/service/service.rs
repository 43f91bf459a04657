use std::sync::Arc;

use async_trait::async_trait;
use queryfan_core::Result;

/// Abstract interface for a Service. Services are singletons built once at
/// startup, leaves first; the ones with background work implement `worker`,
/// which the manager runs in a task until shutdown.
#[async_trait]
pub(crate) trait Service: Send + Sync {
	/// Implement the service's worker loop. The service manager spawns a
	/// task and calls this function after all services have been built.
	async fn worker(self: Arc<Self>) -> Result<()> { Ok(()) }

	/// Interrupt the service. This is sent to initiate a graceful shutdown.
	/// The service worker should return from its work loop.
	fn interrupt(&self) {}

	/// Return the name of the service.
	fn name(&self) -> &str;
}
