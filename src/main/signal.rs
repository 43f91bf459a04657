use std::sync::Arc;

use queryfan_core::Server;
use tracing::{debug, warn};

/// Wait for SIGINT/SIGTERM and translate the first one into a graceful
/// server shutdown.
pub(super) async fn signal(server: Arc<Server>) {
	use tokio::signal::unix;

	let mut interrupt =
		unix::signal(unix::SignalKind::interrupt()).expect("SIGINT handler installs");
	let mut terminate =
		unix::signal(unix::SignalKind::terminate()).expect("SIGTERM handler installs");

	tokio::select! {
		_ = interrupt.recv() => debug!("Received SIGINT"),
		_ = terminate.recv() => debug!("Received SIGTERM"),
	}

	if server.running() {
		if let Err(e) = server.shutdown() {
			warn!("shutdown signalling failed: {e}");
		}
	}
}
