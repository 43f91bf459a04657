use std::{sync::Arc, time::Duration};

use axum_server::Handle as ServerHandle;
use queryfan_core::{Result, Server};
use queryfan_service::Services;

use crate::{layers, serve};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Build and start the services for this process.
pub async fn start(server: Arc<Server>) -> Result<Arc<Services>> {
	tracing::debug!("Starting...");

	let services = Services::build(server)?;
	services.start().await?;

	tracing::debug!("Started");
	Ok(services)
}

/// Main loop: serve the wire protocol until a shutdown signal arrives or the
/// service manager reports a failed worker.
pub async fn run(services: Arc<Services>) -> Result<()> {
	let server = services.server.clone();
	let app = layers::build(&services);

	let handle = ServerHandle::new();
	let sigs = server
		.runtime()
		.spawn(signal(server.clone(), handle.clone()));

	let mut listener = server
		.runtime()
		.spawn(listen(server.clone(), app, handle));

	tracing::debug!("Running");
	let result = tokio::select! {
		result = &mut listener => result.map_err(Into::into).unwrap_or_else(Err),
		result = services.poll() => handle_services_poll(&server, result, listener).await,
	};

	sigs.abort();
	_ = sigs.await;

	tracing::debug!("Finish");
	result
}

/// Tear the services down and release the runtime.
pub async fn stop(services: Arc<Services>) -> Result<()> {
	tracing::debug!("Shutting down...");

	services.stop().await;

	tracing::info!("Shutdown complete.");
	Ok(())
}

async fn listen(
	server: Arc<Server>,
	app: axum::routing::IntoMakeService<axum::Router>,
	handle: ServerHandle,
) -> Result<()> {
	serve::plain(&server, app, handle).await
}

async fn signal(server: Arc<Server>, handle: ServerHandle) {
	loop {
		let sig: &'static str = server
			.signal
			.subscribe()
			.recv()
			.await
			.expect("channel error");

		if !server.running() {
			tracing::debug!("Received signal {sig}, shutting down gracefully");
			handle.graceful_shutdown(Some(SHUTDOWN_TIMEOUT));
			break;
		}
	}
}

async fn handle_services_poll(
	server: &Arc<Server>,
	result: Result<()>,
	listener: tokio::task::JoinHandle<Result<()>>,
) -> Result<()> {
	tracing::debug!("Service manager finished: {result:?}");

	if server.running() {
		if let Err(e) = server.shutdown() {
			tracing::error!("Failed to send shutdown signal: {e}");
		}
	}

	if let Err(e) = listener.await {
		tracing::error!("Listener task finished with error: {e}");
	}

	result
}
