use std::{
	net::SocketAddr,
	sync::Arc,
};

use axum::Router;
use axum_server::{Handle as ServerHandle, bind};
use queryfan_core::{Error, Result, Server};
use tracing::info;

/// Bind the node's declared endpoint and serve until gracefully shut down
/// through the handle.
pub(crate) async fn plain(
	server: &Arc<Server>,
	app: axum::routing::IntoMakeService<Router>,
	handle: ServerHandle,
) -> Result<()> {
	let local = server.local();
	let addr: SocketAddr = format!("{}:{}", local.host, local.port)
		.parse()
		.map_err(|e| Error::Err(format!("invalid listen address: {e}").into()))?;

	info!("Listening on {addr}");
	bind(addr).handle(handle).serve(app).await?;
	info!("Stopped listening on {addr}");

	Ok(())
}
