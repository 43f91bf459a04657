pub(crate) mod clap;
mod logging;
mod runtime;
mod server;
mod signal;

use std::time::Duration;

use queryfan_core::{Error, Result};
use server::Server;
use tracing::{debug, error};

const RUNTIME_SHUTDOWN: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
	let args = clap::parse();
	let runtime = runtime::new(&args)?;
	let server = Server::build(&args, Some(runtime.handle()))?;

	runtime.spawn(signal::signal(server.server.clone()));
	let result = runtime.block_on(async_main(&server));
	runtime.shutdown_timeout(RUNTIME_SHUTDOWN);
	result?;

	debug!("Exit");
	Ok(())
}

/// Start, run and stop the node within the asynchronous runtime.
async fn async_main(server: &Server) -> Result<(), Error> {
	let services = match queryfan_router::start(server.server.clone()).await {
		| Ok(services) => services,
		| Err(e) => {
			error!("Critical error starting server: {e}");
			return Err(e);
		},
	};

	if let Err(e) = queryfan_router::run(services.clone()).await {
		error!("Critical error running server: {e}");
		queryfan_router::stop(services).await?;
		return Err(e);
	}

	if let Err(e) = queryfan_router::stop(services).await {
		error!("Critical error stopping server: {e}");
		return Err(e);
	}

	debug!("Exit runtime");
	Ok(())
}
