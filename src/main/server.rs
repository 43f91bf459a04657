use std::sync::Arc;

use queryfan_core::{Config, NodeId, Result};
use tokio::runtime;
use tracing::info;

use crate::{clap::Args, logging};

/// Server runtime state; complete
pub(crate) struct Server {
	/// Server runtime state; public portion
	pub(crate) server: Arc<queryfan_core::Server>,
}

impl Server {
	pub(crate) fn build(args: &Args, runtime: Option<&runtime::Handle>) -> Result<Arc<Self>> {
		let config = Config::load(args.config.as_deref())?;
		logging::init(&config)?;

		config.check()?;

		let id: NodeId = args.id.parse()?;
		let server = queryfan_core::Server::new(id, config, runtime.cloned())?;
		let local = server.local();
		info!(
			id = %server.id,
			role = %local.role,
			team = %local.team,
			endpoint = %local.endpoint(),
			log = %server.config.log,
			"queryfan {}",
			queryfan_core::version(),
		);

		Ok(Arc::new(Self { server: Arc::new(server) }))
	}
}
