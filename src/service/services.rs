use std::sync::Arc;

use queryfan_core::{Result, Server};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::{
	Service, admission::Admission, cache::Cache, data::Data, manager::Manager,
	orchestrator::Orchestrator, registry::Registry,
};

/// All services of one process, built leaves-first in dependency order:
/// data store, cache, registry, admission, orchestrator.
pub struct Services {
	pub admission: Arc<Admission>,
	pub cache: Arc<Cache>,
	pub data: Arc<Data>,
	pub orchestrator: Arc<Orchestrator>,
	pub registry: Arc<Registry>,
	pub server: Arc<Server>,

	manager: Mutex<Option<Arc<Manager>>>,
}

impl Services {
	pub fn build(server: Arc<Server>) -> Result<Arc<Self>> {
		let data = Data::build(&server)?;
		let cache = Cache::build(&server);
		let registry = Registry::build(&server)?;
		let admission = Admission::build(&server);
		let orchestrator = Orchestrator::build(&server, &admission, &data, &cache, &registry);

		Ok(Arc::new(Self {
			admission,
			cache,
			data,
			orchestrator,
			registry,
			server,
			manager: Mutex::new(None),
		}))
	}

	/// Spawn the background workers (cache eviction, registry load probe)
	/// under the service manager.
	pub async fn start(&self) -> Result<()> {
		debug!("Starting services...");

		let workers: Vec<Arc<dyn Service>> =
			vec![self.cache.clone(), self.registry.clone()];
		let manager = Manager::new(&self.server, workers);
		manager.clone().start().await?;

		_ = self.manager.lock().await.insert(manager);

		info!("Services startup complete.");
		Ok(())
	}

	/// Resolves when the service manager finishes; an error here means a
	/// worker died while the server was still running.
	pub async fn poll(&self) -> Result<()> {
		let manager = self.manager.lock().await.clone();
		if let Some(manager) = manager {
			return manager.poll().await;
		}

		Ok(())
	}

	pub fn interrupt(&self) {
		trace!("Interrupting services...");
		self.cache.interrupt();
		self.registry.interrupt();
	}

	pub async fn stop(&self) {
		info!("Shutting down services...");
		self.interrupt();

		if let Some(manager) = self.manager.lock().await.take() {
			manager.stop().await;
		}

		debug!("Services shutdown complete.");
	}
}
