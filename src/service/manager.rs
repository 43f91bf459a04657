use std::sync::Arc;

use queryfan_core::{Error, Result, Server};
use tokio::{
	sync::{Mutex, MutexGuard},
	task::{JoinHandle, JoinSet},
};
use tracing::{debug, error, trace, warn};

use crate::Service;

/// Supervises the long-running service workers. Worker failures while the
/// server is running propagate out through `poll` and trigger shutdown.
pub(crate) struct Manager {
	manager: Mutex<Option<JoinHandle<Result<()>>>>,
	workers: Mutex<Workers>,
	server: Arc<Server>,
	services: Vec<Arc<dyn Service>>,
}

type Workers = JoinSet<WorkerResult>;
type WorkerResult = (Arc<dyn Service>, Result<()>);
type WorkersLocked<'a> = MutexGuard<'a, Workers>;

impl Manager {
	pub(super) fn new(server: &Arc<Server>, services: Vec<Arc<dyn Service>>) -> Arc<Self> {
		Arc::new(Self {
			manager: Mutex::new(None),
			workers: Mutex::new(JoinSet::new()),
			server: server.clone(),
			services,
		})
	}

	pub(super) async fn poll(&self) -> Result<()> {
		if let Some(manager) = &mut *self.manager.lock().await {
			trace!("Polling service manager...");
			return manager.await?;
		}

		Ok(())
	}

	pub(super) async fn start(self: Arc<Self>) -> Result<()> {
		let mut workers = self.workers.lock().await;

		debug!("Starting service manager...");
		let self_ = self.clone();
		_ = self
			.manager
			.lock()
			.await
			.insert(self.server.runtime().spawn(async move { self_.worker().await }));

		debug!("Starting service workers...");
		for service in self.services.clone() {
			self.start_worker(&mut workers, &service);
		}

		Ok(())
	}

	pub(super) async fn stop(&self) {
		for service in &self.services {
			service.interrupt();
		}

		if let Some(manager) = self.manager.lock().await.take() {
			debug!("Waiting for service manager...");
			if let Err(e) = manager.await {
				error!("Manager shutdown error: {e:?}");
			}
		}
	}

	async fn worker(&self) -> Result<()> {
		loop {
			let mut workers = self.workers.lock().await;
			tokio::select! {
				result = workers.join_next() => match result {
					| Some(Ok(result)) => self.handle_result(&mut workers, result)?,
					| Some(Err(error)) => self.handle_abort(Error::from(error))?,
					| None => break,
				}
			}
		}

		debug!("Worker manager finished");
		Ok(())
	}

	fn handle_abort(&self, error: Error) -> Result<()> {
		if !self.server.running() {
			return Ok(());
		}

		error!("service worker aborted: {error}");
		Err(error)
	}

	fn handle_result(&self, _workers: &mut WorkersLocked<'_>, result: WorkerResult) -> Result<()> {
		let (service, result) = result;
		match result {
			| Ok(()) => {
				debug!("service {:?} worker finished", service.name());
				Ok(())
			},
			| Err(error) => {
				let name = service.name();
				if !self.server.running() {
					warn!("service {name:?} error ignored on shutdown: {error}");
					return Ok(());
				}

				error!("service {name:?} aborted: {error}");
				Err(error)
			},
		}
	}

	fn start_worker(&self, workers: &mut WorkersLocked<'_>, service: &Arc<dyn Service>) {
		debug!("Service {:?} worker starting...", service.name());
		workers.spawn_on(worker(service.clone()), self.server.runtime());
	}
}

/// Base frame for service workers; pairs the result with the service so the
/// manager can attribute failures.
async fn worker(service: Arc<dyn Service>) -> WorkerResult {
	let result = service.clone().worker().await;

	(service, result)
}
