use std::{
	sync::atomic::{AtomicBool, Ordering},
	time::SystemTime,
};

use tokio::{runtime, sync::broadcast};

use crate::{
	Error, Metrics, NodeId, Result,
	config::{Config, Node},
};

/// Per-process runtime state shared by every component.
pub struct Server {
	/// This process's identity within the overlay.
	pub id: NodeId,

	/// Deployment-wide configuration instance.
	pub config: Config,

	/// Timestamp server was started; used for uptime.
	pub started: SystemTime,

	/// Shutdown pending indicator. This is an observable used on shutdown
	/// and should not be modified.
	pub stopping: AtomicBool,

	/// Handle to the runtime.
	pub runtime: Option<runtime::Handle>,

	/// Shutdown signal.
	pub signal: broadcast::Sender<&'static str>,

	/// Query and admission statistics.
	pub metrics: Metrics,
}

impl Server {
	pub fn new(id: NodeId, config: Config, runtime: Option<runtime::Handle>) -> Result<Self> {
		if !config.processes.contains_key(&id) {
			return Err(Error::Config(
				"processes",
				format!("node {id} is not declared in this configuration").into(),
			));
		}

		Ok(Self {
			id,
			config,
			started: SystemTime::now(),
			stopping: AtomicBool::new(false),
			runtime,
			signal: broadcast::channel::<&'static str>(1).0,
			metrics: Metrics::new(),
		})
	}

	/// The configuration entry for this process.
	#[must_use]
	pub fn local(&self) -> &Node {
		self.config
			.processes
			.get(&self.id)
			.expect("local node present in checked configuration")
	}

	pub fn shutdown(&self) -> Result<()> {
		if self.stopping.swap(true, Ordering::AcqRel) {
			return Err(Error::Err("Shutdown already in progress".into()));
		}

		self.signal("SIGTERM")
	}

	pub fn signal(&self, sig: &'static str) -> Result<()> {
		if let Err(e) = self.signal.send(sig) {
			return Err(Error::Err(format!("Failed to send signal: {e}").into()));
		}

		Ok(())
	}

	#[inline]
	pub fn runtime(&self) -> &runtime::Handle {
		self.runtime
			.as_ref()
			.expect("runtime handle available in Server")
	}

	#[inline]
	pub fn running(&self) -> bool { !self.stopping.load(Ordering::Acquire) }
}
