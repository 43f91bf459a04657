use std::{
	collections::HashMap,
	sync::{
		Arc, RwLock,
		atomic::{AtomicBool, Ordering},
	},
	time::{Duration, Instant},
};

use async_trait::async_trait;
use queryfan_core::{
	Error, NodeId, Result, Server, version,
	config::Forwarding,
	proto::{ChunkResponse, MetricsResponse, QueryRequest, QueryResponse},
};
use tokio::time::interval;
use tracing::{debug, trace};

use crate::Service;

/// Typed client view over the declared neighbors. One lazily-created channel
/// per neighbor, shared by all concurrent queries; transport errors retry
/// transparently at most once per call and then surface as
/// `NEIGHBOR_UNREACHABLE`. The registry never buffers or reorders requests.
pub struct Registry {
	http: reqwest::Client,
	neighbors: RwLock<HashMap<NodeId, Arc<Neighbor>>>,
	/// Most recently observed neighbor loads; staleness is tolerated.
	hints: RwLock<HashMap<NodeId, f64>>,
	server: Arc<Server>,
	interrupted: AtomicBool,
}

struct Neighbor {
	endpoint: String,
}

impl Registry {
	pub(crate) fn build(server: &Arc<Server>) -> Result<Arc<Self>> {
		let config = &server.config.client;
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.request_timeout))
			.connect_timeout(Duration::from_secs(config.connect_timeout))
			.pool_max_idle_per_host(config.idle_per_host.into())
			.pool_idle_timeout(Duration::from_secs(config.idle_timeout))
			.user_agent("queryfan/".to_owned() + version())
			.build()?;

		Ok(Arc::new(Self {
			http,
			neighbors: RwLock::new(HashMap::new()),
			hints: RwLock::new(HashMap::new()),
			server: server.clone(),
			interrupted: AtomicBool::new(false),
		}))
	}

	pub async fn query(
		&self,
		id: NodeId,
		request: &QueryRequest,
		deadline: Instant,
	) -> Result<QueryResponse> {
		let neighbor = self.neighbor(id)?;
		let url = format!("{}/v1/query", neighbor.endpoint);

		let mut retried = false;
		loop {
			let send = self
				.http
				.post(&url)
				.timeout(remaining(id, deadline)?)
				.json(request)
				.send()
				.await;

			match send {
				| Ok(response) =>
					return response
						.json()
						.await
						.map_err(|e| unreachable(id, &e)),
				| Err(e) if !retried => {
					trace!(%id, "retrying neighbor call: {e}");
					retried = true;
				},
				| Err(e) => return Err(unreachable(id, &e)),
			}
		}
	}

	pub async fn get_chunk(
		&self,
		id: NodeId,
		uid: &str,
		index: u32,
		deadline: Instant,
	) -> Result<ChunkResponse> {
		let neighbor = self.neighbor(id)?;
		let url = format!("{}/v1/chunk/{uid}/{index}", neighbor.endpoint);

		let mut retried = false;
		loop {
			let send = self
				.http
				.get(&url)
				.timeout(remaining(id, deadline)?)
				.send()
				.await;

			match send {
				| Ok(response) =>
					return response
						.json()
						.await
						.map_err(|e| unreachable(id, &e)),
				| Err(e) if !retried => {
					trace!(%id, "retrying neighbor call: {e}");
					retried = true;
				},
				| Err(e) => return Err(unreachable(id, &e)),
			}
		}
	}

	pub async fn get_metrics(&self, id: NodeId) -> Result<MetricsResponse> {
		let neighbor = self.neighbor(id)?;
		let url = format!("{}/v1/metrics", neighbor.endpoint);

		let response = self.http.get(&url).send().await.map_err(|e| unreachable(id, &e))?;

		response.json().await.map_err(|e| unreachable(id, &e))
	}

	/// Most recently observed `active_requests / max_total` of a neighbor,
	/// if a probe has succeeded yet.
	#[must_use]
	pub fn load_hint(&self, id: NodeId) -> Option<f64> {
		self.hints
			.read()
			.expect("locked for reading")
			.get(&id)
			.copied()
	}

	/// Channels are created on first use and reused; only declared neighbors
	/// may be addressed.
	fn neighbor(&self, id: NodeId) -> Result<Arc<Neighbor>> {
		if let Some(neighbor) = self.neighbors.read().expect("locked for reading").get(&id) {
			return Ok(neighbor.clone());
		}

		if !self.server.local().neighbors.contains(&id) {
			return Err(Error::Err(format!("node {id} is not a declared neighbor").into()));
		}

		let node = self.server.config.node(id)?;
		let neighbor = Arc::new(Neighbor { endpoint: node.endpoint() });

		Ok(self
			.neighbors
			.write()
			.expect("locked for writing")
			.entry(id)
			.or_insert(neighbor)
			.clone())
	}

	async fn probe(&self) {
		let neighbors = self.server.local().neighbors.clone();
		let max_total = f64::from(self.server.config.limits.max_total);

		for id in neighbors {
			match self.get_metrics(id).await {
				| Ok(metrics) => {
					let load = f64::from(metrics.active_requests) / max_total;
					self.hints
						.write()
						.expect("locked for writing")
						.insert(id, load);
					trace!(%id, load, "refreshed neighbor load hint");
				},
				| Err(e) => debug!(%id, "neighbor load probe failed: {e}"),
			}
		}
	}
}

fn remaining(id: NodeId, deadline: Instant) -> Result<Duration> {
	let left = deadline.saturating_duration_since(Instant::now());
	if left.is_zero() {
		return Err(Error::NeighborUnreachable(id, "query deadline expired".into()));
	}

	Ok(left)
}

fn unreachable(id: NodeId, error: &reqwest::Error) -> Error {
	Error::NeighborUnreachable(id, error.to_string().into())
}

#[async_trait]
impl Service for Registry {
	/// Load probing only serves the capacity strategy; under the other
	/// strategies there is no background work.
	async fn worker(self: Arc<Self>) -> Result<()> {
		if self.server.config.strategies.effective_forwarding() != Forwarding::Capacity {
			return Ok(());
		}

		let mut signal = self.server.signal.subscribe();
		let mut ticker = interval(Duration::from_secs(self.server.config.client.probe_interval));

		loop {
			tokio::select! {
				_ = ticker.tick() => {
					if self.interrupted.load(Ordering::Acquire) {
						break;
					}

					self.probe().await;
				},
				_ = signal.recv() => break,
			}
		}

		trace!("registry probe worker finished");
		Ok(())
	}

	fn interrupt(&self) { self.interrupted.store(true, Ordering::Release); }

	fn name(&self) -> &str { "registry" }
}
