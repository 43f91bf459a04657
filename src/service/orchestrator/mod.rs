mod chunking;
mod forward;
mod tests;

use std::{
	sync::Arc,
	time::{Duration, Instant},
};

use queryfan_core::{
	NodeId, Result, Server, Team,
	overlay::{Hop, Hops},
	proto::{Comparator, QueryRequest, QueryResponse, Row, Status},
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
	admission::Admission,
	cache::{Cache, CachedResult},
	data::Data,
	registry::Registry,
};

/// Executes one query end-to-end for this node: admission, loop check, local
/// scan, strategy-selected fan-out, merge, chunk and publish.
pub struct Orchestrator {
	server: Arc<Server>,
	admission: Arc<Admission>,
	data: Arc<Data>,
	cache: Arc<Cache>,
	registry: Arc<Registry>,
}

/// In-flight query record, exclusively owned by the orchestrator while the
/// query runs on this node.
struct Query {
	uid: String,
	field: String,
	comparator: Comparator,
	threshold: f64,
	limit: u32,
	hops: Hops,
	deadline: Instant,
}

impl Query {
	/// Client requests get a fresh UID here, at the originating node;
	/// forwards preserve the UID they carry.
	fn from_request(request: QueryRequest, default_deadline: Duration) -> Result<Self> {
		let hops = match &request.hops {
			| Some(entries) => Hops::parse(entries)?,
			| None => Hops::new(),
		};

		let deadline = request
			.deadline_ms
			.map_or(default_deadline, Duration::from_millis);

		Ok(Self {
			uid: request
				.uid
				.unwrap_or_else(|| Uuid::new_v4().to_string()),
			field: request.field,
			comparator: request.comparator,
			threshold: request.threshold,
			limit: request.limit,
			hops,
			deadline: Instant::now() + deadline,
		})
	}

	/// The sub-query forwarded downstream: reduced limit, extended hops,
	/// unchanged UID.
	fn sub_request(&self, limit: u32) -> QueryRequest {
		QueryRequest {
			field: self.field.clone(),
			comparator: self.comparator,
			threshold: self.threshold,
			limit,
			uid: Some(self.uid.clone()),
			hops: Some(self.hops.to_wire()),
			deadline_ms: Some(
				self.deadline
					.saturating_duration_since(Instant::now())
					.as_millis() as u64,
			),
		}
	}
}

impl Orchestrator {
	pub(crate) fn build(
		server: &Arc<Server>,
		admission: &Arc<Admission>,
		data: &Arc<Data>,
		cache: &Arc<Cache>,
		registry: &Arc<Registry>,
	) -> Arc<Self> {
		Arc::new(Self {
			server: server.clone(),
			admission: admission.clone(),
			data: data.clone(),
			cache: cache.clone(),
			registry: registry.clone(),
		})
	}

	/// Admission is decided first; everything after runs under the token,
	/// which releases the slot on every exit path when it drops.
	#[instrument(skip_all, fields(node = %self.server.id))]
	pub async fn handle_query(&self, request: QueryRequest) -> QueryResponse {
		let started = Instant::now();
		let team = self.charge_team(&request);
		let request_hops = request.hops.clone().unwrap_or_default();

		let _token = match self.admission.admit(team) {
			| Ok(token) => token,
			| Err(e) => {
				self.server.metrics.record_rejected();
				debug!(%team, "query rejected: {e}");
				return QueryResponse::empty(Status::CapacityExhausted, None, request_hops);
			},
		};

		self.server.metrics.record_admitted();

		match self.execute(request).await {
			| Ok(response) => {
				if response.status.is_ok() {
					self.server.metrics.record_completed();
					self.server.metrics.record_query(started.elapsed());
				}

				response
			},
			| Err(e) => {
				self.server.metrics.record_failed();
				warn!("query failed: {e}");
				QueryResponse::empty(e.status(), None, request_hops)
			},
		}
	}

	async fn execute(&self, request: QueryRequest) -> Result<QueryResponse> {
		let default_deadline =
			Duration::from_millis(self.server.config.query.default_deadline_ms);
		let mut query = Query::from_request(request, default_deadline)?;

		// Loop guard: a node accepts a query at most once; the trace is
		// returned unchanged.
		if query.hops.contains(self.server.id) {
			debug!(uid = %query.uid, "loop suppressed");
			return Ok(QueryResponse::empty(
				Status::LoopSuppressed,
				Some(query.uid),
				query.hops.to_wire(),
			));
		}

		query.hops.push(self.server.id);

		let local = self.scan_local(&query);

		let eligible: Vec<NodeId> = self
			.server
			.config
			.downstream(self.server.id)
			.into_iter()
			.filter(|id| !query.hops.contains(*id))
			.collect();

		let partials = forward::dispatch(self, &query, &eligible).await;
		let (rows, hops) = merge(local, partials, query.hops.clone(), query.limit as usize);

		let chunk_size = chunking::chunk_size(
			&self.server.config.strategies,
			rows.len(),
			query.limit,
		);

		let result = CachedResult::new(
			query.uid.clone(),
			rows,
			chunk_size,
			hops.clone(),
			self.cache.ttl(),
		);

		let response = QueryResponse {
			uid: Some(query.uid),
			total_chunks: result.total_chunks(),
			total_records: result.total_records(),
			hops: hops.to_wire(),
			status: Status::Ok,
		};

		self.cache.put(result);

		Ok(response)
	}

	fn scan_local(&self, query: &Query) -> Vec<Arc<Row>> {
		if !self.data.owns_shard() {
			return Vec::new();
		}

		let started = Instant::now();
		let rows = self.data.scan(
			&query.field,
			query.comparator,
			query.threshold,
			query.limit as usize,
		);

		self.server.metrics.record_scan(started.elapsed());
		debug!(matches = rows.len(), "local scan finished");

		rows
	}

	/// The admission ledger charges the team of the upstream sender; a
	/// client-origin query is charged to this node's own team.
	fn charge_team(&self, request: &QueryRequest) -> Team {
		request
			.hops
			.as_ref()
			.and_then(|entries| entries.last())
			.and_then(|entry| entry.parse::<Hop>().ok())
			.and_then(|hop| self.server.config.node(hop.node).ok().map(|node| node.team))
			.unwrap_or_else(|| self.server.local().team)
	}
}

/// Deterministic merge: local rows first, then each downstream partial in
/// declaration order regardless of completion order; the combined trace
/// records failed children with a marker.
fn merge(
	local: Vec<Arc<Row>>,
	partials: Vec<(NodeId, Result<forward::Partial>)>,
	mut hops: Hops,
	limit: usize,
) -> (Vec<Arc<Row>>, Hops) {
	let mut rows = local;

	for (id, partial) in partials {
		match partial {
			| Ok(partial) => {
				hops.extend_from(&partial.hops);
				rows.extend(partial.rows);
			},
			| Err(e) => {
				debug!(%id, "downstream degraded to empty partial: {e}");
				hops.push_failed(id);
			},
		}
	}

	rows.truncate(limit);

	(rows, hops)
}
