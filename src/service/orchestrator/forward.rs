use std::{collections::HashMap, sync::Arc, time::Instant};

use futures::{StreamExt, stream::FuturesUnordered};
use queryfan_core::{
	Error, NodeId, Result,
	config::Forwarding,
	overlay::Hops,
	proto::{Row, Status, decode_rows},
};
use tracing::{debug, trace};

use super::{Orchestrator, Query};

/// Rows and trace contributed by one downstream child.
pub(super) struct Partial {
	pub(super) rows: Vec<Arc<Row>>,
	pub(super) hops: Hops,
}

/// Fan the query out to the eligible downstream set and collect one result
/// per child, in declaration order. Results never fail the parent query; an
/// `Err` entry degrades to an empty partial with a failure marker.
pub(super) async fn dispatch(
	orchestrator: &Orchestrator,
	query: &Query,
	eligible: &[NodeId],
) -> Vec<(NodeId, Result<Partial>)> {
	let targets = targets(query.limit, eligible);
	if targets.is_empty() {
		return Vec::new();
	}

	if Instant::now() >= query.deadline {
		debug!("deadline expired before fan-out; skipping downstream");
		return Vec::new();
	}

	let strategies = &orchestrator.server.config.strategies;
	match strategies.effective_forwarding() {
		| Forwarding::RoundRobin => round_robin(orchestrator, query, &targets).await,
		| Forwarding::Parallel => concurrent(orchestrator, query, &targets).await,
		| Forwarding::Capacity => {
			let sorted = sort_by_load(orchestrator, &targets);
			let mut by_node: HashMap<NodeId, Result<Partial>> =
				concurrent(orchestrator, query, &sorted)
					.await
					.into_iter()
					.collect();

			// Merge order stays the declared order no matter how the
			// capacity sort issued the calls.
			targets
				.iter()
				.map(|&(id, _)| {
					let result = by_node
						.remove(&id)
						.unwrap_or_else(|| Err(deadline_expired(id)));
					(id, result)
				})
				.collect()
		},
	}
}

/// Partition the limit into equal shares, remainder to the earliest declared
/// children; zero-share children are not addressed at all.
pub(super) fn split_limit(limit: u32, children: usize) -> Vec<u32> {
	let children = children as u32;
	let share = limit / children;
	let remainder = limit % children;

	(0..children)
		.map(|i| share + u32::from(i < remainder))
		.collect()
}

fn targets(limit: u32, eligible: &[NodeId]) -> Vec<(NodeId, u32)> {
	if eligible.is_empty() {
		return Vec::new();
	}

	eligible
		.iter()
		.copied()
		.zip(split_limit(limit, eligible.len()))
		.filter(|&(_, share)| share > 0)
		.collect()
}

/// Blocking strategy: await each child completely before the next, in
/// declared order.
async fn round_robin(
	orchestrator: &Orchestrator,
	query: &Query,
	targets: &[(NodeId, u32)],
) -> Vec<(NodeId, Result<Partial>)> {
	let mut results = Vec::with_capacity(targets.len());

	for &(id, share) in targets {
		let result = fetch_partial(orchestrator, query, id, share).await;
		results.push((id, result));
	}

	results
}

/// Issue every child interaction concurrently and wait until all complete or
/// the deadline expires; pending calls are cancelled by dropping their
/// futures, already-received partials are kept.
async fn concurrent(
	orchestrator: &Orchestrator,
	query: &Query,
	targets: &[(NodeId, u32)],
) -> Vec<(NodeId, Result<Partial>)> {
	let mut pending: FuturesUnordered<_> = targets
		.iter()
		.map(|&(id, share)| async move {
			(id, fetch_partial(orchestrator, query, id, share).await)
		})
		.collect();

	let deadline = tokio::time::Instant::from_std(query.deadline);
	let mut finished: HashMap<NodeId, Result<Partial>> = HashMap::with_capacity(targets.len());

	while finished.len() < targets.len() {
		tokio::select! {
			completed = pending.next() => match completed {
				| Some((id, result)) => {
					finished.insert(id, result);
				},
				| None => break,
			},
			() = tokio::time::sleep_until(deadline) => {
				trace!(outstanding = targets.len() - finished.len(), "deadline expired, cancelling fan-out");
				break;
			},
		}
	}

	drop(pending);

	targets
		.iter()
		.map(|&(id, _)| {
			let result = finished
				.remove(&id)
				.unwrap_or_else(|| Err(deadline_expired(id)));
			(id, result)
		})
		.collect()
}

/// Capacity strategy ordering: least-loaded first by the cached hints, ties
/// and unknown loads in declaration order.
fn sort_by_load(orchestrator: &Orchestrator, targets: &[(NodeId, u32)]) -> Vec<(NodeId, u32)> {
	let mut sorted = targets.to_vec();
	sorted.sort_by(|&(a, _), &(b, _)| {
		let load_a = orchestrator.registry.load_hint(a).unwrap_or(f64::INFINITY);
		let load_b = orchestrator.registry.load_hint(b).unwrap_or(f64::INFINITY);

		load_a
			.partial_cmp(&load_b)
			.unwrap_or(std::cmp::Ordering::Equal)
	});

	sorted
}

/// One complete child interaction: `Query` for the metadata, then a
/// `GetChunk` fetch per chunk. A child that rejected for capacity or
/// suppressed a loop contributes an empty partial; everything else
/// non-OK is an error for the merger to mark.
async fn fetch_partial(
	orchestrator: &Orchestrator,
	query: &Query,
	id: NodeId,
	share: u32,
) -> Result<Partial> {
	let request = query.sub_request(share);
	let response = orchestrator
		.registry
		.query(id, &request, query.deadline)
		.await?;

	let hops = Hops::parse(&response.hops)?;

	match response.status {
		| Status::Ok => {},
		| Status::LoopSuppressed | Status::CapacityExhausted => {
			debug!(%id, status = %response.status, "downstream contributed no rows");
			return Ok(Partial { rows: Vec::new(), hops });
		},
		| status =>
			return Err(Error::Err(
				format!("neighbor {id} answered query with {status}").into(),
			)),
	}

	let Some(uid) = response.uid else {
		return Err(Error::Err(format!("neighbor {id} answered OK without a uid").into()));
	};

	let mut rows = Vec::with_capacity(response.total_records as usize);
	for index in 0..response.total_chunks {
		let chunk = orchestrator
			.registry
			.get_chunk(id, &uid, index, query.deadline)
			.await?;

		if !chunk.status.is_ok() {
			return Err(Error::Err(
				format!("neighbor {id} answered chunk {index} with {}", chunk.status).into(),
			));
		}

		rows.extend(decode_rows(&chunk.data)?.into_iter().map(Arc::new));
	}

	Ok(Partial { rows, hops })
}

fn deadline_expired(id: NodeId) -> Error {
	Error::NeighborUnreachable(id, "cancelled at query deadline".into())
}
