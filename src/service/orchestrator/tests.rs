#![cfg(test)]

use std::sync::Arc;

use queryfan_core::{
	Team,
	config::{Chunking, Fairness, Forwarding, Strategies},
	overlay::Hops,
	proto::{Comparator, QueryRequest, Status, decode_rows},
};

use super::{Orchestrator, chunking::chunk_size, forward, forward::split_limit, merge};
use crate::{
	admission::Admission, cache::Cache, data::Data, registry::Registry, testing,
};

fn strategies(chunking: Chunking, chunk_size: u32) -> Strategies {
	Strategies {
		forwarding: Forwarding::RoundRobin,
		async_forwarding: true,
		chunking,
		fairness: Fairness::Strict,
		chunk_size,
		max_chunk_size: 1000,
	}
}

fn request(limit: u32) -> QueryRequest {
	QueryRequest {
		field: "PM2.5".to_owned(),
		comparator: Comparator::Greater,
		threshold: 35.0,
		limit,
		uid: None,
		hops: None,
		deadline_ms: None,
	}
}

fn orchestrator_on(id: char, data: Data, admission: Admission) -> Arc<Orchestrator> {
	let server = testing::server(id);
	let admission = Arc::new(admission);
	let cache = Cache::build(&server);
	let registry = Registry::build(&server).expect("registry builds");
	let data = Arc::new(data);

	Orchestrator::build(&server, &admission, &data, &cache, &registry)
}

fn shard() -> Data {
	Data::from_rows(vec![
		testing::row(40.0, "S-1"),
		testing::row(10.0, "S-2"),
		testing::row(50.0, "S-3"),
		testing::row(36.0, "S-4"),
		testing::row(99.0, "S-5"),
	])
}

fn open_admission() -> Admission { Admission::new(Fairness::Strict, 64, 32, 32) }

#[test]
fn limit_splits_evenly_with_remainder_first() {
	assert_eq!(split_limit(5, 2), vec![3, 2]);
	assert_eq!(split_limit(6, 3), vec![2, 2, 2]);
	assert_eq!(split_limit(1, 3), vec![1, 0, 0]);
	assert_eq!(split_limit(0, 2), vec![0, 0]);
	assert_eq!(split_limit(7, 1), vec![7]);
}

#[test]
fn fixed_chunking_uses_the_base() {
	let strategies = strategies(Chunking::Fixed, 200);

	assert_eq!(chunk_size(&strategies, 0, 5), 200);
	assert_eq!(chunk_size(&strategies, 10_000, 5), 200);
}

#[test]
fn adaptive_chunking_scales_with_result_size() {
	let strategies = strategies(Chunking::Adaptive, 200);

	assert_eq!(chunk_size(&strategies, 99, 0), 50);
	assert_eq!(chunk_size(&strategies, 100, 0), 200);
	assert_eq!(chunk_size(&strategies, 499, 0), 200);
	assert_eq!(chunk_size(&strategies, 500, 0), 400);
	assert_eq!(chunk_size(&strategies, 1999, 0), 400);
	assert_eq!(chunk_size(&strategies, 2000, 0), 1000);
}

#[test]
fn query_based_chunking_clamps_to_bounds() {
	let strategies = strategies(Chunking::QueryBased, 200);

	assert_eq!(chunk_size(&strategies, 0, 100), 200);
	assert_eq!(chunk_size(&strategies, 0, 4000), 400);
	assert_eq!(chunk_size(&strategies, 0, 100_000), 500);
}

#[test]
fn merge_keeps_local_rows_first_and_declared_order() {
	let local = vec![Arc::new(testing::row(1.0, "local"))];
	let partial_b = forward::Partial {
		rows: vec![Arc::new(testing::row(2.0, "from-b"))],
		hops: Hops::parse(&["A".to_owned(), "B".to_owned()]).unwrap(),
	};
	let partial_e = forward::Partial {
		rows: vec![Arc::new(testing::row(3.0, "from-e"))],
		hops: Hops::parse(&["A".to_owned(), "E".to_owned()]).unwrap(),
	};

	let mut hops = Hops::new();
	hops.push(testing::node('A'));

	let (rows, hops) = merge(
		local,
		vec![
			(testing::node('B'), Ok(partial_b)),
			(testing::node('E'), Ok(partial_e)),
		],
		hops,
		10,
	);

	let stations: Vec<_> = rows
		.iter()
		.map(|row| row["station"].as_str().unwrap().to_owned())
		.collect();

	assert_eq!(stations, vec!["local", "from-b", "from-e"]);
	assert_eq!(hops.to_wire(), vec!["A", "B", "E"]);
}

#[test]
fn merge_truncates_to_the_limit() {
	let local = (0..4)
		.map(|i| Arc::new(testing::row(i as f64, "local")))
		.collect();

	let (rows, _) = merge(local, Vec::new(), Hops::new(), 2);

	assert_eq!(rows.len(), 2);
}

#[test]
fn merge_marks_failed_children() {
	let mut hops = Hops::new();
	hops.push(testing::node('E'));

	let (rows, hops) = merge(
		Vec::new(),
		vec![(
			testing::node('F'),
			Err(queryfan_core::Error::NeighborUnreachable(
				testing::node('F'),
				"connection refused".into(),
			)),
		)],
		hops,
		10,
	);

	assert!(rows.is_empty());
	assert_eq!(hops.to_wire(), vec!["E", "F!"]);
}

#[tokio::test]
async fn worker_query_publishes_a_chunked_result() {
	let orchestrator = orchestrator_on('C', shard(), open_admission());

	let response = orchestrator.handle_query(request(5)).await;

	assert_eq!(response.status, Status::Ok);
	assert_eq!(response.hops, vec!["C"]);
	assert_eq!(response.total_records, 4);
	assert_eq!(response.total_chunks, 1);

	let uid = response.uid.expect("published results carry a uid");
	let chunk = orchestrator.cache.get_chunk(&uid, 0).expect("chunk");
	assert_eq!(decode_rows(&chunk.data).expect("decodes").len(), 4);
}

#[tokio::test]
async fn worker_query_honors_the_limit() {
	let orchestrator = orchestrator_on('C', shard(), open_admission());

	let response = orchestrator.handle_query(request(2)).await;

	assert_eq!(response.status, Status::Ok);
	assert_eq!(response.total_records, 2);
}

#[tokio::test]
async fn zero_limit_query_publishes_an_empty_result() {
	let orchestrator = orchestrator_on('C', shard(), open_admission());

	let response = orchestrator.handle_query(request(0)).await;

	assert_eq!(response.status, Status::Ok);
	assert_eq!(response.total_records, 0);
	assert_eq!(response.total_chunks, 1);
}

#[tokio::test]
async fn loop_is_suppressed_without_touching_the_trace() {
	let orchestrator = orchestrator_on('C', shard(), open_admission());

	let mut forwarded = request(5);
	forwarded.uid = Some("carried-uid".to_owned());
	forwarded.hops = Some(vec!["A".to_owned(), "C".to_owned()]);

	let response = orchestrator.handle_query(forwarded).await;

	assert_eq!(response.status, Status::LoopSuppressed);
	assert_eq!(response.total_records, 0);
	assert_eq!(response.hops, vec!["A", "C"]);
	assert_eq!(response.uid.as_deref(), Some("carried-uid"));
}

#[tokio::test]
async fn admission_rejection_surfaces_and_leaves_counters_unchanged() {
	let admission = Admission::new(Fairness::Strict, 1, 1, 1);
	let orchestrator = orchestrator_on('C', shard(), admission);

	let _held = orchestrator
		.admission
		.admit(Team::Green)
		.expect("saturate the only slot");

	let response = orchestrator.handle_query(request(5)).await;

	assert_eq!(response.status, Status::CapacityExhausted);
	assert!(response.uid.is_none());
	assert_eq!(orchestrator.admission.snapshot().active_total, 1);
}

#[tokio::test]
async fn unreachable_child_degrades_to_a_marked_partial() {
	// B's only downstream is C; nothing listens on C's port in this test,
	// so the child interaction fails fast and is recorded in the trace.
	let orchestrator = orchestrator_on('B', Data::empty(), open_admission());

	let response = orchestrator.handle_query(request(5)).await;

	assert_eq!(response.status, Status::Ok);
	assert_eq!(response.total_records, 0);
	assert_eq!(response.hops, vec!["B", "C!"]);

	// Successive queries keep succeeding.
	let again = orchestrator.handle_query(request(5)).await;
	assert_eq!(again.status, Status::Ok);
}

#[tokio::test]
async fn forwarded_queries_are_charged_to_the_sender_team() {
	let orchestrator = orchestrator_on('E', Data::empty(), open_admission());

	let mut forwarded = request(5);
	forwarded.hops = Some(vec!["A".to_owned()]);
	assert_eq!(orchestrator.charge_team(&forwarded), Team::Green);

	let client = request(5);
	assert_eq!(orchestrator.charge_team(&client), Team::Pink);
}

#[tokio::test]
async fn admission_settles_after_each_query() {
	let orchestrator = orchestrator_on('C', shard(), open_admission());

	for _ in 0..3 {
		orchestrator.handle_query(request(5)).await;
	}

	assert_eq!(orchestrator.admission.snapshot().active_total, 0);
}
