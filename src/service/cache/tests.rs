#![cfg(test)]

use std::{sync::Arc, time::Duration};

use queryfan_core::{overlay::Hops, proto::decode_rows};

use super::{Cache, CachedResult};
use crate::testing;

const TTL: Duration = Duration::from_secs(60);

fn cache() -> Arc<Cache> { Cache::build(&testing::server('C')) }

fn result(uid: &str, records: usize, chunk_size: u32, ttl: Duration) -> CachedResult {
	let rows = (0..records)
		.map(|i| Arc::new(testing::row(i as f64, &format!("S-{i}"))))
		.collect();

	CachedResult::new(uid.to_owned(), rows, chunk_size, Hops::new(), ttl)
}

#[test]
fn chunk_count_is_ceiling_of_records_over_size() {
	assert_eq!(result("u", 1050, 200, TTL).total_chunks(), 6);
	assert_eq!(result("u", 1000, 200, TTL).total_chunks(), 5);
	assert_eq!(result("u", 1, 200, TTL).total_chunks(), 1);
}

#[test]
fn empty_result_still_has_one_chunk() {
	let cache = cache();
	cache.put(result("empty", 0, 200, TTL));

	let chunk = cache.get_chunk("empty", 0).expect("empty chunk");
	assert_eq!(chunk.total_chunks, 1);
	assert!(chunk.is_last);
	assert!(decode_rows(&chunk.data).expect("decodes").is_empty());
}

#[test]
fn chunks_partition_the_rows() {
	let cache = cache();
	cache.put(result("uid-1", 5, 2, TTL));

	let sizes: Vec<usize> = (0..3)
		.map(|index| {
			let chunk = cache.get_chunk("uid-1", index).expect("chunk");
			decode_rows(&chunk.data).expect("decodes").len()
		})
		.collect();

	assert_eq!(sizes, vec![2, 2, 1]);

	let last = cache.get_chunk("uid-1", 2).expect("chunk");
	assert!(last.is_last);
	assert!(!cache.get_chunk("uid-1", 0).expect("chunk").is_last);
}

#[test]
fn get_chunk_is_idempotent_within_ttl() {
	let cache = cache();
	cache.put(result("uid-2", 10, 4, TTL));

	let first = cache.get_chunk("uid-2", 1).expect("chunk");
	let second = cache.get_chunk("uid-2", 1).expect("chunk");

	assert_eq!(first.data, second.data);
}

#[test]
fn unknown_uid_is_reported() {
	let error = cache().get_chunk("nope", 0).expect_err("must fail");

	assert_eq!(error.status(), queryfan_core::proto::Status::UidUnknown);
}

#[test]
fn out_of_range_index_is_unknown() {
	let cache = cache();
	cache.put(result("uid-3", 5, 2, TTL));

	let error = cache.get_chunk("uid-3", 3).expect_err("must fail");
	assert_eq!(error.status(), queryfan_core::proto::Status::UidUnknown);
}

#[test]
fn expired_result_is_reported_and_swept() {
	let cache = cache();
	cache.put(result("uid-4", 5, 2, Duration::ZERO));

	let error = cache.get_chunk("uid-4", 0).expect_err("must fail");
	assert_eq!(error.status(), queryfan_core::proto::Status::UidExpired);

	// The entry still occupies the map until the sweep unlinks it.
	assert_eq!(cache.len(), 1);
	cache.sweep();
	assert!(cache.is_empty());
}

#[test]
fn sweep_keeps_live_entries() {
	let cache = cache();
	cache.put(result("dead", 2, 2, Duration::ZERO));
	cache.put(result("live", 2, 2, TTL));

	cache.sweep();

	assert_eq!(cache.len(), 1);
	assert!(cache.get_chunk("live", 0).is_ok());
}
