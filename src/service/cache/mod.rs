mod tests;

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
	Error, Result, Server,
	overlay::Hops,
	proto::{ChunkResponse, Row, Status, encode_rows},
};
use tokio::time::interval;
use tracing::{debug, trace};

use crate::Service;

/// TTL-bounded store of published chunked results, keyed by UID. Readers
/// take a short shared lock; the eviction worker takes the exclusive lock
/// only to unlink expired entries, never touching live payloads.
pub struct Cache {
	results: RwLock<HashMap<String, Arc<CachedResult>>>,
	ttl: Duration,
	sweep_interval: Duration,
	server: Arc<Server>,
	interrupted: AtomicBool,
}

/// One published result. Rows are immutable once published; chunks are
/// windows into the row vector addressed by index.
pub struct CachedResult {
	pub uid: String,
	rows: Vec<Arc<Row>>,
	chunk_size: u32,
	total_chunks: u32,
	pub hops: Hops,
	created: Instant,
	ttl: Duration,
}

impl CachedResult {
	#[must_use]
	pub fn new(uid: String, rows: Vec<Arc<Row>>, chunk_size: u32, hops: Hops, ttl: Duration) -> Self {
		debug_assert!(chunk_size > 0, "chunk size must be positive");

		let total_chunks = rows
			.len()
			.div_ceil(chunk_size as usize)
			.max(1) as u32;

		Self {
			uid,
			rows,
			chunk_size,
			total_chunks,
			hops,
			created: Instant::now(),
			ttl,
		}
	}

	#[must_use]
	pub fn total_chunks(&self) -> u32 { self.total_chunks }

	#[must_use]
	pub fn total_records(&self) -> u32 { self.rows.len() as u32 }

	fn expired(&self) -> bool { self.created.elapsed() >= self.ttl }

	fn chunk_rows(&self, index: u32) -> Option<&[Arc<Row>]> {
		if index >= self.total_chunks {
			return None;
		}

		let start = (index as usize) * (self.chunk_size as usize);
		let end = (start + self.chunk_size as usize).min(self.rows.len());

		Some(&self.rows[start.min(self.rows.len())..end])
	}
}

impl Cache {
	pub(crate) fn build(server: &Arc<Server>) -> Arc<Self> {
		let config = &server.config.cache;

		Arc::new(Self {
			results: RwLock::new(HashMap::new()),
			ttl: Duration::from_secs(config.ttl_secs),
			sweep_interval: Duration::from_secs(config.sweep_interval_secs),
			server: server.clone(),
			interrupted: AtomicBool::new(false),
		})
	}

	/// The TTL applied to results published on this node.
	#[must_use]
	pub fn ttl(&self) -> Duration { self.ttl }

	pub fn put(&self, result: CachedResult) {
		let uid = result.uid.clone();
		self.results
			.write()
			.expect("locked for writing")
			.insert(uid, Arc::new(result));
	}

	/// Either a valid chunk or a terminal status; a sweep racing this lookup
	/// cannot serve stale data because expiry is re-checked under the read
	/// lock.
	pub fn get_chunk(&self, uid: &str, index: u32) -> Result<ChunkResponse> {
		let results = self.results.read().expect("locked for reading");
		let Some(entry) = results.get(uid) else {
			return Err(Error::UidUnknown(uid.to_owned()));
		};

		if entry.expired() {
			return Err(Error::UidExpired(uid.to_owned()));
		}

		let Some(rows) = entry.chunk_rows(index) else {
			return Err(Error::UidUnknown(format!("{uid}#{index}")));
		};

		Ok(ChunkResponse {
			uid: uid.to_owned(),
			index,
			total_chunks: entry.total_chunks,
			data: encode_rows(rows)?,
			is_last: index + 1 == entry.total_chunks,
			status: Status::Ok,
		})
	}

	#[must_use]
	pub fn len(&self) -> usize { self.results.read().expect("locked for reading").len() }

	#[must_use]
	pub fn is_empty(&self) -> bool { self.len() == 0 }

	fn sweep(&self) {
		let mut results = self.results.write().expect("locked for writing");
		let before = results.len();
		results.retain(|_, entry| !entry.expired());

		let evicted = before - results.len();
		if evicted > 0 {
			debug!(evicted, remaining = results.len(), "evicted expired results");
		}
	}
}

#[async_trait]
impl Service for Cache {
	async fn worker(self: Arc<Self>) -> Result<()> {
		let mut signal = self.server.signal.subscribe();
		let mut ticker = interval(self.sweep_interval);

		loop {
			tokio::select! {
				_ = ticker.tick() => {
					if self.interrupted.load(Ordering::Acquire) {
						break;
					}

					self.sweep();
				},
				_ = signal.recv() => break,
			}
		}

		trace!("cache eviction worker finished");
		Ok(())
	}

	fn interrupt(&self) { self.interrupted.store(true, Ordering::Release); }

	fn name(&self) -> &str { "cache" }
}
