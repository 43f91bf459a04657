use std::{
	collections::VecDeque,
	sync::{
		Mutex,
		atomic::{AtomicU64, AtomicUsize, Ordering},
	},
	time::Duration,
};

/// Samples kept per rolling window. Old samples fall off; losing one to a
/// contended lock is acceptable, corruption is not.
const WINDOW: usize = 256;

/// Query and admission statistics for this process. Counters are cumulative
/// atomics; durations feed bounded rolling windows behind a short mutex.
#[derive(Default)]
pub struct Metrics {
	admitted: AtomicU64,
	rejected: AtomicU64,
	completed: AtomicU64,
	failed: AtomicU64,
	data_files_loaded: AtomicUsize,
	scan_times: Mutex<Window>,
	query_times: Mutex<Window>,
}

#[derive(Default)]
struct Window {
	samples: VecDeque<f64>,
	sum: f64,
}

impl Window {
	fn push(&mut self, sample: f64) {
		if self.samples.len() == WINDOW {
			if let Some(dropped) = self.samples.pop_front() {
				self.sum -= dropped;
			}
		}

		self.samples.push_back(sample);
		self.sum += sample;
	}

	fn avg(&self) -> f64 {
		if self.samples.is_empty() {
			return 0.0;
		}

		self.sum / self.samples.len() as f64
	}
}

impl Metrics {
	#[must_use]
	pub fn new() -> Self { Self::default() }

	pub fn record_admitted(&self) { self.admitted.fetch_add(1, Ordering::Relaxed); }

	pub fn record_rejected(&self) { self.rejected.fetch_add(1, Ordering::Relaxed); }

	pub fn record_completed(&self) { self.completed.fetch_add(1, Ordering::Relaxed); }

	pub fn record_failed(&self) { self.failed.fetch_add(1, Ordering::Relaxed); }

	pub fn record_scan(&self, elapsed: Duration) {
		self.scan_times
			.lock()
			.expect("locked for writing")
			.push(elapsed.as_secs_f64() * 1000.0);
	}

	pub fn record_query(&self, elapsed: Duration) {
		self.query_times
			.lock()
			.expect("locked for writing")
			.push(elapsed.as_secs_f64() * 1000.0);
	}

	pub fn set_data_files_loaded(&self, count: usize) {
		self.data_files_loaded.store(count, Ordering::Relaxed);
	}

	#[must_use]
	pub fn admitted(&self) -> u64 { self.admitted.load(Ordering::Relaxed) }

	#[must_use]
	pub fn rejected(&self) -> u64 { self.rejected.load(Ordering::Relaxed) }

	#[must_use]
	pub fn completed(&self) -> u64 { self.completed.load(Ordering::Relaxed) }

	#[must_use]
	pub fn failed(&self) -> u64 { self.failed.load(Ordering::Relaxed) }

	#[must_use]
	pub fn data_files_loaded(&self) -> usize { self.data_files_loaded.load(Ordering::Relaxed) }

	#[must_use]
	pub fn avg_scan_ms(&self) -> f64 { self.scan_times.lock().expect("locked for reading").avg() }

	#[must_use]
	pub fn avg_query_ms(&self) -> f64 {
		self.query_times.lock().expect("locked for reading").avg()
	}
}
