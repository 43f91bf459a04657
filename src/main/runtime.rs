use std::{thread, time::Duration};

use queryfan_core::Result;
use tokio::runtime::Builder;

use crate::clap::Args;

const WORKER_NAME: &str = "queryfan:worker";
const WORKER_MIN: usize = 2;
const WORKER_KEEPALIVE: u64 = 36;

pub(super) fn new(args: &Args) -> Result<tokio::runtime::Runtime> {
	let workers = args.worker_threads.unwrap_or_else(|| {
		thread::available_parallelism().map_or(WORKER_MIN, usize::from)
	});

	Builder::new_multi_thread()
		.enable_io()
		.enable_time()
		.thread_name(WORKER_NAME)
		.worker_threads(workers.max(WORKER_MIN))
		.thread_keep_alive(Duration::from_secs(WORKER_KEEPALIVE))
		.build()
		.map_err(Into::into)
}
