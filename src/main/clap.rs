//! Integration with `clap`

use std::path::PathBuf;

use clap::Parser;

/// Commandline arguments
#[derive(Parser, Debug)]
#[clap(version = queryfan_core::version(), about, long_about = None)]
pub(crate) struct Args {
	/// Which process of the overlay this instance runs as (e.g. "A").
	#[arg(short, long, env = "QUERYFAN_ID")]
	pub(crate) id: String,

	/// Path of the queryfan config TOML file.
	#[arg(short, long)]
	pub(crate) config: Option<PathBuf>,

	/// Number of tokio worker threads; defaults to the available
	/// parallelism.
	#[arg(long)]
	pub(crate) worker_threads: Option<usize>,
}

/// Parse commandline arguments into structured data
#[must_use]
pub(crate) fn parse() -> Args { Args::parse() }
