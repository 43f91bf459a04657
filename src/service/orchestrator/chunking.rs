use queryfan_core::config::{Chunking, Strategies};

/// Upper bound the adaptive policy will ever return.
const ADAPTIVE_CEILING: u32 = 1000;

/// Small-result chunk size for the adaptive policy.
const ADAPTIVE_FLOOR: u32 = 50;

/// Hard cap for the query-based policy.
const QUERY_BASED_CEILING: u32 = 500;

/// Chunk size for a merged result of `records` rows, per the configured
/// policy. Never returns zero.
pub(super) fn chunk_size(strategies: &Strategies, records: usize, limit: u32) -> u32 {
	let base = strategies.chunk_size;

	let size = match strategies.chunking {
		| Chunking::Fixed => base,
		| Chunking::Adaptive => adaptive(strategies, records),
		| Chunking::QueryBased => {
			let ceiling = QUERY_BASED_CEILING.max(base);
			(limit / 10).clamp(base, ceiling)
		},
	};

	size.max(1)
}

fn adaptive(strategies: &Strategies, records: usize) -> u32 {
	let base = strategies.chunk_size;

	if records < 100 {
		ADAPTIVE_FLOOR
	} else if records < 500 {
		base
	} else if records < 2000 {
		base.saturating_mul(2)
	} else {
		strategies.max_chunk_size.min(ADAPTIVE_CEILING)
	}
}
