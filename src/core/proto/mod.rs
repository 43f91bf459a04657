mod tests;

use std::{fmt, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::{NodeId, Result, Role, Team};

/// One shard row: an opaque mapping of column name to cell value. Numeric
/// cells are JSON numbers so filter comparisons need no re-parsing.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Filter comparison operator, spelled on the wire as the operator itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
	#[serde(rename = "<")]
	Less,
	#[serde(rename = "<=")]
	LessEq,
	#[serde(rename = "=")]
	Equal,
	#[serde(rename = ">=")]
	GreaterEq,
	#[serde(rename = ">")]
	Greater,
}

impl Comparator {
	#[must_use]
	pub fn matches(self, value: f64, threshold: f64) -> bool {
		match self {
			| Self::Less => value < threshold,
			| Self::LessEq => value <= threshold,
			| Self::Equal => value == threshold,
			| Self::GreaterEq => value >= threshold,
			| Self::Greater => value > threshold,
		}
	}

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			| Self::Less => "<",
			| Self::LessEq => "<=",
			| Self::Equal => "=",
			| Self::GreaterEq => ">=",
			| Self::Greater => ">",
		}
	}
}

impl fmt::Display for Comparator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

/// Outcome carried in every response body. Domain failures ride here with
/// HTTP 200; callers consult the status before fetching chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
	Ok,
	CapacityExhausted,
	UidExpired,
	UidUnknown,
	LoopSuppressed,
	NeighborUnreachable,
	InternalError,
}

impl Status {
	#[must_use]
	pub fn is_ok(self) -> bool { matches!(self, Self::Ok) }
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			| Self::Ok => "OK",
			| Self::CapacityExhausted => "CAPACITY_EXHAUSTED",
			| Self::UidExpired => "UID_EXPIRED",
			| Self::UidUnknown => "UID_UNKNOWN",
			| Self::LoopSuppressed => "LOOP_SUPPRESSED",
			| Self::NeighborUnreachable => "NEIGHBOR_UNREACHABLE",
			| Self::InternalError => "INTERNAL_ERROR",
		};

		write!(f, "{s}")
	}
}

/// `Query` request body. `uid` and `hops` are set only on internal forwards;
/// the client omits both and the originating leader assigns the uid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryRequest {
	pub field: String,
	pub comparator: Comparator,
	pub threshold: f64,
	pub limit: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub uid: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hops: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub deadline_ms: Option<u64>,
}

/// `Query` response body: result metadata only; rows travel via `GetChunk`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub uid: Option<String>,
	pub total_chunks: u32,
	pub total_records: u32,
	pub hops: Vec<String>,
	pub status: Status,
}

impl QueryResponse {
	/// A rowless response, used for rejections and loop suppression.
	#[must_use]
	pub fn empty(status: Status, uid: Option<String>, hops: Vec<String>) -> Self {
		Self {
			uid,
			total_chunks: 0,
			total_records: 0,
			hops,
			status,
		}
	}
}

/// `GetChunk` response body. `data` is an opaque base64 row batch which
/// round-trips rows losslessly through [`encode_rows`] / [`decode_rows`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkResponse {
	pub uid: String,
	pub index: u32,
	pub total_chunks: u32,
	pub data: String,
	pub is_last: bool,
	pub status: Status,
}

/// `GetMetrics` response body, exposed verbatim from the metrics tracker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsResponse {
	pub process_id: NodeId,
	pub role: Role,
	pub team: Team,
	pub active_requests: u32,
	/// Admission has no queue in this design; rejected work is never parked.
	pub queue_size: u32,
	pub avg_processing_time_ms: f64,
	pub data_files_loaded: u32,
	pub is_healthy: bool,
}

/// Encode a row batch for chunk transport.
pub fn encode_rows(rows: &[Arc<Row>]) -> Result<String> {
	let json = serde_json::to_vec(rows)?;

	Ok(BASE64.encode(json))
}

/// Decode a chunk payload back into rows.
pub fn decode_rows(data: &str) -> Result<Vec<Row>> {
	let json = BASE64.decode(data)?;

	serde_json::from_slice(&json).map_err(Into::into)
}
