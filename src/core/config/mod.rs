pub mod check;

use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

use figment::{
	Figment,
	providers::{Env, Format, Toml},
};
use serde::Deserialize;

use crate::{NodeId, Result, Role, Team};

/// All the config options for a queryfan deployment. One document describes
/// every process of the overlay; a process picks its own entry by id.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	/// Tracing filter directives, e.g. "info" or
	/// "queryfan=debug,tower_http=warn".
	#[serde(default = "default_log")]
	pub log: String,

	/// Directory holding the per-date CSV shard files.
	#[serde(default = "default_data_dir")]
	pub data_dir: PathBuf,

	pub strategies: Strategies,

	#[serde(default)]
	pub limits: Limits,

	#[serde(default)]
	pub cache: Cache,

	#[serde(default)]
	pub client: Client,

	#[serde(default)]
	pub query: Query,

	/// Every process of the overlay, keyed by node id.
	pub processes: BTreeMap<NodeId, Node>,
}

/// Strategy selection, resolved once at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct Strategies {
	pub forwarding: Forwarding,

	/// When false, concurrent fan-out is disabled and forwarding degrades to
	/// the blocking round-robin order.
	#[serde(default = "default_async_forwarding")]
	pub async_forwarding: bool,

	pub chunking: Chunking,

	pub fairness: Fairness,

	/// Base chunk size for the fixed/adaptive/query_based policies.
	///
	/// default: 200
	#[serde(default = "default_chunk_size")]
	pub chunk_size: u32,

	/// Ceiling for the adaptive policy on very large results.
	///
	/// default: 1000
	#[serde(default = "default_max_chunk_size")]
	pub max_chunk_size: u32,
}

impl Strategies {
	/// The forwarding strategy actually in force once `async_forwarding` is
	/// taken into account.
	#[must_use]
	pub fn effective_forwarding(&self) -> Forwarding {
		if self.async_forwarding {
			self.forwarding
		} else {
			Forwarding::RoundRobin
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Forwarding {
	RoundRobin,
	Parallel,
	Capacity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chunking {
	Fixed,
	Adaptive,
	QueryBased,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fairness {
	Strict,
	Weighted,
	Hybrid,
}

/// Admission budgets shared by every process.
#[derive(Clone, Debug, Deserialize)]
pub struct Limits {
	/// default: 64
	#[serde(default = "default_max_total")]
	pub max_total: u32,

	/// default: 32 per team
	#[serde(default = "default_max_per_team")]
	pub max_per_team: BTreeMap<Team, u32>,
}

impl Default for Limits {
	fn default() -> Self {
		Self {
			max_total: default_max_total(),
			max_per_team: default_max_per_team(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Cache {
	/// Lifetime of a published chunked result, in seconds.
	///
	/// default: 120
	#[serde(default = "default_cache_ttl")]
	pub ttl_secs: u64,

	/// How often the eviction sweep runs, in seconds.
	///
	/// default: 5
	#[serde(default = "default_cache_sweep_interval")]
	pub sweep_interval_secs: u64,
}

impl Default for Cache {
	fn default() -> Self {
		Self {
			ttl_secs: default_cache_ttl(),
			sweep_interval_secs: default_cache_sweep_interval(),
		}
	}
}

/// Knobs for the pooled neighbor HTTP client.
#[derive(Clone, Debug, Deserialize)]
pub struct Client {
	/// default: 30
	#[serde(default = "default_request_timeout")]
	pub request_timeout: u64,

	/// default: 5
	#[serde(default = "default_connect_timeout")]
	pub connect_timeout: u64,

	/// default: 4
	#[serde(default = "default_idle_per_host")]
	pub idle_per_host: u16,

	/// default: 25
	#[serde(default = "default_idle_timeout")]
	pub idle_timeout: u64,

	/// Seconds between neighbor load probes under the capacity strategy.
	///
	/// default: 3
	#[serde(default = "default_probe_interval")]
	pub probe_interval: u64,
}

impl Default for Client {
	fn default() -> Self {
		Self {
			request_timeout: default_request_timeout(),
			connect_timeout: default_connect_timeout(),
			idle_per_host: default_idle_per_host(),
			idle_timeout: default_idle_timeout(),
			probe_interval: default_probe_interval(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Query {
	/// Deadline applied to queries that do not carry one, in milliseconds.
	///
	/// default: 10000
	#[serde(default = "default_deadline_ms")]
	pub default_deadline_ms: u64,
}

impl Default for Query {
	fn default() -> Self {
		Self {
			default_deadline_ms: default_deadline_ms(),
		}
	}
}

/// Per-process identity. Immutable after startup.
#[derive(Clone, Debug, Deserialize)]
pub struct Node {
	pub id: NodeId,
	pub role: Role,
	pub team: Team,
	pub host: String,
	pub port: u16,

	/// Declared neighbor links, in forwarding order. Must be symmetric
	/// across the document.
	pub neighbors: Vec<NodeId>,

	/// Inclusive YYYYMMDD shard bounds. Required for data-owning roles.
	#[serde(default)]
	pub date_bounds: Option<[u32; 2]>,
}

impl Node {
	#[must_use]
	pub fn endpoint(&self) -> String { format!("http://{}:{}", self.host, self.port) }

	#[must_use]
	pub fn bounds(&self) -> Option<(u32, u32)> { self.date_bounds.map(|[start, end]| (start, end)) }
}

impl Config {
	/// Load the configuration from the given TOML file (or `queryfan.toml` /
	/// `$QUERYFAN_CONFIG` when absent), with `QUERYFAN_*` environment
	/// overrides applied on top.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let file = path.map_or_else(
			|| Env::var("QUERYFAN_CONFIG").unwrap_or_else(|| "queryfan.toml".to_owned()),
			|path| path.to_string_lossy().into_owned(),
		);

		Figment::new()
			.merge(Toml::file(file))
			.merge(Env::prefixed("QUERYFAN_").split("__"))
			.extract()
			.map_err(Into::into)
	}

	/// Validate the topology and strategy invariants; refuses startup on
	/// violation.
	pub fn check(&self) -> Result { check::check(self) }

	pub fn node(&self, id: NodeId) -> Result<&Node> {
		self.processes
			.get(&id)
			.ok_or_else(|| crate::Error::Config("processes", format!("unknown node id {id}").into()))
	}

	/// Downstream roster of a node: declared neighbors, in declaration
	/// order, on the same team with a strictly lower role. The leader is a
	/// special case: both team leaders are downstream of it.
	#[must_use]
	pub fn downstream(&self, id: NodeId) -> Vec<NodeId> {
		let Ok(node) = self.node(id) else {
			return Vec::new();
		};

		node.neighbors
			.iter()
			.filter(|&&neighbor| {
				self.processes
					.get(&neighbor)
					.is_some_and(|peer| match node.role {
						| Role::Leader => peer.role == Role::TeamLeader,
						| Role::TeamLeader =>
							peer.team == node.team && peer.role == Role::Worker,
						| Role::Worker => false,
					})
			})
			.copied()
			.collect()
	}

	/// The overall date range a team covers: the envelope of its members'
	/// declared bounds.
	#[must_use]
	pub fn team_bounds(&self, team: Team) -> Option<(u32, u32)> {
		self.processes
			.values()
			.filter(|node| node.team == team)
			.filter_map(Node::bounds)
			.fold(None, |acc, (start, end)| match acc {
				| None => Some((start, end)),
				| Some((lo, hi)) => Some((lo.min(start), hi.max(end))),
			})
	}

	/// Per-team admission budget; teams absent from the map get no slots.
	#[must_use]
	pub fn team_budget(&self, team: Team) -> u32 {
		self.limits.max_per_team.get(&team).copied().unwrap_or(0)
	}
}

fn default_log() -> String { "info".to_owned() }

fn default_data_dir() -> PathBuf { PathBuf::from("./data") }

fn default_async_forwarding() -> bool { true }

fn default_chunk_size() -> u32 { 200 }

fn default_max_chunk_size() -> u32 { 1000 }

fn default_max_total() -> u32 { 64 }

fn default_max_per_team() -> BTreeMap<Team, u32> {
	BTreeMap::from([(Team::Green, 32), (Team::Pink, 32)])
}

fn default_cache_ttl() -> u64 { 120 }

fn default_cache_sweep_interval() -> u64 { 5 }

fn default_request_timeout() -> u64 { 30 }

fn default_connect_timeout() -> u64 { 5 }

fn default_idle_per_host() -> u16 { 4 }

fn default_idle_timeout() -> u64 { 25 }

fn default_probe_interval() -> u64 { 3 }

fn default_deadline_ms() -> u64 { 10_000 }
