use chrono::NaiveDate;
use itertools::Itertools;

use super::Config;
use crate::{Error, Result, Role, Team};

/// Startup validation of the loaded configuration. Any violation of the
/// topology or sharding invariants refuses to start the process.
pub fn check(config: &Config) -> Result {
	if config.processes.is_empty() {
		return Err(Error::Config("processes", "no processes declared".into()));
	}

	check_identities(config)?;
	check_roles(config)?;
	check_topology(config)?;
	check_bounds(config)?;
	check_strategies(config)?;

	Ok(())
}

fn check_identities(config: &Config) -> Result {
	for (id, node) in &config.processes {
		if node.id != *id {
			return Err(Error::Config(
				"processes",
				format!("entry {id} declares mismatched id {}", node.id).into(),
			));
		}

		if node.port == 0 {
			return Err(Error::Config(
				"processes",
				format!("node {id} declares port 0").into(),
			));
		}
	}

	Ok(())
}

fn check_roles(config: &Config) -> Result {
	let leaders = config
		.processes
		.values()
		.filter(|node| node.role == Role::Leader)
		.count();

	if leaders != 1 {
		return Err(Error::Config(
			"processes",
			format!("expected exactly one leader, found {leaders}").into(),
		));
	}

	for team in [Team::Green, Team::Pink] {
		let team_leaders = config
			.processes
			.values()
			.filter(|node| node.team == team && node.role == Role::TeamLeader)
			.count();

		if team_leaders != 1 {
			return Err(Error::Config(
				"processes",
				format!("team {team} declares {team_leaders} team leaders, expected 1").into(),
			));
		}
	}

	Ok(())
}

fn check_topology(config: &Config) -> Result {
	for (id, node) in &config.processes {
		if let Some(dup) = node.neighbors.iter().duplicates().next() {
			return Err(Error::Config(
				"neighbors",
				format!("node {id} declares neighbor {dup} twice").into(),
			));
		}

		for neighbor in &node.neighbors {
			if *neighbor == *id {
				return Err(Error::Config(
					"neighbors",
					format!("node {id} declares itself as a neighbor").into(),
				));
			}

			let peer = config.processes.get(neighbor).ok_or_else(|| {
				Error::Config(
					"neighbors",
					format!("node {id} declares unknown neighbor {neighbor}").into(),
				)
			})?;

			if !peer.neighbors.contains(id) {
				return Err(Error::Config(
					"neighbors",
					format!("link {id}-{neighbor} is not symmetric").into(),
				));
			}
		}
	}

	// Every downstream edge the hierarchy relies on must be a declared link:
	// the leader reaches both team leaders, a team leader reaches its
	// workers.
	let leader = config
		.processes
		.values()
		.find(|node| node.role == Role::Leader)
		.expect("leader presence checked above");

	for node in config.processes.values() {
		match node.role {
			| Role::TeamLeader =>
				if !leader.neighbors.contains(&node.id) {
					return Err(Error::Config(
						"neighbors",
						format!("leader {} is not adjacent to team leader {}", leader.id, node.id)
							.into(),
					));
				},
			| Role::Worker => {
				let team_leader = config
					.processes
					.values()
					.find(|peer| peer.team == node.team && peer.role == Role::TeamLeader)
					.expect("team leader presence checked above");

				if !team_leader.neighbors.contains(&node.id) {
					return Err(Error::Config(
						"neighbors",
						format!(
							"worker {} is not adjacent to its team leader {}",
							node.id, team_leader.id
						)
						.into(),
					));
				}
			},
			| Role::Leader => {},
		}
	}

	Ok(())
}

fn check_bounds(config: &Config) -> Result {
	for (id, node) in &config.processes {
		match node.bounds() {
			| None if node.role.owns_data() => {
				return Err(Error::Config(
					"date_bounds",
					format!("node {id} has a data-owning role but no date_bounds").into(),
				));
			},
			| None => {},
			| Some((start, end)) => {
				parse_date(*id, start)?;
				parse_date(*id, end)?;

				if start > end {
					return Err(Error::Config(
						"date_bounds",
						format!("node {id} declares inverted bounds {start}..{end}").into(),
					));
				}
			},
		}
	}

	// Sub-ranges within a team must not overlap.
	for team in [Team::Green, Team::Pink] {
		let ranges = config
			.processes
			.values()
			.filter(|node| node.team == team)
			.filter_map(|node| node.bounds().map(|bounds| (node.id, bounds)))
			.sorted_by_key(|(_, (start, _))| *start)
			.collect_vec();

		for ((a, (_, a_end)), (b, (b_start, _))) in ranges.iter().tuple_windows() {
			if b_start <= a_end {
				return Err(Error::Config(
					"date_bounds",
					format!("nodes {a} and {b} declare overlapping shards in team {team}").into(),
				));
			}
		}
	}

	// Teams own disjoint overall ranges.
	if let (Some((g_start, g_end)), Some((p_start, p_end))) =
		(config.team_bounds(Team::Green), config.team_bounds(Team::Pink))
	{
		if g_start <= p_end && p_start <= g_end {
			return Err(Error::Config(
				"date_bounds",
				"green and pink date ranges overlap".into(),
			));
		}
	}

	Ok(())
}

fn check_strategies(config: &Config) -> Result {
	if config.strategies.chunk_size == 0 {
		return Err(Error::Config("chunk_size", "chunk_size must be at least 1".into()));
	}

	if config.strategies.max_chunk_size < config.strategies.chunk_size {
		return Err(Error::Config(
			"max_chunk_size",
			"max_chunk_size must not be below chunk_size".into(),
		));
	}

	if config.limits.max_total == 0 {
		return Err(Error::Config("max_total", "max_total must be at least 1".into()));
	}

	for team in [Team::Green, Team::Pink] {
		if config.processes.values().any(|node| node.team == team)
			&& config.team_budget(team) == 0
		{
			return Err(Error::Config(
				"max_per_team",
				format!("team {team} has processes but no admission budget").into(),
			));
		}
	}

	Ok(())
}

fn parse_date(id: crate::NodeId, yyyymmdd: u32) -> Result<NaiveDate> {
	NaiveDate::parse_from_str(&yyyymmdd.to_string(), "%Y%m%d").map_err(|_| {
		Error::Config(
			"date_bounds",
			format!("node {id} declares invalid date {yyyymmdd}").into(),
		)
	})
}
